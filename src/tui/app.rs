//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation
//! - Input event handling
//! - Background prediction via the worker, tracked by a [`Session`]

use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::JsonArtifactLoader;
use crate::application::{PredictionService, Session};
use crate::config::AppConfig;
use crate::ports::ArtifactLoader;

use super::ui::{
    patient::{render_patient_form, PatientFormState},
    render_disclaimer,
    result::{render_result_screen, ProgressView},
};
use super::worker::{PredictionProgress, PredictionWorker, PredictionWorkerHandle};

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    PatientForm,
    Result,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    LoadingArtifacts,
    Predicting,
}

impl Phase {
    /// `(floor, target, time constant in seconds)` of the progress animation.
    fn curve(self) -> (f64, f64, f64) {
        match self {
            Self::LoadingArtifacts => (0.05, 0.60, 1.5),
            Self::Predicting => (0.60, 0.95, 0.4),
        }
    }

    fn view(self, progress: f64) -> ProgressView {
        match self {
            Self::LoadingArtifacts => ProgressView {
                stage: "Loading artifacts",
                description: "Loading the fitted scaler and classifier...",
                progress,
            },
            Self::Predicting => ProgressView {
                stage: "Predicting",
                description: "Scaling biomarkers and scoring...",
                progress,
            },
        }
    }
}

/// Main application state
pub struct App<L: ArtifactLoader + 'static = JsonArtifactLoader> {
    screen: Screen,
    should_quit: bool,
    service: PredictionService<L>,
    session: Session,
    form: PatientFormState,
    pending_worker: Option<PredictionWorkerHandle>,
    phase: Option<(Phase, Instant)>,
    progress: ProgressView,
    show_trace: bool,
}

impl App {
    /// Create the application over the configured artifact directory.
    ///
    /// Artifacts are loaded on the first prediction, not here.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self::with_service(PredictionService::new(JsonArtifactLoader::new(
            config.artifacts.clone(),
        )))
    }
}

impl<L: ArtifactLoader + 'static> App<L> {
    /// Create application with an injected service (Composition Root pattern).
    #[must_use]
    pub fn with_service(service: PredictionService<L>) -> Self {
        Self {
            screen: Screen::PatientForm,
            should_quit: false,
            service,
            session: Session::new(),
            form: PatientFormState::default(),
            pending_worker: None,
            phase: None,
            progress: ProgressView::default(),
            show_trace: false,
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        tracing::info!("Artifact location: {}", self.service.location());

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        while !self.should_quit {
            self.poll_worker();
            self.tick_progress();

            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(3)])
                    .split(f.area());

                match self.screen {
                    Screen::PatientForm => render_patient_form(f, chunks[0], &self.form),
                    Screen::Result => render_result_screen(
                        f,
                        chunks[0],
                        self.session.state(),
                        &self.progress,
                        self.show_trace,
                    ),
                }
                render_disclaimer(f, chunks[1]);
            })?;

            // Short poll to stay responsive while a worker runs
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }
        }

        Ok(())
    }

    /// Drain progress messages from the background worker.
    fn poll_worker(&mut self) {
        while let Some(progress) = self.pending_worker.as_ref().and_then(PredictionWorkerHandle::try_recv) {
            match progress {
                PredictionProgress::LoadingArtifacts => self.set_phase(Phase::LoadingArtifacts),
                PredictionProgress::Predicting => self.set_phase(Phase::Predicting),
                PredictionProgress::Finished(outcome) => {
                    self.session.complete(outcome);
                    self.pending_worker = None;
                    self.phase = None;
                    self.progress.progress = 1.0;
                }
            }
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        let (floor, _, _) = phase.curve();
        let progress = self.progress.progress.max(floor);
        self.phase = Some((phase, Instant::now()));
        self.progress = phase.view(progress);
    }

    /// Smooth, monotonic progress approaching the current phase target.
    fn tick_progress(&mut self) {
        let Some((phase, started_at)) = self.phase else {
            return;
        };
        let (floor, target, tau) = phase.curve();
        let elapsed = Instant::now()
            .saturating_duration_since(started_at)
            .as_secs_f64();
        let k = 1.0 - (-elapsed / tau).exp();
        let desired = floor + (target - floor) * k;
        self.progress.progress = desired.max(self.progress.progress).min(target);
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::PatientForm => self.handle_patient_form_key(key),
            Screen::Result => self.handle_result_key(key),
        }
    }

    fn handle_patient_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::BackTab => self.form.prev_field(),
            KeyCode::Down | KeyCode::Tab => self.form.next_field(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.form.reset_defaults(),
            KeyCode::Char(c) => self.form.input_char(c),
            KeyCode::Backspace => self.form.delete_char(),
            KeyCode::Delete => self.form.clear_field(),
            KeyCode::Enter => self.submit_patient_form(),
            KeyCode::Esc if self.session.outcome().is_some() => self.screen = Screen::Result,
            _ => {}
        }
    }

    fn handle_result_key(&mut self, key: KeyCode) {
        if self.session.is_busy() {
            return;
        }
        match key {
            // Inputs were wiped on submit; a new prediction starts from the form.
            KeyCode::Enter | KeyCode::Esc => self.screen = Screen::PatientForm,
            KeyCode::Char('n') | KeyCode::Char('N') => {
                self.form = PatientFormState::default();
                self.session.reset();
                self.screen = Screen::PatientForm;
            }
            KeyCode::Char('t') | KeyCode::Char('T') => self.show_trace = !self.show_trace,
            _ => {}
        }
    }

    fn submit_patient_form(&mut self) {
        let Some(features) = self.form.validate() else {
            return;
        };
        if !self.session.trigger() {
            return;
        }

        self.screen = Screen::Result;
        self.show_trace = false;
        self.progress = ProgressView::default();
        self.phase = None;
        self.pending_worker = Some(PredictionWorker::spawn(self.service.clone(), features));

        // Clear plaintext buffers from the UI immediately.
        self.form.clear_sensitive();
    }
}
