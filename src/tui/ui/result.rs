//! Prediction progress and result view.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::application::SessionState;
use crate::domain::{ConcentrationClass, ErrorReport, PredictionResult, THERAPEUTIC_THRESHOLD_UG_ML};
use crate::tui::styles::ClinicalTheme;

/// What the progress bar shows while a request is in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressView {
    pub stage: &'static str,
    pub description: &'static str,
    pub progress: f64,
}

impl Default for ProgressView {
    fn default() -> Self {
        Self {
            stage: "Queued",
            description: "Waiting for the prediction worker...",
            progress: 0.0,
        }
    }
}

/// Render the result screen for the current session state.
pub fn render_result_screen(
    f: &mut Frame,
    area: Rect,
    state: &SessionState,
    progress: &ProgressView,
    show_trace: bool,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_header(f, chunks[0]);
    match state {
        SessionState::Idle => render_idle(f, chunks[1]),
        SessionState::Predicting => render_progress(f, chunks[1], progress),
        SessionState::ResultReady(Ok(result)) => render_result(f, chunks[1], result),
        SessionState::ResultReady(Err(report)) => render_error(f, chunks[1], report, show_trace),
    }
    render_footer(f, chunks[2], state);
}

fn render_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", ClinicalTheme::text()),
        Span::styled("Prediction", ClinicalTheme::title()),
        Span::styled(
            format!(" │ Serum IFX vs {THERAPEUTIC_THRESHOLD_UG_ML} μg/ml threshold"),
            ClinicalTheme::text_secondary(),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_idle(f: &mut Frame, area: Rect) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "No prediction yet",
            ClinicalTheme::text_secondary(),
        )),
        Line::from(Span::styled(
            "Fill in the biomarker form and press Enter",
            ClinicalTheme::text_muted(),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(content, area);
}

fn render_progress(f: &mut Frame, area: Rect, view: &ProgressView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(0),
        ])
        .margin(2)
        .split(area);

    let stage = Paragraph::new(Line::from(vec![
        Span::styled("Stage: ", ClinicalTheme::text_secondary()),
        Span::styled(view.stage, ClinicalTheme::focused()),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(stage, chunks[0]);

    let ratio = view.progress.clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(ClinicalTheme::border()),
        )
        .gauge_style(ClinicalTheme::info())
        .ratio(ratio)
        .label(format!("{:.0}%", ratio * 100.0));
    f.render_widget(gauge, chunks[1]);

    let desc = Paragraph::new(Line::from(Span::styled(
        view.description,
        ClinicalTheme::text_muted(),
    )))
    .alignment(Alignment::Center);
    f.render_widget(desc, chunks[2]);
}

fn render_result(f: &mut Frame, area: Rect, result: &PredictionResult) {
    let block = Block::default()
        .title(Span::styled(" Prediction Result ", ClinicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicalTheme::border_focused());

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Class
            Constraint::Length(3), // Confidence gauge
            Constraint::Length(2), // Probability pair
            Constraint::Min(0),    // Advice
        ])
        .margin(1)
        .split(inner);

    let class_style = ClinicalTheme::concentration(result.class);
    let marker = match result.class {
        ConcentrationClass::Therapeutic => "OK",
        ConcentrationClass::Subtherapeutic => "!",
    };
    let class_display = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("{marker} {}", result.label.to_uppercase()),
            class_style,
        )),
        Line::from(Span::styled(
            result.class.description(),
            ClinicalTheme::text_secondary(),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(class_display, chunks[0]);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(" Confidence ", ClinicalTheme::text_secondary()))
                .borders(Borders::ALL)
                .border_style(ClinicalTheme::border()),
        )
        .gauge_style(ClinicalTheme::confidence_gauge(result.class, result.confidence))
        .ratio(result.confidence.clamp(0.0, 1.0))
        .label(format!("{:.1}%", result.confidence * 100.0));
    f.render_widget(gauge, chunks[1]);

    let [p_low, p_high] = result.probabilities;
    let probabilities = Paragraph::new(Line::from(vec![
        Span::styled("P(< 3 μg/ml) ", ClinicalTheme::text_secondary()),
        Span::styled(format!("{:.1}%", p_low * 100.0), ClinicalTheme::text()),
        Span::styled("   P(≥ 3 μg/ml) ", ClinicalTheme::text_secondary()),
        Span::styled(format!("{:.1}%", p_high * 100.0), ClinicalTheme::text()),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(probabilities, chunks[2]);

    let advice: Vec<Line> = result
        .class
        .advice()
        .iter()
        .map(|line| {
            Line::from(vec![
                Span::styled(" • ", class_style),
                Span::styled(*line, ClinicalTheme::text()),
            ])
        })
        .collect();
    let advice = Paragraph::new(advice)
        .block(
            Block::default()
                .title(Span::styled(" Clinical Advice ", ClinicalTheme::subtitle()))
                .borders(Borders::ALL)
                .border_style(ClinicalTheme::border()),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(advice, chunks[3]);
}

fn render_error(f: &mut Frame, area: Rect, report: &ErrorReport, show_trace: bool) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("! {}", report.kind),
            ClinicalTheme::danger(),
        )),
        Line::from(""),
        Line::from(Span::styled(report.message.as_str(), ClinicalTheme::text())),
    ];

    match (&report.trace, show_trace) {
        (Some(trace), true) => {
            lines.push(Line::from(""));
            lines.extend(
                trace
                    .lines()
                    .map(|l| Line::from(Span::styled(l, ClinicalTheme::text_muted()))),
            );
        }
        (Some(_), false) => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "[T] show trace",
                ClinicalTheme::text_muted(),
            )));
        }
        (None, _) => {}
    }

    let content = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(ClinicalTheme::danger()),
        );

    f.render_widget(content, area);
}

fn render_footer(f: &mut Frame, area: Rect, state: &SessionState) {
    let content = match state {
        SessionState::Predicting => Line::from(Span::styled(
            "Processing...",
            ClinicalTheme::text_muted(),
        )),
        _ => Line::from(vec![
            Span::styled("[Enter/Esc] ", ClinicalTheme::key_hint()),
            Span::styled("Back to Form ", ClinicalTheme::key_desc()),
            Span::styled("[T] ", ClinicalTheme::key_hint()),
            Span::styled("Trace ", ClinicalTheme::key_desc()),
            Span::styled("[N] ", ClinicalTheme::key_hint()),
            Span::styled("New Patient ", ClinicalTheme::key_desc()),
            Span::styled("[Ctrl+Q] ", ClinicalTheme::key_hint()),
            Span::styled("Quit", ClinicalTheme::key_desc()),
        ]),
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(footer, area);
}
