//! Interactive session state, independent of rendering.
//!
//! `Idle -> Predicting -> ResultReady`, with re-trigger or reset from
//! `ResultReady`. One request is in flight at a time.

use crate::domain::{ErrorReport, FeatureMap, PredictionResult};
use crate::ports::ArtifactLoader;

use super::PredictionService;

/// Outcome of one prediction request.
pub type Outcome = Result<PredictionResult, ErrorReport>;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Predicting,
    ResultReady(Outcome),
}

#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Start a request. Returns `false` (and changes nothing) while one is
    /// already in flight.
    pub fn trigger(&mut self) -> bool {
        if self.is_busy() {
            tracing::debug!("Prediction already in progress; trigger ignored");
            return false;
        }
        self.state = SessionState::Predicting;
        true
    }

    /// Finish the in-flight request. Ignored unless `Predicting`.
    pub fn complete(&mut self, outcome: Outcome) {
        if self.is_busy() {
            self.state = SessionState::ResultReady(outcome);
        } else {
            tracing::debug!("Completion without a pending request ignored");
        }
    }

    /// Discard any result and return to `Idle`. Ignored while `Predicting`.
    pub fn reset(&mut self) {
        if !self.is_busy() {
            self.state = SessionState::Idle;
        }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self.state, SessionState::Predicting)
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&Outcome> {
        match &self.state {
            SessionState::ResultReady(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Run a request synchronously on the calling thread.
    ///
    /// Returns `None` if a request is already in flight.
    pub fn submit<L: ArtifactLoader>(
        &mut self,
        service: &PredictionService<L>,
        features: &FeatureMap,
    ) -> Option<&Outcome> {
        if !self.trigger() {
            return None;
        }
        self.complete(service.run(features));
        self.outcome()
    }
}
