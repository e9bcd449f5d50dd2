//! Model ports: Traits for the fitted normalizer and classifier.
//!
//! Both objects are pre-fitted and read-only. Implementations must be
//! deterministic and must never refit on a call.

/// Errors raised by a fitted normalizer or classifier at call time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Dimension mismatch: expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Non-finite value produced by {0}")]
    NonFinite(&'static str),

    #[error("Invalid model: {0}")]
    Invalid(String),
}

/// A fitted feature scaler.
pub trait Normalizer: Send + Sync {
    /// Number of input columns the normalizer was fitted on.
    fn n_features(&self) -> usize;

    /// Scale a single row.
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` if `row.len() != n_features()`.
    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError>;
}

/// A fitted binary classifier over classes `0` and `1`.
pub trait Classifier: Send + Sync {
    /// Number of input columns the classifier was fitted on.
    fn n_features(&self) -> usize;

    /// Probability distribution `[p(class 0), p(class 1)]` for a scaled row.
    ///
    /// # Errors
    /// Returns error on dimension mismatch or numeric failure.
    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], ModelError>;

    /// Predicted class for a scaled row.
    ///
    /// Defaults to the most probable class; ties resolve to class `0`.
    ///
    /// # Errors
    /// Returns error on dimension mismatch or numeric failure.
    fn predict(&self, row: &[f64]) -> Result<u8, ModelError> {
        let proba = self.predict_proba(row)?;
        Ok(u8::from(proba[1] > proba[0]))
    }
}
