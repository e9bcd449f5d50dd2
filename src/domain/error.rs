//! Error taxonomy of the prediction pipeline and its displayable form.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::path::PathBuf;

use serde::Serialize;

/// Failure to load the fitted artifacts.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    /// One or both artifact files are missing.
    #[error("Artifact(s) not found in {}: {}", dir.display(), missing.join(", "))]
    NotFound { dir: PathBuf, missing: Vec<String> },

    /// An artifact is present but unreadable, malformed or incompatible.
    #[error("Failed to load artifact {artifact}: {cause}")]
    Load {
        artifact: String,
        cause: String,
        trace: String,
    },
}

/// Failure of a single prediction request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PredictError {
    /// Missing or unknown keys, or values outside their domain constraint.
    #[error("Invalid features: {}", .0.join("; "))]
    InvalidFeatures(Vec<String>),

    /// A value that cannot be represented as a finite real number.
    #[error("Feature {feature}: value {value} is not a finite real number")]
    TypeCoercion { feature: String, value: String },

    /// The normalizer or classifier failed.
    #[error("Inference failed: {cause}")]
    Inference { cause: String, trace: String },

    #[error(transparent)]
    Artifacts(#[from] LoadError),
}

/// Category of a displayable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ArtifactNotFound,
    ArtifactLoadError,
    TypeCoercionError,
    PredictionError,
    InvalidFeatures,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ArtifactNotFound => "ArtifactNotFound",
            Self::ArtifactLoadError => "ArtifactLoadError",
            Self::TypeCoercionError => "TypeCoercionError",
            Self::PredictionError => "PredictionError",
            Self::InvalidFeatures => "InvalidFeatures",
        };
        f.write_str(s)
    }
}

/// Structured error handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl From<&LoadError> for ErrorReport {
    fn from(err: &LoadError) -> Self {
        match err {
            LoadError::NotFound { .. } => Self {
                kind: ErrorKind::ArtifactNotFound,
                message: err.to_string(),
                trace: None,
            },
            LoadError::Load { trace, .. } => Self {
                kind: ErrorKind::ArtifactLoadError,
                message: err.to_string(),
                trace: Some(trace.clone()),
            },
        }
    }
}

impl From<&PredictError> for ErrorReport {
    fn from(err: &PredictError) -> Self {
        match err {
            PredictError::Artifacts(load) => Self::from(load),
            PredictError::InvalidFeatures(_) => Self {
                kind: ErrorKind::InvalidFeatures,
                message: err.to_string(),
                trace: None,
            },
            PredictError::TypeCoercion { .. } => Self {
                kind: ErrorKind::TypeCoercionError,
                message: err.to_string(),
                trace: None,
            },
            PredictError::Inference { trace, .. } => Self {
                kind: ErrorKind::PredictionError,
                message: err.to_string(),
                trace: Some(trace.clone()),
            },
        }
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Render an error's source chain, plus a stack backtrace when enabled
/// through `RUST_BACKTRACE`/`RUST_LIB_BACKTRACE`.
#[must_use]
pub fn trace_of(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\n  caused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }

    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        out.push_str("\n\nstack backtrace:\n");
        out.push_str(&backtrace.to_string());
    }
    out
}
