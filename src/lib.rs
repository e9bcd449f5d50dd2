//! # IFX Predictor
//!
//! Decision support for infliximab (IFX) therapeutic drug monitoring.
//!
//! Thirteen patient biomarkers are validated, ordered into the column layout
//! the artifacts were fitted on, scaled by a pre-fitted normalizer and scored
//! by a pre-trained binary classifier. The result is whether the serum IFX
//! concentration is expected to reach the therapeutic threshold, with the
//! model's confidence in its own answer.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Feature catalog, validated feature vectors, prediction results, errors
//! - `ports`: Trait definitions for the fitted normalizer, classifier and artifact loader
//! - `adapters`: JSON artifact store, fitted estimator implementations, log sanitization
//! - `application`: Artifact cache, prediction pipeline, session state machine
//! - `config`: Environment-based configuration
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{
    parse_feature_map, ConcentrationClass, ErrorKind, ErrorReport, Feature, FeatureMap,
    FeatureVector, LoadError, PredictError, PredictionResult, RawValue,
};

/// Result type for IFX predictor operations
pub type Result<T> = std::result::Result<T, IfxError>;

/// Main error type for the IFX predictor
#[derive(Debug, thiserror::Error)]
pub enum IfxError {
    #[error("Artifact loading failed: {0}")]
    Load(#[from] LoadError),

    #[error("Prediction failed: {0}")]
    Predict(#[from] PredictError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
