//! Domain layer: Core business types and logic.
//!
//! This module contains pure Rust types with no I/O.
//! All inbound values are validated here before reaching a model.

mod error;
pub mod features;
mod prediction;

pub use error::{trace_of, ErrorKind, ErrorReport, LoadError, PredictError};
pub use features::{
    parse_feature_map, Feature, FeatureConstraint, FeatureMap, FeatureVector, RawValue,
    FEATURE_COUNT, FEATURE_ORDER,
};
pub use prediction::{
    select_confidence, ConcentrationClass, PredictionResult, THERAPEUTIC_THRESHOLD_UG_ML,
};
