//! Adapters layer: Concrete implementations of ports.
//!
//! - `estimators`: fitted scaler and classifier evaluated from JSON parameters
//! - `artifacts`: directory-backed artifact loading with digest verification
//! - `sanitize`: patient-data filtering for logs

pub mod artifacts;
pub mod estimators;
pub mod sanitize;

pub use artifacts::{ArtifactLocation, JsonArtifactLoader};
pub use estimators::{FittedClassifier, FittedScaler};
