//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the prediction pipeline and the fitted artifacts it consumes.

mod artifacts;
mod model;

pub use artifacts::ArtifactLoader;
pub use model::{Classifier, ModelError, Normalizer};
