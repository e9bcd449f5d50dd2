//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the prediction use case shared by every front end.

pub mod cache;
mod pipeline;
mod service;
mod session;

pub use cache::{ArtifactCache, Artifacts, LoadedArtifacts};
pub use pipeline::predict;
pub use service::PredictionService;
pub use session::{Outcome, Session, SessionState};
