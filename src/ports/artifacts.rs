//! Artifact loader port: Trait for reading the fitted artifacts from storage.

use crate::domain::LoadError;
use crate::ports::{Classifier, Normalizer};

/// Reads and deserializes the fitted normalizer and classifier.
///
/// A loader performs the expensive work on every call; memoization is the
/// job of [`crate::application::ArtifactCache`].
pub trait ArtifactLoader: Send + Sync {
    type Normalizer: Normalizer + 'static;
    type Classifier: Classifier + 'static;

    /// Load both artifacts.
    ///
    /// # Errors
    /// - `LoadError::NotFound` naming every missing artifact
    /// - `LoadError::Load` for any read, format or compatibility failure
    fn load(&self) -> Result<(Self::Normalizer, Self::Classifier), LoadError>;

    /// Human-readable storage location, for logs and status display.
    fn location(&self) -> String;
}
