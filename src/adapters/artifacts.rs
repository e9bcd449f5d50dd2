//! JSON artifact store: Implementation of ArtifactLoader.
//!
//! Loads the fitted scaler and classifier from a configured directory.
//!
//! # Integrity
//!
//! - If `manifest.json` is present, every loaded artifact must be listed in it
//!   with a matching SHA-256 digest
//! - Without a manifest, artifacts load with a warning unless a manifest is
//!   required by configuration
//!
//! # Compatibility
//!
//! Both artifacts must have been fitted on the thirteen model inputs. When an
//! artifact exports its fit-time column names, they must match
//! [`FEATURE_ORDER`] exactly: a transposed column is refused at load time
//! instead of silently corrupting every prediction.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::adapters::estimators::{FittedClassifier, FittedScaler};
use crate::domain::{trace_of, LoadError, FEATURE_COUNT, FEATURE_ORDER};
use crate::ports::{ArtifactLoader, Classifier, Normalizer};

/// Name of the optional digest manifest inside the artifact directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Only supported manifest layout.
const MANIFEST_VERSION: u32 = 1;

/// Where the artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub dir: PathBuf,
    pub normalizer_id: String,
    pub classifier_id: String,
    /// Refuse to load without a digest manifest.
    pub require_manifest: bool,
}

impl ArtifactLocation {
    #[must_use]
    pub fn normalizer_path(&self) -> PathBuf {
        self.dir.join(&self.normalizer_id)
    }

    #[must_use]
    pub fn classifier_path(&self) -> PathBuf {
        self.dir.join(&self.classifier_id)
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }
}

/// SHA-256 digests of the artifact files, keyed by file name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestManifest {
    pub version: u32,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub files: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Incompatible(String);

fn load_error(artifact: &str, err: &(dyn std::error::Error + 'static)) -> LoadError {
    LoadError::Load {
        artifact: artifact.to_string(),
        cause: err.to_string(),
        trace: trace_of(err),
    }
}

fn incompatible(artifact: &str, message: String) -> LoadError {
    load_error(artifact, &Incompatible(message))
}

/// Lowercase hex SHA-256 of a byte slice.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Compare two digests without short-circuiting on the first differing byte.
fn digest_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim().to_ascii_lowercase(), b.trim().to_ascii_lowercase());
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Check that fit-time column names (if exported) match the fixed order.
fn check_feature_contract(
    artifact: &str,
    feature_names: Option<&[String]>,
    n_features: usize,
) -> Result<(), LoadError> {
    if n_features != FEATURE_COUNT {
        return Err(incompatible(
            artifact,
            format!("fitted on {n_features} features, expected {FEATURE_COUNT}"),
        ));
    }
    let Some(names) = feature_names else {
        tracing::warn!(
            "Artifact {} does not export feature names; column order cannot be verified",
            artifact
        );
        return Ok(());
    };
    if names.len() != FEATURE_COUNT {
        return Err(incompatible(
            artifact,
            format!("exports {} feature names, expected {FEATURE_COUNT}", names.len()),
        ));
    }
    for (column, (name, feature)) in names.iter().zip(FEATURE_ORDER).enumerate() {
        if name != feature.key() {
            return Err(incompatible(
                artifact,
                format!(
                    "feature order mismatch at column {column}: artifact has {name:?}, expected {:?}",
                    feature.key()
                ),
            ));
        }
    }
    Ok(())
}

/// JSON artifact loader over a directory.
#[derive(Debug, Clone)]
pub struct JsonArtifactLoader {
    location: ArtifactLocation,
}

impl JsonArtifactLoader {
    #[must_use]
    pub fn new(location: ArtifactLocation) -> Self {
        Self { location }
    }

    fn read(&self, id: &str, path: &Path) -> Result<Vec<u8>, LoadError> {
        fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound {
                    dir: self.location.dir.clone(),
                    missing: vec![id.to_string()],
                }
            } else {
                load_error(id, &e)
            }
        })
    }

    fn parse<T: DeserializeOwned>(id: &str, bytes: &[u8]) -> Result<T, LoadError> {
        serde_json::from_slice(bytes).map_err(|e| load_error(id, &e))
    }

    /// Verify artifact digests against `manifest.json`, if present.
    fn verify_manifest(&self, artifacts: &[(&str, &[u8])]) -> Result<(), LoadError> {
        let manifest_path = self.location.manifest_path();
        if !manifest_path.is_file() {
            if self.location.require_manifest {
                tracing::error!("Artifact manifest required but not found at {:?}", manifest_path);
                return Err(incompatible(
                    MANIFEST_FILE,
                    format!("manifest required but not found at {}", manifest_path.display()),
                ));
            }
            tracing::warn!(
                "No {} in {:?}; loading artifacts without integrity verification",
                MANIFEST_FILE,
                self.location.dir
            );
            return Ok(());
        }

        let content = fs::read(&manifest_path).map_err(|e| load_error(MANIFEST_FILE, &e))?;
        let manifest: DigestManifest = Self::parse(MANIFEST_FILE, &content)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(incompatible(
                MANIFEST_FILE,
                format!("unsupported manifest version {}", manifest.version),
            ));
        }

        for (id, bytes) in artifacts {
            let expected = manifest.files.get(*id).ok_or_else(|| {
                incompatible(id, format!("not listed in {MANIFEST_FILE}"))
            })?;
            let actual = sha256_hex(bytes);
            if !digest_eq(expected, &actual) {
                tracing::error!("Digest mismatch for artifact {}", id);
                return Err(incompatible(
                    id,
                    format!("SHA-256 mismatch (manifest {expected}, file {actual})"),
                ));
            }
        }

        tracing::info!("Artifact digests verified against {:?}", manifest_path);
        Ok(())
    }
}

impl ArtifactLoader for JsonArtifactLoader {
    type Normalizer = FittedScaler;
    type Classifier = FittedClassifier;

    fn load(&self) -> Result<(FittedScaler, FittedClassifier), LoadError> {
        let loc = &self.location;
        let normalizer_path = loc.normalizer_path();
        let classifier_path = loc.classifier_path();

        let missing: Vec<String> = [
            (&loc.normalizer_id, &normalizer_path),
            (&loc.classifier_id, &classifier_path),
        ]
        .into_iter()
        .filter(|(_, path)| !path.is_file())
        .map(|(id, _)| id.clone())
        .collect();
        if !missing.is_empty() {
            tracing::error!(
                "Missing artifact(s) in {:?}: {}",
                loc.dir,
                missing.join(", ")
            );
            return Err(LoadError::NotFound {
                dir: loc.dir.clone(),
                missing,
            });
        }

        let normalizer_bytes = self.read(&loc.normalizer_id, &normalizer_path)?;
        let classifier_bytes = self.read(&loc.classifier_id, &classifier_path)?;
        self.verify_manifest(&[
            (loc.normalizer_id.as_str(), normalizer_bytes.as_slice()),
            (loc.classifier_id.as_str(), classifier_bytes.as_slice()),
        ])?;

        let scaler: FittedScaler = Self::parse(&loc.normalizer_id, &normalizer_bytes)?;
        scaler
            .validate()
            .map_err(|e| load_error(&loc.normalizer_id, &e))?;
        check_feature_contract(
            &loc.normalizer_id,
            scaler.feature_names.as_deref(),
            scaler.n_features(),
        )?;

        let classifier: FittedClassifier = Self::parse(&loc.classifier_id, &classifier_bytes)?;
        classifier
            .validate()
            .map_err(|e| load_error(&loc.classifier_id, &e))?;
        check_feature_contract(
            &loc.classifier_id,
            classifier.feature_names.as_deref(),
            classifier.n_features(),
        )?;

        tracing::info!(
            "Loaded artifacts from {:?} (normalizer={}, classifier={}, n_features={})",
            loc.dir,
            loc.normalizer_id,
            loc.classifier_id,
            FEATURE_COUNT
        );
        Ok((scaler, classifier))
    }

    fn location(&self) -> String {
        self.location.dir.display().to_string()
    }
}

/// Write `manifest.json` binding the current artifact files by digest.
///
/// # Errors
/// Returns error if an artifact cannot be read or the manifest cannot be written.
pub fn write_manifest(location: &ArtifactLocation) -> crate::Result<PathBuf> {
    let mut files = BTreeMap::new();
    for (id, path) in [
        (&location.normalizer_id, location.normalizer_path()),
        (&location.classifier_id, location.classifier_path()),
    ] {
        let bytes = fs::read(&path)?;
        files.insert(id.clone(), sha256_hex(&bytes));
    }

    let manifest = DigestManifest {
        version: MANIFEST_VERSION,
        created_at: Some(chrono::Utc::now()),
        files,
    };
    let path = location.manifest_path();
    fs::write(&path, serde_json::to_vec_pretty(&manifest)?)?;
    tracing::info!("Wrote artifact manifest to {:?}", path);
    Ok(path)
}
