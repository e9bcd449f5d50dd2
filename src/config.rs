//! Environment-based configuration.
//!
//! Every setting has a default, so an empty environment yields a working
//! configuration pointing at `./models`.

use std::path::PathBuf;

use crate::adapters::sanitize::DEFAULT_SANITIZE_MAX_BYTES;
use crate::adapters::ArtifactLocation;
use crate::{IfxError, Result};

pub const DEFAULT_ARTIFACT_DIR: &str = "models";
pub const DEFAULT_SCALER_FILE: &str = "ifx_scaler.json";
pub const DEFAULT_MODEL_FILE: &str = "ifx_ensemble_model.json";
pub const DEFAULT_LOG_FILE: &str = "ifx_predictor.log";

/// Where formatted log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// File when stdout is a terminal, stdout otherwise.
    #[default]
    Auto,
    File,
    Stdout,
}

impl LogMode {
    /// Parse a mode name; anything unrecognized is `Auto`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Self::File,
            "stdout" => Self::Stdout,
            _ => Self::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub artifacts: ArtifactLocation,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    /// Per-line input cap of the log sanitizer.
    pub sanitize_max_bytes: usize,
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES")
}

/// Artifact identifiers are file names inside the artifact directory.
fn plain_file_name(var: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\'])
    {
        return Err(IfxError::Config(format!(
            "{var} must be a plain file name, got {value:?}"
        )));
    }
    Ok(trimmed.to_string())
}

fn positive_size(var: &str, value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(IfxError::Config(format!(
            "{var} must be a positive byte count, got {value:?}"
        ))),
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Same as [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `IfxError::Config` if an artifact identifier is not a plain file
    /// name or the sanitizer cap is not a positive integer.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dir = lookup("IFX_ARTIFACT_DIR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ARTIFACT_DIR.to_string());
        let normalizer_id = plain_file_name(
            "IFX_SCALER_FILE",
            lookup("IFX_SCALER_FILE").unwrap_or_else(|| DEFAULT_SCALER_FILE.to_string()),
        )?;
        let classifier_id = plain_file_name(
            "IFX_MODEL_FILE",
            lookup("IFX_MODEL_FILE").unwrap_or_else(|| DEFAULT_MODEL_FILE.to_string()),
        )?;
        if normalizer_id == classifier_id {
            return Err(IfxError::Config(format!(
                "IFX_SCALER_FILE and IFX_MODEL_FILE both name {normalizer_id:?}"
            )));
        }

        let sanitize_max_bytes = match lookup("IFX_SANITIZE_MAX_BYTES") {
            Some(v) => positive_size("IFX_SANITIZE_MAX_BYTES", &v)?,
            None => DEFAULT_SANITIZE_MAX_BYTES,
        };

        Ok(Self {
            artifacts: ArtifactLocation {
                dir: PathBuf::from(dir),
                normalizer_id,
                classifier_id,
                require_manifest: lookup("IFX_REQUIRE_MANIFEST")
                    .is_some_and(|v| parse_bool(&v)),
            },
            log_mode: lookup("IFX_LOG_MODE")
                .map(|v| LogMode::parse(&v))
                .unwrap_or_default(),
            log_file: lookup("IFX_LOG_FILE")
                .filter(|v| !v.trim().is_empty())
                .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from),
            sanitize_max_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).expect("defaults are valid");
        assert_eq!(config.artifacts.dir, PathBuf::from("models"));
        assert_eq!(config.artifacts.normalizer_id, "ifx_scaler.json");
        assert_eq!(config.artifacts.classifier_id, "ifx_ensemble_model.json");
        assert!(!config.artifacts.require_manifest);
        assert_eq!(config.log_mode, LogMode::Auto);
        assert_eq!(config.log_file, PathBuf::from("ifx_predictor.log"));
        assert_eq!(config.sanitize_max_bytes, 16 * 1024);
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("IFX_ARTIFACT_DIR", "/srv/ifx"),
            ("IFX_SCALER_FILE", "scaler-v2.json"),
            ("IFX_REQUIRE_MANIFEST", "yes"),
            ("IFX_LOG_MODE", "STDOUT"),
            ("IFX_SANITIZE_MAX_BYTES", "4096"),
        ])
        .expect("valid");
        assert_eq!(config.sanitize_max_bytes, 4096);
        assert_eq!(config.artifacts.normalizer_path(), PathBuf::from("/srv/ifx/scaler-v2.json"));
        assert!(config.artifacts.require_manifest);
        assert_eq!(config.log_mode, LogMode::Stdout);
    }

    #[test]
    fn test_identifiers_must_be_file_names() {
        for bad in ["", "../model.json", "nested/model.json", ".."] {
            let err = from_pairs(&[("IFX_MODEL_FILE", bad)]).expect_err("must reject");
            assert!(matches!(err, IfxError::Config(_)), "{bad:?}");
        }
        assert!(from_pairs(&[("IFX_MODEL_FILE", "ifx_scaler.json")]).is_err());
    }

    #[test]
    fn test_sanitize_cap_must_be_positive() {
        for bad in ["0", "-1", "lots"] {
            let err = from_pairs(&[("IFX_SANITIZE_MAX_BYTES", bad)]).expect_err("must reject");
            assert!(matches!(err, IfxError::Config(_)), "{bad:?}");
        }
    }

    #[test]
    fn test_parse_bool_and_log_mode() {
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("on"));
        assert_eq!(LogMode::parse("file"), LogMode::File);
        assert_eq!(LogMode::parse("syslog"), LogMode::Auto);
    }
}
