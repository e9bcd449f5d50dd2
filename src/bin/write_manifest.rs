//! Artifact manifest utility.
//!
//! Writes `manifest.json` with the SHA-256 digests of the configured scaler
//! and classifier, so the loader can detect a swapped or corrupted artifact.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin write_manifest -- [<artifact_dir>]
//! ```
//!
//! File names come from `IFX_SCALER_FILE` / `IFX_MODEL_FILE`; the directory
//! from the argument, else `IFX_ARTIFACT_DIR`.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use ifx_predictor::adapters::artifacts::write_manifest;
use ifx_predictor::config::AppConfig;

fn usage() -> &'static str {
    "Usage: write_manifest [<artifact_dir>]"
}

fn main() -> Result<()> {
    let mut config = AppConfig::from_env()?;

    let mut args = env::args().skip(1);
    match (args.next(), args.next()) {
        (None, _) => {}
        (Some(arg), None) if arg == "-h" || arg == "--help" => {
            println!("{}", usage());
            return Ok(());
        }
        (Some(dir), None) => config.artifacts.dir = PathBuf::from(dir),
        (Some(_), Some(_)) => bail!(usage()),
    }

    let path = write_manifest(&config.artifacts).with_context(|| {
        format!(
            "Failed to write manifest for {} and {} in {}",
            config.artifacts.normalizer_id,
            config.artifacts.classifier_id,
            config.artifacts.dir.display()
        )
    })?;

    println!("Wrote manifest: {}", path.display());
    Ok(())
}
