//! One-shot JSON prediction.
//!
//! Reads a JSON object mapping the thirteen feature keys to values from a
//! file argument (or stdin), runs the prediction and prints either a
//! `PredictionResult` or an `ErrorReport` as JSON on stdout.
//!
//! # Usage
//!
//! ```bash
//! echo '{"Fg": 3.2, "CDAI": 150, ...}' | cargo run --bin predict_json
//! cargo run --bin predict_json -- patient.json
//! ```
//!
//! Exits with status 1 when the input is rejected or the prediction fails.
//! Logs go to stderr.

use std::io::Read;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ifx_predictor::adapters::sanitize::SanitizingMakeWriter;
use ifx_predictor::adapters::JsonArtifactLoader;
use ifx_predictor::application::{Outcome, PredictionService, Session};
use ifx_predictor::config::AppConfig;
use ifx_predictor::{parse_feature_map, ErrorKind, ErrorReport};

fn read_input() -> Result<String> {
    let mut args = std::env::args().skip(1);
    match (args.next(), args.next()) {
        (Some(path), None) if path != "-" => {
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read {path}"))
        }
        (None | Some(_), None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
        _ => bail!("Usage: predict_json [<features.json> | -]"),
    }
}

fn main() -> Result<ExitCode> {
    let config = AppConfig::from_env()?;

    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(
            SanitizingMakeWriter::new(writer).with_max_bytes(config.sanitize_max_bytes),
        ))
        .init();

    let outcome: Outcome = match parse_feature_map(&read_input()?) {
        Ok(features) => {
            let service = PredictionService::new(JsonArtifactLoader::new(config.artifacts));
            let mut session = Session::new();
            match session.submit(&service, &features) {
                Some(outcome) => outcome.clone(),
                None => bail!("A prediction is already in flight"),
            }
        }
        Err(e) => Err(ErrorReport {
            kind: ErrorKind::InvalidFeatures,
            message: format!("Input must be a JSON object of feature values: {e}"),
            trace: None,
        }),
    };

    let (json, code) = match &outcome {
        Ok(result) => (serde_json::to_string_pretty(result)?, ExitCode::SUCCESS),
        Err(report) => (serde_json::to_string_pretty(report)?, ExitCode::FAILURE),
    };
    println!("{json}");
    Ok(code)
}
