//! IFX Predictor: infliximab concentration decision support.
//!
//! Main entry point for the terminal application.

use std::io::IsTerminal;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ifx_predictor::adapters::sanitize::SanitizingMakeWriter;
use ifx_predictor::config::{AppConfig, LogMode};
use ifx_predictor::tui::App;

fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    // Writing logs to the terminal corrupts the TUI (alternate screen), so an
    // interactive session logs to a file unless told otherwise.
    let use_file = match config.log_mode {
        LogMode::File => true,
        LogMode::Stdout => false,
        LogMode::Auto => std::io::stdout().is_terminal(),
    };

    let (writer, _guard) = if use_file {
        if let Some(parent) = config.log_file.parent() {
            // Best-effort: a missing directory surfaces as the open error below.
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(
            SanitizingMakeWriter::new(writer).with_max_bytes(config.sanitize_max_bytes),
        ))
        .init();

    tracing::info!("Starting IFX predictor...");

    let mut app = App::new(&config);
    app.run()?;

    tracing::info!("IFX predictor shutdown complete.");
    Ok(())
}
