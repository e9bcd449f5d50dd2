//! TUI module: Terminal User Interface using Ratatui.
//!
//! Provides the clinical interface for:
//! - Biomarker input with defaults, hints and sampling guidance
//! - Background prediction with progress
//! - Result display with confidence and clinical advice

mod app;
mod styles;
mod ui;
mod worker;

pub use app::{App, Screen};
pub use styles::ClinicalTheme;
pub use worker::{PredictionProgress, PredictionWorker, PredictionWorkerHandle};
