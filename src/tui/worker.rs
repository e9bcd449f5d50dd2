//! Background prediction worker.
//!
//! Artifact loading can take a while on first use, so requests run off the
//! TUI thread and report progress over a channel.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::application::{Outcome, PredictionService};
use crate::domain::FeatureMap;
use crate::ports::ArtifactLoader;

/// Progress updates from the prediction worker.
#[derive(Debug, Clone)]
pub enum PredictionProgress {
    /// First request of the process: artifacts are being loaded
    LoadingArtifacts,
    /// Artifacts ready, running the pipeline
    Predicting,
    /// Request finished with a result or an error report
    Finished(Outcome),
}

/// Handle to a running prediction worker.
pub struct PredictionWorkerHandle {
    progress_rx: Receiver<PredictionProgress>,
    _handle: JoinHandle<()>,
}

impl PredictionWorkerHandle {
    /// Try to receive the next progress update (non-blocking).
    #[must_use]
    pub fn try_recv(&self) -> Option<PredictionProgress> {
        self.progress_rx.try_recv().ok()
    }

    /// Block until the next progress update; `None` once the worker is gone.
    #[must_use]
    pub fn recv(&self) -> Option<PredictionProgress> {
        self.progress_rx.recv().ok()
    }
}

pub struct PredictionWorker;

impl PredictionWorker {
    /// Spawn a background prediction for one feature map.
    pub fn spawn<L>(service: PredictionService<L>, features: FeatureMap) -> PredictionWorkerHandle
    where
        L: ArtifactLoader + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || Self::run_with_progress(&service, &features, &tx));

        PredictionWorkerHandle {
            progress_rx: rx,
            _handle: handle,
        }
    }

    fn run_with_progress<L: ArtifactLoader>(
        service: &PredictionService<L>,
        features: &FeatureMap,
        tx: &Sender<PredictionProgress>,
    ) {
        // The receiver may already be gone if the UI quit; nothing to do then.
        if !service.artifacts_loaded() {
            let _ = tx.send(PredictionProgress::LoadingArtifacts);
        }
        let _ = tx.send(PredictionProgress::Predicting);
        let _ = tx.send(PredictionProgress::Finished(service.run(features)));
    }
}
