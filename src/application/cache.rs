//! Process-wide artifact cache.
//!
//! Artifacts are loaded at most once per process: the first caller loads,
//! concurrent first callers wait on the same lock and observe the same
//! instance. A failed load is not remembered, so the next call retries.

use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::LoadError;
use crate::ports::ArtifactLoader;

/// The loaded, immutable normalizer/classifier pair.
#[derive(Debug)]
pub struct Artifacts<N, C> {
    pub normalizer: N,
    pub classifier: C,
}

/// Artifacts produced by a given loader.
pub type LoadedArtifacts<L> =
    Artifacts<<L as ArtifactLoader>::Normalizer, <L as ArtifactLoader>::Classifier>;

/// Lazily loaded, shared artifacts.
pub struct ArtifactCache<L: ArtifactLoader> {
    loader: L,
    slot: Mutex<Option<Arc<LoadedArtifacts<L>>>>,
}

impl<L: ArtifactLoader> ArtifactCache<L> {
    #[must_use]
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached artifacts, loading them on first use.
    ///
    /// # Errors
    /// Returns the loader's error; nothing is cached in that case.
    pub fn get(&self) -> Result<Arc<LoadedArtifacts<L>>, LoadError> {
        // The slot only ever holds a fully loaded value, so a poisoned lock
        // carries no partial state.
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(artifacts) = slot.as_ref() {
            return Ok(Arc::clone(artifacts));
        }

        tracing::info!("Loading artifacts from {}", self.loader.location());
        let (normalizer, classifier) = self.loader.load().map_err(|e| {
            tracing::error!("Artifact load failed: {}", e);
            e
        })?;
        let artifacts = Arc::new(Artifacts {
            normalizer,
            classifier,
        });
        *slot = Some(Arc::clone(&artifacts));
        Ok(artifacts)
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    #[must_use]
    pub fn loader(&self) -> &L {
        &self.loader
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ports::{Classifier, ModelError, Normalizer};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    /// Identity normalizer of fixed width.
    pub(crate) struct Identity(pub usize);

    impl Normalizer for Identity {
        fn n_features(&self) -> usize {
            self.0
        }

        fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
            Ok(row.to_vec())
        }
    }

    /// Classifier answering with a fixed distribution.
    pub(crate) struct Fixed(pub [f64; 2]);

    impl Classifier for Fixed {
        fn n_features(&self) -> usize {
            crate::domain::FEATURE_COUNT
        }

        fn predict_proba(&self, _row: &[f64]) -> Result<[f64; 2], ModelError> {
            Ok(self.0)
        }
    }

    /// Loader that counts how often it is invoked.
    pub(crate) struct CountingLoader {
        pub loads: AtomicUsize,
        pub fail: AtomicBool,
        pub proba: [f64; 2],
    }

    impl CountingLoader {
        pub(crate) fn new(proba: [f64; 2]) -> Self {
            Self {
                loads: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                proba,
            }
        }

        pub(crate) fn failing() -> Self {
            let loader = Self::new([0.5, 0.5]);
            loader.fail.store(true, Ordering::SeqCst);
            loader
        }
    }

    impl ArtifactLoader for CountingLoader {
        type Normalizer = Identity;
        type Classifier = Fixed;

        fn load(&self) -> Result<(Identity, Fixed), LoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            // Widen the race window for concurrent first callers.
            thread::sleep(Duration::from_millis(20));
            if self.fail.load(Ordering::SeqCst) {
                return Err(LoadError::NotFound {
                    dir: "missing".into(),
                    missing: vec!["scaler.json".into(), "model.json".into()],
                });
            }
            Ok((Identity(crate::domain::FEATURE_COUNT), Fixed(self.proba)))
        }

        fn location(&self) -> String {
            "memory".to_string()
        }
    }

    #[test]
    fn test_loads_once_across_calls() {
        let cache = ArtifactCache::new(CountingLoader::new([0.4, 0.6]));
        assert!(!cache.is_loaded());

        let first = cache.get().expect("Should load");
        for _ in 0..5 {
            let again = cache.get().expect("Should hit cache");
            assert!(Arc::ptr_eq(&first, &again));
        }
        assert!(cache.is_loaded());
        assert_eq!(cache.loader().loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_use_loads_once() {
        let cache = ArtifactCache::new(CountingLoader::new([0.4, 0.6]));
        let barrier = Barrier::new(8);

        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.get().expect("Should load")
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("thread panicked"))
                .collect()
        });

        assert_eq!(cache.loader().loads.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_failed_load_is_retried() {
        let cache = ArtifactCache::new(CountingLoader::failing());

        assert!(matches!(cache.get(), Err(LoadError::NotFound { .. })));
        assert!(!cache.is_loaded());

        cache.loader().fail.store(false, Ordering::SeqCst);
        cache.get().expect("Should load after the artifacts appear");
        assert_eq!(cache.loader().loads.load(Ordering::SeqCst), 2);
    }
}
