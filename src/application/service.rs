//! Prediction service: The use case behind every front end.
//!
//! This service coordinates:
//! - Feature coercion and validation
//! - Lazy, shared artifact loading
//! - The normalize/classify pipeline
//! - Conversion of failures into displayable reports

use std::sync::Arc;

use crate::application::cache::ArtifactCache;
use crate::application::pipeline;
use crate::domain::{
    ErrorKind, ErrorReport, FeatureMap, FeatureVector, PredictError, PredictionResult,
};
use crate::ports::ArtifactLoader;

/// Service for running concentration predictions.
///
/// Cheap to clone; clones share one artifact cache.
pub struct PredictionService<L: ArtifactLoader> {
    cache: Arc<ArtifactCache<L>>,
}

impl<L: ArtifactLoader> Clone for PredictionService<L> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<L: ArtifactLoader> PredictionService<L> {
    #[must_use]
    pub fn new(loader: L) -> Self {
        Self::with_cache(Arc::new(ArtifactCache::new(loader)))
    }

    #[must_use]
    pub fn with_cache(cache: Arc<ArtifactCache<L>>) -> Self {
        Self { cache }
    }

    #[must_use]
    pub fn artifacts_loaded(&self) -> bool {
        self.cache.is_loaded()
    }

    /// Human-readable artifact location.
    #[must_use]
    pub fn location(&self) -> String {
        self.cache.loader().location()
    }

    /// Predict from an inbound feature map.
    ///
    /// Values are validated before artifacts are touched, so a malformed
    /// request never triggers a load.
    ///
    /// # Errors
    /// Returns `InvalidFeatures`/`TypeCoercion` for bad input, `Artifacts`
    /// if loading fails, `Inference` if a model fails.
    pub fn predict(&self, features: &FeatureMap) -> Result<PredictionResult, PredictError> {
        let vector = FeatureVector::from_map(features)?;
        self.predict_vector(&vector)
    }

    /// Predict from an already validated vector.
    ///
    /// # Errors
    /// Same as [`PredictionService::predict`], minus input validation.
    pub fn predict_vector(&self, vector: &FeatureVector) -> Result<PredictionResult, PredictError> {
        let artifacts = self.cache.get()?;
        pipeline::predict(vector, &artifacts.normalizer, &artifacts.classifier)
    }

    /// Predict and convert any failure into an [`ErrorReport`].
    ///
    /// # Errors
    /// Returns the report for whichever stage failed.
    pub fn run(&self, features: &FeatureMap) -> Result<PredictionResult, ErrorReport> {
        tracing::info!("Starting IFX concentration prediction...");
        match self.predict(features) {
            Ok(result) => {
                tracing::info!(
                    "Prediction complete: class={}, confidence={:.2}%",
                    result.class,
                    result.confidence * 100.0
                );
                Ok(result)
            }
            Err(err) => {
                let report = ErrorReport::from(&err);
                match report.kind {
                    // Input errors quote the offending values.
                    ErrorKind::InvalidFeatures | ErrorKind::TypeCoercionError => {
                        tracing::warn!("Prediction rejected: {}", report.kind);
                    }
                    _ => tracing::warn!("Prediction failed: {}", report),
                }
                Err(report)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cache::tests::CountingLoader;
    use crate::adapters::sanitize::sanitize;
    use crate::domain::{ConcentrationClass, RawValue};
    use std::sync::atomic::Ordering;

    fn default_map() -> FeatureMap {
        FeatureVector::defaults().to_map()
    }

    #[test]
    fn test_end_to_end_prediction() {
        let service = PredictionService::new(CountingLoader::new([0.2, 0.8]));
        let result = service.run(&default_map()).expect("Should predict");

        assert_eq!(result.class, ConcentrationClass::Therapeutic);
        assert_eq!(result.label, "therapeutic concentration");
        assert!((result.confidence - 0.8).abs() < f64::EPSILON);
        assert!(service.artifacts_loaded());
    }

    #[test]
    fn test_documented_example_is_therapeutic() {
        let features: FeatureMap = serde_json::from_str(
            r#"{"Fg": 3.0, "CDAI": 300, "APTT": 20.0, "eGFR": 75.0, "D-Dimer": 0.5,
                "ALB": 45.0, "Dose": 600.0, "WBC": 7.0, "Age": 49.0, "AST": 24.0,
                "ALT": 31.5, "ADA": 4.0, "Lesion site": 3}"#,
        )
        .expect("valid JSON");
        let service = PredictionService::new(CountingLoader::new([0.2, 0.8]));

        let result = service.predict(&features).expect("Should predict");
        assert_eq!(result.label, "therapeutic concentration");
        assert!((result.confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_malformed_value_never_loads_artifacts() {
        let service = PredictionService::new(CountingLoader::new([0.2, 0.8]));
        let mut map = default_map();
        map.insert("Fg".into(), RawValue::from("abc"));

        let report = service.run(&map).expect_err("Should fail");
        assert_eq!(report.kind, ErrorKind::TypeCoercionError);
        assert!(report.message.contains("Fg"));
        assert!(!service.artifacts_loaded());
    }

    #[test]
    fn test_coercion_report_is_redacted_in_logs() {
        let service = PredictionService::new(CountingLoader::new([0.2, 0.8]));
        let mut map = default_map();
        map.insert("Fg".into(), RawValue::from("12.5.3"));

        let report = service.run(&map).expect_err("Should fail");
        assert!(report.message.contains("12.5.3"));

        let line = sanitize(&format!("WARN Prediction failed: {report}"));
        assert!(!line.contains("12.5.3"), "leaked: {line}");
        assert!(line.contains("Fg=[REDACTED]"));
    }

    #[test]
    fn test_missing_artifacts_report() {
        let service = PredictionService::new(CountingLoader::failing());
        let report = service.run(&default_map()).expect_err("Should fail");

        assert_eq!(report.kind, ErrorKind::ArtifactNotFound);
        assert!(report.message.contains("scaler.json"));
        assert!(report.message.contains("model.json"));
    }

    #[test]
    fn test_clones_share_one_cache() {
        let service = PredictionService::new(CountingLoader::new([0.6, 0.4]));
        let other = service.clone();

        service.predict(&default_map()).expect("Should predict");
        let result = other.predict(&default_map()).expect("Should predict");

        assert_eq!(result.class, ConcentrationClass::Subtherapeutic);
        assert!((result.confidence - 0.6).abs() < f64::EPSILON);
        assert_eq!(service.cache.loader().loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repeated_calls_are_deterministic() {
        let service = PredictionService::new(CountingLoader::new([0.25, 0.75]));
        let a = service.predict(&default_map()).expect("Should predict");
        let b = service.predict(&default_map()).expect("Should predict");
        assert_eq!(a.class, b.class);
        assert_eq!(a.probabilities, b.probabilities);
    }
}
