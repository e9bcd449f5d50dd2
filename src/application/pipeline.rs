//! The prediction pipeline: normalize, classify, interpret.

use crate::domain::{trace_of, ConcentrationClass, FeatureVector, PredictError, PredictionResult};
use crate::ports::{Classifier, ModelError, Normalizer};

fn inference_error(err: &ModelError) -> PredictError {
    PredictError::Inference {
        cause: err.to_string(),
        trace: trace_of(err),
    }
}

/// Run one validated feature vector through the normalizer and classifier.
///
/// The vector is passed in [`crate::domain::FEATURE_ORDER`]; the normalizer
/// output goes to the classifier unchanged.
///
/// # Errors
/// Returns [`PredictError::Inference`] if either model fails, returns the
/// wrong shape, or the classifier reports a class other than 0 or 1.
pub fn predict<N, C>(
    features: &FeatureVector,
    normalizer: &N,
    classifier: &C,
) -> Result<PredictionResult, PredictError>
where
    N: Normalizer + ?Sized,
    C: Classifier + ?Sized,
{
    let scaled = normalizer
        .transform(features.as_slice())
        .map_err(|e| inference_error(&e))?;
    if scaled.len() != features.as_slice().len() {
        return Err(inference_error(&ModelError::DimensionMismatch {
            expected: features.as_slice().len(),
            got: scaled.len(),
        }));
    }

    let class = classifier.predict(&scaled).map_err(|e| inference_error(&e))?;
    let probabilities = classifier
        .predict_proba(&scaled)
        .map_err(|e| inference_error(&e))?;
    if probabilities.iter().any(|p| !(0.0..=1.0).contains(p)) {
        return Err(inference_error(&ModelError::Invalid(format!(
            "probabilities out of range: {probabilities:?}"
        ))));
    }

    let class = ConcentrationClass::from_class(class).ok_or_else(|| {
        inference_error(&ModelError::Invalid(format!(
            "classifier returned class {class}, expected 0 or 1"
        )))
    })?;

    tracing::debug!(
        "Classified as {} (p0={:.4}, p1={:.4})",
        class,
        probabilities[0],
        probabilities[1]
    );
    Ok(PredictionResult::new(class, probabilities))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Feature, FEATURE_COUNT};
    use std::sync::Mutex;

    /// Records its input and halves every value.
    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<f64>>,
    }

    impl Normalizer for Recording {
        fn n_features(&self) -> usize {
            FEATURE_COUNT
        }

        fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
            *self.seen.lock().expect("lock") = row.to_vec();
            Ok(row.iter().map(|v| v / 2.0).collect())
        }
    }

    struct Truncating;

    impl Normalizer for Truncating {
        fn n_features(&self) -> usize {
            FEATURE_COUNT
        }

        fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
            Ok(row[..3].to_vec())
        }
    }

    struct Failing;

    impl Normalizer for Failing {
        fn n_features(&self) -> usize {
            FEATURE_COUNT
        }

        fn transform(&self, _row: &[f64]) -> Result<Vec<f64>, ModelError> {
            Err(ModelError::NonFinite("scaled value"))
        }
    }

    /// Classifier with a scripted answer that records its input.
    struct Scripted {
        class: u8,
        proba: [f64; 2],
        seen: Mutex<Vec<f64>>,
    }

    impl Scripted {
        fn new(class: u8, proba: [f64; 2]) -> Self {
            Self {
                class,
                proba,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Classifier for Scripted {
        fn n_features(&self) -> usize {
            FEATURE_COUNT
        }

        fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], ModelError> {
            *self.seen.lock().expect("lock") = row.to_vec();
            Ok(self.proba)
        }

        fn predict(&self, _row: &[f64]) -> Result<u8, ModelError> {
            Ok(self.class)
        }
    }

    fn ordered_vector() -> FeatureVector {
        FeatureVector::from_ordered([
            2.0, 120.0, 31.0, 95.0, 0.7, 41.0, 400.0, 6.5, 45.0, 22.0, 18.0, 9.0, 2.0,
        ])
        .expect("valid vector")
    }

    #[test]
    fn test_scaled_vector_reaches_classifier_in_order() {
        let normalizer = Recording::default();
        let classifier = Scripted::new(1, [0.2, 0.8]);
        let features = ordered_vector();

        predict(&features, &normalizer, &classifier).expect("Should predict");

        let seen = normalizer.seen.lock().expect("lock").clone();
        assert_eq!(seen, features.as_slice());
        assert_eq!(seen[Feature::Fg.index()], 2.0);
        assert_eq!(seen[Feature::Ada.index()], 9.0);
        assert_eq!(seen[Feature::LesionSite.index()], 2.0);

        let scaled = classifier.seen.lock().expect("lock").clone();
        let halved: Vec<f64> = features.iter().map(|(_, v)| v / 2.0).collect();
        assert_eq!(scaled, halved);
    }

    #[test]
    fn test_therapeutic_prediction() {
        let result = predict(
            &FeatureVector::defaults(),
            &Recording::default(),
            &Scripted::new(1, [0.2, 0.8]),
        )
        .expect("Should predict");

        assert_eq!(result.class, ConcentrationClass::Therapeutic);
        assert_eq!(result.label, "therapeutic concentration");
        assert!((result.confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_confidence_is_probability_of_predicted_class() {
        let result = predict(
            &FeatureVector::defaults(),
            &Recording::default(),
            &Scripted::new(0, [0.9, 0.1]),
        )
        .expect("Should predict");
        assert_eq!(result.class, ConcentrationClass::Subtherapeutic);
        assert!((result.confidence - 0.9).abs() < f64::EPSILON);

        let result = predict(
            &FeatureVector::defaults(),
            &Recording::default(),
            &Scripted::new(1, [0.3, 0.7]),
        )
        .expect("Should predict");
        assert!((result.confidence - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_class_is_inference_error() {
        let err = predict(
            &FeatureVector::defaults(),
            &Recording::default(),
            &Scripted::new(2, [0.5, 0.5]),
        )
        .expect_err("class 2 must be rejected");
        assert!(matches!(err, PredictError::Inference { .. }));
        assert!(err.to_string().contains("class 2"));
    }

    #[test]
    fn test_model_failures_are_inference_errors() {
        let classifier = Scripted::new(1, [0.2, 0.8]);

        let err = predict(&FeatureVector::defaults(), &Failing, &classifier)
            .expect_err("normalizer failure");
        assert!(matches!(err, PredictError::Inference { .. }));

        let err = predict(&FeatureVector::defaults(), &Truncating, &classifier)
            .expect_err("shape change");
        match err {
            PredictError::Inference { cause, .. } => assert!(cause.contains("13")),
            other => panic!("Expected Inference error, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_probabilities_are_rejected() {
        let err = predict(
            &FeatureVector::defaults(),
            &Recording::default(),
            &Scripted::new(1, [-0.1, 1.1]),
        )
        .expect_err("invalid distribution");
        assert!(matches!(err, PredictError::Inference { .. }));
    }
}
