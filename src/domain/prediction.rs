//! Prediction result types.
//!
//! Represents the interpreted output of the concentration classifier.

use serde::{Deserialize, Serialize};

/// Trough serum IFX concentration separating the two classes (μg/ml).
pub const THERAPEUTIC_THRESHOLD_UG_ML: f64 = 3.0;

/// Predicted serum concentration class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcentrationClass {
    /// Below the therapeutic threshold (model class 0)
    Subtherapeutic,
    /// At or above the therapeutic threshold (model class 1)
    Therapeutic,
}

impl ConcentrationClass {
    /// Map a binary model class to a concentration class.
    ///
    /// Returns `None` for anything other than `0` or `1`.
    #[must_use]
    pub fn from_class(class: u8) -> Option<Self> {
        match class {
            0 => Some(Self::Subtherapeutic),
            1 => Some(Self::Therapeutic),
            _ => None,
        }
    }

    /// Binary model class (also the index into the probability pair).
    #[must_use]
    pub fn class_index(self) -> usize {
        match self {
            Self::Subtherapeutic => 0,
            Self::Therapeutic => 1,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Therapeutic => "therapeutic concentration",
            Self::Subtherapeutic => "subtherapeutic concentration",
        }
    }

    /// Threshold wording for display.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Therapeutic => "Serum IFX expected ≥ 3 μg/ml",
            Self::Subtherapeutic => "Serum IFX expected < 3 μg/ml",
        }
    }

    /// Static clinical guidance for the predicted class.
    #[must_use]
    pub fn advice(self) -> &'static [&'static str] {
        match self {
            Self::Therapeutic => &[
                "Maintain the current treatment regimen",
                "Monitor IFX concentration every 8 weeks",
                "Routine monitoring of inflammation markers",
            ],
            Self::Subtherapeutic => &[
                "Check medication adherence",
                "Consider dose optimisation (+10-20%)",
                "Test for anti-drug antibodies",
                "Shorten the monitoring interval (2-4 weeks)",
            ],
        }
    }

    /// Get the associated color for TUI display (RGB).
    #[must_use]
    pub fn color(self) -> (u8, u8, u8) {
        match self {
            Self::Therapeutic => (40, 167, 69),    // #28A745
            Self::Subtherapeutic => (220, 53, 69), // #DC3545
        }
    }
}

impl std::fmt::Display for ConcentrationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Confidence of the model in its own answer: the probability mass of the
/// predicted class, not of the positive class.
#[must_use]
pub fn select_confidence(class: ConcentrationClass, probabilities: [f64; 2]) -> f64 {
    probabilities[class.class_index()]
}

/// Labeled, probability-annotated prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub class: ConcentrationClass,

    /// Human-facing label of `class`
    pub label: &'static str,

    /// Probability of the predicted class (0.0 to 1.0)
    pub confidence: f64,

    /// Full distribution over `[subtherapeutic, therapeutic]`
    pub probabilities: [f64; 2],

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl PredictionResult {
    #[must_use]
    pub fn new(class: ConcentrationClass, probabilities: [f64; 2]) -> Self {
        Self {
            class,
            label: class.label(),
            confidence: select_confidence(class, probabilities),
            probabilities,
            created_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_follows_predicted_class() {
        let positive = PredictionResult::new(ConcentrationClass::Therapeutic, [0.3, 0.7]);
        assert!((positive.confidence - 0.7).abs() < f64::EPSILON);

        let negative = PredictionResult::new(ConcentrationClass::Subtherapeutic, [0.9, 0.1]);
        assert!((negative.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_label_mapping() {
        assert_eq!(
            ConcentrationClass::from_class(1).map(ConcentrationClass::label),
            Some("therapeutic concentration")
        );
        assert_eq!(
            ConcentrationClass::from_class(0).map(ConcentrationClass::label),
            Some("subtherapeutic concentration")
        );
        assert_eq!(ConcentrationClass::from_class(2), None);
    }

    #[test]
    fn test_advice_differs_per_class() {
        assert!(ConcentrationClass::Therapeutic.advice()[0].contains("Maintain"));
        assert!(ConcentrationClass::Subtherapeutic
            .advice()
            .iter()
            .any(|line| line.contains("anti-drug antibodies")));
    }

    #[test]
    fn test_result_serializes_label() {
        let result = PredictionResult::new(ConcentrationClass::Therapeutic, [0.2, 0.8]);
        let json = serde_json::to_value(&result).expect("Should serialize");
        assert_eq!(json["label"], "therapeutic concentration");
        assert_eq!(json["class"], "therapeutic");
        assert_eq!(json["confidence"], 0.8);
    }
}
