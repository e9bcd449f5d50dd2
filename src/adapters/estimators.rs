//! Fitted estimators: Implementations of Normalizer and Classifier.
//!
//! The JSON layouts mirror the fitted attributes of the scikit-learn
//! estimators the artifacts are exported from (`MinMaxScaler.min_/scale_`,
//! `StandardScaler.mean_/scale_`, `LogisticRegression.coef_/intercept_`,
//! `DecisionTreeClassifier.tree_`, soft `VotingClassifier`). Inference here
//! reproduces their `transform`, `predict_proba` and `predict`.

use serde::{Deserialize, Serialize};

use crate::ports::{Classifier, ModelError, Normalizer};

fn check_len(row: &[f64], expected: usize) -> Result<(), ModelError> {
    if row.len() == expected {
        Ok(())
    } else {
        Err(ModelError::DimensionMismatch {
            expected,
            got: row.len(),
        })
    }
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Fitted scaling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerParams {
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
}

/// A fitted feature scaler loaded from a JSON artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaler {
    /// Column names seen at fit time, if exported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,

    #[serde(flatten)]
    pub params: ScalerParams,
}

impl FittedScaler {
    /// Check parameter shapes and values.
    ///
    /// # Errors
    /// Returns `ModelError::Invalid` describing the first problem found.
    pub fn validate(&self) -> Result<(), ModelError> {
        let (offset, scale) = match &self.params {
            ScalerParams::MinMax { min, scale } => (min, scale),
            ScalerParams::Standard { mean, scale } => (mean, scale),
        };
        if offset.is_empty() || offset.len() != scale.len() {
            return Err(ModelError::Invalid(format!(
                "scaler parameter lengths differ ({} vs {})",
                offset.len(),
                scale.len()
            )));
        }
        if !all_finite(offset) || !all_finite(scale) {
            return Err(ModelError::Invalid("scaler parameters must be finite".into()));
        }
        if matches!(self.params, ScalerParams::Standard { .. }) && scale.iter().any(|s| *s == 0.0) {
            return Err(ModelError::Invalid("standard scaler has a zero scale".into()));
        }
        Ok(())
    }
}

impl Normalizer for FittedScaler {
    fn n_features(&self) -> usize {
        match &self.params {
            ScalerParams::MinMax { scale, .. } | ScalerParams::Standard { scale, .. } => scale.len(),
        }
    }

    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_len(row, self.n_features())?;
        let scaled: Vec<f64> = match &self.params {
            ScalerParams::MinMax { min, scale } => row
                .iter()
                .zip(scale.iter().zip(min))
                .map(|(x, (s, m))| x * s + m)
                .collect(),
            ScalerParams::Standard { mean, scale } => row
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / s)
                .collect(),
        };
        if all_finite(&scaled) {
            Ok(scaled)
        } else {
            Err(ModelError::NonFinite("scaler"))
        }
    }
}

/// Array form of a fitted binary decision tree (`tree_` attributes).
///
/// Leaves have `children_left == children_right == -1`. Internal nodes route
/// a row left when `row[feature] <= threshold`, with the row value rounded to
/// `f32` first since fitted trees split on single-precision inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights `[class 0, class 1]`
    pub value: Vec<[f64; 2]>,
}

impl DecisionTree {
    fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        let n = self.children_left.len();
        if n == 0
            || self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err(ModelError::Invalid("decision tree arrays differ in length".into()));
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == -1 && right == -1 {
                let [a, b] = self.value[node];
                if !(a.is_finite() && b.is_finite()) || a < 0.0 || b < 0.0 || a + b <= 0.0 {
                    return Err(ModelError::Invalid(format!(
                        "decision tree leaf {node} has invalid class weights"
                    )));
                }
                continue;
            }
            // Children always carry higher ids than their parent, which rules out cycles.
            let child_ok = |c: i64| c > node as i64 && (c as usize) < n;
            if !child_ok(left) || !child_ok(right) {
                return Err(ModelError::Invalid(format!(
                    "decision tree node {node} has invalid children ({left}, {right})"
                )));
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(ModelError::Invalid(format!(
                    "decision tree node {node} splits on unknown feature {feature}"
                )));
            }
            if !self.threshold[node].is_finite() {
                return Err(ModelError::Invalid(format!(
                    "decision tree node {node} has a non-finite threshold"
                )));
            }
        }
        Ok(())
    }

    fn predict_proba(&self, row: &[f64]) -> [f64; 2] {
        let mut node = 0usize;
        while self.children_left[node] != -1 {
            let feature = self.feature[node] as usize;
            node = if f64::from(row[feature] as f32) <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        let [a, b] = self.value[node];
        let total = a + b;
        [a / total, b / total]
    }
}

/// A fitted binary estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    Logistic {
        coef: Vec<f64>,
        intercept: f64,
    },
    DecisionTree(DecisionTree),
    /// Weighted average of member probabilities.
    SoftVoting {
        estimators: Vec<Estimator>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weights: Option<Vec<f64>>,
    },
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Estimator {
    fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        match self {
            Self::Logistic { coef, intercept } => {
                if coef.len() != n_features {
                    return Err(ModelError::Invalid(format!(
                        "logistic model has {} coefficients for {n_features} features",
                        coef.len()
                    )));
                }
                if !all_finite(coef) || !intercept.is_finite() {
                    return Err(ModelError::Invalid("logistic parameters must be finite".into()));
                }
                Ok(())
            }
            Self::DecisionTree(tree) => tree.validate(n_features),
            Self::SoftVoting {
                estimators,
                weights,
            } => {
                if estimators.is_empty() {
                    return Err(ModelError::Invalid("voting ensemble has no members".into()));
                }
                if let Some(weights) = weights {
                    if weights.len() != estimators.len() {
                        return Err(ModelError::Invalid(format!(
                            "voting ensemble has {} weights for {} members",
                            weights.len(),
                            estimators.len()
                        )));
                    }
                    if !all_finite(weights)
                        || weights.iter().any(|w| *w < 0.0)
                        || weights.iter().sum::<f64>() <= 0.0
                    {
                        return Err(ModelError::Invalid(
                            "voting weights must be non-negative with a positive sum".into(),
                        ));
                    }
                }
                estimators.iter().try_for_each(|e| e.validate(n_features))
            }
        }
    }

    fn predict_proba(&self, row: &[f64]) -> [f64; 2] {
        match self {
            Self::Logistic { coef, intercept } => {
                let z = coef.iter().zip(row).map(|(c, x)| c * x).sum::<f64>() + intercept;
                let p = sigmoid(z);
                [1.0 - p, p]
            }
            Self::DecisionTree(tree) => tree.predict_proba(row),
            Self::SoftVoting {
                estimators,
                weights,
            } => {
                let mut acc = [0.0, 0.0];
                let mut total = 0.0;
                for (i, estimator) in estimators.iter().enumerate() {
                    let w = weights.as_ref().map_or(1.0, |w| w[i]);
                    let [a, b] = estimator.predict_proba(row);
                    acc[0] += w * a;
                    acc[1] += w * b;
                    total += w;
                }
                [acc[0] / total, acc[1] / total]
            }
        }
    }
}

/// A fitted binary classifier loaded from a JSON artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedClassifier {
    /// Class labels in probability-column order; must be `[0, 1]`.
    pub classes: Vec<u8>,

    pub n_features: usize,

    /// Column names seen at fit time, if exported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,

    pub estimator: Estimator,
}

impl FittedClassifier {
    /// Check class layout and estimator parameters.
    ///
    /// # Errors
    /// Returns `ModelError::Invalid` describing the first problem found.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.classes != [0, 1] {
            return Err(ModelError::Invalid(format!(
                "expected binary classes [0, 1], found {:?}",
                self.classes
            )));
        }
        self.estimator.validate(self.n_features)
    }
}

impl Classifier for FittedClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], ModelError> {
        check_len(row, self.n_features)?;
        if !all_finite(row) {
            return Err(ModelError::NonFinite("classifier input"));
        }
        let proba = self.estimator.predict_proba(row);
        if all_finite(&proba) {
            Ok(proba)
        } else {
            Err(ModelError::NonFinite("classifier"))
        }
    }
}
