//! Biomarker feature catalog for IFX concentration prediction.
//!
//! The thirteen inputs and their column order are part of the fitted
//! artifacts' interface: the scaler and classifier were fitted on columns in
//! exactly [`FEATURE_ORDER`]. A transposed column does not raise an error in
//! the model, it silently produces a wrong prediction, so every vector handed
//! to a normalizer is built here and nowhere else.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::PredictError;

/// Number of model inputs.
pub const FEATURE_COUNT: usize = 13;

/// A model input. Discriminants are the column indices of the fitted artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    /// Fibrinogen
    Fg = 0,
    /// Crohn's Disease Activity Index
    Cdai = 1,
    /// Activated partial thromboplastin time
    Aptt = 2,
    /// Estimated glomerular filtration rate
    Egfr = 3,
    /// D-dimer
    DDimer = 4,
    /// Albumin
    Alb = 5,
    /// IFX dose
    Dose = 6,
    /// White blood cell count
    Wbc = 7,
    /// Age in years
    Age = 8,
    /// Aspartate aminotransferase
    Ast = 9,
    /// Alanine aminotransferase
    Alt = 10,
    /// Adenosine deaminase
    Ada = 11,
    /// Number of lesion sites (integer)
    LesionSite = 12,
}

/// Column order the artifacts were fitted on.
pub const FEATURE_ORDER: [Feature; FEATURE_COUNT] = [
    Feature::Fg,
    Feature::Cdai,
    Feature::Aptt,
    Feature::Egfr,
    Feature::DDimer,
    Feature::Alb,
    Feature::Dose,
    Feature::Wbc,
    Feature::Age,
    Feature::Ast,
    Feature::Alt,
    Feature::Ada,
    Feature::LesionSite,
];

/// Domain constraint of a single input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureConstraint {
    /// Closed real range; defaults to the midpoint.
    Continuous { min: f64, max: f64 },
    /// Closed integer range with step 1; defaults to the integer midpoint.
    Integer { min: i64, max: i64 },
    /// Any value `>= 0`; no upper bound.
    NonNegative { default: f64 },
}

impl FeatureConstraint {
    /// Value pre-filled in the input form.
    #[must_use]
    pub fn default_value(&self) -> f64 {
        match *self {
            Self::Continuous { min, max } => (min + max) / 2.0,
            Self::Integer { min, max } => ((min + max) / 2) as f64,
            Self::NonNegative { default } => default,
        }
    }

    /// Check a coerced value against the constraint.
    ///
    /// # Errors
    /// Returns a human-readable description of the violation.
    pub fn check(&self, value: f64) -> Result<(), String> {
        match *self {
            Self::Continuous { min, max } => {
                if (min..=max).contains(&value) {
                    Ok(())
                } else {
                    Err(format!("{value} is outside [{min}, {max}]"))
                }
            }
            Self::Integer { min, max } => {
                if value.fract() != 0.0 {
                    Err(format!("{value} is not a whole number"))
                } else if ((min as f64)..=(max as f64)).contains(&value) {
                    Ok(())
                } else {
                    Err(format!("{value} is outside [{min}, {max}]"))
                }
            }
            Self::NonNegative { .. } => {
                if value >= 0.0 {
                    Ok(())
                } else {
                    Err(format!("{value} must not be negative"))
                }
            }
        }
    }

    /// Short range hint for form fields.
    #[must_use]
    pub fn hint(&self) -> String {
        match *self {
            Self::Continuous { min, max } => format!("{min}-{max}"),
            Self::Integer { min, max } => format!("whole number {min}-{max}"),
            Self::NonNegative { .. } => ">= 0".to_string(),
        }
    }
}

impl Feature {
    /// Stable key used by forms, JSON input and artifact metadata.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Fg => "Fg",
            Self::Cdai => "CDAI",
            Self::Aptt => "APTT",
            Self::Egfr => "eGFR",
            Self::DDimer => "D-Dimer",
            Self::Alb => "ALB",
            Self::Dose => "Dose",
            Self::Wbc => "WBC",
            Self::Age => "Age",
            Self::Ast => "AST",
            Self::Alt => "ALT",
            Self::Ada => "ADA",
            Self::LesionSite => "Lesion site",
        }
    }

    /// Human-readable label with unit.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fg => "Fibrinogen (g/L)",
            Self::Cdai => "Crohn's Disease Activity Index",
            Self::Aptt => "APTT (s)",
            Self::Egfr => "eGFR (ml/min/1.73m²)",
            Self::DDimer => "D-dimer (mg/L)",
            Self::Alb => "Albumin (g/L)",
            Self::Dose => "IFX dose (mg)",
            Self::Wbc => "WBC (×10⁹/L)",
            Self::Age => "Age (years)",
            Self::Ast => "AST (U/L)",
            Self::Alt => "ALT (U/L)",
            Self::Ada => "ADA (U/L)",
            Self::LesionSite => "Lesion sites",
        }
    }

    #[must_use]
    pub const fn constraint(self) -> FeatureConstraint {
        match self {
            Self::Fg => FeatureConstraint::Continuous { min: 1.8, max: 4.5 },
            Self::Cdai => FeatureConstraint::Continuous { min: 0.0, max: 600.0 },
            Self::Aptt => FeatureConstraint::NonNegative { default: 20.0 },
            Self::Egfr => FeatureConstraint::Continuous { min: 30.0, max: 120.0 },
            Self::DDimer => FeatureConstraint::NonNegative { default: 0.5 },
            Self::Alb => FeatureConstraint::Continuous { min: 35.0, max: 55.0 },
            Self::Dose => FeatureConstraint::Continuous { min: 200.0, max: 1000.0 },
            Self::Wbc => FeatureConstraint::Continuous { min: 4.0, max: 10.0 },
            Self::Age => FeatureConstraint::Continuous { min: 18.0, max: 80.0 },
            Self::Ast => FeatureConstraint::Continuous { min: 8.0, max: 40.0 },
            Self::Alt => FeatureConstraint::Continuous { min: 7.0, max: 56.0 },
            Self::Ada => FeatureConstraint::NonNegative { default: 4.0 },
            Self::LesionSite => FeatureConstraint::Integer { min: 1, max: 5 },
        }
    }

    /// Column index in the fitted artifacts.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look a feature up by its stable key (case-sensitive).
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        FEATURE_ORDER.iter().copied().find(|f| f.key() == key)
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A user-supplied value before coercion.
///
/// JSON numbers arrive as `Integer` or `Number`, form fields as `Text`.
/// Anything else (booleans, null, arrays) lands in `Other` and fails coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawValue {
    /// Coerce to a finite `f64`.
    #[must_use]
    pub fn coerce(&self) -> Option<f64> {
        let value = match self {
            Self::Integer(i) => *i as f64,
            Self::Number(x) => *x,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            Self::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Number(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Other(v) => write!(f, "{v}"),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Inbound mapping of feature key to raw value, as supplied by a form or JSON.
pub type FeatureMap = HashMap<String, RawValue>;

/// Parse a JSON object of feature values.
///
/// Numbers outside the `f64` range (`1e999`) are kept as text, so they fail
/// coercion with `TypeCoercion` instead of aborting the parse.
///
/// # Errors
/// Returns the `serde_json` error if the input is not a JSON object.
pub fn parse_feature_map(json: &str) -> Result<FeatureMap, serde_json::Error> {
    let entries: HashMap<String, Box<serde_json::value::RawValue>> = serde_json::from_str(json)?;
    Ok(entries
        .into_iter()
        .map(|(key, raw)| {
            let value = serde_json::from_str(raw.get())
                .unwrap_or_else(|_| RawValue::Text(raw.get().to_string()));
            (key, value)
        })
        .collect())
}

/// The thirteen inputs, coerced, validated and stored in fitted column order.
///
/// Only constructible through validation, so holding one is proof that the
/// layout contract holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Build a vector from an inbound feature map.
    ///
    /// Checks, in order: exactly the thirteen keys are present, every value
    /// coerces to a finite real, every value satisfies its constraint.
    ///
    /// # Errors
    /// - `PredictError::InvalidFeatures` for missing/unknown keys or constraint violations
    /// - `PredictError::TypeCoercion` for a value that is not a finite real number
    pub fn from_map(map: &FeatureMap) -> Result<Self, PredictError> {
        let missing: Vec<&str> = FEATURE_ORDER
            .iter()
            .map(|f| f.key())
            .filter(|key| !map.contains_key(*key))
            .collect();
        let mut unknown: Vec<&str> = map
            .keys()
            .map(String::as_str)
            .filter(|key| Feature::from_key(key).is_none())
            .collect();
        unknown.sort_unstable();

        if !missing.is_empty() || !unknown.is_empty() {
            let mut problems = Vec::new();
            if !missing.is_empty() {
                problems.push(format!("missing features: {}", missing.join(", ")));
            }
            if !unknown.is_empty() {
                problems.push(format!("unknown features: {}", unknown.join(", ")));
            }
            return Err(PredictError::InvalidFeatures(problems));
        }

        let mut values = [0.0; FEATURE_COUNT];
        for feature in FEATURE_ORDER {
            let raw = &map[feature.key()];
            values[feature.index()] = raw.coerce().ok_or_else(|| PredictError::TypeCoercion {
                feature: feature.key().to_string(),
                value: raw.to_string(),
            })?;
        }

        let vector = Self { values };
        vector.check_constraints()?;
        Ok(vector)
    }

    /// Build a vector from values already in fitted column order.
    ///
    /// # Errors
    /// Same as [`FeatureVector::from_map`], minus the key checks.
    pub fn from_ordered(values: [f64; FEATURE_COUNT]) -> Result<Self, PredictError> {
        if let Some(feature) = FEATURE_ORDER.iter().find(|f| !values[f.index()].is_finite()) {
            return Err(PredictError::TypeCoercion {
                feature: feature.key().to_string(),
                value: values[feature.index()].to_string(),
            });
        }
        let vector = Self { values };
        vector.check_constraints()?;
        Ok(vector)
    }

    /// Vector of every constraint's default value.
    #[must_use]
    pub fn defaults() -> Self {
        let mut values = [0.0; FEATURE_COUNT];
        for feature in FEATURE_ORDER {
            values[feature.index()] = feature.constraint().default_value();
        }
        Self { values }
    }

    fn check_constraints(&self) -> Result<(), PredictError> {
        let violations: Vec<String> = FEATURE_ORDER
            .iter()
            .filter_map(|f| {
                f.constraint()
                    .check(self.values[f.index()])
                    .err()
                    .map(|reason| format!("{}: {reason}", f.key()))
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(PredictError::InvalidFeatures(violations))
        }
    }

    /// Values in fitted column order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        self.values
    }

    #[must_use]
    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    /// Iterate `(feature, value)` pairs in fitted column order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        FEATURE_ORDER.iter().map(move |&f| (f, self.values[f.index()]))
    }

    /// Convert back into a feature map (numbers only).
    #[must_use]
    pub fn to_map(&self) -> FeatureMap {
        self.iter()
            .map(|(f, v)| (f.key().to_string(), RawValue::Number(v)))
            .collect()
    }
}

/// Format a value without trailing zeros (`3.15`, `300`, `0.5`).
#[must_use]
pub fn format_value(value: f64) -> String {
    let s = format!("{value:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_map() -> FeatureMap {
        let mut map = FeatureMap::new();
        map.insert("Fg".into(), 3.0.into());
        map.insert("CDAI".into(), 300i64.into());
        map.insert("APTT".into(), 20.0.into());
        map.insert("eGFR".into(), 75.0.into());
        map.insert("D-Dimer".into(), 0.5.into());
        map.insert("ALB".into(), 45.0.into());
        map.insert("Dose".into(), 600.0.into());
        map.insert("WBC".into(), 7.0.into());
        map.insert("Age".into(), 49.0.into());
        map.insert("AST".into(), 24.0.into());
        map.insert("ALT".into(), 31.5.into());
        map.insert("ADA".into(), 4.0.into());
        map.insert("Lesion site".into(), 3i64.into());
        map
    }

    #[test]
    fn test_feature_order_matches_fitted_layout() {
        let keys: Vec<&str> = FEATURE_ORDER.iter().map(|f| f.key()).collect();
        assert_eq!(
            keys,
            vec![
                "Fg", "CDAI", "APTT", "eGFR", "D-Dimer", "ALB", "Dose", "WBC", "Age", "AST",
                "ALT", "ADA", "Lesion site"
            ]
        );
        for (i, f) in FEATURE_ORDER.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
    }

    #[test]
    fn test_from_map_orders_values() {
        let vector = FeatureVector::from_map(&example_map()).expect("Should validate");
        assert_eq!(
            vector.as_slice(),
            &[3.0, 300.0, 20.0, 75.0, 0.5, 45.0, 600.0, 7.0, 49.0, 24.0, 31.5, 4.0, 3.0]
        );
        assert!((vector.get(Feature::Alt) - 31.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_map_reports_missing_and_unknown_keys() {
        let mut map = example_map();
        map.remove("ALB");
        map.remove("Lesion site");
        map.insert("CRP".into(), 5.0.into());

        match FeatureVector::from_map(&map) {
            Err(PredictError::InvalidFeatures(problems)) => {
                assert_eq!(problems.len(), 2);
                assert!(problems[0].contains("ALB"));
                assert!(problems[0].contains("Lesion site"));
                assert!(problems[1].contains("CRP"));
            }
            other => panic!("Expected InvalidFeatures, got {other:?}"),
        }
    }

    #[test]
    fn test_from_map_rejects_non_numeric_value() {
        let mut map = example_map();
        map.insert("WBC".into(), "seven".into());

        match FeatureVector::from_map(&map) {
            Err(PredictError::TypeCoercion { feature, value }) => {
                assert_eq!(feature, "WBC");
                assert_eq!(value, "\"seven\"");
            }
            other => panic!("Expected TypeCoercion, got {other:?}"),
        }
    }

    #[test]
    fn test_text_values_are_coerced() {
        let mut map = example_map();
        map.insert("Dose".into(), " 450.5 ".into());
        map.insert("Lesion site".into(), "2".into());

        let vector = FeatureVector::from_map(&map).expect("Should coerce text");
        assert!((vector.get(Feature::Dose) - 450.5).abs() < f64::EPSILON);
        assert!((vector.get(Feature::LesionSite) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_finite_and_non_scalar_values_fail_coercion() {
        assert_eq!(RawValue::Number(f64::NAN).coerce(), None);
        assert_eq!(RawValue::Text("inf".into()).coerce(), None);
        assert_eq!(RawValue::Other(serde_json::Value::Bool(true)).coerce(), None);
        assert_eq!(RawValue::Integer(3).coerce(), Some(3.0));
    }

    #[test]
    fn test_constraints_are_revalidated() {
        let mut map = example_map();
        map.insert("Age".into(), 12.0.into());
        map.insert("Lesion site".into(), 2.5.into());
        map.insert("ADA".into(), (-1.0).into());

        match FeatureVector::from_map(&map) {
            Err(PredictError::InvalidFeatures(violations)) => {
                assert_eq!(violations.len(), 3);
                assert!(violations.iter().any(|v| v.starts_with("Age")));
                assert!(violations.iter().any(|v| v.contains("whole number")));
                assert!(violations.iter().any(|v| v.contains("negative")));
            }
            other => panic!("Expected InvalidFeatures, got {other:?}"),
        }
    }

    #[test]
    fn test_unbounded_features_accept_large_values() {
        let mut map = example_map();
        map.insert("D-Dimer".into(), 42.0.into());
        assert!(FeatureVector::from_map(&map).is_ok());
    }

    #[test]
    fn test_defaults_follow_constraint_kinds() {
        let defaults = FeatureVector::defaults();
        assert!((defaults.get(Feature::Fg) - 3.15).abs() < 1e-9);
        assert!((defaults.get(Feature::Aptt) - 20.0).abs() < f64::EPSILON);
        assert!((defaults.get(Feature::LesionSite) - 3.0).abs() < f64::EPSILON);
        assert!(FeatureVector::from_ordered(defaults.to_array()).is_ok());
    }

    #[test]
    fn test_json_map_deserializes_mixed_values() {
        let json = r#"{"Fg": 3, "CDAI": 300.5, "APTT": "20", "ADA": null}"#;
        let map: FeatureMap = serde_json::from_str(json).expect("Should parse");
        assert_eq!(map["Fg"], RawValue::Integer(3));
        assert_eq!(map["CDAI"], RawValue::Number(300.5));
        assert_eq!(map["APTT"], RawValue::Text("20".into()));
        assert_eq!(map["ADA"].coerce(), None);
    }

    #[test]
    fn test_out_of_range_json_number_is_a_coercion_error() {
        let json = r#"{"Fg": 1e999, "CDAI": 300, "APTT": 20.0, "eGFR": 75.0, "D-Dimer": 0.5,
            "ALB": 45.0, "Dose": 600.0, "WBC": 7.0, "Age": 49.0, "AST": 24.0,
            "ALT": 31.5, "ADA": 4.0, "Lesion site": 3}"#;
        assert!(serde_json::from_str::<FeatureMap>(json).is_err());

        let map = parse_feature_map(json).expect("Should parse");
        assert_eq!(map["CDAI"], RawValue::Integer(300));
        assert_eq!(map["Fg"], RawValue::Text("1e999".into()));
        match FeatureVector::from_map(&map) {
            Err(PredictError::TypeCoercion { feature, value }) => {
                assert_eq!(feature, "Fg");
                assert_eq!(value, "\"1e999\"");
            }
            other => panic!("Expected TypeCoercion, got {other:?}"),
        }

        assert!(parse_feature_map("[1, 2]").is_err());
    }

    #[test]
    fn test_violation_messages_show_exact_values() {
        let ada = Feature::Ada.constraint().check(-0.00001).expect_err("negative");
        assert_eq!(ada, "-0.00001 must not be negative");
        let fg = Feature::Fg.constraint().check(4.50001).expect_err("above range");
        assert!(fg.starts_with("4.50001 is outside"), "{fg}");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(3.15), "3.15");
        assert_eq!(format_value(300.0), "300");
        assert_eq!(format_value(0.5), "0.5");
    }
}
