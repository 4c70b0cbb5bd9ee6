//! Standardization with statistics persisted at training time.
//!
//! The scaler is never fit at inference time. Fitting on a single incoming
//! sample would centre every feature on itself and produce an all-zero vector.

use serde::{Deserialize, Serialize};
use wasteclass_core::{FeatureSchema, FeatureVector, InferenceError, ScaledFeatureVector};

/// On-disk layout of a scaler artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerArtifact {
    schema_version: u32,
    feature_names: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// Per-feature `(x - mean) / scale` transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScalerArtifact", into = "ScalerArtifact")]
pub struct StandardScaler {
    schema_version: u32,
    feature_names: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl TryFrom<ScalerArtifact> for StandardScaler {
    type Error = String;

    fn try_from(a: ScalerArtifact) -> Result<Self, Self::Error> {
        Self::new(a.schema_version, a.feature_names, a.mean, a.scale)
    }
}

impl From<StandardScaler> for ScalerArtifact {
    fn from(s: StandardScaler) -> Self {
        Self {
            schema_version: s.schema_version,
            feature_names: s.feature_names,
            mean: s.mean,
            scale: s.scale,
        }
    }
}

impl StandardScaler {
    /// Build a scaler from persisted statistics.
    ///
    /// A scale of exactly zero marks a constant training feature and is
    /// stored as `1.0`, so such features are only centred.
    pub fn new(
        schema_version: u32,
        feature_names: Vec<String>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    ) -> Result<Self, String> {
        let n = feature_names.len();
        if mean.len() != n || scale.len() != n {
            return Err(format!(
                "length mismatch: {n} feature names, {} means, {} scales",
                mean.len(),
                scale.len()
            ));
        }
        if let Some(i) = mean.iter().position(|m| !m.is_finite()) {
            return Err(format!("mean for '{}' is not finite", feature_names[i]));
        }
        if let Some(i) = scale.iter().position(|s| !s.is_finite() || *s < 0.0) {
            return Err(format!(
                "scale for '{}' must be finite and non-negative",
                feature_names[i]
            ));
        }

        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();

        Ok(Self {
            schema_version,
            feature_names,
            mean,
            scale,
        })
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Check the artifact was fit against `schema`: same version, same
    /// field names, same order.
    pub fn check_schema(&self, schema: &FeatureSchema) -> Result<(), String> {
        if self.schema_version != schema.version {
            return Err(format!(
                "scaler was fit for schema v{}, service uses v{}",
                self.schema_version, schema.version
            ));
        }
        if self.feature_names != schema.fields {
            return Err(format!(
                "scaler features {:?} do not match schema {:?}",
                self.feature_names, schema.fields
            ));
        }
        Ok(())
    }

    pub fn transform(&self, raw: &FeatureVector) -> Result<ScaledFeatureVector, InferenceError> {
        if raw.len() != self.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.len(),
                actual: raw.len(),
            });
        }
        let scaled = raw
            .as_slice()
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((x, m), s)| (x - m) / s)
            .collect();
        Ok(ScaledFeatureVector::new(scaled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasteclass_core::food_waste;

    fn unit(n: usize) -> StandardScaler {
        StandardScaler::new(
            1,
            (0..n).map(|i| format!("f{i}")).collect(),
            vec![0.0; n],
            vec![1.0; n],
        )
        .unwrap()
    }

    #[test]
    fn identity_statistics_pass_values_through() {
        let scaler = unit(1);
        let scaled = scaler.transform(&FeatureVector::new(vec![5.0])).unwrap();
        assert_eq!(scaled.as_slice(), &[5.0]);
    }

    #[test]
    fn centres_and_scales_per_feature() {
        let scaler = StandardScaler::new(
            1,
            vec!["a".into(), "b".into()],
            vec![10.0, -2.0],
            vec![2.0, 4.0],
        )
        .unwrap();
        let scaled = scaler
            .transform(&FeatureVector::new(vec![14.0, 6.0]))
            .unwrap();
        assert_eq!(scaled.as_slice(), &[2.0, 2.0]);
    }

    #[test]
    fn transform_is_idempotent_over_calls() {
        let scaler = StandardScaler::new(
            1,
            vec!["a".into(), "b".into()],
            vec![3.0, 7.0],
            vec![0.5, 2.5],
        )
        .unwrap();
        let raw = FeatureVector::new(vec![1.25, 9.0]);
        let first = scaler.transform(&raw).unwrap();
        let second = scaler.transform(&raw).unwrap();
        assert_eq!(first, second);
        // A scaler fit on this one sample would have produced all zeros.
        assert!(first.as_slice().iter().any(|v| *v != 0.0));
    }

    #[test]
    fn zero_scale_only_centres() {
        let scaler =
            StandardScaler::new(1, vec!["a".into()], vec![4.0], vec![0.0]).unwrap();
        assert_eq!(scaler.scale(), &[1.0]);
        let scaled = scaler.transform(&FeatureVector::new(vec![6.0])).unwrap();
        assert_eq!(scaled.as_slice(), &[2.0]);
    }

    #[test]
    fn rejects_inconsistent_lengths() {
        let err = StandardScaler::new(1, vec!["a".into()], vec![0.0, 1.0], vec![1.0]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_non_finite_statistics() {
        assert!(StandardScaler::new(1, vec!["a".into()], vec![f64::NAN], vec![1.0]).is_err());
        assert!(StandardScaler::new(1, vec!["a".into()], vec![0.0], vec![-1.0]).is_err());
    }

    #[test]
    fn transform_rejects_wrong_length() {
        let err = unit(2).transform(&FeatureVector::new(vec![1.0])).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::ShapeMismatch { expected: 2, actual: 1 }
        ));
    }

    #[test]
    fn schema_check_requires_same_names_and_order() {
        let schema = food_waste::schema_v1();
        let names: Vec<String> = schema.fields.clone();
        let ok = StandardScaler::new(1, names.clone(), vec![0.0; 7], vec![1.0; 7]).unwrap();
        assert!(ok.check_schema(&schema).is_ok());

        let mut swapped = names.clone();
        swapped.swap(1, 2);
        let bad = StandardScaler::new(1, swapped, vec![0.0; 7], vec![1.0; 7]).unwrap();
        assert!(bad.check_schema(&schema).is_err());

        let wrong_version = StandardScaler::new(2, names, vec![0.0; 7], vec![1.0; 7]).unwrap();
        assert!(wrong_version.check_schema(&schema).is_err());
    }

    #[test]
    fn deserializes_and_validates_json() {
        let json = r#"{
            "schema_version": 1,
            "feature_names": ["a", "b"],
            "mean": [1.0, 2.0],
            "scale": [0.5, 0.0]
        }"#;
        let scaler: StandardScaler = serde_json::from_str(json).unwrap();
        assert_eq!(scaler.scale(), &[0.5, 1.0]);

        let bad = r#"{"schema_version": 1, "feature_names": ["a"], "mean": [], "scale": [1.0]}"#;
        assert!(serde_json::from_str::<StandardScaler>(bad).is_err());
    }
}
