//! The per-request inference chain: extract → scale → predict → label.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;
use wasteclass_core::{
    FeatureSchema, FeatureVector, InferenceError, PredictionLabel, ScaledFeatureVector,
};

use crate::classifier::Classifier;
use crate::scaler::StandardScaler;

/// Immutable bundle of schema, scaler and classifier.
///
/// Built once per process and shared behind an `Arc`; every method takes
/// `&self`, so concurrent requests never contend.
pub struct InferencePipeline {
    schema: FeatureSchema,
    scaler: StandardScaler,
    classifier: Box<dyn Classifier>,
}

/// Which part of a pipeline disagreed with the others.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("scaler: {0}")]
    Scaler(String),
    #[error("classifier: {0}")]
    Classifier(String),
}

/// Outcome of a successful inference.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: PredictionLabel,
    pub scaled: ScaledFeatureVector,
}

impl std::fmt::Debug for InferencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePipeline")
            .field("schema", &self.schema)
            .field("n_features", &self.classifier.n_features())
            .finish()
    }
}

impl InferencePipeline {
    /// Assemble a pipeline, checking that all three parts agree on shape and
    /// that the classifier is structurally sound.
    pub fn new(
        schema: FeatureSchema,
        scaler: StandardScaler,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self, AssemblyError> {
        scaler
            .check_schema(&schema)
            .map_err(AssemblyError::Scaler)?;
        classifier.validate().map_err(AssemblyError::Classifier)?;
        if classifier.n_features() != schema.len() {
            return Err(AssemblyError::Classifier(format!(
                "classifier expects {} features, schema v{} has {}",
                classifier.n_features(),
                schema.version,
                schema.len()
            )));
        }
        Ok(Self {
            schema,
            scaler,
            classifier,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Run the full chain over submitted form values.
    pub fn predict(&self, form: &HashMap<String, String>) -> Result<Prediction, InferenceError> {
        let raw = self.schema.extract(form)?;
        self.predict_vector(&raw)
    }

    /// Run scale → predict → label over an already-assembled vector.
    pub fn predict_vector(&self, raw: &FeatureVector) -> Result<Prediction, InferenceError> {
        let scaled = self.scaler.transform(raw)?;
        let class = self.classifier.predict(&scaled)?;
        let label = PredictionLabel::from_class(class)?;
        debug!(class, label = %label, "prediction");
        Ok(Prediction { label, scaled })
    }
}
