//! Loading persisted model and scaler artifacts from local storage.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::info;
use wasteclass_core::{FeatureSchema, InferenceError};

use crate::classifier::ModelArtifact;
use crate::pipeline::{AssemblyError, InferencePipeline};
use crate::scaler::StandardScaler;

/// Locations of the two artifacts a pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
}

impl ArtifactPaths {
    pub fn new(model: impl Into<PathBuf>, scaler: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            scaler: scaler.into(),
        }
    }
}

/// Whether `path` is a regular file. Unreadable metadata counts as absent.
pub async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file())
}

/// Read both artifacts and assemble a pipeline for `schema`.
pub async fn load_pipeline(
    paths: &ArtifactPaths,
    schema: FeatureSchema,
) -> Result<InferencePipeline, InferenceError> {
    let model: ModelArtifact = read_json(&paths.model).await?;
    let scaler: StandardScaler = read_json(&paths.scaler).await?;

    let kind = model.kind();
    let pipeline =
        InferencePipeline::new(schema, scaler, Box::new(model)).map_err(|e| match e {
            AssemblyError::Scaler(reason) => InferenceError::artifact(&paths.scaler, reason),
            AssemblyError::Classifier(reason) => InferenceError::artifact(&paths.model, reason),
        })?;

    info!(
        model = %paths.model.display(),
        scaler = %paths.scaler.display(),
        kind,
        schema_version = pipeline.schema().version,
        "loaded inference artifacts"
    );
    Ok(pipeline)
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, InferenceError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| InferenceError::artifact(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| InferenceError::artifact(path, e))
}
