//! Process-wide, read-only access to the loaded inference pipeline.

use std::sync::Arc;

use tokio::sync::OnceCell;
use wasteclass_ai::{ArtifactPaths, InferencePipeline, load_pipeline};
use wasteclass_core::{FeatureSchema, InferenceError};
use wasteclass_sync::{ArtifactFetcher, FetchState};

/// Where artifacts come from.
pub enum ArtifactSource {
    /// Files already on local disk.
    Local(ArtifactPaths),
    /// Files fetched once from remote storage, then read locally.
    Remote(Arc<ArtifactFetcher>),
}

/// Loads the pipeline on first use and hands out shared references after.
///
/// A failed load leaves nothing cached, so the next caller tries again.
pub struct ModelProvider {
    source: ArtifactSource,
    schema: FeatureSchema,
    pipeline: OnceCell<Arc<InferencePipeline>>,
}

impl ModelProvider {
    pub fn new(source: ArtifactSource, schema: FeatureSchema) -> Self {
        Self {
            source,
            schema,
            pipeline: OnceCell::new(),
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub async fn pipeline(&self) -> Result<Arc<InferencePipeline>, InferenceError> {
        self.pipeline
            .get_or_try_init(|| async {
                let paths = match &self.source {
                    ArtifactSource::Local(paths) => paths.clone(),
                    ArtifactSource::Remote(fetcher) => fetcher
                        .ensure_local()
                        .await
                        .map_err(|e| e.into_inference())?,
                };
                let pipeline = load_pipeline(&paths, self.schema.clone()).await?;
                Ok::<_, InferenceError>(Arc::new(pipeline))
            })
            .await
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.pipeline.initialized()
    }

    pub fn source_name(&self) -> &'static str {
        match self.source {
            ArtifactSource::Local(_) => "local",
            ArtifactSource::Remote(_) => "remote",
        }
    }

    /// Remote fetch state; `None` for local sources.
    pub fn fetch_state(&self) -> Option<FetchState> {
        match &self.source {
            ArtifactSource::Local(_) => None,
            ArtifactSource::Remote(fetcher) => Some(fetcher.state()),
        }
    }
}
