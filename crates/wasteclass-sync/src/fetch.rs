//! One-time, idempotent retrieval of model artifacts from remote storage.
//!
//! The fetch moves through `Uninitialized → Authenticating → Downloading →
//! Ready`; any step may end in `Failed`. Entry is serialized by an async
//! mutex, and files already present locally are never downloaded again, so
//! concurrent first requests produce a single transfer.

use std::path::{Path, PathBuf};

use tokio::sync::{Mutex, watch};
use tracing::{info, warn};
use wasteclass_ai::{ArtifactPaths, is_file};

use crate::drive::DriveClient;
use crate::error::{FetchError, SyncError};
use crate::oauth::{ClientSecret, OAuthClient};

/// Where the artifacts live remotely and how to authenticate.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub model_file_id: String,
    pub scaler_file_id: String,
    pub client_secret: PathBuf,
    pub token_cache: PathBuf,
    pub scope: String,
    pub api_base: String,
    /// Local destination for the downloaded files.
    pub destination: ArtifactPaths,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    Uninitialized,
    Authenticating,
    Downloading { artifact: &'static str },
    Ready,
    Failed(String),
}

impl FetchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Authenticating => "authenticating",
            Self::Downloading { .. } => "downloading",
            Self::Ready => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

pub struct ArtifactFetcher {
    config: RemoteConfig,
    drive: DriveClient,
    state: watch::Sender<FetchState>,
    lock: Mutex<()>,
}

impl ArtifactFetcher {
    pub fn new(config: RemoteConfig) -> Self {
        let drive = DriveClient::new(config.api_base.clone());
        let (state, _) = watch::channel(FetchState::Uninitialized);
        Self {
            config,
            drive,
            state,
            lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Current state, for health reporting.
    pub fn state(&self) -> FetchState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state.subscribe()
    }

    fn set(&self, next: FetchState) {
        info!(state = next.as_str(), "artifact fetch state");
        self.state.send_replace(next);
    }

    /// Make sure both artifacts exist locally, downloading whatever is missing.
    ///
    /// Safe to call from many tasks at once and again after a failure.
    /// Errors name the artifact that was being fetched.
    pub async fn ensure_local(&self) -> Result<ArtifactPaths, FetchError> {
        let _guard = self.lock.lock().await;
        let dest = &self.config.destination;

        let mut missing = Vec::new();
        let targets = [
            ("model", &self.config.model_file_id, &dest.model),
            ("scaler", &self.config.scaler_file_id, &dest.scaler),
        ];
        for (artifact, file_id, path) in targets {
            if !is_file(path).await {
                missing.push((artifact, file_id.as_str(), path.as_path()));
            }
        }

        if missing.is_empty() {
            if self.state() != FetchState::Ready {
                self.set(FetchState::Ready);
            }
            return Ok(dest.clone());
        }

        match self.fetch_missing(&missing).await {
            Ok(()) => {
                self.set(FetchState::Ready);
                Ok(dest.clone())
            }
            Err(e) => {
                warn!(
                    artifact = %e.artifact.display(),
                    error = %e.source,
                    auth = e.is_auth(),
                    "artifact fetch failed"
                );
                self.set(FetchState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Authenticate once, then download each `(name, file id, path)` in order.
    /// Authentication failures are charged to the first missing artifact.
    async fn fetch_missing(
        &self,
        missing: &[(&'static str, &str, &Path)],
    ) -> Result<(), FetchError> {
        let Some(&(_, _, first)) = missing.first() else {
            return Ok(());
        };
        let failed = |path: &Path| {
            let artifact = path.to_path_buf();
            move |source: SyncError| FetchError { artifact, source }
        };

        self.set(FetchState::Authenticating);
        let token = self.authenticate().await.map_err(failed(first))?;

        for &(artifact, file_id, path) in missing {
            self.set(FetchState::Downloading { artifact });
            self.drive
                .download(&token, file_id, path)
                .await
                .map_err(failed(path))?;
        }
        Ok(())
    }

    async fn authenticate(&self) -> Result<String, SyncError> {
        let secret = ClientSecret::from_file(&self.config.client_secret).await?;
        let oauth = OAuthClient::new(
            secret,
            self.config.token_cache.clone(),
            self.config.scope.clone(),
        );
        oauth.access_token().await
    }
}
