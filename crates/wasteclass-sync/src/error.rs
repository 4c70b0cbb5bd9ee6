use std::path::{Path, PathBuf};

use thiserror::Error;
use wasteclass_core::InferenceError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the failure came from credentials rather than transport or storage.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::Auth(_) | Self::Server { status: 401 | 403, .. }
        )
    }

    /// Fold into the request-level taxonomy. `artifact` names what was being
    /// fetched when the error occurred.
    pub fn into_inference(self, artifact: &Path) -> InferenceError {
        if self.is_auth() {
            InferenceError::Auth(self.to_string())
        } else {
            InferenceError::artifact(artifact, self)
        }
    }
}

/// A failed fetch and the local artifact it was producing.
#[derive(Error, Debug)]
#[error("fetching {}: {source}", artifact.display())]
pub struct FetchError {
    pub artifact: PathBuf,
    #[source]
    pub source: SyncError,
}

impl FetchError {
    pub fn is_auth(&self) -> bool {
        self.source.is_auth()
    }

    pub fn into_inference(self) -> InferenceError {
        self.source.into_inference(&self.artifact)
    }
}
