use std::path::PathBuf;

use thiserror::Error;

/// Message shown to end users for any failed prediction.
pub const GENERIC_ERROR_MESSAGE: &str = "Error occurred. Please try again.";

/// Coarse error category, used to differentiate failures in logs while the
/// user-facing message stays generic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, non-numeric or non-finite field.
    InvalidInput,
    /// Model or scaler artifact missing, corrupt, or inconsistent.
    ArtifactLoad,
    /// Credential acquisition or refresh failed.
    Auth,
    /// The loaded model misbehaved at call time.
    Model,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::ArtifactLoad => "artifact_load",
            Self::Auth => "auth",
            Self::Model => "model",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' is not a number: {value:?}")]
    NotNumeric { field: String, value: String },

    #[error("field '{field}' is not finite: {value}")]
    NotFinite { field: String, value: f64 },

    #[error("failed to load artifact {path}: {reason}")]
    ArtifactLoad { path: PathBuf, reason: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("shape mismatch: expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("model produced unsupported class {0}")]
    UnsupportedClass(i64),

    #[error("malformed model: {0}")]
    MalformedModel(String),
}

impl InferenceError {
    pub fn artifact(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::ArtifactLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_) | Self::NotNumeric { .. } | Self::NotFinite { .. } => {
                ErrorKind::InvalidInput
            }
            Self::ArtifactLoad { .. } => ErrorKind::ArtifactLoad,
            Self::Auth(_) => ErrorKind::Auth,
            Self::ShapeMismatch { .. }
            | Self::UnsupportedClass(_)
            | Self::MalformedModel(_) => ErrorKind::Model,
        }
    }

    /// The text shown to end users. Identical for every error.
    pub fn user_message(&self) -> &'static str {
        GENERIC_ERROR_MESSAGE
    }
}
