//! Command-line and environment configuration.
//!
//! Every flag can also be set through a `WASTECLASS_*` environment variable.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use wasteclass_ai::ArtifactPaths;
use wasteclass_sync::{ArtifactFetcher, RemoteConfig, drive::DEFAULT_API_BASE};
use wasteclass_web::ArtifactSource;

pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Local artifact locations. With a remote source these are the download targets.
#[derive(Args, Debug, Clone)]
pub struct ArtifactArgs {
    /// Classifier artifact (JSON).
    #[arg(long, env = "WASTECLASS_MODEL", default_value = "artifacts/model.json")]
    pub model: PathBuf,

    /// Scaler artifact (JSON) with training-time mean and scale.
    #[arg(long, env = "WASTECLASS_SCALER", default_value = "artifacts/scaler.json")]
    pub scaler: PathBuf,
}

impl ArtifactArgs {
    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.model, &self.scaler)
    }
}

/// OAuth client registration and token cache.
#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    #[arg(
        long,
        env = "WASTECLASS_CLIENT_SECRET",
        default_value = "credentials/client_secret.json"
    )]
    pub client_secret: PathBuf,

    #[arg(long, env = "WASTECLASS_TOKEN_CACHE", default_value = "credentials/token.json")]
    pub token_cache: PathBuf,

    #[arg(long, env = "WASTECLASS_SCOPE", default_value = DRIVE_READONLY_SCOPE)]
    pub scope: String,
}

/// Remote drive source. Enabled when both file ids are given.
#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    /// Drive file id of the classifier artifact.
    #[arg(long, env = "WASTECLASS_DRIVE_MODEL_ID", requires = "drive_scaler_id")]
    pub drive_model_id: Option<String>,

    /// Drive file id of the scaler artifact.
    #[arg(long, env = "WASTECLASS_DRIVE_SCALER_ID", requires = "drive_model_id")]
    pub drive_scaler_id: Option<String>,

    #[arg(long, env = "WASTECLASS_DRIVE_API_BASE", default_value = DEFAULT_API_BASE)]
    pub drive_api_base: String,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

impl RemoteArgs {
    pub fn remote_config(&self, destination: ArtifactPaths) -> Option<RemoteConfig> {
        let (model, scaler) = (self.drive_model_id.as_ref()?, self.drive_scaler_id.as_ref()?);
        Some(RemoteConfig {
            model_file_id: model.clone(),
            scaler_file_id: scaler.clone(),
            client_secret: self.credentials.client_secret.clone(),
            token_cache: self.credentials.token_cache.clone(),
            scope: self.credentials.scope.clone(),
            api_base: self.drive_api_base.clone(),
            destination,
        })
    }
}

/// Pick the artifact source from the parsed flags.
pub fn artifact_source(artifacts: &ArtifactArgs, remote: &RemoteArgs) -> ArtifactSource {
    match remote.remote_config(artifacts.paths()) {
        Some(config) => ArtifactSource::Remote(Arc::new(ArtifactFetcher::new(config))),
        None => ArtifactSource::Local(artifacts.paths()),
    }
}

/// Parse a `name=value` pair.
pub fn parse_field(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    if name.is_empty() {
        return Err(format!("empty field name in '{s}'"));
    }
    Ok((name.to_string(), value.to_string()))
}
