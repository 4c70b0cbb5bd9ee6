//! Sync layer: fetch model artifacts from remote drive storage using cached OAuth credentials.

pub mod drive;
mod error;
pub mod fetch;
pub mod oauth;

#[cfg(any(test, feature = "test-util"))]
pub mod testserver;

pub use drive::DriveClient;
pub use error::{FetchError, SyncError};
pub use fetch::{ArtifactFetcher, FetchState, RemoteConfig};
pub use oauth::{ClientSecret, OAuthClient, StoredToken};
