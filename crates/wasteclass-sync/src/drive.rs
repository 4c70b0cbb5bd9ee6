//! Chunked file download from a drive-style files API.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::SyncError;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Downloads file contents by stable file id.
pub struct DriveClient {
    client: reqwest::Client,
    api_base: String,
}

impl DriveClient {
    /// `api_base` should be like `https://www.googleapis.com/drive/v3` (no trailing slash).
    pub fn new(api_base: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn media_url(&self, file_id: &str) -> String {
        format!("{}/files/{file_id}?alt=media", self.api_base)
    }

    /// Stream `file_id` into `dest`, returning the number of bytes written.
    ///
    /// Bytes go to a sibling `.part` file that is renamed into place only
    /// after the body is complete, so `dest` never holds a partial artifact.
    pub async fn download(
        &self,
        access_token: &str,
        file_id: &str,
        dest: &Path,
    ) -> Result<u64, SyncError> {
        let url = self.media_url(file_id);
        info!(file_id, dest = %dest.display(), "downloading artifact");

        let mut resp = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }

        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::io(parent, e))?;
        }

        let part = part_path(dest);
        let mut file = tokio::fs::File::create(&part)
            .await
            .map_err(|e| SyncError::io(&part, e))?;

        let total = resp.content_length();
        let mut written: u64 = 0;
        let mut last_pct: u64 = 0;

        let result = async {
            while let Some(chunk) = resp.chunk().await? {
                file.write_all(&chunk)
                    .await
                    .map_err(|e| SyncError::io(&part, e))?;
                written += chunk.len() as u64;

                if let Some(total) = total.filter(|t| *t > 0) {
                    let pct = written * 100 / total;
                    if pct >= last_pct + 10 || pct == 100 {
                        last_pct = pct;
                        debug!(file_id, pct, "download progress");
                    }
                }
            }
            file.flush().await.map_err(|e| SyncError::io(&part, e))?;
            Ok::<(), SyncError>(())
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }
        drop(file);

        tokio::fs::rename(&part, dest)
            .await
            .map_err(|e| SyncError::io(dest, e))?;

        info!(file_id, bytes = written, "download complete");
        Ok(written)
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
