//! File downloader for HTTP(S) and `file://` archives.

use std::path::Path;
use std::sync::Arc;

use url::Url;

use crate::http::{DownloadInfo, HttpClient};
use crate::{KegError, Result};

use super::checksum::{verify_checksum, Checksum};

/// File downloader for release archives
pub struct FileDownloader {
    http_client: Arc<HttpClient>,
}

impl FileDownloader {
    /// Create a new file downloader
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self { http_client }
    }

    /// Download a file to the specified path
    pub async fn download<F>(&self, url: &str, dest: &Path, progress: Option<F>) -> Result<DownloadInfo>
    where
        F: Fn(u64, u64),
    {
        let parsed = Url::parse(url).map_err(|e| KegError::Fetch {
            url: url.to_string(),
            reason: format!("invalid URL: {}", e),
        })?;

        match parsed.scheme() {
            "file" => Self::copy_local(&parsed, url, dest, progress).await,
            "http" | "https" => self
                .http_client
                .download(url, dest, progress)
                .await
                .map_err(|e| KegError::Fetch {
                    url: url.to_string(),
                    reason: e.to_string(),
                }),
            scheme => Err(KegError::Fetch {
                url: url.to_string(),
                reason: format!("unsupported URL scheme '{}'", scheme),
            }),
        }
    }

    async fn copy_local<F>(parsed: &Url, url: &str, dest: &Path, progress: Option<F>) -> Result<DownloadInfo>
    where
        F: Fn(u64, u64),
    {
        let fetch_error = |reason: String| KegError::Fetch {
            url: url.to_string(),
            reason,
        };

        let source = parsed
            .to_file_path()
            .map_err(|_| fetch_error("not a local file path".to_string()))?;

        log::debug!("Copying local archive {}", source.display());

        let bytes = tokio::fs::copy(&source, dest)
            .await
            .map_err(|e| fetch_error(format!("{}: {}", source.display(), e)))?;

        if let Some(ref callback) = progress {
            callback(bytes, bytes);
        }

        Ok(DownloadInfo {
            bytes,
            content_type: None,
        })
    }

    /// Download and verify checksum.
    ///
    /// On mismatch the downloaded file is removed before the error is returned.
    pub async fn download_verified<F>(
        &self,
        url: &str,
        dest: &Path,
        expected_checksum: &Checksum,
        progress: Option<F>,
    ) -> Result<DownloadInfo>
    where
        F: Fn(u64, u64),
    {
        let info = self.download(url, dest, progress).await?;

        if let Err(e) = verify_checksum(dest, expected_checksum, url).await {
            let _ = tokio::fs::remove_file(dest).await;
            return Err(e);
        }

        log::debug!("Verified {} ({} bytes)", expected_checksum, info.bytes);

        Ok(info)
    }
}
