//! HTTP client for archive downloads.
//!
//! A thin wrapper around `reqwest` that adds:
//! - total and connect timeouts
//! - refusal of plain `http://` unless insecure HTTP is allowed
//! - streamed downloads with a progress callback
//! - proxy and custom CA certificate support
//!
//! Requests are not retried. A failed download is reported to the caller,
//! who may rerun the whole installation.
//!
//! ```no_run
//! use keg_pm::http::{HttpClient, HttpClientConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpClientConfig::new().with_timeout(Duration::from_secs(60));
//! let client = HttpClient::with_config(config)?;
//!
//! client.download(
//!     "https://example.com/package.tar.gz",
//!     "/tmp/package.tar.gz".as_ref(),
//!     Some(|downloaded, total| {
//!         println!("Downloaded {}/{} bytes", downloaded, total);
//!     }),
//! ).await?;
//! # Ok(())
//! # }
//! ```

use reqwest::redirect::Policy;
use reqwest::{Client, Response, Url};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

const DEFAULT_USER_AGENT: &str = concat!("keg/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;

fn is_plain_http(url: &Url) -> bool {
    url.scheme() == "http"
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Request timed out after {}s: {url}", timeout.as_secs())]
    Timeout { url: String, timeout: Duration },

    #[error("HTTP {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Refusing insecure URL {url} (secure-http is enabled)")]
    Insecure { url: String },

    #[error("Cannot read CA file {}: {source}", .path.display())]
    CaFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Metadata about a completed download
#[derive(Debug, Clone, Default)]
pub struct DownloadInfo {
    pub bytes: u64,
    pub content_type: Option<String>,
}

pub struct HttpClient {
    client: Client,
    user_agent: String,
    timeout: Duration,
    secure_http: bool,
}

impl HttpClient {
    pub fn new() -> Result<Self, HttpError> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, HttpError> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent);

        if config.secure_http {
            builder = builder.redirect(Policy::custom(|attempt| {
                if is_plain_http(attempt.url()) {
                    attempt.error("redirect to plain http refused (secure-http is enabled)")
                } else if attempt.previous().len() >= MAX_REDIRECTS {
                    attempt.error("too many redirects")
                } else {
                    attempt.follow()
                }
            }));
        }

        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)?;
            builder = builder.proxy(proxy);
        }

        if let Some(cafile) = &config.cafile {
            let cert_bytes = std::fs::read(cafile).map_err(|source| HttpError::CaFile {
                path: cafile.clone(),
                source,
            })?;
            let cert = reqwest::Certificate::from_pem(&cert_bytes)?;
            builder = builder.add_root_certificate(cert);
            log::debug!("Trusting CA certificates from {}", cafile.display());
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            user_agent: config.user_agent,
            timeout: config.timeout,
            secure_http: config.secure_http,
        })
    }

    /// Perform a GET request; non-2xx responses are errors
    pub async fn get(&self, url: &str) -> Result<Response, HttpError> {
        if self.secure_http && Url::parse(url).is_ok_and(|u| is_plain_http(&u)) {
            return Err(HttpError::Insecure {
                url: url.to_string(),
            });
        }

        log::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response)
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            HttpError::Request(err)
        }
    }

    /// Download file with progress callback
    pub async fn download<F>(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<F>,
    ) -> Result<DownloadInfo, HttpError>
    where
        F: Fn(u64, u64),
    {
        let response = self.get(url).await?;

        let total_size = response.content_length().unwrap_or(0);
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(dest).await?;
        let mut downloaded: u64 = 0;

        let mut stream = response.bytes_stream();

        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.classify(url, e))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if let Some(ref callback) = progress {
                callback(downloaded, total_size);
            }
        }

        file.flush().await?;

        Ok(DownloadInfo {
            bytes: downloaded,
            content_type,
        })
    }

    /// Get the configured user agent
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Whether plain `http://` URLs are refused
    pub fn secure_http(&self) -> bool {
        self.secure_http
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub proxy: Option<String>,
    pub cafile: Option<PathBuf>,
    pub user_agent: String,
    pub secure_http: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            proxy: None,
            cafile: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            secure_http: true,
        }
    }
}

impl HttpClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_cafile(mut self, cafile: PathBuf) -> Self {
        self.cafile = Some(cafile);
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_secure_http(mut self, secure_http: bool) -> Self {
        self.secure_http = secure_http;
        self
    }
}
