//! HTTP transport for archive downloads.

mod client;

pub use client::{
    DownloadInfo, HttpClient, HttpClientConfig, HttpError, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT,
};
