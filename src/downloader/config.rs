//! Configuration structures and defaults for the downloader.
//!
//! [`SessionOptions`] holds the session policy recognized by
//! [`Downloader::configure`]. [`DownloaderConfig`] adds the transport and
//! runtime knobs exposed by [`DownloaderBuilder`].
//!
//! [`Downloader::configure`]: super::Downloader::configure
//! [`DownloaderBuilder`]: super::DownloaderBuilder
//!
//! # Examples
//!
//! ```rust
//! use ferry::downloader::DownloadCallback;
//! use ferry::DownloadResult;
//!
//! let callback: DownloadCallback = Box::new(|result: DownloadResult| match result {
//!     Some(payload) => println!("✓ {} bytes", payload.len()),
//!     None => println!("✗ nothing"),
//! });
//! ```

use crate::download::DownloadResult;
use crate::http::{HttpClientConfig, Transport};

use reqwest::header::HeaderMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// One-shot callback receiving the outcome of a download.
pub type DownloadCallback = Box<dyn FnOnce(DownloadResult) + Send + 'static>;

/// Session policy for the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionOptions {
    /// Allow fetching over metered links such as cellular data.
    pub allow_metered_network: bool,
    /// Let responses be served from and stored in caches.
    pub enable_response_cache: bool,
}

/// Configuration structure for the downloader
#[derive(Clone, Default)]
pub struct DownloaderConfig {
    /// Session policy.
    pub session: SessionOptions,
    /// Directory where payload temp files are created.
    pub directory: Option<PathBuf>,
    /// Custom HTTP headers.
    pub headers: Option<HeaderMap>,
    /// Optional proxy configuration.
    pub proxy: Option<reqwest::Proxy>,
    /// Total time allowed per fetch.
    pub timeout: Option<Duration>,
    /// Time allowed to establish a connection.
    pub connect_timeout: Option<Duration>,
    /// Transport replacing the default HTTP session.
    pub transport: Option<Arc<dyn Transport>>,
    /// Runtime driving fetches and deliveries.
    pub runtime: Option<Handle>,
}

impl DownloaderConfig {
    /// HTTP client configuration derived from this configuration.
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            session: self.session,
            proxy: self.proxy.clone(),
            headers: self.headers.clone(),
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
        }
    }
}

impl fmt::Debug for DownloaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloaderConfig")
            .field("session", &self.session)
            .field("directory", &self.directory)
            .field("headers", &self.headers)
            .field("proxy", &self.proxy)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("transport", &self.transport.is_some())
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}
