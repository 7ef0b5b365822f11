//! Builder pattern implementation for creating Downloader instances.
//!
//! # Examples
//!
//! ```rust
//! use ferry::downloader::DownloaderBuilder;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), ferry::Error> {
//! let downloader = DownloaderBuilder::new()
//!     .allow_metered_network(false)
//!     .enable_response_cache(false)
//!     .timeout(Duration::from_secs(30))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use super::{
    config::{DownloaderConfig, SessionOptions},
    downloader::Downloader,
};
use crate::error::Result;
use crate::http::Transport;

use reqwest::header::{HeaderMap, HeaderValue, IntoHeaderName};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::runtime::Handle;

/// A builder used to create a [`Downloader`].
#[derive(Default)]
pub struct DownloaderBuilder {
    config: DownloaderConfig,
}

impl DownloaderBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        DownloaderBuilder::default()
    }

    /// Replace the whole session policy.
    pub fn configure(mut self, options: SessionOptions) -> Self {
        self.config.session = options;
        self
    }

    /// Allow fetching over metered links.
    pub fn allow_metered_network(mut self, allow: bool) -> Self {
        self.config.session.allow_metered_network = allow;
        self
    }

    /// Allow responses to be served from and stored in caches.
    pub fn enable_response_cache(mut self, enable: bool) -> Self {
        self.config.session.enable_response_cache = enable;
        self
    }

    /// Sets the directory where payload temp files are created.
    pub fn directory(mut self, directory: PathBuf) -> Self {
        self.config.directory = Some(directory);
        self
    }

    /// Set the proxy used by the HTTP session.
    pub fn proxy(mut self, proxy: reqwest::Proxy) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    /// Set the total time allowed per fetch.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set the time allowed to establish a connection.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Fetch through `transport` instead of the default HTTP session.
    ///
    /// HTTP-specific options (headers, proxy, timeouts) are ignored.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    /// Drive fetches and deliveries on `runtime`.
    ///
    /// Defaults to the runtime `build` is called from.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.config.runtime = Some(runtime);
        self
    }

    fn new_header(&self) -> HeaderMap {
        match self.config.headers {
            Some(ref h) => h.to_owned(),
            _ => HeaderMap::new(),
        }
    }

    /// Add the http headers.
    ///
    /// You can call `.headers()` multiple times and all `HeaderMap` will be merged into a single one.
    ///
    /// See also [`header()`].
    ///
    /// [`header()`]: DownloaderBuilder::header
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut new = self.new_header();
        new.extend(headers);

        self.config.headers = Some(new);
        self
    }

    /// Add the http header
    ///
    /// ```
    /// use reqwest::header::{self, HeaderValue};
    /// use ferry::downloader::DownloaderBuilder;
    ///
    /// let ua = HeaderValue::from_static("ferry/0.1");
    /// let builder = DownloaderBuilder::new().header(header::USER_AGENT, ua);
    /// ```
    pub fn header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        let mut new = self.new_header();

        new.insert(name, value);

        self.config.headers = Some(new);
        self
    }

    /// Create the [`Downloader`] with the specified options.
    ///
    /// Fails when no runtime handle was given and none is current, or when
    /// the HTTP client cannot be built.
    pub fn build(self) -> Result<Downloader> {
        Downloader::new(self.config)
    }
}
