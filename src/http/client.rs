//! HTTP client setup and middleware configuration.
//!
//! Builds the connection pool behind an [`HttpSession`]: an ephemeral
//! `reqwest` client (no cookie store, nothing persisted) wrapped in a
//! tracing middleware. Failed requests are never retried at this layer.
//!
//! [`HttpSession`]: super::HttpSession
//!
//! # Examples
//!
//! ```rust
//! use ferry::http::{create_http_client, HttpClientConfig};
//! use reqwest::header::{HeaderMap, USER_AGENT};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut headers = HeaderMap::new();
//! headers.insert(USER_AGENT, "MyApp/1.0".parse()?);
//!
//! let config = HttpClientConfig {
//!     headers: Some(headers),
//!     ..HttpClientConfig::default()
//! };
//!
//! let client = create_http_client(config)?;
//! # Ok(())
//! # }
//! ```

use crate::downloader::config::SessionOptions;

use reqwest::{
    header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA},
    Proxy,
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use std::time::Duration;
use tracing::debug;

/// Configuration for HTTP client setup.
#[derive(Debug, Clone, Default)]
pub struct HttpClientConfig {
    /// Session-level policy.
    pub session: SessionOptions,
    /// Optional proxy configuration.
    pub proxy: Option<Proxy>,
    /// Default headers to include with all requests.
    pub headers: Option<HeaderMap>,
    /// Total time allowed for one request, body included.
    pub timeout: Option<Duration>,
    /// Time allowed to establish a connection.
    pub connect_timeout: Option<Duration>,
}

/// Headers sent with every request when response caching is disabled.
pub fn no_cache_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Resolve the default headers for a configuration.
///
/// User headers win over the cache-suppression headers.
pub fn default_headers(config: &HttpClientConfig) -> HeaderMap {
    let mut headers = if config.session.enable_response_cache {
        HeaderMap::new()
    } else {
        no_cache_headers()
    };
    if let Some(ref h) = config.headers {
        headers.extend(h.clone());
    }
    headers
}

/// Creates an HTTP client with middleware configuration.
///
/// This function sets up a reqwest client with:
/// - Tracing middleware for request/response logging
/// - Cache suppression headers unless response caching is enabled
/// - Optional proxy, timeouts and default headers
pub fn create_http_client(
    config: HttpClientConfig,
) -> Result<ClientWithMiddleware, reqwest::Error> {
    let headers = default_headers(&config);

    if !config.session.allow_metered_network {
        debug!("Metered network access disabled for this session (advisory)");
    }

    let mut inner_client_builder = reqwest::Client::builder().default_headers(headers);

    if let Some(proxy) = config.proxy {
        inner_client_builder = inner_client_builder.proxy(proxy);
    }

    if let Some(timeout) = config.timeout {
        inner_client_builder = inner_client_builder.timeout(timeout);
    }

    if let Some(timeout) = config.connect_timeout {
        inner_client_builder = inner_client_builder.connect_timeout(timeout);
    }

    let inner_client = inner_client_builder.build()?;

    let client = ClientBuilder::new(inner_client)
        // Trace HTTP requests. See the tracing crate to make use of these traces.
        .with(TracingMiddleware::default())
        .build();

    Ok(client)
}
