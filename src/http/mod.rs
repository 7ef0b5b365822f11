//! HTTP module containing the transport layer.
//!
//! - [`client`] - HTTP client creation and middleware configuration
//! - [`session`] - The [`Transport`] seam and its reqwest-backed [`HttpSession`]
//!
//! # Examples
//!
//! ```rust
//! use ferry::http::{HttpClientConfig, HttpSession};
//! use ferry::SessionOptions;
//!
//! # fn example() -> Result<(), ferry::Error> {
//! let config = HttpClientConfig {
//!     session: SessionOptions {
//!         allow_metered_network: false,
//!         enable_response_cache: false,
//!     },
//!     ..HttpClientConfig::default()
//! };
//! let session = HttpSession::new(config, None)?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod session;

pub use client::{create_http_client, HttpClientConfig};
pub use session::{HttpSession, Transport};
