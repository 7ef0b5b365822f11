//! Error handling for the ferry library.
//!
//! Errors describe why a fetch did not produce a payload. They stay inside the
//! crate boundary for downloads: every failure, including cancellation,
//! reaches download callbacks as an absent result. They surface to callers
//! only from construction (building a [`Downloader`], parsing a
//! [`ResourceId`]) and from custom [`Transport`] implementations.
//!
//! [`Downloader`]: crate::Downloader
//! [`ResourceId`]: crate::ResourceId
//! [`Transport`]: crate::Transport

use std::io;
use thiserror::Error;

/// Errors that can happen when using ferry.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from an underlying system.
    ///
    /// Also used when a transport panics while fetching.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The resource locator cannot be parsed or does not address a resource.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The transport does not know how to fetch this kind of locator.
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// I/O Error.
    ///
    /// Raised while materializing a payload on disk.
    #[error("I/O error")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library.
    ///
    /// Network failures, timeouts and non-success HTTP statuses.
    #[error("Reqwest Error")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },

    /// Error from the middleware stack wrapping the HTTP client.
    #[error("Middleware Error")]
    Middleware {
        #[from]
        source: reqwest_middleware::Error,
    },

    /// The body ended before the advertised length was received.
    #[error("Truncated body: expected {expected} bytes, received {received}")]
    Truncated { expected: u64, received: u64 },

    /// The fetch was aborted by `cancel` or `cancel_all`.
    #[error("Download cancelled")]
    Cancelled,

    /// No tokio runtime was available to drive downloads.
    #[error("No tokio runtime available; build the downloader inside a runtime or pass a handle")]
    NoRuntime,
}

impl Error {
    /// Whether this error is the result of an explicit cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Result type alias for operations that can fail with a ferry error.
pub type Result<T> = std::result::Result<T, Error>;
