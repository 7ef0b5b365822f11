//! Ferry fetches resources by locator, making sure that concurrent requests
//! for the same resource share a single transfer, and lets the owner cancel
//! everything that is still outstanding in one call.
//!
//! Results are delivered to one-shot callbacks on a dedicated, serialized
//! delivery context. A callback receives either a [`Payload`] (a temporary
//! file holding the body) or `None`, whatever went wrong.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ferry::{DownloaderBuilder, Error};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let downloader = DownloaderBuilder::new()
//!     .allow_metered_network(false)
//!     .enable_response_cache(false)
//!     .build()?
//!     .cancel_on_drop();
//!
//! let image = "https://www.nasa.gov/sites/default/files/pia17474_1.jpg";
//! if let Some(payload) = downloader.download_async(image).await {
//!     let bytes = payload.bytes().await?;
//!     println!("{} bytes", bytes.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`download`] - Resource identifiers and payloads
//! - [`downloader`] - The [`Downloader`], its builder and configuration
//! - [`error`] - Centralized error handling with the `Error` enum
//! - [`http`] - The [`Transport`] seam and the HTTP session

mod dispatch;
pub mod download;
pub mod downloader;
pub mod error;
pub mod http;
mod registry;

pub use download::{DownloadResult, Payload, ResourceId};
pub use downloader::{
    CancelOnDrop, DownloadCallback, Downloader, DownloaderBuilder, SessionOptions,
};
pub use error::{Error, Result};
pub use http::{create_http_client, HttpClientConfig, HttpSession, Transport};
pub use registry::TaskState;
pub use tokio_util::sync::CancellationToken;
