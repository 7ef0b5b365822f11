//! Downloader module containing the coordinator, its builder, and configuration.
//!
//! - `downloader` - The [`Downloader`]: single-flight fetches and bulk cancellation
//! - `builder` - [`DownloaderBuilder`] for configuring a downloader
//! - `config` - Session options, configuration structure and callback type
//! - `guard` - [`CancelOnDrop`], cancelling outstanding work on teardown
//!
//! # Examples
//!
//! ```rust
//! use ferry::downloader::DownloaderBuilder;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = DownloaderBuilder::new().build()?;
//!
//! // Three requests, one fetch.
//! for _ in 0..3 {
//!     downloader.download("https://example.com/file.zip", |result| {
//!         println!("got something: {}", result.is_some());
//!     });
//! }
//! assert_eq!(downloader.active_downloads(), 1);
//! downloader.cancel_all();
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod downloader;
pub mod guard;

pub use builder::DownloaderBuilder;
pub use config::{DownloadCallback, DownloaderConfig, SessionOptions};
pub use downloader::Downloader;
pub use guard::CancelOnDrop;
