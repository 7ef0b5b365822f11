//! Download module containing the values that flow through a download.
//!
//! - [`resource`] - [`ResourceId`], the normalized locator used for deduplication
//! - [`payload`] - [`Payload`], the temp-file handle delivered to callbacks
//!
//! # Examples
//!
//! ```rust
//! use ferry::download::{DownloadResult, ResourceId};
//! use std::convert::TryFrom;
//!
//! let resource = ResourceId::try_from("https://example.com/file.zip")?;
//! let on_done = |result: DownloadResult| match result {
//!     Some(payload) => println!("{} bytes at {:?}", payload.len(), payload.path()),
//!     None => println!("nothing for {}", resource),
//! };
//! on_done(None);
//! # Ok::<(), ferry::Error>(())
//! ```

pub mod payload;
pub mod resource;

pub use payload::{DownloadResult, Payload};
pub use resource::ResourceId;
