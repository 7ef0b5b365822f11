//! Cancel-on-teardown guard.

use super::downloader::Downloader;

use std::ops::Deref;

/// Owns a [`Downloader`] and calls [`Downloader::cancel_all`] when dropped.
///
/// Only work registered at drop time is cancelled. Other clones of the
/// downloader stay usable.
///
/// ```rust
/// use ferry::DownloaderBuilder;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), ferry::Error> {
/// let screen = DownloaderBuilder::new().build()?.cancel_on_drop();
/// screen.download("https://example.com/a.png", |_| {});
/// drop(screen); // the fetch for a.png is aborted
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CancelOnDrop {
    downloader: Downloader,
    armed: bool,
}

impl CancelOnDrop {
    pub(crate) fn new(downloader: Downloader) -> Self {
        Self {
            downloader,
            armed: true,
        }
    }

    /// Release the downloader without cancelling anything.
    pub fn into_inner(mut self) -> Downloader {
        self.armed = false;
        self.downloader.clone()
    }
}

impl Deref for CancelOnDrop {
    type Target = Downloader;

    fn deref(&self) -> &Downloader {
        &self.downloader
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.downloader.cancel_all();
        }
    }
}
