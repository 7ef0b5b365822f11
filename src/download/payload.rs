//! Locally materialized download payloads.
//!
//! A [`Payload`] is a cheap, cloneable handle to a temporary file holding a
//! fetched body. Every callback waiting on the same resource receives a clone
//! of the same handle. The file is removed once the last clone is dropped, so
//! callers that need the data beyond that point must read it or copy it out.
//!
//! # Examples
//!
//! ```rust
//! use ferry::Payload;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), ferry::Error> {
//! let payload = Payload::write(None, b"hello", None).await?;
//! assert_eq!(payload.len(), 5);
//! assert_eq!(payload.bytes().await?, b"hello");
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tokio::{fs, io::AsyncWriteExt};

/// Outcome handed to download callbacks: a payload, or nothing.
pub type DownloadResult = Option<Payload>;

/// Handle to a fetched body stored in a temporary file.
#[derive(Clone)]
pub struct Payload {
    inner: Arc<Inner>,
}

struct Inner {
    path: TempPath,
    len: u64,
}

impl Payload {
    /// Wrap a temporary file that already holds `len` bytes.
    ///
    /// The payload takes ownership of the file: it is deleted when the last
    /// handle goes away.
    pub fn new(path: TempPath, len: u64) -> Self {
        Self {
            inner: Arc::new(Inner { path, len }),
        }
    }

    /// Materialize `bytes` into a new temporary file.
    ///
    /// The file is created in `directory`, or in the system temporary
    /// directory when `None`. An `extension` (without the dot) is used as the
    /// file suffix.
    pub async fn write(
        directory: Option<&Path>,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<Self> {
        let (file, path) = temp_file(directory, extension).await?.into_parts();
        let mut file = fs::File::from_std(file);
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(Self::new(path, bytes.len() as u64))
    }

    /// Location of the payload on disk.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Size of the payload in bytes.
    pub fn len(&self) -> u64 {
        self.inner.len
    }

    /// Whether the fetched body was empty.
    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Read the whole payload into memory.
    pub async fn bytes(&self) -> Result<Vec<u8>> {
        Ok(fs::read(self.path()).await?)
    }

    /// Copy the payload to `destination`, creating parent directories.
    ///
    /// The copy outlives the payload.
    pub async fn copy_to(&self, destination: &Path) -> Result<PathBuf> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(self.path(), destination).await?;
        Ok(destination.to_path_buf())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("path", &self.path())
            .field("len", &self.inner.len)
            .finish()
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Payload {}

/// Longest extension kept as a temp-file suffix.
const MAX_SUFFIX_LEN: usize = 16;

/// Suffix for a payload file, or `None` when `extension` is not a short
/// ASCII alphanumeric string.
fn suffix_for(extension: Option<&str>) -> Option<String> {
    extension
        .filter(|ext| !ext.is_empty() && ext.len() <= MAX_SUFFIX_LEN)
        .filter(|ext| ext.bytes().all(|b| b.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
}

/// Create a named temporary file for a payload on the blocking pool.
pub(crate) async fn temp_file(
    directory: Option<&Path>,
    extension: Option<&str>,
) -> Result<tempfile::NamedTempFile> {
    let directory = directory.map(Path::to_path_buf);
    let suffix = suffix_for(extension).unwrap_or_default();

    tokio::task::spawn_blocking(move || -> Result<tempfile::NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("ferry-").suffix(&suffix);
        let file = match directory {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file)
    })
    .await
    .map_err(|e| Error::Internal(format!("temp file task failed: {}", e)))?
}
