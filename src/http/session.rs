//! Transport sessions.
//!
//! A [`Transport`] performs one outbound fetch per call and reports exactly
//! one outcome. The downloader hands it a [`CancellationToken`] acting as the
//! abort handle for the transfer; transports should stop promptly once it
//! fires, though the downloader does not depend on it to resolve the fetch.
//!
//! [`HttpSession`] is the reqwest-backed implementation.

use super::client::{create_http_client, HttpClientConfig};
use crate::download::payload::temp_file;
use crate::download::{Payload, ResourceId};
use crate::downloader::config::SessionOptions;
use crate::error::{Error, Result};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest_middleware::ClientWithMiddleware;
use std::fmt;
use std::path::PathBuf;
use tokio::{fs, io::AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Outbound fetch of a single resource.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `resource` and materialize it locally.
    ///
    /// `abort` is cancelled when the download is cancelled.
    async fn fetch(&self, resource: &ResourceId, abort: CancellationToken) -> Result<Payload>;
}

/// HTTP(S) transport over an ephemeral connection pool.
#[derive(Clone)]
pub struct HttpSession {
    client: ClientWithMiddleware,
    session: SessionOptions,
    directory: Option<PathBuf>,
}

impl fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSession")
            .field("session", &self.session)
            .field("directory", &self.directory)
            .finish()
    }
}

impl HttpSession {
    /// Creates a session from a client configuration.
    ///
    /// Payloads are written to `directory`, or the system temporary directory.
    pub fn new(config: HttpClientConfig, directory: Option<PathBuf>) -> Result<Self> {
        let session = config.session;
        let client = create_http_client(config)?;
        Ok(Self {
            client,
            session,
            directory,
        })
    }

    /// Gets the session options the pool was built with.
    pub fn options(&self) -> SessionOptions {
        self.session
    }

    async fn fetch_inner(&self, resource: &ResourceId) -> Result<Payload> {
        match resource.scheme() {
            "http" | "https" => (),
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        }

        debug!("Fetching {}", resource);
        let res = self.client.get(resource.url().clone()).send().await?;
        let res = res.error_for_status()?;
        let expected = res.content_length();

        let extension = resource.extension();
        let (file, path) = temp_file(self.directory.as_deref(), extension.as_deref())
            .await?
            .into_parts();
        let mut file = fs::File::from_std(file);

        let mut received: u64 = 0;
        let mut stream = res.bytes_stream();
        while let Some(item) = stream.next().await {
            let mut chunk = item?;
            received += chunk.len() as u64;
            file.write_all_buf(&mut chunk).await?;
        }
        file.flush().await?;

        if let Some(expected) = expected {
            if received < expected {
                return Err(Error::Truncated { expected, received });
            }
        }

        debug!("Fetched {} ({} bytes) into {:?}", resource, received, &*path);
        Ok(Payload::new(path, received))
    }
}

#[async_trait]
impl Transport for HttpSession {
    async fn fetch(&self, resource: &ResourceId, abort: CancellationToken) -> Result<Payload> {
        // Dropping the in-progress fetch closes the connection and removes the
        // partially written temp file.
        tokio::select! {
            biased;
            _ = abort.cancelled() => Err(Error::Cancelled),
            res = self.fetch_inner(resource) => res,
        }
    }
}
