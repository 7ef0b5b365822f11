//! Core downloader implementation.
//!
//! The [`Downloader`] ties the task registry, a [`Transport`] and the
//! completion dispatcher together. A request for a resource that is already
//! being fetched joins the existing fetch instead of starting a new one, so
//! there is at most one transport fetch per resource at any time.
//!
//! # Examples
//!
//! ```rust,no_run
//! use ferry::{Downloader, SessionOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), ferry::Error> {
//! let downloader = Downloader::configure(SessionOptions::default())?;
//!
//! downloader.download("https://example.com/image.jpg", |result| match result {
//!     Some(payload) => println!("{} bytes at {:?}", payload.len(), payload.path()),
//!     None => println!("no image"),
//! });
//!
//! // Later, when the owner goes away:
//! downloader.cancel_all();
//! # Ok(())
//! # }
//! ```

use super::config::{DownloadCallback, DownloaderConfig, SessionOptions};
use super::guard::CancelOnDrop;
use crate::dispatch::Dispatcher;
use crate::download::{DownloadResult, Payload, ResourceId};
use crate::error::{Error, Result};
use crate::http::{HttpSession, Transport};
use crate::registry::{Registration, TaskRegistry, TaskState};

use futures::FutureExt;
use std::convert::TryFrom;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct Inner {
    config: DownloaderConfig,
    registry: TaskRegistry,
    transport: Arc<dyn Transport>,
    dispatcher: Dispatcher,
    runtime: Handle,
}

/// Represents the download controller.
///
/// Cloning is cheap and every clone drives the same registry. Dropping the
/// downloader does not cancel anything: the owner calls [`cancel_all`] on
/// teardown, or wraps the downloader with [`cancel_on_drop`].
///
/// [`cancel_all`]: Downloader::cancel_all
/// [`cancel_on_drop`]: Downloader::cancel_on_drop
#[derive(Clone)]
pub struct Downloader {
    inner: Arc<Inner>,
}

impl fmt::Debug for Downloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Downloader")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .finish()
    }
}

impl Downloader {
    /// Creates a new Downloader with the given configuration.
    pub(crate) fn new(mut config: DownloaderConfig) -> Result<Self> {
        let runtime = match config.runtime.take() {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| Error::NoRuntime)?,
        };

        let transport: Arc<dyn Transport> = match config.transport {
            Some(ref transport) => Arc::clone(transport),
            None => Arc::new(HttpSession::new(
                config.http_client_config(),
                config.directory.clone(),
            )?),
        };

        debug!("Creating downloader with {:?}", config.session);
        let dispatcher = Dispatcher::spawn(&runtime);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                registry: TaskRegistry::new(),
                transport,
                dispatcher,
                runtime,
            }),
        })
    }

    /// Creates a downloader with default settings and the given session options.
    ///
    /// Must be called from within a tokio runtime.
    pub fn configure(options: SessionOptions) -> Result<Self> {
        super::DownloaderBuilder::new().configure(options).build()
    }

    /// Gets the session options.
    pub fn session(&self) -> SessionOptions {
        self.inner.config.session
    }

    /// Gets the directory where payloads are materialized.
    pub fn directory(&self) -> Option<&Path> {
        self.inner.config.directory.as_deref()
    }

    /// Request `locator` and deliver the outcome to `callback`.
    ///
    /// Never blocks and never runs `callback` before returning. If the
    /// resource is already being fetched, the callback joins that fetch. A
    /// malformed locator resolves to `None` without touching the network.
    /// Scheme support belongs to the transport: a well-formed locator with a
    /// scheme the transport cannot serve (`ftp://` for [`HttpSession`]) is
    /// registered and resolves to `None` once the transport rejects it.
    pub fn download<F>(&self, locator: &str, callback: F)
    where
        F: FnOnce(DownloadResult) + Send + 'static,
    {
        match ResourceId::try_from(locator) {
            Ok(resource) => self.download_resource(resource, callback),
            Err(e) => {
                warn!("Rejecting download: {}", e);
                let callback: DownloadCallback = Box::new(callback);
                self.inner.dispatcher.deliver(locator, vec![callback], None);
            }
        }
    }

    /// Same as [`download`](Self::download), for an already parsed identifier.
    pub fn download_resource<F>(&self, resource: ResourceId, callback: F)
    where
        F: FnOnce(DownloadResult) + Send + 'static,
    {
        let callback: DownloadCallback = Box::new(callback);
        match self.inner.registry.register_or_join(&resource, callback) {
            Registration::New { abort } => {
                debug!("Starting fetch for {}", resource);
                self.spawn_fetch(resource, abort);
            }
            Registration::Joined { waiters } => {
                debug!("Joined fetch for {} ({} waiting)", resource, waiters);
            }
        }
    }

    /// Request `locator` and wait for the outcome.
    pub async fn download_async(&self, locator: &str) -> DownloadResult {
        let (tx, rx) = oneshot::channel();
        self.download(locator, move |result| {
            let _ = tx.send(result);
        });
        rx.await.ok().flatten()
    }

    fn spawn_fetch(&self, resource: ResourceId, abort: CancellationToken) {
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            let outcome = inner.fetch(&resource, abort).await;
            let completion = inner.registry.complete(&resource, &outcome);
            if let Err(ref e) = outcome {
                if completion.state == TaskState::Cancelled {
                    debug!("Fetch for {} cancelled", resource);
                } else {
                    warn!("Fetch for {} failed: {}", resource, e);
                }
            }

            inner
                .dispatcher
                .deliver(resource.as_str(), completion.callbacks, outcome.ok());
        });
    }

    /// Abort every fetch registered at the time of the call.
    ///
    /// Returns immediately. Each affected callback later receives `None`.
    /// Downloads requested concurrently with this call may not be cancelled.
    pub fn cancel_all(&self) {
        let tasks = self.inner.registry.all_tasks();
        debug!("Cancelling {} task(s)", tasks.len());
        for task in tasks {
            debug!("Cancelling {} ({:?})", task.resource, task.state);
            task.abort();
        }
    }

    /// Abort the fetch for `locator`, if one is registered.
    pub fn cancel(&self, locator: &str) {
        let Ok(resource) = ResourceId::try_from(locator) else {
            return;
        };
        if let Some(task) = self.inner.registry.get(&resource) {
            debug!("Cancelling {} ({:?})", task.resource, task.state);
            task.abort();
        }
    }

    /// Number of resources currently being fetched.
    pub fn active_downloads(&self) -> usize {
        self.inner.registry.len()
    }

    /// Whether a fetch for `locator` is registered.
    pub fn is_downloading(&self, locator: &str) -> bool {
        self.task_state(locator).is_some()
    }

    /// State of the fetch for `locator`, if one is registered.
    pub fn task_state(&self, locator: &str) -> Option<TaskState> {
        let resource = ResourceId::try_from(locator).ok()?;
        self.inner.registry.get(&resource).map(|task| task.state)
    }

    /// Wrap the downloader so that dropping it cancels outstanding work.
    pub fn cancel_on_drop(self) -> CancelOnDrop {
        CancelOnDrop::new(self)
    }
}

impl Inner {
    /// Run the transport for `resource`, producing exactly one outcome.
    async fn fetch(&self, resource: &ResourceId, abort: CancellationToken) -> Result<Payload> {
        if !self.registry.mark_in_flight(resource) {
            warn!("Task for {} was not pending when its fetch started", resource);
        }

        let transfer = AssertUnwindSafe(self.transport.fetch(resource, abort.clone()))
            .catch_unwind()
            .map(|res| {
                res.unwrap_or_else(|_| Err(Error::Internal("transport panicked".into())))
            });

        tokio::select! {
            biased;
            _ = abort.cancelled() => Err(Error::Cancelled),
            res = transfer => res,
        }
    }
}
