//! Completion delivery.
//!
//! Results are handed to callbacks on one dedicated tokio task, never on the
//! caller's stack and never on the task that ran the fetch. Deliveries are
//! therefore serialized: two callbacks never run at the same time, and the
//! callbacks of one resource run in registration order. A panicking callback
//! is logged and does not prevent the remaining ones from running.
//!
//! Callbacks share that single context, so they should hand long work off
//! rather than block it.

use crate::download::DownloadResult;
use crate::downloader::config::DownloadCallback;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

struct Delivery {
    label: String,
    callbacks: Vec<DownloadCallback>,
    result: DownloadResult,
}

impl Delivery {
    /// Run every callback in order. Returns how many panicked.
    fn run(self) -> usize {
        let Delivery {
            label,
            callbacks,
            result,
        } = self;
        let mut panicked = 0;

        for (index, callback) in callbacks.into_iter().enumerate() {
            let result = result.clone();
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || callback(result))) {
                panicked += 1;
                error!(
                    "Callback #{} for {} panicked: {}",
                    index,
                    label,
                    panic_message(payload.as_ref())
                );
            }
        }

        panicked
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Sender side of the delivery context.
#[derive(Debug, Clone)]
pub(crate) struct Dispatcher {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl Dispatcher {
    /// Start the delivery task on `runtime`.
    ///
    /// The task exits once every `Dispatcher` clone is dropped and the queue
    /// is drained.
    pub(crate) fn spawn(runtime: &Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run(rx));
        Self { tx }
    }

    /// Queue `callbacks` to receive `result`, in order.
    pub(crate) fn deliver(
        &self,
        label: impl Into<String>,
        callbacks: Vec<DownloadCallback>,
        result: DownloadResult,
    ) {
        if callbacks.is_empty() {
            return;
        }

        let delivery = Delivery {
            label: label.into(),
            callbacks,
            result,
        };
        if let Err(mpsc::error::SendError(delivery)) = self.tx.send(delivery) {
            warn!(
                "Delivery context stopped, dropping {} callback(s) for {}",
                delivery.callbacks.len(),
                delivery.label
            );
        }
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("label", &self.label)
            .field("callbacks", &self.callbacks.len())
            .field("result", &self.result)
            .finish()
    }
}

async fn run(mut rx: mpsc::UnboundedReceiver<Delivery>) {
    while let Some(delivery) = rx.recv().await {
        let label = delivery.label.clone();
        let count = delivery.callbacks.len();
        let panicked = delivery.run();
        debug!(
            "Delivered {} to {} callback(s), {} panicked",
            label, count, panicked
        );
    }
    debug!("Delivery context stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_delivers_in_order_despite_panics() {
        let dispatcher = Dispatcher::spawn(&Handle::current());
        let log = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = oneshot::channel();

        let mut callbacks: Vec<DownloadCallback> = Vec::new();
        for n in 0..2 {
            let log = Arc::clone(&log);
            callbacks.push(Box::new(move |_| log.lock().push(n)));
        }
        callbacks.push(Box::new(|_| panic!("callback failure")));
        {
            let log = Arc::clone(&log);
            callbacks.push(Box::new(move |result: DownloadResult| {
                log.lock().push(3);
                let _ = done_tx.send(result.is_none());
            }));
        }

        dispatcher.deliver("https://example.com/a", callbacks, None);

        assert!(done_rx.await.unwrap());
        assert_eq!(*log.lock(), vec![0, 1, 3]);
    }

    #[tokio::test]
    async fn test_not_run_on_caller_stack() {
        let dispatcher = Dispatcher::spawn(&Handle::current());
        let ran = Arc::new(Mutex::new(false));
        let (tx, rx) = oneshot::channel();

        let flag = Arc::clone(&ran);
        let callback: DownloadCallback = Box::new(move |_| {
            *flag.lock() = true;
            let _ = tx.send(());
        });
        dispatcher.deliver("x", vec![callback], None);

        assert!(!*ran.lock());
        rx.await.unwrap();
        assert!(*ran.lock());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_deliveries_never_overlap() {
        let dispatcher = Dispatcher::spawn(&Handle::current());
        let running = Arc::new(Mutex::new(0usize));
        let max_seen = Arc::new(Mutex::new(0usize));
        let (tx, mut rx) = mpsc::unbounded_channel();

        for i in 0..20 {
            let running = Arc::clone(&running);
            let max_seen = Arc::clone(&max_seen);
            let tx = tx.clone();
            let callback: DownloadCallback = Box::new(move |_| {
                {
                    let mut r = running.lock();
                    *r += 1;
                    let mut m = max_seen.lock();
                    *m = (*m).max(*r);
                }
                *running.lock() -= 1;
                let _ = tx.send(());
            });
            dispatcher.deliver(format!("r{}", i), vec![callback], None);
        }

        for _ in 0..20 {
            rx.recv().await.unwrap();
        }
        assert_eq!(*max_seen.lock(), 1);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
