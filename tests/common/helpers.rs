#![allow(dead_code)]

use async_trait::async_trait;
use ferry::{
    CancellationToken, DownloadResult, Downloader, DownloaderBuilder, Error, Payload,
    ResourceId, Result, Transport,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Semaphore};

// Common test constants
pub const RESOURCE_A: &str = "https://example.com/images/a.jpg";
pub const RESOURCE_B: &str = "https://example.com/images/b.jpg";
pub const RESOURCE_C: &str = "https://example.com/images/c.jpg";
pub const WAIT: Duration = Duration::from_secs(5);
pub const QUIET: Duration = Duration::from_millis(100);

/// Installs a test subscriber once; set `RUST_LOG=ferry=debug` to see logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// === Scripted transport ===

/// Transport whose fetches block until released by the test.
///
/// It ignores its abort token on purpose: cancellation must work even with
/// a transport that never looks at it.
pub struct ScriptedTransport {
    gate: Semaphore,
    fetches: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
}

impl ScriptedTransport {
    /// Every fetch waits for [`release`](Self::release).
    pub fn gated() -> Arc<Self> {
        Arc::new(Self::with_permits(0))
    }

    /// Fetches complete as soon as they start.
    pub fn open() -> Arc<Self> {
        Arc::new(Self::with_permits(Semaphore::MAX_PERMITS))
    }

    fn with_permits(permits: usize) -> Self {
        Self {
            gate: Semaphore::new(permits),
            fetches: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            panicking: Mutex::new(HashSet::new()),
        }
    }

    /// Let `n` blocked or future fetches finish.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Make fetches of `locator` fail.
    pub fn fail(&self, locator: &str) {
        self.failing.lock().unwrap().insert(normalized(locator));
    }

    /// Make fetches of `locator` panic.
    pub fn panic_on(&self, locator: &str) {
        self.panicking.lock().unwrap().insert(normalized(locator));
    }

    /// Locators fetched so far, in start order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn fetch_count_for(&self, locator: &str) -> usize {
        let locator = normalized(locator);
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|f| **f == locator)
            .count()
    }

    /// Wait until at least `n` fetches have started.
    pub async fn wait_for_fetches(&self, n: usize) {
        tokio::time::timeout(WAIT, async {
            while self.fetch_count() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Timed out waiting for fetches to start");
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, resource: &ResourceId, _abort: CancellationToken) -> Result<Payload> {
        self.fetches.lock().unwrap().push(resource.to_string());

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;
        permit.forget();

        if self.panicking.lock().unwrap().contains(resource.as_str()) {
            panic!("scripted panic for {}", resource);
        }
        if self.failing.lock().unwrap().contains(resource.as_str()) {
            return Err(Error::Internal(format!("scripted failure for {}", resource)));
        }
        Payload::write(None, resource.as_str().as_bytes(), resource.extension().as_deref()).await
    }
}

pub fn normalized(locator: &str) -> String {
    ResourceId::try_from(locator)
        .expect("Invalid test locator")
        .to_string()
}

// === Downloader helpers ===

/// Creates a downloader driven by `transport` on the current runtime.
pub fn downloader_with(transport: Arc<ScriptedTransport>) -> Downloader {
    init_tracing();
    DownloaderBuilder::new()
        .transport(transport)
        .build()
        .expect("Failed to build downloader")
}

// === Callback collection ===

/// Collects `(tag, result)` pairs from download callbacks.
pub struct Collector {
    tx: mpsc::UnboundedSender<(usize, DownloadResult)>,
    rx: mpsc::UnboundedReceiver<(usize, DownloadResult)>,
}

impl Collector {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// A callback reporting its result under `tag`.
    pub fn callback(&self, tag: usize) -> impl FnOnce(DownloadResult) + Send + 'static {
        let tx = self.tx.clone();
        move |result| {
            let _ = tx.send((tag, result));
        }
    }

    /// Next delivery, failing the test if none arrives in time.
    pub async fn next(&mut self) -> (usize, DownloadResult) {
        tokio::time::timeout(WAIT, self.rx.recv())
            .await
            .expect("Timed out waiting for a delivery")
            .expect("Collector channel closed")
    }

    /// Exactly `n` deliveries, in arrival order.
    pub async fn take(&mut self, n: usize) -> Vec<(usize, DownloadResult)> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.next().await);
        }
        out
    }

    /// Asserts nothing else is delivered for a short while.
    pub async fn assert_quiet(&mut self) {
        if let Ok(Some((tag, _))) = tokio::time::timeout(QUIET, self.rx.recv()).await {
            panic!("Unexpected extra delivery for callback {}", tag);
        }
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

// === Local HTTP server ===

pub const HELLO_BODY: &[u8] = b"hello ferry";

/// Minimal HTTP/1.1 server for session tests.
///
/// Routes:
/// - `/hello.jpg`, `/hello` and anything under `/files/` return [`HELLO_BODY`]
/// - `/short` advertises 100 bytes and sends 10
/// - `/stall` never answers
/// - anything else is a 404
///
/// Absolute-form targets (`GET http://host/path`) are routed by their path,
/// so the server also acts as a forward proxy.
pub struct TestServer {
    pub base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("No local address");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let log = Arc::clone(&log);
                tokio::spawn(handle_connection(socket, log));
            }
        });

        Self {
            base: format!("http://{}", addr),
            requests,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Lowercased request heads received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle_connection(mut socket: tokio::net::TcpStream, log: Arc<Mutex<Vec<String>>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let head = String::from_utf8_lossy(&buf).to_lowercase();
    let target = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");
    let path = match target.strip_prefix("http://") {
        Some(rest) => rest.find('/').map_or("/", |i| &rest[i..]).to_string(),
        None => target.to_string(),
    };
    log.lock().unwrap().push(head);

    let response: Vec<u8> = match path.as_str() {
        p if p == "/hello" || p == "/hello.jpg" || p.starts_with("/files/") => {
            let mut r = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                HELLO_BODY.len()
            )
            .into_bytes();
            r.extend_from_slice(HELLO_BODY);
            r
        }
        "/short" => {
            let mut r =
                b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\nconnection: close\r\n\r\n".to_vec();
            r.extend_from_slice(b"0123456789");
            r
        }
        "/stall" => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            return;
        }
        _ => b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".to_vec(),
    };

    let _ = socket.write_all(&response).await;
    let _ = socket.shutdown().await;
}
