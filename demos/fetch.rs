//! Example fetching one image from several places at once.
//!
//! Run with `RUST_LOG=ferry=debug cargo run --example fetch [URL]`.

use color_eyre::Result;
use ferry::DownloaderBuilder;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const DEFAULT_IMAGE: &str =
    "https://www.nasa.gov/sites/default/files/styles/1600x1200_autoletterbox/public/pia17474_1.jpg";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_IMAGE.to_string());

    // The "screen" owns the downloader; leaving scope cancels what is left.
    let screen = DownloaderBuilder::new()
        .allow_metered_network(false)
        .enable_response_cache(false)
        .timeout(Duration::from_secs(60))
        .build()?
        .cancel_on_drop();

    let viewers = 3;
    let (tx, mut rx) = mpsc::unbounded_channel();
    for viewer in 0..viewers {
        let tx = tx.clone();
        screen.download(&url, move |result| {
            let _ = tx.send((viewer, result));
        });
    }
    drop(tx);
    println!(
        "{} viewer(s) waiting on {} transfer(s)",
        viewers,
        screen.active_downloads()
    );

    while let Some((viewer, result)) = rx.recv().await {
        match result {
            Some(payload) => {
                let bytes = payload.bytes().await?;
                println!("[viewer {}] image: {} bytes", viewer, bytes.len());
            }
            None => println!("[viewer {}] no image", viewer),
        }
    }

    Ok(())
}
