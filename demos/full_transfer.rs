//! Full transfer example
//!
//! This example demonstrates the core functionality of beatsync-client:
//! - Building a configuration
//! - Creating a client instance
//! - Subscribing to events
//! - Running a dance/bgm transfer to completion
//! - Downloading every successful artifact version
//!
//! Usage:
//!
//! ```bash
//! cargo run --example full_transfer -- dance.mp4 bgm.mp4 [http://localhost:8000]
//! ```

use beatsync_client::{Config, Event, Outcome, TransferClient};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let dance = args.next().unwrap_or_else(|| "dance.mp4".to_string());
    let bgm = args.next().unwrap_or_else(|| "bgm.mp4".to_string());
    let base_url = args
        .next()
        .unwrap_or_else(|| "http://localhost:8000".to_string());

    // Build configuration
    let mut config = Config::new(&base_url);
    config.download.save_dir = "downloads".into();

    // Create client instance
    let client = TransferClient::new(config)?;

    // Subscribe to events
    let mut events = client.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::UploadStarted {
                    kind,
                    filename,
                    size_bytes,
                } => {
                    println!("⬆ Uploading {kind} file {filename} ({size_bytes} bytes)");
                }
                Event::UploadProgress { kind, percent, .. } => {
                    println!("⬆ Upload {kind}: {percent:.0}%");
                }
                Event::UploadComplete { kind, file_id, .. } => {
                    println!("✓ Uploaded {kind} as {file_id}");
                }
                Event::TaskSubmitted { task_id } => {
                    println!("✓ Submitted task {task_id}");
                }
                Event::StatusText { text } => {
                    println!("⏳ {text}");
                }
                Event::DownloadStarted {
                    version, filename, ..
                } => {
                    println!("⬇ Downloading {version} as {filename}");
                }
                Event::DownloadProgress {
                    version, percent, ..
                } => {
                    println!("⬇ Download {version}: {percent}%");
                }
                Event::DownloadRetrying {
                    version,
                    attempt,
                    max_retries,
                    ..
                } => {
                    println!("↻ Restarting {version} (attempt {attempt}/{max_retries})");
                }
                Event::DownloadDelivered {
                    version, locator, ..
                } => {
                    println!("✓ Delivered {version}: {locator:?}");
                }
                Event::TaskFinished { task_id, outcome } => {
                    println!("✓ Task {task_id} finished: {outcome:?}");
                }
                _ => {}
            }
        }
    });

    // Run the transfer to a terminal outcome
    let outcome = client
        .transfer(Path::new(&dance), Path::new(&bgm), |_| {})
        .await?;

    match outcome {
        Outcome::Succeeded { artifacts } => {
            let task_id = client.task_id().expect("task id is set after submission");
            for artifact in artifacts {
                client.download_artifact(&task_id, &artifact.version).await?;
            }
            println!("All artifacts saved to ./downloads");
        }
        Outcome::Failed { reason } => {
            println!("✗ Processing failed: {reason}");
        }
        Outcome::TimedOut { attempts } => {
            println!("✗ Gave up after {attempts} status polls");
        }
        Outcome::Cancelled => {
            println!("✗ Transfer was cancelled");
        }
    }

    Ok(())
}
