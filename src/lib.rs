//! # beatsync-client
//!
//! Client library for the BeatSync dance-video processing service.
//!
//! ## Design Philosophy
//!
//! beatsync-client is designed to be:
//! - **Highly configurable** - every timeout, retry budget, and poll cadence can be tuned
//! - **Sensible defaults** - works out of the box against a local service
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - consumers subscribe to events for progress and status
//!
//! ## Quick Start
//!
//! ```no_run
//! use beatsync_client::{Config, Outcome, TransferClient};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new("http://localhost:8000");
//!     let client = TransferClient::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = client.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let outcome = client
//!         .transfer(Path::new("dance.mp4"), Path::new("bgm.mp4"), |snapshot| {
//!             println!("status: {:?}", snapshot.status);
//!         })
//!         .await?;
//!
//!     if let Outcome::Succeeded { artifacts } = outcome {
//!         let task_id = client.task_id().expect("set after submission");
//!         for artifact in artifacts {
//!             client.download_artifact(&task_id, &artifact.version).await?;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Core transfer client implementation (decomposed into focused submodules)
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Artifact delivery sinks
pub mod sink;
/// Core types and events
pub mod types;
/// Utility functions
pub mod util;

mod wire;

// Re-export commonly used types
pub use client::{DownloadRecord, TransferClient};
pub use config::{Config, DownloadConfig, HealthConfig, JobConfig, UploadConfig};
pub use error::{DownloadError, Error, PollError, Result, SinkError, SubmitError, UploadError};
pub use sink::{ArtifactSink, FileSink};
pub use types::{
    ArtifactVersion, DownloadOutcome, Event, FileId, FileKind, JobStatus, Outcome, StatusSnapshot,
    TaskId, TaskPhase, UploadReceipt,
};
