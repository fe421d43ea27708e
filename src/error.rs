//! Error types for beatsync-client
//!
//! This module provides the error taxonomy for the library:
//! - A top-level [`Error`] with `#[from]` conversions from every stage
//! - Stage-specific error types ([`UploadError`], [`SubmitError`],
//!   [`PollError`], [`DownloadError`], [`SinkError`])
//! - Classification helpers the retry/poll machinery relies on
//!   ([`PollError::is_fatal`], [`DownloadError::is_interruption`])
//!
//! Cancellation is deliberately modelled as [`DownloadError::Cancelled`]
//! internally but is mapped to [`crate::types::DownloadOutcome::Cancelled`]
//! before it reaches the public API; callers never see a user-initiated
//! cancel as an `Err`.

use crate::types::TaskId;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for beatsync-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for beatsync-client
///
/// This is the primary error type used throughout the library. Each variant
/// includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// Upload stage error
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    /// Job submission error
    #[error("submission error: {0}")]
    Submit(#[from] SubmitError),

    /// Status polling error
    #[error("poll error: {0}")]
    Poll(#[from] PollError),

    /// Artifact download error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// I/O error (local file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error outside any specific stage (e.g., HTTP client construction)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Upload stage errors
///
/// Local validation failures ([`UnsupportedFormat`](UploadError::UnsupportedFormat),
/// [`TooLarge`](UploadError::TooLarge)) are raised before any network I/O.
#[derive(Debug, Error)]
pub enum UploadError {
    /// File extension is not on the allow-list
    #[error("unsupported file format \"{extension}\" (allowed: {allowed})")]
    UnsupportedFormat {
        /// The rejected extension, lower-cased, without the leading dot
        extension: String,
        /// Comma-separated list of accepted extensions
        allowed: String,
    },

    /// File exceeds the configured size ceiling
    #[error("file is {size_bytes} bytes, exceeding the {limit_bytes} byte limit")]
    TooLarge {
        /// Actual file size in bytes
        size_bytes: u64,
        /// Configured ceiling in bytes
        limit_bytes: u64,
    },

    /// The pre-upload health probe never got a healthy answer
    #[error("service is not responding after {attempts} health checks; verify it is running and retry")]
    ServiceUnavailable {
        /// Number of probe attempts made before giving up
        attempts: u32,
    },

    /// The upload request exceeded its size-scaled deadline
    #[error("upload timed out after {limit:?}")]
    Timeout {
        /// The deadline that was exceeded
        limit: Duration,
    },

    /// The upload endpoint could not be reached
    #[error("could not reach upload endpoint: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The server refused the upload
    #[error("server rejected upload ({status}): {message}")]
    Rejected {
        /// HTTP status code of the rejection
        status: u16,
        /// Server-provided message, or a generic fallback
        message: String,
    },

    /// The server answered 2xx but the body was not a valid upload receipt
    #[error("unexpected upload response: {0}")]
    InvalidResponse(String),
}

/// Job submission errors
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The server accepted the submission but returned no task identifier
    #[error("submission response did not include a task id")]
    MissingTaskId,

    /// The submission request exceeded its fixed deadline
    #[error("submission timed out after {limit:?}")]
    Timeout {
        /// The deadline that was exceeded
        limit: Duration,
    },

    /// The processing endpoint could not be reached
    #[error("could not reach processing endpoint: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The server refused the submission
    #[error("server rejected submission ({status}): {message}")]
    Rejected {
        /// HTTP status code of the rejection
        status: u16,
        /// Server-provided message, or a generic fallback
        message: String,
    },

    /// The server answered 2xx but the body was not a valid submission receipt
    #[error("unexpected submission response: {0}")]
    InvalidResponse(String),
}

/// Status polling errors
///
/// Only [`TaskNotFound`](PollError::TaskNotFound) aborts the poll loop; every
/// other variant is transient, logged, and swallowed while the loop keeps
/// consuming attempts from its fixed ceiling.
#[derive(Debug, Error)]
pub enum PollError {
    /// The service does not know the task (HTTP 404) - immediately fatal
    #[error("task {task_id} is unknown to the service")]
    TaskNotFound {
        /// The task identifier the service rejected
        task_id: TaskId,
    },

    /// The status endpoint answered with a non-2xx status other than 404
    #[error("status endpoint returned HTTP {status}")]
    Status {
        /// HTTP status code of the failed poll
        status: u16,
    },

    /// The status request failed at the transport level (timeout, connect, ...)
    #[error("status request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The status body could not be parsed
    #[error("malformed status payload: {0}")]
    InvalidBody(String),
}

impl PollError {
    /// Whether this poll failure must abort the loop immediately
    ///
    /// Everything except an unknown task is treated as transient.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, PollError::TaskNotFound { .. })
    }
}

/// Artifact download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The body stream failed mid-transfer; the engine restarts from byte zero
    #[error("artifact stream interrupted: {reason}")]
    Interrupted {
        /// Transport-level description of the failure
        reason: String,
    },

    /// Every permitted restart was consumed without a complete body
    #[error("download failed after {attempts} attempts: {reason}")]
    RetriesExhausted {
        /// Total fetch attempts made (initial try plus retries)
        attempts: u32,
        /// Description of the final interruption
        reason: String,
    },

    /// The server refused the download request
    #[error("server rejected download ({status}): {message}")]
    Server {
        /// HTTP status code of the rejection
        status: u16,
        /// Server-provided message, or a generic fallback
        message: String,
    },

    /// The user reset the client while the transfer was in flight
    ///
    /// Never surfaced from the public download methods; mapped to
    /// [`crate::types::DownloadOutcome::Cancelled`] instead.
    #[error("download cancelled")]
    Cancelled,

    /// No sink in the configured chain reported itself available
    #[error("no delivery sink is available")]
    NoSink,

    /// The selected sink failed to deliver the payload
    #[error("delivery failed: {0}")]
    Sink(#[from] SinkError),
}

impl DownloadError {
    /// Whether the engine may discard received bytes and restart from zero
    ///
    /// Only mid-stream transport interruptions are restartable; HTTP
    /// rejections, sink failures, and cancellation are not.
    #[must_use]
    pub fn is_interruption(&self) -> bool {
        matches!(self, DownloadError::Interrupted { .. })
    }
}

/// Delivery sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// The user declined the delivery (e.g., dismissed a share dialog)
    ///
    /// Distinguished from [`Failed`](SinkError::Failed) because a declined
    /// delivery keeps the cache entry while a failed one invalidates it.
    #[error("delivery cancelled by user")]
    Cancelled,

    /// The sink attempted delivery and failed
    #[error("sink \"{name}\" failed: {reason}")]
    Failed {
        /// Name of the sink that failed
        name: String,
        /// Description of the failure
        reason: String,
    },
}
