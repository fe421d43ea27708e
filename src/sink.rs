//! Artifact delivery sinks
//!
//! A sink hands a fully downloaded artifact to its final destination. The
//! client holds a ranked chain of sinks and delivers through the first one
//! that reports itself available at call time; there is no fallback to the
//! next sink once one has been selected. The built-in [`FileSink`] saves
//! artifacts into a directory, and custom sinks (share dialogs, media
//! libraries, object stores) plug in through the [`ArtifactSink`] trait.

use crate::client::DownloadRecord;
use crate::error::SinkError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Trait for artifact delivery targets
///
/// Implementations report availability synchronously and deliver
/// asynchronously. A delivery either succeeds with an optional locator (a
/// path, URL, or other handle the caller can show the user), is declined by
/// the user ([`SinkError::Cancelled`]), or fails ([`SinkError::Failed`]).
/// The download engine never retries a failed delivery.
///
/// # Examples
///
/// ```no_run
/// use beatsync_client::{ArtifactSink, DownloadRecord, SinkError};
///
/// struct LogSink;
///
/// #[async_trait::async_trait]
/// impl ArtifactSink for LogSink {
///     fn name(&self) -> &'static str {
///         "log"
///     }
///
///     fn is_available(&self) -> bool {
///         true
///     }
///
///     async fn deliver(
///         &self,
///         record: &DownloadRecord,
///     ) -> Result<Option<String>, SinkError> {
///         println!("{} ({} bytes)", record.filename, record.payload.len());
///         Ok(None)
///     }
/// }
/// ```
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Short sink name used in logs and events
    fn name(&self) -> &'static str;

    /// Whether this sink can currently accept a payload
    fn is_available(&self) -> bool;

    /// Deliver the record, returning an optional locator for the result
    async fn deliver(&self, record: &DownloadRecord) -> Result<Option<String>, SinkError>;
}

/// First available sink in a ranked chain, highest priority first
pub(crate) fn first_available(
    sinks: &[Arc<dyn ArtifactSink>],
) -> Option<Arc<dyn ArtifactSink>> {
    sinks.iter().find(|sink| sink.is_available()).cloned()
}

/// Sink that saves artifacts into a local directory
///
/// The directory is created on first delivery if it does not exist. The
/// locator returned on success is the path of the written file.
#[derive(Clone, Debug)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Create a sink saving into `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory this sink saves into
    #[must_use]
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn failed(&self, reason: String) -> SinkError {
        SinkError::Failed {
            name: "file".to_string(),
            reason,
        }
    }
}

#[async_trait]
impl ArtifactSink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn deliver(&self, record: &DownloadRecord) -> Result<Option<String>, SinkError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| self.failed(format!("create {}: {e}", self.dir.display())))?;

        let path = self.dir.join(&record.filename);
        tokio::fs::write(&path, &record.payload)
            .await
            .map_err(|e| self.failed(format!("write {}: {e}", path.display())))?;

        tracing::debug!(
            path = %path.display(),
            bytes = record.payload.len(),
            "artifact saved to disk"
        );
        Ok(Some(path.display().to_string()))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::Utc;

    fn record(filename: &str, payload: &'static [u8]) -> DownloadRecord {
        DownloadRecord {
            version: "modular".to_string(),
            payload: Bytes::from_static(payload),
            filename: filename.to_string(),
            locator: None,
            cached_at: Utc::now(),
        }
    }

    struct FixedSink {
        sink_name: &'static str,
        available: bool,
    }

    #[async_trait]
    impl ArtifactSink for FixedSink {
        fn name(&self) -> &'static str {
            self.sink_name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn deliver(&self, _record: &DownloadRecord) -> Result<Option<String>, SinkError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn file_sink_writes_the_payload_and_returns_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());

        let locator = sink
            .deliver(&record("beatsync_t1_modular.mp4", b"video bytes"))
            .await
            .unwrap()
            .unwrap();

        let expected = dir.path().join("beatsync_t1_modular.mp4");
        assert_eq!(locator, expected.display().to_string());
        assert_eq!(std::fs::read(&expected).unwrap(), b"video bytes");
    }

    #[tokio::test]
    async fn file_sink_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("artifacts").join("today");
        let sink = FileSink::new(&nested);

        sink.deliver(&record("clip.mp4", b"x")).await.unwrap();

        assert!(nested.join("clip.mp4").is_file());
    }

    #[tokio::test]
    async fn file_sink_reports_write_failures() {
        let dir = tempfile::tempdir().unwrap();
        // Point the sink at a path that already exists as a regular file.
        let blocked = dir.path().join("occupied");
        std::fs::write(&blocked, b"not a directory").unwrap();
        let sink = FileSink::new(&blocked);

        let err = sink.deliver(&record("clip.mp4", b"x")).await.unwrap_err();
        match err {
            SinkError::Failed { name, .. } => assert_eq!(name, "file"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn chain_resolution_picks_the_first_available_sink() {
        let sinks: Vec<Arc<dyn ArtifactSink>> = vec![
            Arc::new(FixedSink {
                sink_name: "share",
                available: false,
            }),
            Arc::new(FixedSink {
                sink_name: "gallery",
                available: true,
            }),
            Arc::new(FixedSink {
                sink_name: "file",
                available: true,
            }),
        ];

        let selected = first_available(&sinks).unwrap();
        assert_eq!(selected.name(), "gallery");
    }

    #[test]
    fn chain_resolution_returns_none_when_nothing_is_available() {
        let sinks: Vec<Arc<dyn ArtifactSink>> = vec![Arc::new(FixedSink {
            sink_name: "share",
            available: false,
        })];
        assert!(first_available(&sinks).is_none());

        let empty: Vec<Arc<dyn ArtifactSink>> = Vec::new();
        assert!(first_available(&empty).is_none());
    }
}
