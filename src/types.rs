//! Core types for beatsync-client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a processing task, assigned by the service
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an uploaded file, assigned by the service
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub String);

impl FileId {
    /// Create a new FileId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for FileId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for FileId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of an uploaded file within a processing job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// The dance (choreography) video
    Dance,
    /// The background-music video
    Bgm,
}

impl FileKind {
    /// Wire name of this file kind (the `file_type` form field)
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Dance => "dance",
            FileKind::Bgm => "bgm",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle phase of the client's current transfer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    /// No transfer started yet (or state was reset)
    #[default]
    Pending,
    /// At least one upload is in flight
    Uploading,
    /// Job submitted, poll loop not started yet
    Submitted,
    /// Poll loop running
    Polling,
    /// Task reached a successful terminal state
    Succeeded,
    /// Task reached a failed terminal state
    Failed,
    /// Poll loop exhausted its attempt ceiling
    TimedOut,
    /// User reset cancelled the transfer
    Cancelled,
}

impl TaskPhase {
    /// Whether this phase is terminal (success, failure, timeout, or reset)
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskPhase::Succeeded | TaskPhase::Failed | TaskPhase::TimedOut | TaskPhase::Cancelled
        )
    }
}

/// Processing status reported by the service, for the task overall and for
/// each artifact version
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Queued, not started
    Pending,
    /// Actively processing
    Processing,
    /// Finished successfully
    Success,
    /// Finished with an error
    Failed,
}

impl JobStatus {
    /// Map a wire status string onto the enum
    ///
    /// Unknown strings map to [`Processing`](JobStatus::Processing): a status
    /// the client does not recognize must never read as terminal, and the
    /// poll attempt ceiling still bounds the loop.
    #[must_use]
    pub fn from_wire(status: &str) -> Self {
        match status {
            "pending" | "queued" => JobStatus::Pending,
            "processing" => JobStatus::Processing,
            "success" | "completed" => JobStatus::Success,
            "failed" | "error" => JobStatus::Failed,
            _ => JobStatus::Processing,
        }
    }

    /// Whether this status is terminal
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

/// One artifact version named by a status payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactVersion {
    /// Version label (the service produces "modular" and "v2"; the set is open)
    pub version: String,

    /// Processing status of this version
    pub status: JobStatus,

    /// Opaque server-side output path, present once the version succeeded
    pub output: Option<String>,
}

/// One observed status of a task, as reported by a successful poll
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// The task this snapshot describes
    pub task_id: TaskId,

    /// Overall task status
    pub status: JobStatus,

    /// Human-readable status message from the service, if any
    pub message: Option<String>,

    /// Per-version statuses named by the payload (may be empty early on)
    pub versions: Vec<ArtifactVersion>,

    /// When the client received this snapshot
    pub polled_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// The versions that have reached a successful terminal state
    #[must_use]
    pub fn successful_versions(&self) -> Vec<ArtifactVersion> {
        self.versions
            .iter()
            .filter(|v| v.status == JobStatus::Success)
            .cloned()
            .collect()
    }

    /// Decide whether this snapshot ends the poll loop, and with what outcome
    ///
    /// The loop ends when the overall status is terminal, or when the payload
    /// names at least one version and every named version is terminal. In the
    /// latter case the task counts as succeeded if any version succeeded.
    #[must_use]
    pub fn terminal_outcome(&self) -> Option<Outcome> {
        match self.status {
            JobStatus::Success => Some(Outcome::Succeeded {
                artifacts: self.successful_versions(),
            }),
            JobStatus::Failed => Some(Outcome::Failed {
                reason: self.failure_reason(),
            }),
            JobStatus::Pending | JobStatus::Processing => {
                if self.versions.is_empty()
                    || !self.versions.iter().all(|v| v.status.is_terminal())
                {
                    return None;
                }
                let artifacts = self.successful_versions();
                if artifacts.is_empty() {
                    Some(Outcome::Failed {
                        reason: self.failure_reason(),
                    })
                } else {
                    Some(Outcome::Succeeded { artifacts })
                }
            }
        }
    }

    fn failure_reason(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "processing failed".to_string())
    }
}

/// Terminal result of a poll loop
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// The task finished and produced artifacts
    Succeeded {
        /// The versions that reached a successful terminal state
        artifacts: Vec<ArtifactVersion>,
    },

    /// The task finished without a usable artifact
    Failed {
        /// Failure description from the service, or a generic fallback
        reason: String,
    },

    /// The attempt ceiling was exhausted before the task became terminal
    TimedOut {
        /// Number of poll attempts consumed
        attempts: u32,
    },

    /// The loop was cancelled by a reset or superseded by a newer loop
    Cancelled,
}

impl Outcome {
    /// Whether this outcome carries artifacts
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }
}

/// Receipt for a completed upload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Which of the two job inputs this receipt covers
    pub kind: FileKind,

    /// Server-assigned file identifier
    pub file_id: FileId,

    /// Byte size confirmed by the server
    pub size_bytes: u64,
}

/// Result of a download request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The artifact was delivered through a sink
    Delivered {
        /// Version label of the delivered artifact
        version: String,
        /// Filename the sink received
        filename: String,
        /// Sink-provided locator (e.g., the saved path), if any
        locator: Option<String>,
        /// Payload size in bytes
        size_bytes: u64,
        /// Whether the payload came from the cache instead of the network
        from_cache: bool,
    },

    /// The user cancelled while the transfer or delivery was in flight
    Cancelled,
}

/// Event emitted during the transfer lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// An upload started
    UploadStarted {
        /// Which job input is being uploaded
        kind: FileKind,
        /// Local filename
        filename: String,
        /// Local file size in bytes
        size_bytes: u64,
    },

    /// Upload progress advanced by at least one whole percent
    UploadProgress {
        /// Which job input is being uploaded
        kind: FileKind,
        /// Progress percentage (0.0 to 100.0)
        percent: f32,
        /// Bytes read from disk so far
        sent_bytes: u64,
        /// Total bytes to send
        total_bytes: u64,
    },

    /// An upload completed and the server issued a file id
    UploadComplete {
        /// Which job input finished uploading
        kind: FileKind,
        /// Server-assigned file identifier
        file_id: FileId,
        /// Byte size confirmed by the server
        size_bytes: u64,
    },

    /// The processing job was accepted
    TaskSubmitted {
        /// Server-assigned task identifier
        task_id: TaskId,
    },

    /// A poll attempt returned a status payload
    StatusPolled {
        /// The parsed snapshot
        snapshot: StatusSnapshot,
    },

    /// User-facing status text (suppressed while a download is active)
    StatusText {
        /// Display text
        text: String,
    },

    /// An artifact download started
    DownloadStarted {
        /// Version label being downloaded
        version: String,
        /// Filename the artifact will be delivered under
        filename: String,
        /// Total size from Content-Length, when the server provided one
        total_bytes: Option<u64>,
    },

    /// Download progress crossed a reporting step
    DownloadProgress {
        /// Version label being downloaded
        version: String,
        /// Progress percentage (0 to 100)
        percent: u8,
        /// Bytes received so far
        received_bytes: u64,
        /// Total bytes expected
        total_bytes: u64,
    },

    /// A download was interrupted and restarts from byte zero
    DownloadRetrying {
        /// Version label being downloaded
        version: String,
        /// Restart attempt number (1-based)
        attempt: u32,
        /// Configured maximum number of restarts
        max_retries: u32,
        /// Description of the interruption
        error: String,
    },

    /// An artifact was handed to a sink
    DownloadDelivered {
        /// Version label that was delivered
        version: String,
        /// Name of the sink that accepted the payload
        sink: String,
        /// Sink-provided locator, if any
        locator: Option<String>,
        /// Whether the payload came from the cache
        from_cache: bool,
    },

    /// A download failed terminally
    DownloadFailed {
        /// Version label that failed
        version: String,
        /// Error description
        error: String,
    },

    /// The poll loop ended with a terminal outcome
    TaskFinished {
        /// The task that finished
        task_id: TaskId,
        /// The terminal outcome
        outcome: Outcome,
    },

    /// The client state was reset by the user
    Reset,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: JobStatus, versions: Vec<ArtifactVersion>) -> StatusSnapshot {
        StatusSnapshot {
            task_id: TaskId::from("task-1"),
            status,
            message: None,
            versions,
            polled_at: Utc::now(),
        }
    }

    fn version(label: &str, status: JobStatus) -> ArtifactVersion {
        ArtifactVersion {
            version: label.to_string(),
            status,
            output: (status == JobStatus::Success).then(|| format!("/out/{label}.mp4")),
        }
    }

    // --- JobStatus wire mapping ---

    #[test]
    fn job_status_maps_known_wire_strings() {
        let cases = [
            ("pending", JobStatus::Pending),
            ("queued", JobStatus::Pending),
            ("processing", JobStatus::Processing),
            ("success", JobStatus::Success),
            ("completed", JobStatus::Success),
            ("failed", JobStatus::Failed),
            ("error", JobStatus::Failed),
        ];

        for (wire, expected) in cases {
            assert_eq!(
                JobStatus::from_wire(wire),
                expected,
                "\"{wire}\" should map to {expected:?}"
            );
        }
    }

    #[test]
    fn job_status_maps_unknown_strings_to_processing() {
        assert_eq!(
            JobStatus::from_wire("finalizing"),
            JobStatus::Processing,
            "unknown status must stay non-terminal so the loop cannot end on a string the client does not understand"
        );
        assert_eq!(JobStatus::from_wire(""), JobStatus::Processing);
    }

    #[test]
    fn only_success_and_failed_are_terminal() {
        assert!(JobStatus::Success.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    // --- Terminal outcome rule ---

    #[test]
    fn overall_success_terminates_with_successful_versions() {
        let snap = snapshot(
            JobStatus::Success,
            vec![
                version("modular", JobStatus::Success),
                version("v2", JobStatus::Failed),
            ],
        );

        match snap.terminal_outcome() {
            Some(Outcome::Succeeded { artifacts }) => {
                assert_eq!(artifacts.len(), 1);
                assert_eq!(artifacts[0].version, "modular");
            }
            other => panic!("expected Succeeded, got {other:?}"),
        }
    }

    #[test]
    fn overall_failed_terminates_with_message_as_reason() {
        let mut snap = snapshot(JobStatus::Failed, vec![]);
        snap.message = Some("ffmpeg exploded".to_string());

        assert_eq!(
            snap.terminal_outcome(),
            Some(Outcome::Failed {
                reason: "ffmpeg exploded".to_string()
            })
        );
    }

    #[test]
    fn overall_failed_without_message_uses_generic_reason() {
        let snap = snapshot(JobStatus::Failed, vec![]);
        assert_eq!(
            snap.terminal_outcome(),
            Some(Outcome::Failed {
                reason: "processing failed".to_string()
            })
        );
    }

    #[test]
    fn processing_with_no_versions_is_not_terminal() {
        let snap = snapshot(JobStatus::Processing, vec![]);
        assert_eq!(snap.terminal_outcome(), None);
    }

    #[test]
    fn processing_with_one_pending_version_is_not_terminal() {
        let snap = snapshot(
            JobStatus::Processing,
            vec![
                version("modular", JobStatus::Success),
                version("v2", JobStatus::Processing),
            ],
        );
        assert_eq!(
            snap.terminal_outcome(),
            None,
            "a task is only fully terminal when every named version is terminal"
        );
    }

    #[test]
    fn processing_with_all_versions_terminal_terminates() {
        // The overall field still says processing; the per-version states rule.
        let snap = snapshot(
            JobStatus::Processing,
            vec![
                version("modular", JobStatus::Success),
                version("v2", JobStatus::Success),
            ],
        );

        match snap.terminal_outcome() {
            Some(Outcome::Succeeded { artifacts }) => assert_eq!(artifacts.len(), 2),
            other => panic!("expected Succeeded with both versions, got {other:?}"),
        }
    }

    #[test]
    fn processing_with_all_versions_failed_is_a_failure() {
        let snap = snapshot(
            JobStatus::Processing,
            vec![
                version("modular", JobStatus::Failed),
                version("v2", JobStatus::Failed),
            ],
        );

        assert!(matches!(
            snap.terminal_outcome(),
            Some(Outcome::Failed { .. })
        ));
    }

    #[test]
    fn mixed_terminal_versions_count_as_success() {
        let snap = snapshot(
            JobStatus::Processing,
            vec![
                version("modular", JobStatus::Failed),
                version("v2", JobStatus::Success),
            ],
        );

        match snap.terminal_outcome() {
            Some(Outcome::Succeeded { artifacts }) => {
                assert_eq!(artifacts.len(), 1);
                assert_eq!(artifacts[0].version, "v2");
            }
            other => panic!("expected Succeeded with v2 only, got {other:?}"),
        }
    }

    // --- Identifiers ---

    #[test]
    fn task_id_display_and_conversions() {
        let id = TaskId::from("abc-123");
        assert_eq!(id.to_string(), "abc-123");
        assert_eq!(id.as_str(), "abc-123");
        assert_eq!(TaskId::new(String::from("abc-123")), id);
    }

    #[test]
    fn file_kind_wire_names() {
        assert_eq!(FileKind::Dance.as_str(), "dance");
        assert_eq!(FileKind::Bgm.as_str(), "bgm");
        assert_eq!(FileKind::Bgm.to_string(), "bgm");
    }

    // --- Phases ---

    #[test]
    fn terminal_phases() {
        assert!(TaskPhase::Succeeded.is_terminal());
        assert!(TaskPhase::Failed.is_terminal());
        assert!(TaskPhase::TimedOut.is_terminal());
        assert!(TaskPhase::Cancelled.is_terminal());
        assert!(!TaskPhase::Pending.is_terminal());
        assert!(!TaskPhase::Uploading.is_terminal());
        assert!(!TaskPhase::Submitted.is_terminal());
        assert!(!TaskPhase::Polling.is_terminal());
    }

    #[test]
    fn default_phase_is_pending() {
        assert_eq!(TaskPhase::default(), TaskPhase::Pending);
    }

    // --- Event serialization ---

    #[test]
    fn events_serialize_with_snake_case_type_tag() {
        let event = Event::TaskSubmitted {
            task_id: TaskId::from("t-9"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "task_submitted");
        assert_eq!(json["task_id"], "t-9");

        let event = Event::DownloadProgress {
            version: "modular".to_string(),
            percent: 45,
            received_bytes: 450,
            total_bytes: 1000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "download_progress");
        assert_eq!(json["percent"], 45);
    }

    #[test]
    fn outcome_serializes_with_result_tag() {
        let json = serde_json::to_value(Outcome::TimedOut { attempts: 240 }).unwrap();
        assert_eq!(json["result"], "timed_out");
        assert_eq!(json["attempts"], 240);
    }
}
