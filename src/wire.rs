//! Wire payloads exchanged with the BeatSync service
//!
//! All request and response bodies are JSON with snake_case keys. Parsing is
//! deliberately lenient: optional fields default, unknown fields are ignored,
//! and status strings go through [`JobStatus::from_wire`] so a new server
//! vocabulary degrades gracefully instead of failing the poll.

use crate::types::{ArtifactVersion, JobStatus, StatusSnapshot, TaskId};
use chrono::Utc;
use serde::Deserialize;

/// Body of a successful `POST /api/upload`
#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    /// Server-assigned file identifier
    pub file_id: String,

    /// Byte size the server confirmed it stored
    #[serde(default)]
    pub size: Option<u64>,
}

/// Body of a successful `POST /api/process`
#[derive(Debug, Deserialize)]
pub(crate) struct ProcessResponse {
    /// Server-assigned task identifier; its absence is a submission failure
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Body of a successful `GET /api/status/{task_id}`
#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    /// Overall task status string
    pub status: String,

    /// Optional human-readable message
    #[serde(default)]
    pub message: Option<String>,

    /// Per-version entries; absent early in a task's life
    #[serde(default)]
    pub versions: Vec<VersionEntry>,
}

/// One per-version entry inside a status payload
#[derive(Debug, Deserialize)]
pub(crate) struct VersionEntry {
    /// Version label ("modular", "v2", ...)
    pub version: String,

    /// Status string for this version
    pub status: String,

    /// Opaque server-side output path, once produced
    #[serde(default)]
    pub output: Option<String>,
}

impl StatusResponse {
    /// Convert the wire payload into a timestamped snapshot
    pub(crate) fn into_snapshot(self, task_id: TaskId) -> StatusSnapshot {
        StatusSnapshot {
            task_id,
            status: JobStatus::from_wire(&self.status),
            message: self.message,
            versions: self
                .versions
                .into_iter()
                .map(|entry| ArtifactVersion {
                    version: entry.version,
                    status: JobStatus::from_wire(&entry.status),
                    output: entry.output,
                })
                .collect(),
            polled_at: Utc::now(),
        }
    }
}

/// Extract the `detail` field from a FastAPI-style error body
///
/// `detail` is usually a string but can be a structured value (validation
/// errors arrive as arrays); non-string values are rendered as JSON.
pub(crate) fn extract_detail(body: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    match parsed.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Server message for a rejected request, with a fallback when the body
/// carries no usable detail
pub(crate) fn rejection_message(body: &str) -> String {
    extract_detail(body).unwrap_or_else(|| "no detail provided".to_string())
}
