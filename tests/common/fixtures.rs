//! Media fixtures and wire payload builders

use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

/// Bytes written into sample video fixtures; valid UTF-8 so multipart bodies
/// can be matched as strings
pub const SAMPLE_VIDEO_BYTES: &[u8] = b"FAKE MP4 PAYLOAD good enough for transport tests";

/// Write a sample video file named `name` under `dir`
pub fn write_sample_video(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, SAMPLE_VIDEO_BYTES).expect("failed to write sample video");
    path
}

/// Body of a successful upload response
pub fn upload_body(file_id: &str) -> serde_json::Value {
    json!({
        "file_id": file_id,
        "filename": "stored.mp4",
        "size": SAMPLE_VIDEO_BYTES.len(),
    })
}

/// Body of a successful job submission response
pub fn process_body(task_id: &str) -> serde_json::Value {
    json!({
        "task_id": task_id,
        "message": "queued",
    })
}

/// Status payload with an overall status string and per-version entries
pub fn status_body(overall: &str, versions: &[(&str, &str)]) -> serde_json::Value {
    let versions: Vec<serde_json::Value> = versions
        .iter()
        .map(|(version, status)| {
            json!({
                "version": version,
                "status": status,
                "output": format!("/srv/output/{version}.mp4"),
            })
        })
        .collect();
    json!({
        "status": overall,
        "message": null,
        "versions": versions,
    })
}

/// FastAPI-style error body
pub fn detail_body(detail: &str) -> serde_json::Value {
    json!({ "detail": detail })
}
