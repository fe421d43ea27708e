//! File validation and multipart upload
//!
//! Uploads run in three stages: local validation (extension allow-list and
//! size ceiling, both checked before any network traffic), the escalating
//! health probe, then a streaming multipart POST whose deadline scales with
//! file size. Progress events fire as whole-percent milestones while the
//! body streams off disk.

use super::TransferClient;
use crate::error::{Result, UploadError};
use crate::types::{Event, FileId, FileKind, TaskPhase, UploadReceipt};
use crate::util;
use crate::wire::{self, UploadResponse};
use futures::StreamExt;
use std::path::Path;
use tokio_util::io::ReaderStream;

/// Read-buffer size for streaming the file body off disk
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

impl TransferClient {
    /// Upload a local video file as the `kind` input of a processing job
    ///
    /// Validation failures are raised before the service is contacted. On
    /// success the receipt is stored in the client state and returned; the
    /// matching [`Event::UploadComplete`] carries the same file id.
    ///
    /// # Errors
    ///
    /// - [`UploadError::UnsupportedFormat`] / [`UploadError::TooLarge`] on
    ///   local validation failure, before any network I/O
    /// - [`UploadError::ServiceUnavailable`] when the health probe exhausts
    ///   its tiers
    /// - [`UploadError::Timeout`], [`UploadError::Unreachable`],
    ///   [`UploadError::Rejected`], or [`UploadError::InvalidResponse`] from
    ///   the upload request itself
    /// - [`Error::Io`](crate::Error::Io) when the file cannot be read
    pub async fn upload(&self, path: &Path, kind: FileKind) -> Result<UploadReceipt> {
        let extension = util::file_extension(path).unwrap_or_default();
        if !self.config.upload.allows_extension(&extension) {
            return Err(UploadError::UnsupportedFormat {
                extension,
                allowed: self.config.upload.allowed_list(),
            }
            .into());
        }

        let metadata = tokio::fs::metadata(path).await?;
        let size_bytes = metadata.len();
        if size_bytes > self.config.upload.max_file_bytes {
            return Err(UploadError::TooLarge {
                size_bytes,
                limit_bytes: self.config.upload.max_file_bytes,
            }
            .into());
        }

        self.probe_health().await?;

        self.set_phase(TaskPhase::Uploading);
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("upload.{extension}"));
        self.emit_event(Event::UploadStarted {
            kind,
            filename: filename.clone(),
            size_bytes,
        });

        let timeout = self.config.upload.timeout_for(size_bytes);
        tracing::info!(
            kind = %kind,
            filename = %filename,
            size = %util::format_bytes(size_bytes),
            deadline = ?timeout,
            "starting upload"
        );

        let file = tokio::fs::File::open(path).await?;
        let form = self.upload_form(file, &filename, kind, size_bytes);

        let response = self
            .http
            .post(self.config.upload_url())
            .multipart(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UploadError::Timeout { limit: timeout }
                } else {
                    UploadError::Unreachable(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message: wire::rejection_message(&body),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
        let parsed: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        let receipt = UploadReceipt {
            kind,
            file_id: FileId::from(parsed.file_id),
            size_bytes: parsed.size.unwrap_or(size_bytes),
        };
        self.store_receipt(receipt.clone());
        self.emit_event(Event::UploadComplete {
            kind,
            file_id: receipt.file_id.clone(),
            size_bytes: receipt.size_bytes,
        });
        tracing::info!(kind = %kind, file_id = %receipt.file_id, "upload complete");

        Ok(receipt)
    }

    /// Build the multipart form, wrapping the file in a progress-reporting stream
    fn upload_form(
        &self,
        file: tokio::fs::File,
        filename: &str,
        kind: FileKind,
        size_bytes: u64,
    ) -> reqwest::multipart::Form {
        let progress = self.clone();
        let mut sent: u64 = 0;
        let mut last_percent: u64 = 0;

        let body = ReaderStream::with_capacity(file, UPLOAD_CHUNK_BYTES).inspect(move |chunk| {
            let Ok(bytes) = chunk else { return };
            sent += bytes.len() as u64;
            let percent = if size_bytes > 0 {
                (sent * 100 / size_bytes).min(100)
            } else {
                100
            };
            if percent > last_percent {
                last_percent = percent;
                progress.emit_event(Event::UploadProgress {
                    kind,
                    percent: percent as f32,
                    sent_bytes: sent,
                    total_bytes: size_bytes,
                });
            }
        });

        let part = reqwest::multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(body),
            size_bytes,
        )
        .file_name(filename.to_string());

        reqwest::multipart::Form::new()
            .part("file", part)
            .text("file_type", kind.as_str())
    }
}
