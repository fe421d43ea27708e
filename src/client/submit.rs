//! Processing job submission

use super::TransferClient;
use crate::error::{Result, SubmitError};
use crate::types::{Event, FileId, TaskId};
use crate::wire::{self, ProcessResponse};

impl TransferClient {
    /// Submit a processing job referencing two uploaded files
    ///
    /// One form-encoded POST with a fixed deadline. A 2xx answer without a
    /// task identifier is itself a failure: nothing can be polled without
    /// one.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Timeout`], [`SubmitError::Unreachable`],
    /// [`SubmitError::Rejected`], [`SubmitError::InvalidResponse`], or
    /// [`SubmitError::MissingTaskId`].
    pub async fn submit(&self, dance_file_id: &FileId, bgm_file_id: &FileId) -> Result<TaskId> {
        let timeout = self.config.job.submit_timeout;

        let response = self
            .http
            .post(self.config.process_url())
            .form(&[
                ("dance_file_id", dance_file_id.as_str()),
                ("bgm_file_id", bgm_file_id.as_str()),
            ])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubmitError::Timeout { limit: timeout }
                } else {
                    SubmitError::Unreachable(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
                message: wire::rejection_message(&body),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| SubmitError::InvalidResponse(e.to_string()))?;
        let parsed: ProcessResponse = serde_json::from_str(&body)
            .map_err(|e| SubmitError::InvalidResponse(e.to_string()))?;

        let task_id = parsed
            .task_id
            .filter(|id| !id.is_empty())
            .map(TaskId::from)
            .ok_or(SubmitError::MissingTaskId)?;

        self.store_task(task_id.clone());
        self.emit_event(Event::TaskSubmitted {
            task_id: task_id.clone(),
        });
        tracing::info!(task_id = %task_id, "processing job submitted");

        Ok(task_id)
    }
}
