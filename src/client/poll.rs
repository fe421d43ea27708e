//! Fixed-cadence status polling
//!
//! One loop per submitted task: a status request on a fixed interval, a hard
//! attempt ceiling, and a termination rule that also reads the per-version
//! states (the overall status field alone lags behind on some services).
//! Only an unknown task aborts the loop early; transient failures are logged
//! and swallowed, though each one still consumes an attempt. Registering a
//! new loop cancels the prior one, so at most one loop polls at a time.

use super::TransferClient;
use crate::error::{Error, PollError, Result};
use crate::types::{Event, JobStatus, Outcome, StatusSnapshot, TaskId, TaskPhase};
use crate::wire::StatusResponse;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

impl TransferClient {
    /// Poll the status endpoint until `task_id` reaches a terminal condition
    ///
    /// The loop polls immediately and then on the configured cadence. It ends
    /// when the task is terminal (overall status, or every named version),
    /// when the attempt ceiling is exhausted ([`Outcome::TimedOut`]), or when
    /// it is cancelled by [`reset`](TransferClient::reset) or superseded by a
    /// newer loop ([`Outcome::Cancelled`]). `on_update` is invoked with every
    /// successful snapshot, including the terminal one.
    ///
    /// # Errors
    ///
    /// Only a fatal poll failure is an `Err`: the service answering 404 for
    /// the task ([`PollError::TaskNotFound`]). Every other failure is
    /// transient and swallowed.
    pub async fn poll_until_terminal<F>(&self, task_id: &TaskId, mut on_update: F) -> Result<Outcome>
    where
        F: FnMut(&StatusSnapshot) + Send,
    {
        let (poll_id, guard) = self.register_poll();
        let generation = self.generation_token();
        self.set_phase(TaskPhase::Polling);
        tracing::info!(
            task_id = %task_id,
            interval = ?self.config.job.poll_interval,
            max_attempts = self.config.job.max_poll_attempts,
            "poll loop started"
        );

        let result = self
            .poll_loop(task_id, &guard, &generation, &mut on_update)
            .await;

        // Only the loop that still owns the registry slot reports the ending.
        // A superseded or reset-away loop returns its outcome quietly; the
        // successor (or the reset) owns the state from here.
        if self.finish_poll(poll_id) {
            match &result {
                Ok(outcome) => {
                    self.set_phase(phase_for(outcome));
                    self.emit_event(Event::TaskFinished {
                        task_id: task_id.clone(),
                        outcome: outcome.clone(),
                    });
                    match outcome {
                        Outcome::Succeeded { artifacts } => {
                            tracing::info!(task_id = %task_id, artifacts = artifacts.len(), "task succeeded");
                        }
                        Outcome::Failed { reason } => {
                            tracing::warn!(task_id = %task_id, %reason, "task failed");
                        }
                        Outcome::TimedOut { attempts } => {
                            tracing::warn!(task_id = %task_id, attempts, "poll attempts exhausted");
                        }
                        Outcome::Cancelled => {
                            tracing::info!(task_id = %task_id, "poll loop cancelled");
                        }
                    }
                }
                Err(error) => {
                    self.set_phase(TaskPhase::Failed);
                    self.emit_event(Event::TaskFinished {
                        task_id: task_id.clone(),
                        outcome: Outcome::Failed {
                            reason: error.to_string(),
                        },
                    });
                    tracing::error!(task_id = %task_id, %error, "poll loop aborted");
                }
            }
        }

        result.map_err(Error::from)
    }

    async fn poll_loop<F>(
        &self,
        task_id: &TaskId,
        guard: &CancellationToken,
        generation: &CancellationToken,
        on_update: &mut F,
    ) -> std::result::Result<Outcome, PollError>
    where
        F: FnMut(&StatusSnapshot) + Send,
    {
        let max_attempts = self.config.job.max_poll_attempts;
        let mut interval = tokio::time::interval(self.config.job.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for attempt in 1..=max_attempts {
            tokio::select! {
                _ = interval.tick() => {}
                _ = guard.cancelled() => return Ok(Outcome::Cancelled),
                _ = generation.cancelled() => return Ok(Outcome::Cancelled),
            }

            match self.fetch_status(task_id).await {
                Ok(snapshot) => {
                    self.store_snapshot(snapshot.clone());
                    self.emit_event(Event::StatusPolled {
                        snapshot: snapshot.clone(),
                    });
                    on_update(&snapshot);
                    if !self.is_downloading() {
                        self.emit_event(Event::StatusText {
                            text: status_text(&snapshot),
                        });
                    }

                    if let Some(outcome) = snapshot.terminal_outcome() {
                        return Ok(outcome);
                    }
                    tracing::debug!(
                        task_id = %task_id,
                        attempt,
                        status = ?snapshot.status,
                        versions = snapshot.versions.len(),
                        "task still in progress"
                    );
                }
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    // Swallowed, but the attempt is still spent.
                    tracing::warn!(
                        task_id = %task_id,
                        attempt,
                        max_attempts,
                        %error,
                        "poll attempt failed, continuing"
                    );
                }
            }
        }

        Ok(Outcome::TimedOut {
            attempts: max_attempts,
        })
    }

    /// One status request, classifying 404 as fatal
    pub(crate) async fn fetch_status(
        &self,
        task_id: &TaskId,
    ) -> std::result::Result<StatusSnapshot, PollError> {
        let response = self
            .http
            .get(self.config.status_url(task_id))
            .timeout(self.config.job.status_timeout)
            .send()
            .await
            .map_err(PollError::Request)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PollError::TaskNotFound {
                task_id: task_id.clone(),
            });
        }
        if !status.is_success() {
            return Err(PollError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(PollError::Request)?;
        let parsed: StatusResponse =
            serde_json::from_str(&body).map_err(|e| PollError::InvalidBody(e.to_string()))?;
        Ok(parsed.into_snapshot(task_id.clone()))
    }
}

fn phase_for(outcome: &Outcome) -> TaskPhase {
    match outcome {
        Outcome::Succeeded { .. } => TaskPhase::Succeeded,
        Outcome::Failed { .. } => TaskPhase::Failed,
        Outcome::TimedOut { .. } => TaskPhase::TimedOut,
        Outcome::Cancelled => TaskPhase::Cancelled,
    }
}

/// User-facing status line for a snapshot
///
/// A service-provided message wins; otherwise the line is derived from the
/// overall status and the per-version progress.
fn status_text(snapshot: &StatusSnapshot) -> String {
    if let Some(message) = &snapshot.message
        && !message.is_empty()
    {
        return message.clone();
    }

    let total = snapshot.versions.len();
    let done = snapshot
        .versions
        .iter()
        .filter(|v| v.status.is_terminal())
        .count();

    match snapshot.status {
        JobStatus::Pending => "waiting for processing to start".to_string(),
        JobStatus::Processing if total > 0 => {
            format!("processing ({done}/{total} versions finished)")
        }
        JobStatus::Processing => "processing".to_string(),
        JobStatus::Success => "processing complete".to_string(),
        JobStatus::Failed => "processing failed".to_string(),
    }
}
