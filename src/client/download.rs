//! Streaming artifact download engine
//!
//! The engine fully materializes an artifact before delivery: the body
//! streams in chunk by chunk, restarts from byte zero when the stream is
//! interrupted (a bounded number of times), and honors the client-wide
//! cancellation flag between chunks. A completed payload is written to the
//! per-version cache first and then handed to the sink chain, so a repeat
//! request replays from the cache even when that first delivery failed.
//! There is no overall deadline: artifact bodies are large and slow, and the
//! interruption handling plus cancellation bound the transfer instead.

use super::cache::DownloadRecord;
use super::TransferClient;
use crate::error::{DownloadError, Result, SinkError};
use crate::sink;
use crate::types::{DownloadOutcome, Event, TaskId};
use crate::util;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

/// Result of one streaming fetch attempt
enum FetchAttempt {
    /// The full body was received
    Complete(Bytes),
    /// The cancellation flag was observed before the body completed
    Cancelled,
}

impl TransferClient {
    /// Download one artifact version of a task and deliver it
    ///
    /// Builds the download URL and the service-conventional filename
    /// (`beatsync_{task_id}_{version}.mp4`), then runs
    /// [`download`](TransferClient::download).
    ///
    /// # Errors
    ///
    /// See [`download`](TransferClient::download).
    pub async fn download_artifact(
        &self,
        task_id: &TaskId,
        version: &str,
    ) -> Result<DownloadOutcome> {
        let url = self.config.download_url(task_id, version);
        let filename = util::suggested_filename(task_id, version);
        self.download(&url, &filename, version).await
    }

    /// Download `url` and deliver it as `filename`, cached under `version`
    ///
    /// A cached payload for `version` short-circuits the network entirely:
    /// the sink chain is re-invoked on the cached record. A declined delivery
    /// ([`DownloadOutcome::Cancelled`]) keeps the cache entry; any other
    /// cached-delivery failure invalidates it and falls back to a fresh
    /// download.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::RetriesExhausted`] when every permitted restart is
    ///   consumed without a complete body
    /// - [`DownloadError::Server`] when the service refuses the request
    ///   (never restarted)
    /// - [`DownloadError::NoSink`] when no sink in the chain is available
    /// - [`DownloadError::Sink`] when the selected sink fails
    ///
    /// Cancellation via [`reset`](TransferClient::reset) is not an error; it
    /// comes back as [`DownloadOutcome::Cancelled`].
    pub async fn download(
        &self,
        url: &str,
        filename: &str,
        version: &str,
    ) -> Result<DownloadOutcome> {
        if let Some(record) = self.cache.get(version) {
            tracing::debug!(version, "replaying cached artifact");
            match self.deliver(&record, true).await {
                Ok(outcome) => return Ok(outcome),
                Err(error) => {
                    tracing::warn!(
                        version,
                        %error,
                        "cached delivery failed, falling back to a fresh download"
                    );
                    self.cache.invalidate(version);
                }
            }
        }

        self.begin_download();
        let result = self.fetch_and_deliver(url, filename, version).await;
        self.end_download();

        match &result {
            Ok(DownloadOutcome::Delivered {
                locator,
                size_bytes,
                ..
            }) => {
                tracing::info!(
                    version,
                    size = %util::format_bytes(*size_bytes),
                    locator = ?locator,
                    "artifact delivered"
                );
            }
            Ok(DownloadOutcome::Cancelled) => {
                tracing::info!(version, "download cancelled");
            }
            Err(error) => {
                self.emit_event(Event::DownloadFailed {
                    version: version.to_string(),
                    error: error.to_string(),
                });
                tracing::error!(version, %error, "download failed");
            }
        }

        Ok(result?)
    }

    /// Bounded restart-from-zero fetch loop ending in one delivery
    async fn fetch_and_deliver(
        &self,
        url: &str,
        filename: &str,
        version: &str,
    ) -> std::result::Result<DownloadOutcome, DownloadError> {
        let generation = self.generation_token();
        let max_retries = self.config.download.max_retries;
        let mut attempt: u32 = 0;

        loop {
            match self.fetch_once(url, filename, version, &generation).await {
                Ok(FetchAttempt::Complete(payload)) => {
                    let record = DownloadRecord {
                        version: version.to_string(),
                        payload,
                        filename: filename.to_string(),
                        locator: None,
                        cached_at: Utc::now(),
                    };
                    // Cache before delivery: a repeat request must skip the
                    // network even when this delivery fails.
                    self.cache.put(record.clone());
                    tracing::debug!(
                        version,
                        bytes = record.payload.len(),
                        "artifact downloaded and cached"
                    );
                    return self.deliver(&record, false).await;
                }
                Ok(FetchAttempt::Cancelled) => return Ok(DownloadOutcome::Cancelled),
                Err(DownloadError::Interrupted { reason }) => {
                    attempt += 1;
                    if attempt > max_retries {
                        tracing::error!(version, attempts = attempt, %reason, "download retries exhausted");
                        return Err(DownloadError::RetriesExhausted {
                            attempts: attempt,
                            reason,
                        });
                    }
                    self.emit_event(Event::DownloadRetrying {
                        version: version.to_string(),
                        attempt,
                        max_retries,
                        error: reason.clone(),
                    });
                    tracing::warn!(
                        version,
                        attempt,
                        max_retries,
                        error = %reason,
                        "stream interrupted, restarting from byte zero"
                    );
                    tokio::time::sleep(util::retry_delay(
                        self.config.download.retry_delay,
                        self.config.download.jitter,
                    ))
                    .await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// One streaming attempt from byte zero
    async fn fetch_once(
        &self,
        url: &str,
        filename: &str,
        version: &str,
        generation: &CancellationToken,
    ) -> std::result::Result<FetchAttempt, DownloadError> {
        if generation.is_cancelled() {
            return Ok(FetchAttempt::Cancelled);
        }

        let body = self.fetcher.fetch(url).await?;
        let total_bytes = body.total_bytes;
        self.emit_event(Event::DownloadStarted {
            version: version.to_string(),
            filename: filename.to_string(),
            total_bytes,
        });
        tracing::debug!(version, total_bytes = ?total_bytes, "download stream opened");

        let step = u64::from(self.config.download.progress_step.max(1));
        let mut payload = BytesMut::new();
        let mut received: u64 = 0;
        let mut next_milestone = step;
        let mut stream = body.stream;

        while let Some(next) = stream.next().await {
            // The cancellation flag wins over whatever the stream produced.
            if generation.is_cancelled() {
                tracing::debug!(version, received, "cancellation observed mid-stream");
                return Ok(FetchAttempt::Cancelled);
            }
            let chunk = next?;
            received += chunk.len() as u64;
            payload.extend_from_slice(&chunk);

            if let Some(total) = total_bytes
                && total > 0
            {
                let percent = (received * 100 / total).min(100);
                if percent >= next_milestone {
                    self.emit_event(Event::DownloadProgress {
                        version: version.to_string(),
                        percent: percent as u8,
                        received_bytes: received,
                        total_bytes: total,
                    });
                    next_milestone = percent - percent % step + step;
                }
            }
        }

        if let Some(total) = total_bytes
            && received < total
        {
            return Err(DownloadError::Interrupted {
                reason: format!("stream ended after {received} of {total} bytes"),
            });
        }

        Ok(FetchAttempt::Complete(payload.freeze()))
    }

    /// Resolve the sink chain and deliver the record through it
    async fn deliver(
        &self,
        record: &DownloadRecord,
        from_cache: bool,
    ) -> std::result::Result<DownloadOutcome, DownloadError> {
        let Some(selected) = sink::first_available(&self.sinks) else {
            return Err(DownloadError::NoSink);
        };

        tracing::debug!(
            version = %record.version,
            sink = selected.name(),
            from_cache,
            "delivering artifact"
        );

        match selected.deliver(record).await {
            Ok(locator) => {
                let locator = locator.or_else(|| record.locator.clone());
                if locator != record.locator {
                    // Remember the locator so a cache replay can report it.
                    let mut updated = record.clone();
                    updated.locator = locator.clone();
                    self.cache.put(updated);
                }
                self.emit_event(Event::DownloadDelivered {
                    version: record.version.clone(),
                    sink: selected.name().to_string(),
                    locator: locator.clone(),
                    from_cache,
                });
                Ok(DownloadOutcome::Delivered {
                    version: record.version.clone(),
                    filename: record.filename.clone(),
                    locator,
                    size_bytes: record.payload.len() as u64,
                    from_cache,
                })
            }
            Err(SinkError::Cancelled) => {
                tracing::info!(
                    version = %record.version,
                    sink = selected.name(),
                    "delivery declined by the user"
                );
                Ok(DownloadOutcome::Cancelled)
            }
            Err(error) => Err(DownloadError::Sink(error)),
        }
    }
}
