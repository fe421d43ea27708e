//! Pre-upload service health probe

use super::TransferClient;
use crate::error::UploadError;
use crate::util;

impl TransferClient {
    /// Probe the health endpoint with escalating per-attempt timeouts
    ///
    /// One attempt is made per configured tier, in order, so a slow-to-wake
    /// service gets progressively more patience. Any 2xx answer ends the
    /// probe; a rejection or transport failure moves on to the next tier
    /// after a short delay. When every tier is exhausted the upload fails
    /// with [`UploadError::ServiceUnavailable`], leaving the retry decision
    /// to the caller.
    pub(crate) async fn probe_health(&self) -> std::result::Result<(), UploadError> {
        let url = self.config.health_url();
        let attempts = self.config.health.attempts();

        for (tier, timeout) in self.config.health.timeout_tiers.iter().enumerate() {
            let attempt = tier as u32 + 1;
            match self.http.get(&url).timeout(*timeout).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(attempt, "service is healthy");
                    return Ok(());
                }
                Ok(response) => {
                    tracing::warn!(
                        attempt,
                        attempts,
                        status = response.status().as_u16(),
                        "health probe rejected"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        attempt,
                        attempts,
                        %error,
                        probe_timeout = ?timeout,
                        "health probe failed"
                    );
                }
            }

            if attempt < attempts {
                tokio::time::sleep(util::retry_delay(
                    self.config.health.retry_delay,
                    self.config.health.jitter,
                ))
                .await;
            }
        }

        tracing::error!(attempts, "service did not answer any health probe");
        Err(UploadError::ServiceUnavailable { attempts })
    }
}
