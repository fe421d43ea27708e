//! Artifact byte-stream source — fetch trait and the production HTTP impl

use crate::error::DownloadError;
use crate::wire;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};

/// An opened artifact body: the advertised length plus the chunk stream
pub(crate) struct ArtifactBody {
    /// Total size from Content-Length, when the server provided one
    pub(crate) total_bytes: Option<u64>,

    /// The body as a stream of chunks; errors are already classified
    pub(crate) stream: BoxStream<'static, std::result::Result<Bytes, DownloadError>>,
}

impl std::fmt::Debug for ArtifactBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactBody")
            .field("total_bytes", &self.total_bytes)
            .finish_non_exhaustive()
    }
}

/// Abstraction over artifact body fetching, enabling testability.
///
/// Transport-level failures (connect errors, stream resets, stalled bodies)
/// come back as [`DownloadError::Interrupted`] so the engine can restart;
/// non-2xx responses come back as [`DownloadError::Server`] and are final.
#[async_trait::async_trait]
pub(crate) trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<ArtifactBody, DownloadError>;
}

/// Production [`ArtifactFetcher`] backed by the shared HTTP client.
///
/// No overall request deadline is applied: artifact bodies can be large and
/// slow, and the engine bounds the transfer through chunk-level interruption
/// handling and cancellation instead.
pub(crate) struct HttpArtifactFetcher {
    http: reqwest::Client,
}

impl HttpArtifactFetcher {
    pub(crate) fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<ArtifactBody, DownloadError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Interrupted {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DownloadError::Server {
                status: status.as_u16(),
                message: wire::rejection_message(&body),
            });
        }

        let total_bytes = response.content_length();
        let stream = response
            .bytes_stream()
            .map_err(|e| DownloadError::Interrupted {
                reason: e.to_string(),
            })
            .boxed();

        Ok(ArtifactBody {
            total_bytes,
            stream,
        })
    }
}
