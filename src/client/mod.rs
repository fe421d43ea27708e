//! The BeatSync transfer client
//!
//! [`TransferClient`] owns every stage of a transfer: validated uploads of
//! the two input videos, job submission, the fixed-cadence status poll loop,
//! and the streaming artifact download engine with its per-version cache and
//! ranked sink chain. The client is cheap to clone (all fields are shared)
//! and every operation takes `&self`, so uploads can run concurrently and a
//! UI can keep one clone for `reset()` while another drives a transfer.
//!
//! Stage implementations live in focused submodules: the pre-upload health
//! probe, upload, submit, poll, and download, plus the artifact fetch seam
//! and the download cache.

mod cache;
mod download;
mod fetch;
mod health;
mod poll;
mod submit;
mod upload;

pub use cache::DownloadRecord;

use crate::config::Config;
use crate::error::Result;
use crate::sink::{ArtifactSink, FileSink};
use crate::types::{Event, FileKind, Outcome, StatusSnapshot, TaskId, TaskPhase, UploadReceipt};
use cache::DownloadCache;
use fetch::{ArtifactFetcher, HttpArtifactFetcher};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;

/// Mutable transfer state, kept as one record behind one lock
#[derive(Debug, Default)]
pub(crate) struct ClientState {
    /// Lifecycle phase of the current transfer
    pub(crate) phase: TaskPhase,
    /// Upload receipts by input kind
    pub(crate) receipts: HashMap<FileKind, UploadReceipt>,
    /// Task identifier of the submitted job, if any
    pub(crate) task_id: Option<TaskId>,
    /// Most recent status snapshot from the poll loop
    pub(crate) last_snapshot: Option<StatusSnapshot>,
    /// Number of artifact downloads currently streaming
    pub(crate) active_downloads: u32,
}

/// The poll loop currently registered as the active one
pub(crate) struct ActivePoll {
    pub(crate) id: u64,
    pub(crate) guard: CancellationToken,
}

/// Cancellation plumbing shared by every operation
#[derive(Clone)]
pub(crate) struct CancelState {
    /// Current client generation; cancelled and replaced by `reset()`
    generation: Arc<Mutex<CancellationToken>>,
    /// The single active poll loop; a newer loop cancels and replaces it
    active_poll: Arc<Mutex<Option<ActivePoll>>>,
    /// Monotonic id source for poll loops
    next_poll_id: Arc<AtomicU64>,
}

impl Default for CancelState {
    fn default() -> Self {
        Self {
            generation: Arc::new(Mutex::new(CancellationToken::new())),
            active_poll: Arc::new(Mutex::new(None)),
            next_poll_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

/// Lock one of the client's state mutexes
///
/// Guards are held only for field access and never across await points. The
/// guarded values are self-contained, so a poisoned lock still yields usable
/// data.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Client for the BeatSync media-processing service (cloneable - all fields are shared)
///
/// # Examples
///
/// ```no_run
/// use beatsync_client::{Config, TransferClient};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = TransferClient::new(Config::new("http://localhost:8000"))?;
///
/// let outcome = client
///     .transfer(
///         Path::new("dance.mp4"),
///         Path::new("bgm.mp4"),
///         |snapshot| println!("status: {:?}", snapshot.status),
///     )
///     .await?;
/// println!("finished: {outcome:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TransferClient {
    /// Shared HTTP client (connect timeout only; deadlines are per request)
    pub(crate) http: reqwest::Client,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Mutable transfer state
    pub(crate) state: Arc<Mutex<ClientState>>,
    /// Completed downloads by version label
    pub(crate) cache: DownloadCache,
    /// Ranked delivery chain, highest priority first
    pub(crate) sinks: Arc<Vec<Arc<dyn ArtifactSink>>>,
    /// Cancellation plumbing
    pub(crate) cancel: CancelState,
    /// Artifact byte-stream source (HTTP in production, scripted in tests)
    pub(crate) fetcher: Arc<dyn ArtifactFetcher>,
}

impl std::fmt::Debug for TransferClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TransferClient {
    /// Create a client with the default sink chain
    ///
    /// The default chain holds a single [`FileSink`] saving into the
    /// configured download directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) when the configuration
    /// fails validation, or [`Error::Network`](crate::Error::Network) when
    /// the HTTP client cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        let save_dir = config.download.save_dir.clone();
        Self::with_sinks(config, vec![Arc::new(FileSink::new(save_dir))])
    }

    /// Create a client with a custom ranked sink chain
    ///
    /// Sinks are tried in order at delivery time; the first one reporting
    /// itself available receives the artifact.
    ///
    /// # Errors
    ///
    /// Same as [`TransferClient::new`].
    pub fn with_sinks(config: Config, sinks: Vec<Arc<dyn ArtifactSink>>) -> Result<Self> {
        let http = Self::build_http(&config)?;
        let fetcher = Arc::new(HttpArtifactFetcher::new(http.clone()));
        Ok(Self::assemble(config, http, sinks, fetcher))
    }

    /// Create a client with a scripted artifact fetcher (test seam)
    pub(crate) fn with_fetcher(
        config: Config,
        sinks: Vec<Arc<dyn ArtifactSink>>,
        fetcher: Arc<dyn ArtifactFetcher>,
    ) -> Result<Self> {
        let http = Self::build_http(&config)?;
        Ok(Self::assemble(config, http, sinks, fetcher))
    }

    fn build_http(config: &Config) -> Result<reqwest::Client> {
        config.validate()?;
        // Connect timeout only. Stage deadlines are applied per request, and
        // artifact downloads deliberately run without an overall deadline.
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(http)
    }

    fn assemble(
        config: Config,
        http: reqwest::Client,
        sinks: Vec<Arc<dyn ArtifactSink>>,
        fetcher: Arc<dyn ArtifactFetcher>,
    ) -> Self {
        // Buffer of 1000 events lets multiple subscribers receive all events
        // independently without back-pressuring the transfer.
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        Self {
            http,
            config: Arc::new(config),
            event_tx,
            state: Arc::new(Mutex::new(ClientState::default())),
            cache: DownloadCache::default(),
            sinks: Arc::new(sinks),
            cancel: CancelState::default(),
            fetcher,
        }
    }

    /// Run a full transfer: upload both inputs, submit, poll to completion
    ///
    /// The two uploads run concurrently; submission happens only after both
    /// have a receipt. `on_update` is invoked with every successful status
    /// snapshot, including the terminal one.
    ///
    /// # Errors
    ///
    /// Surfaces the first stage error: [`UploadError`](crate::UploadError),
    /// [`SubmitError`](crate::SubmitError), or a fatal
    /// [`PollError`](crate::PollError). A task that finishes unsuccessfully
    /// is not an `Err` - that comes back as [`Outcome::Failed`] (or
    /// [`Outcome::TimedOut`] / [`Outcome::Cancelled`]).
    pub async fn transfer<F>(
        &self,
        dance_path: &Path,
        bgm_path: &Path,
        on_update: F,
    ) -> Result<Outcome>
    where
        F: FnMut(&StatusSnapshot) + Send,
    {
        let (dance, bgm) = tokio::try_join!(
            self.upload(dance_path, FileKind::Dance),
            self.upload(bgm_path, FileKind::Bgm),
        )?;

        let task_id = self.submit(&dance.file_id, &bgm.file_id).await?;
        self.poll_until_terminal(&task_id, on_update).await
    }

    /// Subscribe to transfer lifecycle events
    ///
    /// Returns a broadcast receiver; every subscriber sees every event. A
    /// receiver that falls more than the channel buffer behind starts
    /// reporting lagged errors and skips ahead.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use beatsync_client::{Config, TransferClient};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = TransferClient::new(Config::default())?;
    /// let mut events = client.subscribe();
    ///
    /// tokio::spawn(async move {
    ///     while let Ok(event) = events.recv().await {
    ///         tracing::info!(?event, "transfer event");
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Subscribe to events as a [`Stream`](futures::Stream)
    ///
    /// Convenience wrapper over [`subscribe`](TransferClient::subscribe) for
    /// `StreamExt` combinators. Lagged receivers yield an `Err` item and
    /// continue.
    pub fn event_stream(&self) -> BroadcastStream<Event> {
        BroadcastStream::new(self.event_tx.subscribe())
    }

    /// Get the current configuration
    ///
    /// The configuration is wrapped in an Arc, so this is a cheap clone.
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Lifecycle phase of the current transfer
    #[must_use]
    pub fn phase(&self) -> TaskPhase {
        self.lock_state().phase
    }

    /// Task identifier of the submitted job, if a submission succeeded
    #[must_use]
    pub fn task_id(&self) -> Option<TaskId> {
        self.lock_state().task_id.clone()
    }

    /// Most recent status snapshot observed by the poll loop
    #[must_use]
    pub fn latest_status(&self) -> Option<StatusSnapshot> {
        self.lock_state().last_snapshot.clone()
    }

    /// Upload receipt for `kind`, if that upload completed
    #[must_use]
    pub fn upload_receipt(&self, kind: FileKind) -> Option<UploadReceipt> {
        self.lock_state().receipts.get(&kind).cloned()
    }

    /// Whether at least one artifact download is currently streaming
    #[must_use]
    pub fn is_downloading(&self) -> bool {
        self.lock_state().active_downloads > 0
    }

    /// Version labels with a cached artifact payload
    #[must_use]
    pub fn cached_versions(&self) -> Vec<String> {
        self.cache.cached_versions()
    }

    /// Reset the client to its initial state
    ///
    /// Synchronously cancels the in-flight poll loop and any streaming
    /// download (both stop cooperatively at their next check), clears the
    /// download cache and all transfer state, and emits [`Event::Reset`].
    /// The client is immediately ready for a fresh transfer.
    pub fn reset(&self) {
        {
            let mut generation = lock(&self.cancel.generation);
            generation.cancel();
            *generation = CancellationToken::new();
        }
        if let Some(active) = lock(&self.cancel.active_poll).take() {
            active.guard.cancel();
        }

        self.cache.clear();
        *self.lock_state() = ClientState::default();

        self.emit_event(Event::Reset);
        tracing::info!("transfer state reset");
    }

    /// Emit an event to all subscribers
    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err when no receiver exists; the event is just dropped
        self.event_tx.send(event).ok();
    }

    /// The cancellation token of the current client generation
    ///
    /// Operations capture this once at their start; `reset()` cancels it and
    /// installs a fresh one, so work started before the reset observes the
    /// cancel while work started after does not.
    pub(crate) fn generation_token(&self) -> CancellationToken {
        lock(&self.cancel.generation).clone()
    }

    /// Register a new poll loop as the active one, superseding any prior loop
    pub(crate) fn register_poll(&self) -> (u64, CancellationToken) {
        let id = self.cancel.next_poll_id.fetch_add(1, Ordering::SeqCst);
        let guard = CancellationToken::new();
        let prior = lock(&self.cancel.active_poll).replace(ActivePoll {
            id,
            guard: guard.clone(),
        });
        if let Some(prev) = prior {
            tracing::debug!(superseded = prev.id, successor = id, "poll loop superseded");
            prev.guard.cancel();
        }
        (id, guard)
    }

    /// Deregister a finished poll loop
    ///
    /// Returns true when the loop was still the registered one. A loop that
    /// was superseded or reset away finds someone else (or nobody) in the
    /// slot and must not report a terminal phase.
    pub(crate) fn finish_poll(&self, id: u64) -> bool {
        let mut slot = lock(&self.cancel.active_poll);
        if slot.as_ref().is_some_and(|active| active.id == id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn set_phase(&self, phase: TaskPhase) {
        self.lock_state().phase = phase;
    }

    pub(crate) fn begin_download(&self) {
        self.lock_state().active_downloads += 1;
    }

    pub(crate) fn end_download(&self) {
        let mut state = self.lock_state();
        // A reset may zero the counter while this download is still in flight.
        state.active_downloads = state.active_downloads.saturating_sub(1);
    }

    pub(crate) fn store_receipt(&self, receipt: UploadReceipt) {
        self.lock_state().receipts.insert(receipt.kind, receipt);
    }

    /// Record the task id of a fresh submission
    ///
    /// A new task invalidates everything remembered from the previous one:
    /// the version-keyed download cache and the last snapshot. Without this,
    /// a reused client would replay the prior task's bytes as the new task's
    /// artifact.
    pub(crate) fn store_task(&self, task_id: TaskId) {
        self.cache.clear();
        let mut state = self.lock_state();
        state.task_id = Some(task_id);
        state.phase = TaskPhase::Submitted;
        state.last_snapshot = None;
    }

    pub(crate) fn store_snapshot(&self, snapshot: StatusSnapshot) {
        self.lock_state().last_snapshot = Some(snapshot);
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        lock(&self.state)
    }
}
