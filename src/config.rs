//! Configuration types for beatsync-client

use crate::error::{Error, Result};
use crate::types::TaskId;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Upload behavior configuration (validation limits, timeout scaling)
///
/// Groups settings for the upload stage. Used as a nested sub-config within
/// [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Accepted file extensions, matched case-insensitively without the dot
    /// (default: mp4, mov, avi, mkv)
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Maximum accepted file size in bytes (default: 500 MiB)
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Fixed portion of the upload deadline (default: 30 seconds)
    #[serde(default = "default_upload_base_timeout", with = "duration_serde")]
    pub base_timeout: Duration,

    /// Throughput floor used to scale the deadline with file size
    /// (default: 512 KiB/s)
    #[serde(default = "default_assumed_throughput")]
    pub assumed_throughput_bps: u64,

    /// Ceiling for the scaled upload deadline (default: 30 minutes)
    #[serde(default = "default_upload_max_timeout", with = "duration_serde")]
    pub max_timeout: Duration,
}

impl UploadConfig {
    /// Whether `extension` (without the dot) is on the allow-list
    #[must_use]
    pub fn allows_extension(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.to_lowercase() == extension)
    }

    /// The allow-list as a display string for error messages
    #[must_use]
    pub fn allowed_list(&self) -> String {
        self.allowed_extensions.join(", ")
    }

    /// Deadline for uploading a file of `size_bytes`
    ///
    /// `base_timeout` plus the transfer time at the assumed throughput floor,
    /// clamped to `max_timeout`. Small files get a short deadline, large files
    /// a much longer one.
    #[must_use]
    pub fn timeout_for(&self, size_bytes: u64) -> Duration {
        let transfer_secs = size_bytes / self.assumed_throughput_bps.max(1);
        let scaled = self.base_timeout + Duration::from_secs(transfer_secs);
        scaled.min(self.max_timeout)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            max_file_bytes: default_max_file_bytes(),
            base_timeout: default_upload_base_timeout(),
            assumed_throughput_bps: default_assumed_throughput(),
            max_timeout: default_upload_max_timeout(),
        }
    }
}

/// Health probe configuration (escalating timeout tiers)
///
/// Groups settings for the pre-upload service probe. Used as a nested
/// sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Per-attempt timeouts; one probe attempt is made per tier, in order
    /// (default: 2, 5, 10 seconds)
    #[serde(default = "default_timeout_tiers", with = "duration_vec_serde")]
    pub timeout_tiers: Vec<Duration>,

    /// Delay between probe attempts (default: 1 second)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub retry_delay: Duration,

    /// Add random jitter to the delay between attempts (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl HealthConfig {
    /// Number of probe attempts (one per timeout tier)
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.timeout_tiers.len() as u32
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_tiers: default_timeout_tiers(),
            retry_delay: default_retry_delay(),
            jitter: true,
        }
    }
}

/// Job submission and status polling configuration
///
/// Groups settings for the submit request and the poll loop. Used as a
/// nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobConfig {
    /// Deadline for the submission request (default: 30 seconds)
    #[serde(default = "default_submit_timeout", with = "duration_serde")]
    pub submit_timeout: Duration,

    /// Cadence of the status poll loop (default: 5 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Fixed number of poll attempts before the loop gives up
    /// (default: 240, about 20 minutes at the default cadence)
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Deadline for each individual status request (default: 10 seconds)
    #[serde(default = "default_status_timeout", with = "duration_serde")]
    pub status_timeout: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            submit_timeout: default_submit_timeout(),
            poll_interval: default_poll_interval(),
            max_poll_attempts: default_max_poll_attempts(),
            status_timeout: default_status_timeout(),
        }
    }
}

/// Artifact download configuration (restart retries, progress reporting)
///
/// Groups settings for the streaming download engine. Used as a nested
/// sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Restarts permitted after a mid-stream interruption (default: 2)
    ///
    /// The engine makes at most `max_retries + 1` fetch attempts, each from
    /// byte zero.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before a restart (default: 1 second)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub retry_delay: Duration,

    /// Add random jitter to the restart delay (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,

    /// Percentage points between progress events (default: 5)
    #[serde(default = "default_progress_step")]
    pub progress_step: u8,

    /// Directory the built-in file sink saves artifacts into
    /// (default: "./downloads")
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            jitter: true,
            progress_step: default_progress_step(),
            save_dir: default_save_dir(),
        }
    }
}

/// Main configuration for [`TransferClient`](crate::TransferClient)
///
/// Fields are organized into logical sub-configs:
/// - [`upload`](UploadConfig) — validation limits, timeout scaling
/// - [`health`](HealthConfig) — pre-upload probe tiers
/// - [`job`](JobConfig) — submission deadline, poll cadence and ceiling
/// - [`download`](DownloadConfig) — restart retries, progress granularity
///
/// Every knob has a serde default, so a config file only needs the keys it
/// overrides. `Config::default()` targets a local service on port 8000.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the BeatSync service (default: "http://localhost:8000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// TCP connect timeout applied to every request (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Upload stage settings
    #[serde(default)]
    pub upload: UploadConfig,

    /// Health probe settings
    #[serde(default)]
    pub health: HealthConfig,

    /// Submission and polling settings
    #[serde(default)]
    pub job: JobConfig,

    /// Download engine settings
    #[serde(default)]
    pub download: DownloadConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout: default_connect_timeout(),
            upload: UploadConfig::default(),
            health: HealthConfig::default(),
            job: JobConfig::default(),
            download: DownloadConfig::default(),
        }
    }
}

impl Config {
    /// Create a configuration pointing at `base_url`, defaults elsewhere
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Check the configuration for values the client cannot operate with
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| Error::Config {
            message: format!("base_url \"{}\" is not a valid URL: {e}", self.base_url),
            key: Some("base_url".to_string()),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("base_url scheme \"{}\" is not http or https", parsed.scheme()),
                key: Some("base_url".to_string()),
            });
        }
        if self.upload.allowed_extensions.is_empty() {
            return Err(Error::Config {
                message: "allowed_extensions must name at least one extension".to_string(),
                key: Some("upload.allowed_extensions".to_string()),
            });
        }
        if self.upload.max_file_bytes == 0 {
            return Err(Error::Config {
                message: "max_file_bytes must be greater than zero".to_string(),
                key: Some("upload.max_file_bytes".to_string()),
            });
        }
        if self.health.timeout_tiers.is_empty() {
            return Err(Error::Config {
                message: "timeout_tiers must contain at least one tier".to_string(),
                key: Some("health.timeout_tiers".to_string()),
            });
        }
        if self.job.poll_interval.is_zero() {
            return Err(Error::Config {
                message: "poll_interval must be greater than zero".to_string(),
                key: Some("job.poll_interval".to_string()),
            });
        }
        if self.job.max_poll_attempts == 0 {
            return Err(Error::Config {
                message: "max_poll_attempts must be greater than zero".to_string(),
                key: Some("job.max_poll_attempts".to_string()),
            });
        }
        if self.download.progress_step == 0 || self.download.progress_step > 100 {
            return Err(Error::Config {
                message: "progress_step must be between 1 and 100".to_string(),
                key: Some("download.progress_step".to_string()),
            });
        }
        Ok(())
    }
}

// Endpoint builders — every request URL in the crate comes from these, so the
// path layout of the service lives in exactly one place.
impl Config {
    fn api_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// URL of the health endpoint
    #[must_use]
    pub fn health_url(&self) -> String {
        format!("{}/api/health", self.api_base())
    }

    /// URL of the upload endpoint
    #[must_use]
    pub fn upload_url(&self) -> String {
        format!("{}/api/upload", self.api_base())
    }

    /// URL of the job submission endpoint
    #[must_use]
    pub fn process_url(&self) -> String {
        format!("{}/api/process", self.api_base())
    }

    /// URL of the status endpoint for `task_id`
    #[must_use]
    pub fn status_url(&self, task_id: &TaskId) -> String {
        format!(
            "{}/api/status/{}",
            self.api_base(),
            urlencoding::encode(task_id.as_str())
        )
    }

    /// URL of the artifact download endpoint for `task_id` and `version`
    #[must_use]
    pub fn download_url(&self, task_id: &TaskId, version: &str) -> String {
        format!(
            "{}/api/download/{}?version={}",
            self.api_base(),
            urlencoding::encode(task_id.as_str()),
            urlencoding::encode(version)
        )
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_allowed_extensions() -> Vec<String> {
    vec![
        "mp4".to_string(),
        "mov".to_string(),
        "avi".to_string(),
        "mkv".to_string(),
    ]
}

fn default_max_file_bytes() -> u64 {
    500 * 1024 * 1024
}

fn default_upload_base_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_assumed_throughput() -> u64 {
    512 * 1024
}

fn default_upload_max_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_timeout_tiers() -> Vec<Duration> {
    vec![
        Duration::from_secs(2),
        Duration::from_secs(5),
        Duration::from_secs(10),
    ]
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_submit_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_max_poll_attempts() -> u32 {
    240
}

fn default_status_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_retries() -> u32 {
    2
}

fn default_progress_step() -> u8 {
    5
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (seconds as u64)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration list serialization helper (seconds as a u64 array)
mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(durations.iter().map(Duration::as_secs))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Vec::<u64>::deserialize(deserializer)?;
        Ok(secs.into_iter().map(Duration::from_secs).collect())
    }
}
