//! Test configuration helpers for mock and live BeatSync services

use beatsync_client::Config;
use std::path::PathBuf;
use std::time::Duration;

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Config pointed at a mock server, with every timing knob tightened so the
/// suite finishes in milliseconds instead of the production defaults
pub fn mock_service_config(base_url: &str) -> Config {
    let mut config = Config::new(base_url);
    config.connect_timeout = Duration::from_secs(2);
    config.upload.base_timeout = Duration::from_secs(2);
    config.health.timeout_tiers = vec![Duration::from_millis(500), Duration::from_millis(500)];
    config.health.retry_delay = Duration::from_millis(10);
    config.health.jitter = false;
    config.job.submit_timeout = Duration::from_secs(2);
    config.job.poll_interval = Duration::from_millis(25);
    config.job.max_poll_attempts = 20;
    config.job.status_timeout = Duration::from_secs(2);
    config.download.retry_delay = Duration::from_millis(10);
    config.download.jitter = false;
    config
}

/// Load a live service config from environment variables
///
/// Required environment variables:
/// - `BEATSYNC_URL` - Base URL of the running service
pub fn load_live_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();

    let base_url = std::env::var("BEATSYNC_URL")
        .map_err(|_| ConfigError("BEATSYNC_URL not set in environment".to_string()))?;

    Ok(Config::new(base_url))
}

/// Load the input video paths for live transfer tests
///
/// Required environment variables:
/// - `BEATSYNC_DANCE_FILE` - Path to a dance video the service accepts
/// - `BEATSYNC_BGM_FILE` - Path to a background-music video
pub fn load_live_media() -> Result<(PathBuf, PathBuf), ConfigError> {
    dotenvy::dotenv().ok();

    let dance = std::env::var("BEATSYNC_DANCE_FILE")
        .map_err(|_| ConfigError("BEATSYNC_DANCE_FILE not set in environment".to_string()))?;
    let bgm = std::env::var("BEATSYNC_BGM_FILE")
        .map_err(|_| ConfigError("BEATSYNC_BGM_FILE not set in environment".to_string()))?;

    Ok((PathBuf::from(dance), PathBuf::from(bgm)))
}

/// Check if a live service is configured
pub fn has_live_service() -> bool {
    dotenvy::dotenv().ok();
    std::env::var("BEATSYNC_URL").is_ok()
}

/// Check if live transfer inputs are configured
pub fn has_live_media() -> bool {
    dotenvy::dotenv().ok();
    std::env::var("BEATSYNC_DANCE_FILE").is_ok() && std::env::var("BEATSYNC_BGM_FILE").is_ok()
}
