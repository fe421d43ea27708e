//! Utility functions for filenames, sizes, and retry delays

use crate::types::TaskId;
use rand::Rng;
use std::path::Path;
use std::time::Duration;

/// Format a byte count for logs and status text
///
/// # Examples
///
/// ```
/// use beatsync_client::util::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1536), "1.5 KiB");
/// assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
/// ```
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

/// Extract the lower-cased extension of a path, without the dot
///
/// Returns `None` when the path has no extension or it is not valid UTF-8.
///
/// # Examples
///
/// ```
/// use beatsync_client::util::file_extension;
/// use std::path::Path;
///
/// assert_eq!(file_extension(Path::new("clip.MP4")), Some("mp4".to_string()));
/// assert_eq!(file_extension(Path::new("archive.tar.gz")), Some("gz".to_string()));
/// assert_eq!(file_extension(Path::new("noext")), None);
/// ```
#[must_use]
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

/// Suggested filename for a downloaded artifact
///
/// Follows the service's `beatsync_{task_id}` convention, extended with the
/// version label so two artifacts of the same task do not collide. Characters
/// that are unsafe in filenames are replaced with underscores.
#[must_use]
pub fn suggested_filename(task_id: &TaskId, version: &str) -> String {
    format!(
        "beatsync_{}_{}.mp4",
        sanitize_component(task_id.as_str()),
        sanitize_component(version)
    )
}

fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Apply the configured jitter policy to a retry delay
///
/// With jitter enabled the delay is multiplied by a uniform factor in
/// `1.0..=2.0` to prevent synchronized retries; otherwise it is returned
/// unchanged.
#[must_use]
pub(crate) fn retry_delay(base: Duration, jitter: bool) -> Duration {
    if !jitter {
        return base;
    }
    let mut rng = rand::thread_rng();
    let factor: f64 = rng.gen_range(1.0..=2.0);
    Duration::from_secs_f64(base.as_secs_f64() * factor)
}
