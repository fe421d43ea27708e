//! Per-version cache of completed downloads
//!
//! An artifact that was fully received once is never fetched again for the
//! same version label: repeat requests replay the cached payload straight
//! into the sink chain. The cache holds at most one record per version and
//! lives until the next task: records are keyed by version label alone, so
//! submitting a new task empties the store, as does a client reset.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A completed artifact download, remembered for replay
#[derive(Clone, Debug)]
pub struct DownloadRecord {
    /// Version label this record caches
    pub version: String,

    /// The full artifact payload
    pub payload: Bytes,

    /// Filename the artifact is delivered under
    pub filename: String,

    /// Locator returned by the sink on the most recent delivery, if any
    pub locator: Option<String>,

    /// When the payload finished downloading
    pub cached_at: DateTime<Utc>,
}

/// Version-keyed store of [`DownloadRecord`]s
///
/// Clones share the same underlying map. Accessors take brief internal locks
/// and never hold them across await points.
#[derive(Clone, Debug, Default)]
pub(crate) struct DownloadCache {
    records: Arc<Mutex<HashMap<String, DownloadRecord>>>,
}

impl DownloadCache {
    /// Cached record for `version`, if one exists
    pub(crate) fn get(&self, version: &str) -> Option<DownloadRecord> {
        self.lock().get(version).cloned()
    }

    /// Store `record`, replacing any prior record for the same version
    pub(crate) fn put(&self, record: DownloadRecord) {
        self.lock().insert(record.version.clone(), record);
    }

    /// Drop the record for `version`, returning it if it existed
    pub(crate) fn invalidate(&self, version: &str) -> Option<DownloadRecord> {
        self.lock().remove(version)
    }

    /// Drop every record
    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    /// Version labels with a cached payload, sorted for stable output
    pub(crate) fn cached_versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.lock().keys().cloned().collect();
        versions.sort();
        versions
    }

    /// Lock the record map; entries are self-contained values, so a poisoned
    /// lock still yields usable data.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DownloadRecord>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
