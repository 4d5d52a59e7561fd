//! Normalized snapshot of a watched Job at one point in time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identity of a record inside the ingest queue.
///
/// Every watch event produces a fresh `JobRecord` instance; the key deduplicates
/// per-object bookkeeping (done/forget), not the records themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub namespace: String,
    pub name: String,
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Immutable, flattened view of one Job as observed by the watcher.
///
/// Constructed once per watch event and never mutated afterwards. Duration is
/// fixed (`end - start`) for terminal jobs, wall-clock elapsed otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub name: String,
    pub cluster_name: String,
    pub namespace: String,
    pub labels: String,
    pub annotations: String,
    pub active: i32,
    pub success: i32,
    pub failed: i32,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: f64,
    pub active_deadline_seconds: i64,
    pub completions: i32,
    pub backoff_limit: i32,
    pub parallelism: i32,
}

impl JobRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

/// Truncate a serialized field to `max` bytes, respecting char boundaries.
pub fn truncate_field(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}
