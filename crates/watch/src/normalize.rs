//! Job -> JobRecord shaping. Deterministic given the observation time.

use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::Job;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use clusterlens_core::{truncate_field, JobRecord, RecordKey, MAX_FIELD_LENGTH};

/// Stable queue/cache key for a job: (namespace, name).
pub fn job_key(job: &Job) -> RecordKey {
    RecordKey {
        namespace: job.metadata.namespace.clone().unwrap_or_default(),
        name: job.metadata.name.clone().unwrap_or_default(),
    }
}

/// Normalize against the current wall clock.
pub fn normalize(job: &Job, cluster_name: &str) -> JobRecord {
    normalize_at(job, cluster_name, Utc::now())
}

/// Normalize a job into an immutable record, computing the elapsed duration
/// at `now` for non-terminal jobs.
pub fn normalize_at(job: &Job, cluster_name: &str, now: DateTime<Utc>) -> JobRecord {
    let key = job_key(job);

    let labels = flatten_kv(job.metadata.labels.as_ref());
    let annotations = flatten_kv(job.metadata.annotations.as_ref());

    let status = job.status.as_ref();
    let active = status.and_then(|s| s.active).unwrap_or(0);
    let success = status.and_then(|s| s.succeeded).unwrap_or(0);
    let failed = status.and_then(|s| s.failed).unwrap_or(0);

    let start_time = status.and_then(|s| s.start_time.as_ref()).map(|t| t.0);
    let end_time = status.and_then(|s| s.completion_time.as_ref()).map(|t| t.0);

    // Fixed interval once terminal; wall-clock elapsed otherwise.
    let duration = match (start_time, end_time) {
        (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 1000.0,
        (Some(start), None) => (now - start).num_milliseconds() as f64 / 1000.0,
        (None, _) => 0.0,
    };

    let spec = job.spec.as_ref();
    JobRecord {
        name: key.name,
        namespace: key.namespace,
        cluster_name: cluster_name.to_string(),
        labels: truncate_field(labels, MAX_FIELD_LENGTH),
        annotations: truncate_field(annotations, MAX_FIELD_LENGTH),
        active,
        success,
        failed,
        start_time,
        end_time,
        duration,
        active_deadline_seconds: spec.and_then(|s| s.active_deadline_seconds).unwrap_or(0),
        completions: spec.and_then(|s| s.completions).unwrap_or(0),
        backoff_limit: spec.and_then(|s| s.backoff_limit).unwrap_or(0),
        parallelism: spec.and_then(|s| s.parallelism).unwrap_or(0),
    }
}

fn flatten_kv(map: Option<&BTreeMap<String, String>>) -> String {
    let mut out = String::new();
    if let Some(map) = map {
        for (k, v) in map {
            let _ = write!(out, "{}:{};", k, v);
        }
    }
    out
}
