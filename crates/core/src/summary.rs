//! Per-scope running aggregates, rebuilt from scratch every aggregation cycle.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::record::JobRecord;
use crate::ALL_SCOPE;

/// Summary metrics for one scope: the `ALL` sentinel or a namespace.
///
/// The whole summary map is discarded and rebuilt at the start of every
/// aggregation cycle; it is a point-in-time snapshot, never carried across
/// cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeSummary {
    pub namespace: String,
    pub path: String,
    pub job_count: i64,
    pub job_active_count: i64,
    pub job_success_count: i64,
    pub job_failed_count: i64,
    pub job_duration: i64,
}

impl ScopeSummary {
    pub fn new(metric_root: &str, scope: &str) -> Self {
        Self {
            namespace: scope.to_string(),
            path: format!("{}|Jobs|{}", metric_root, scope),
            job_count: 0,
            job_active_count: 0,
            job_success_count: 0,
            job_failed_count: 0,
            job_duration: 0,
        }
    }

    /// Fold one record into this summary.
    pub fn fold(&mut self, rec: &JobRecord) {
        self.job_count += 1;
        self.job_active_count += i64::from(rec.active);
        self.job_success_count += i64::from(rec.success);
        self.job_failed_count += i64::from(rec.failed);
        self.job_duration += rec.duration as i64;
    }

    /// Flatten every numeric field into an individually named data point.
    /// Identity fields (namespace, path) are not emitted.
    pub fn metric_points(&self) -> Vec<MetricPoint> {
        vec![
            MetricPoint::new("JobCount", self.job_count, &self.path),
            MetricPoint::new("JobActiveCount", self.job_active_count, &self.path),
            MetricPoint::new("JobSuccessCount", self.job_success_count, &self.path),
            MetricPoint::new("JobFailedCount", self.job_failed_count, &self.path),
            MetricPoint::new("JobDuration", self.job_duration, &self.path),
        ]
    }
}

/// One named metric data point scoped by a summary path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPoint {
    pub metric_name: String,
    pub metric_value: i64,
    pub metric_path: String,
}

impl MetricPoint {
    pub fn new(name: &str, value: i64, path: &str) -> Self {
        Self {
            metric_name: name.to_string(),
            metric_value: value,
            metric_path: path.to_string(),
        }
    }
}

/// Build the scope summary map for one cycle.
///
/// The `ALL` summary always exists: when `records` is empty a single
/// zero-valued `ALL` entry is synthesized so downstream delivery still emits a
/// baseline point.
pub fn summarize(records: &[JobRecord], metric_root: &str) -> FxHashMap<String, ScopeSummary> {
    let mut map: FxHashMap<String, ScopeSummary> = FxHashMap::default();
    for rec in records {
        map.entry(ALL_SCOPE.to_string())
            .or_insert_with(|| ScopeSummary::new(metric_root, ALL_SCOPE))
            .fold(rec);
        map.entry(rec.namespace.clone())
            .or_insert_with(|| ScopeSummary::new(metric_root, &rec.namespace))
            .fold(rec);
    }
    if map.is_empty() {
        map.insert(
            ALL_SCOPE.to_string(),
            ScopeSummary::new(metric_root, ALL_SCOPE),
        );
    }
    map
}

/// Flatten an entire summary map into the metric batch delivered per cycle.
pub fn flatten_points(map: &FxHashMap<String, ScopeSummary>) -> Vec<MetricPoint> {
    let mut out = Vec::with_capacity(map.len() * 5);
    for summary in map.values() {
        out.extend(summary.metric_points());
    }
    out
}
