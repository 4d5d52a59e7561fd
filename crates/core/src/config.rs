//! Agent configuration and the in-scope predicate.
//!
//! Configuration is read fresh on every use via [`ConfigHandle`]; nothing in
//! the pipeline caches it across ticks, so a replaced config takes effect on
//! the next cycle without a restart.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

fn default_cluster_name() -> String {
    "k8s-cluster".to_string()
}

fn default_event_batch_limit() -> usize {
    100
}

fn default_job_schema_name() -> String {
    "k8s_jobs".to_string()
}

fn default_metric_root() -> String {
    "Server|Component:Cluster".to_string()
}

fn default_aggregate_interval_secs() -> u64 {
    45
}

fn default_flush_interval_secs() -> u64 {
    15
}

fn default_queue_capacity() -> usize {
    2048
}

/// Top-level agent configuration, typically loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Cluster identity stamped on every record.
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// Namespaces to monitor; empty means all.
    #[serde(default)]
    pub include_namespaces: Vec<String>,

    /// Namespaces to skip; exclusion always wins over inclusion.
    #[serde(default)]
    pub exclude_namespaces: Vec<String>,

    /// Maximum records delivered to the event sink per flush tick.
    #[serde(default = "default_event_batch_limit")]
    pub event_batch_limit: usize,

    /// Event schema name at the monitoring backend.
    #[serde(default = "default_job_schema_name")]
    pub job_schema_name: String,

    /// Metric path prefix for summary data points.
    #[serde(default = "default_metric_root")]
    pub metric_root: String,

    /// Cadence of the metrics snapshot task, in seconds.
    #[serde(default = "default_aggregate_interval_secs")]
    pub aggregate_interval_secs: u64,

    /// Cadence of the event flush task, in seconds.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// Ingest queue capacity; the oldest record is dropped past this point.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Monitoring controller base URL, e.g. "https://controller.example.com".
    #[serde(default)]
    pub controller_url: String,

    /// Account name sent with every controller request.
    #[serde(default)]
    pub account_name: String,

    /// Access key sent with every controller request.
    #[serde(default)]
    pub api_key: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cluster_name: default_cluster_name(),
            include_namespaces: Vec::new(),
            exclude_namespaces: Vec::new(),
            event_batch_limit: default_event_batch_limit(),
            job_schema_name: default_job_schema_name(),
            metric_root: default_metric_root(),
            aggregate_interval_secs: default_aggregate_interval_secs(),
            flush_interval_secs: default_flush_interval_secs(),
            queue_capacity: default_queue_capacity(),
            controller_url: String::new(),
            account_name: String::new(),
            api_key: String::new(),
        }
    }
}

impl AgentConfig {
    /// Whether an object in `namespace` is in scope under this config.
    pub fn qualifies(&self, namespace: &str) -> bool {
        qualifies(
            namespace,
            &self.include_namespaces,
            &self.exclude_namespaces,
        )
    }
}

/// Pure scope predicate: in scope iff the include list is empty or contains
/// the namespace, and the exclude list does not. Exclude wins over include.
pub fn qualifies(namespace: &str, include: &[String], exclude: &[String]) -> bool {
    (include.is_empty() || include.iter().any(|ns| ns == namespace))
        && !exclude.iter().any(|ns| ns == namespace)
}

/// Shared, swappable view of the current configuration.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<ArcSwap<AgentConfig>>,
}

impl ConfigHandle {
    pub fn new(cfg: AgentConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(cfg)),
        }
    }

    /// Current configuration snapshot.
    pub fn get(&self) -> Arc<AgentConfig> {
        self.inner.load_full()
    }

    /// Swap in a new configuration; readers pick it up on their next use.
    pub fn replace(&self, cfg: AgentConfig) {
        self.inner.store(Arc::new(cfg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nss(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_include_means_all() {
        assert!(qualifies("anything", &[], &[]));
    }

    #[test]
    fn include_list_restricts() {
        let include = nss(&["a", "b"]);
        assert!(qualifies("a", &include, &[]));
        assert!(!qualifies("c", &include, &[]));
    }

    #[test]
    fn exclude_wins_over_include() {
        // "kube-system" present in both lists must not qualify
        let include = nss(&["kube-system"]);
        let exclude = nss(&["kube-system"]);
        assert!(!qualifies("kube-system", &include, &exclude));
    }

    #[test]
    fn exclude_applies_with_empty_include() {
        let exclude = nss(&["kube-system"]);
        assert!(!qualifies("kube-system", &[], &exclude));
        assert!(qualifies("default", &[], &exclude));
    }

    #[test]
    fn handle_swaps_take_effect() {
        let handle = ConfigHandle::new(AgentConfig::default());
        assert!(handle.get().qualifies("kube-system"));

        let mut cfg = AgentConfig::default();
        cfg.exclude_namespaces = nss(&["kube-system"]);
        handle.replace(cfg);
        assert!(!handle.get().qualifies("kube-system"));
    }
}
