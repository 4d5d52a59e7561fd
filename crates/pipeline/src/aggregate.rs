//! Periodic metrics aggregation over the watcher's cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use clusterlens_core::{flatten_points, summarize, ConfigHandle, JobRecord};
use clusterlens_sink::MetricsSink;
use clusterlens_watch::{normalize, CacheHandle};

/// Recomputes scope summaries from a cache snapshot on a fixed period and
/// delivers the flattened batch in one call. The summary map lives and dies
/// inside a single cycle; nothing aggregates across ticks.
pub struct Aggregator {
    cache: CacheHandle,
    sink: Arc<dyn MetricsSink>,
    config: ConfigHandle,
}

impl Aggregator {
    pub fn new(cache: CacheHandle, sink: Arc<dyn MetricsSink>, config: ConfigHandle) -> Self {
        Self {
            cache,
            sink,
            config,
        }
    }

    /// Tick until cancelled. The cadence is read once at startup; everything
    /// else is re-read from config every cycle.
    pub async fn run(self, cancel: CancellationToken) {
        let period = Duration::from_secs(self.config.get().aggregate_interval_secs.max(1));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.aggregate_once().await,
            }
        }
        info!("aggregator stopped");
    }

    /// One full cycle: snapshot, fold, flatten, deliver.
    pub async fn aggregate_once(&self) {
        let t0 = Instant::now();
        let cfg = self.config.get();
        let snapshot = self.cache.snapshot();

        let records: Vec<JobRecord> = snapshot
            .iter()
            .map(|job| normalize(job, &cfg.cluster_name))
            .collect();
        let summaries = summarize(&records, &cfg.metric_root);
        let points = flatten_points(&summaries);

        info!(
            jobs = records.len(),
            scopes = summaries.len(),
            points = points.len(),
            "ready to push job metrics"
        );
        if let Err(e) = self.sink.post_metrics(&points).await {
            warn!(error = %e, "metric delivery failed; retrying on next cycle");
        }
        metrics::histogram!(
            "aggregate_cycle_ms",
            t0.elapsed().as_secs_f64() * 1000.0
        );
    }
}
