//! Periodic event flush: drain the ingest queue in bounded batches and
//! deliver them to the event sink.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use clusterlens_core::{ConfigHandle, JobRecord};
use clusterlens_sink::{job_schema, EventSink};

use crate::queue::IngestQueue;

/// Drains up to min(backlog, batch limit) records per tick and ships them as
/// one payload. Remaining backlog waits for the next tick: bounded batch size
/// is traded for delivery latency. Drained records are never re-enqueued; a
/// failed tick loses them (best-effort delivery).
pub struct Flusher {
    queue: Arc<IngestQueue>,
    sink: Arc<dyn EventSink>,
    config: ConfigHandle,
}

impl Flusher {
    pub fn new(queue: Arc<IngestQueue>, sink: Arc<dyn EventSink>, config: ConfigHandle) -> Self {
        Self {
            queue,
            sink,
            config,
        }
    }

    /// Tick until cancelled; cadence fixed at startup, batch limit and schema
    /// name re-read from config every tick.
    pub async fn run(self, cancel: CancellationToken) {
        let period = Duration::from_secs(self.config.get().flush_interval_secs.max(1));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.flush_once().await,
            }
        }
        info!("flusher stopped");
    }

    /// One flush tick. No-op on an empty queue; never pulls more items than
    /// the backlog observed at tick start, so it cannot block on `get`.
    pub async fn flush_once(&self) {
        let backlog = self.queue.len();
        if backlog == 0 {
            return;
        }
        let cfg = self.config.get();
        let limit = cfg.event_batch_limit.max(1);

        info!(backlog, "flushing job record queue");
        let mut batch: Vec<JobRecord> = Vec::with_capacity(backlog.min(limit));
        for _ in 0..backlog {
            match self.queue.get().await {
                Some(rec) => {
                    let key = rec.key();
                    self.queue.done(&key);
                    self.queue.forget(&key);
                    batch.push(rec);
                    if batch.len() >= limit {
                        break;
                    }
                }
                None => {
                    info!("ingest queue shut down mid-flush");
                    break;
                }
            }
        }
        if batch.is_empty() {
            return;
        }
        metrics::counter!("flush_records_total", batch.len() as u64);
        self.deliver(&cfg.job_schema_name, batch).await;
    }

    async fn deliver(&self, schema_name: &str, batch: Vec<JobRecord>) {
        if let Err(e) = self.sink.ensure_schema(schema_name, &job_schema()).await {
            // drained records are not re-enqueued; next tick starts clean
            error!(
                schema = %schema_name,
                records = batch.len(),
                error = %e,
                "failed to ensure event schema; skipping this tick's delivery"
            );
            return;
        }
        let payload = match serde_json::to_vec(&batch) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "failed to serialize job records; skipping delivery");
                return;
            }
        };
        debug!(records = batch.len(), bytes = payload.len(), "sending job records to events api");
        if let Err(e) = self.sink.post_events(schema_name, payload).await {
            error!(error = %e, "failed to post job records");
        }
    }
}
