//! Pipeline lifecycle: startup ordering, task spawning, shutdown joining.

use std::sync::Arc;

use kube::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use clusterlens_core::ConfigHandle;
use clusterlens_sink::{EventSink, MetricsSink};
use clusterlens_watch::{job_cache, run_job_watch};

use crate::aggregate::Aggregator;
use crate::flush::Flusher;
use crate::queue::IngestQueue;
use crate::relay::spawn_relay;

/// Owns the pipeline's tasks for one resource kind.
///
/// Startup order: watch loop + relay first, then block on cache sync, then
/// the periodic tasks. Shutdown: the cancellation token stops every task, the
/// queue is shut down, and `observe` joins all tasks before returning.
pub struct PipelineController {
    client: Client,
    queue: Arc<IngestQueue>,
    metrics_sink: Arc<dyn MetricsSink>,
    event_sink: Arc<dyn EventSink>,
    config: ConfigHandle,
}

impl PipelineController {
    pub fn new(
        client: Client,
        config: ConfigHandle,
        metrics_sink: Arc<dyn MetricsSink>,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        let queue = Arc::new(IngestQueue::with_capacity(config.get().queue_capacity));
        Self {
            client,
            queue,
            metrics_sink,
            event_sink,
            config,
        }
    }

    /// Run the pipeline until `cancel` fires; returns after every background
    /// task has been joined.
    pub async fn observe(self, cancel: CancellationToken) -> anyhow::Result<()> {
        let cfg = self.config.get();
        let (events_tx, events_rx) = mpsc::channel(cfg.queue_capacity.max(1));
        let (writer, cache) = job_cache();

        let mut tasks: Vec<JoinHandle<()>> = Vec::new();
        tasks.push(tokio::spawn(run_job_watch(
            self.client.clone(),
            writer,
            events_tx,
            cancel.clone(),
        )));
        tasks.push(spawn_relay(
            events_rx,
            Arc::clone(&self.queue),
            self.config.clone(),
        ));

        if cache.wait_for_sync(&cancel).await {
            info!("cache synchronized; starting job processing");
        } else {
            // non-fatal: proceed best-effort with whatever the cache holds
            warn!("cache sync incomplete at startup");
        }

        let aggregator = Aggregator::new(
            cache.clone(),
            Arc::clone(&self.metrics_sink),
            self.config.clone(),
        );
        tasks.push(tokio::spawn(aggregator.run(cancel.clone())));

        let flusher = Flusher::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.event_sink),
            self.config.clone(),
        );
        tasks.push(tokio::spawn(flusher.run(cancel.clone())));

        cancel.cancelled().await;
        self.queue.shut_down();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "pipeline task join failed");
            }
        }
        info!("pipeline stopped");
        Ok(())
    }
}
