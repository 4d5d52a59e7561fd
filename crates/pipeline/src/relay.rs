//! Relay task: scope filtering + normalization between the watch stream and
//! the ingest queue. The only work on this path is a predicate, a record
//! build, and a non-blocking enqueue.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use clusterlens_core::ConfigHandle;
use clusterlens_watch::{normalize, RawEvent};

use crate::queue::IngestQueue;

/// Consume raw watch events until the channel closes.
///
/// All three lifecycle kinds enqueue a record; deletions carry no tombstone
/// marker. Updates are filtered and normalized from the old object: a
/// namespace never changes in place, and the update's pre-image is the state
/// the previous event left unreported.
pub fn spawn_relay(
    mut events: mpsc::Receiver<RawEvent>,
    queue: Arc<IngestQueue>,
    config: ConfigHandle,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(ev) = events.recv().await {
            let cfg = config.get();
            let (job, verb) = match &ev {
                RawEvent::Added(job) => (job, "added"),
                RawEvent::Updated { old, new: _ } => (old, "updated"),
                RawEvent::Deleted(job) => (job, "deleted"),
            };
            let namespace = job.metadata.namespace.as_deref().unwrap_or("");
            if !cfg.qualifies(namespace) {
                continue;
            }
            debug!(
                job = %job.metadata.name.as_deref().unwrap_or(""),
                ns = %namespace,
                verb,
                "job event in scope"
            );
            queue.add(normalize(job, &cfg.cluster_name));
        }
        debug!("event channel closed; relay exiting");
    })
}
