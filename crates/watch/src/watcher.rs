//! Long-running job list+watch loop.
//!
//! Lifecycle events are forwarded over an mpsc channel instead of callbacks so
//! the dispatch path stays non-blocking and the consumer can be tested in
//! isolation. Transient transport errors are absorbed by the kube watcher,
//! which relists and resumes on its own; this loop only logs them.

use futures::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use kube::{
    api::Api,
    runtime::watcher::{self, Event},
    Client,
};
use rustc_hash::FxHashSet;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::CacheWriter;
use crate::normalize::job_key;

/// Lifecycle event for one watched job.
#[derive(Debug, Clone)]
pub enum RawEvent {
    Added(Job),
    Updated { old: Job, new: Job },
    Deleted(Job),
}

/// Run the watch loop until `cancel` fires or the stream ends.
///
/// Applies every event to the cache before forwarding it, so consumers always
/// observe the cache at least as fresh as the event they are handling. The
/// first completed relist marks the cache synced.
pub async fn run_job_watch(
    client: Client,
    mut writer: CacheWriter,
    events_tx: mpsc::Sender<RawEvent>,
    cancel: CancellationToken,
) {
    let api: Api<Job> = Api::all(client);
    let stream = watcher::watcher(api, watcher::Config::default());
    futures::pin_mut!(stream);
    info!("job watcher started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("job watcher stopping");
                break;
            }
            ev = stream.next() => match ev {
                Some(Ok(Event::Applied(job))) => {
                    let key = job_key(&job);
                    match writer.upsert(key, job.clone()) {
                        Some(old) => {
                            debug!(job = %job.metadata.name.as_deref().unwrap_or(""), "updated job");
                            let _ = events_tx.send(RawEvent::Updated { old, new: job }).await;
                        }
                        None => {
                            debug!(job = %job.metadata.name.as_deref().unwrap_or(""), "added job");
                            let _ = events_tx.send(RawEvent::Added(job)).await;
                        }
                    }
                }
                Some(Ok(Event::Deleted(job))) => {
                    debug!(job = %job.metadata.name.as_deref().unwrap_or(""), "deleted job");
                    writer.remove(&job_key(&job));
                    let _ = events_tx.send(RawEvent::Deleted(job)).await;
                }
                Some(Ok(Event::Restarted(list))) => {
                    debug!(count = list.len(), "watch relist");
                    let keep: FxHashSet<_> = list.iter().map(job_key).collect();
                    for job in writer.retain_keys(&keep) {
                        let _ = events_tx.send(RawEvent::Deleted(job)).await;
                    }
                    for job in list {
                        let key = job_key(&job);
                        match writer.upsert(key, job.clone()) {
                            Some(old) => {
                                let _ = events_tx.send(RawEvent::Updated { old, new: job }).await;
                            }
                            None => {
                                let _ = events_tx.send(RawEvent::Added(job)).await;
                            }
                        }
                    }
                    writer.mark_synced();
                }
                Some(Err(e)) => {
                    metrics::counter!("watch_errors_total", 1u64);
                    warn!(error = %e, "watch error; stream will relist and resume");
                }
                None => {
                    warn!("watch stream ended");
                    break;
                }
            }
        }
    }
}
