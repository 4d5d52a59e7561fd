//! Local job cache: single writer on the watch dispatch path, lock-free
//! snapshot reads for the aggregator.

use std::sync::Arc;

use arc_swap::ArcSwap;
use k8s_openapi::api::batch::v1::Job;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use clusterlens_core::RecordKey;

/// Create a connected writer/handle pair. The watcher owns the writer; every
/// other task reads through clones of the handle.
pub fn job_cache() -> (CacheWriter, CacheHandle) {
    let snap = Arc::new(ArcSwap::from_pointee(Vec::new()));
    let (synced_tx, synced_rx) = watch::channel(false);
    (
        CacheWriter {
            items: FxHashMap::default(),
            snap: Arc::clone(&snap),
            synced_tx,
        },
        CacheHandle { snap, synced_rx },
    )
}

/// Exclusive write side of the cache, owned by the watch task.
pub struct CacheWriter {
    items: FxHashMap<RecordKey, Job>,
    snap: Arc<ArcSwap<Vec<Job>>>,
    synced_tx: watch::Sender<bool>,
}

impl CacheWriter {
    /// Insert or replace a job, returning the previous value for that key.
    pub fn upsert(&mut self, key: RecordKey, job: Job) -> Option<Job> {
        let old = self.items.insert(key, job);
        self.publish();
        old
    }

    pub fn remove(&mut self, key: &RecordKey) -> Option<Job> {
        let old = self.items.remove(key);
        if old.is_some() {
            self.publish();
        }
        old
    }

    /// Drop every key not present in `keep`, returning the evicted jobs.
    /// Used after a watch relist to reconcile deletions missed while
    /// disconnected.
    pub fn retain_keys(&mut self, keep: &FxHashSet<RecordKey>) -> Vec<Job> {
        let stale: Vec<RecordKey> = self
            .items
            .keys()
            .filter(|k| !keep.contains(*k))
            .cloned()
            .collect();
        let mut evicted = Vec::with_capacity(stale.len());
        for key in &stale {
            if let Some(job) = self.items.remove(key) {
                evicted.push(job);
            }
        }
        if !evicted.is_empty() {
            self.publish();
        }
        evicted
    }

    /// Mark the initial list as fully applied. Idempotent.
    pub fn mark_synced(&self) {
        self.synced_tx.send_replace(true);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn publish(&self) {
        let items: Vec<Job> = self.items.values().cloned().collect();
        metrics::gauge!("watch_cache_objects", items.len() as f64);
        self.snap.store(Arc::new(items));
    }
}

/// Read side of the cache, cheap to clone and share.
#[derive(Clone)]
pub struct CacheHandle {
    snap: Arc<ArcSwap<Vec<Job>>>,
    synced_rx: watch::Receiver<bool>,
}

impl CacheHandle {
    /// Current cache contents for read-only iteration.
    pub fn snapshot(&self) -> Arc<Vec<Job>> {
        self.snap.load_full()
    }

    pub fn has_synced(&self) -> bool {
        *self.synced_rx.borrow()
    }

    /// Block until the initial list has been applied or `cancel` fires.
    /// Returns false when aborted before sync completed.
    pub async fn wait_for_sync(&self, cancel: &CancellationToken) -> bool {
        let mut rx = self.synced_rx.clone();
        if *rx.borrow() {
            return true;
        }
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                changed = rx.changed() => {
                    if changed.is_err() {
                        // writer gone; report whatever state we last saw
                        return *rx.borrow();
                    }
                    if *rx.borrow() {
                        return true;
                    }
                }
            }
        }
    }
}
