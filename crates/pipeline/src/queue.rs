//! Ingest queue decoupling watch events from the periodic flusher.
//!
//! FIFO with fixed capacity: when full, the oldest record is dropped and
//! counted rather than back-pressuring the watch dispatch path. Records are
//! never coalesced; every observed change stays an individual record. The
//! (namespace, name) key only scopes the done/forget bookkeeping.

use std::collections::VecDeque;
use std::sync::Mutex;

use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::Notify;
use tracing::debug;

use clusterlens_core::{JobRecord, RecordKey};

pub struct IngestQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

struct QueueState {
    order: VecDeque<JobRecord>,
    processing: FxHashSet<RecordKey>,
    attempts: FxHashMap<RecordKey, u32>,
    cap: usize,
    dropped: u64,
    shutting_down: bool,
}

impl IngestQueue {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                order: VecDeque::new(),
                processing: FxHashSet::default(),
                attempts: FxHashMap::default(),
                cap: cap.max(1),
                dropped: 0,
                shutting_down: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Non-blocking enqueue, safe on the watch dispatch path. Past capacity
    /// the oldest record is dropped instead of blocking the producer.
    pub fn add(&self, rec: JobRecord) {
        {
            let mut st = self.state.lock().expect("queue poisoned");
            if st.shutting_down {
                return;
            }
            if st.order.len() >= st.cap {
                st.order.pop_front();
                st.dropped += 1;
                metrics::counter!("ingest_dropped_total", 1u64);
            }
            st.order.push_back(rec);
            metrics::gauge!("ingest_queue_depth", st.order.len() as f64);
        }
        self.notify.notify_one();
    }

    /// Block until a record is available or the queue shuts down; `None`
    /// means shutting down.
    pub async fn get(&self) -> Option<JobRecord> {
        loop {
            let notified = self.notify.notified();
            {
                let mut st = self.state.lock().expect("queue poisoned");
                if st.shutting_down {
                    return None;
                }
                if let Some(rec) = st.order.pop_front() {
                    let key = rec.key();
                    *st.attempts.entry(key.clone()).or_insert(0) += 1;
                    st.processing.insert(key);
                    metrics::gauge!("ingest_queue_depth", st.order.len() as f64);
                    return Some(rec);
                }
            }
            notified.await;
        }
    }

    /// Release the in-flight marker for a key after processing.
    pub fn done(&self, key: &RecordKey) {
        let mut st = self.state.lock().expect("queue poisoned");
        st.processing.remove(key);
    }

    /// Clear retry bookkeeping for a key.
    pub fn forget(&self, key: &RecordKey) {
        let mut st = self.state.lock().expect("queue poisoned");
        st.attempts.remove(key);
    }

    /// Backlog size; a snapshot, not a guarantee against concurrent producers.
    pub fn len(&self) -> usize {
        self.state.lock().expect("queue poisoned").order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records discarded because the queue was at capacity.
    pub fn dropped(&self) -> u64 {
        self.state.lock().expect("queue poisoned").dropped
    }

    /// Make all blocked and future `get` calls return `None` immediately.
    pub fn shut_down(&self) {
        {
            let mut st = self.state.lock().expect("queue poisoned");
            st.shutting_down = true;
            debug!(backlog = st.order.len(), "ingest queue shutting down");
        }
        self.notify.notify_waiters();
    }
}
