#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use clusterlens_core::{AgentConfig, ConfigHandle, JobRecord};
use clusterlens_pipeline::{Flusher, IngestQueue};
use clusterlens_sink::schema::SchemaDefWrapper;
use clusterlens_sink::{EventSink, SinkError};

#[derive(Default)]
struct RecordingEventSink {
    fail_schema: bool,
    schema_calls: AtomicUsize,
    batches: Mutex<Vec<Vec<JobRecord>>>,
}

impl RecordingEventSink {
    fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn ensure_schema(&self, _name: &str, _def: &SchemaDefWrapper) -> Result<(), SinkError> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_schema {
            return Err(SinkError::Schema("schema backend down".into()));
        }
        Ok(())
    }

    async fn post_events(&self, _name: &str, payload: Vec<u8>) -> Result<(), SinkError> {
        let records: Vec<JobRecord> = serde_json::from_slice(&payload)?;
        self.batches.lock().unwrap().push(records);
        Ok(())
    }
}

fn rec(n: usize) -> JobRecord {
    JobRecord {
        name: format!("job-{n}"),
        cluster_name: "c".into(),
        namespace: "batch".into(),
        labels: String::new(),
        annotations: String::new(),
        active: 0,
        success: 1,
        failed: 0,
        start_time: None,
        end_time: None,
        duration: 1.0,
        active_deadline_seconds: 0,
        completions: 1,
        backoff_limit: 0,
        parallelism: 1,
    }
}

fn fixture(batch_limit: usize, sink: Arc<RecordingEventSink>) -> (Arc<IngestQueue>, Flusher) {
    let cfg = AgentConfig {
        event_batch_limit: batch_limit,
        ..Default::default()
    };
    let queue = Arc::new(IngestQueue::with_capacity(1024));
    let flusher = Flusher::new(Arc::clone(&queue), sink, ConfigHandle::new(cfg));
    (queue, flusher)
}

#[tokio::test]
async fn small_backlog_ships_in_one_call() {
    // scenario: 3 queued, limit 10 -> one delivery of 3, queue empty
    let sink = Arc::new(RecordingEventSink::default());
    let (queue, flusher) = fixture(10, Arc::clone(&sink));
    for n in 0..3 {
        queue.add(rec(n));
    }

    flusher.flush_once().await;

    assert_eq!(sink.batch_sizes(), vec![3]);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn backlog_larger_than_limit_drains_over_ticks() {
    // scenario: 25 queued, limit 10 -> 10 per tick, empty after 3 ticks
    let sink = Arc::new(RecordingEventSink::default());
    let (queue, flusher) = fixture(10, Arc::clone(&sink));
    for n in 0..25 {
        queue.add(rec(n));
    }

    flusher.flush_once().await;
    assert_eq!(queue.len(), 15);
    flusher.flush_once().await;
    assert_eq!(queue.len(), 5);
    flusher.flush_once().await;
    assert!(queue.is_empty());

    assert_eq!(sink.batch_sizes(), vec![10, 10, 5]);
}

#[tokio::test]
async fn batch_never_exceeds_limit() {
    let sink = Arc::new(RecordingEventSink::default());
    let (queue, flusher) = fixture(4, Arc::clone(&sink));
    for n in 0..9 {
        queue.add(rec(n));
    }

    flusher.flush_once().await;
    let sizes = sink.batch_sizes();
    assert!(sizes.iter().all(|&s| s <= 4), "oversized batch: {sizes:?}");
}

#[tokio::test]
async fn empty_queue_is_a_noop() {
    let sink = Arc::new(RecordingEventSink::default());
    let (_queue, flusher) = fixture(10, Arc::clone(&sink));

    flusher.flush_once().await;

    assert_eq!(sink.schema_calls.load(Ordering::SeqCst), 0);
    assert!(sink.batch_sizes().is_empty());
}

#[tokio::test]
async fn schema_failure_drops_drained_records_without_posting() {
    let sink = Arc::new(RecordingEventSink {
        fail_schema: true,
        ..Default::default()
    });
    let (queue, flusher) = fixture(10, Arc::clone(&sink));
    for n in 0..3 {
        queue.add(rec(n));
    }

    flusher.flush_once().await;

    // drained items are gone, nothing was posted, nothing re-enqueued
    assert_eq!(sink.schema_calls.load(Ordering::SeqCst), 1);
    assert!(sink.batch_sizes().is_empty());
    assert!(queue.is_empty());
}

#[tokio::test]
async fn delivery_preserves_queue_fifo_order() {
    let sink = Arc::new(RecordingEventSink::default());
    let (queue, flusher) = fixture(10, Arc::clone(&sink));
    for n in 0..5 {
        queue.add(rec(n));
    }

    flusher.flush_once().await;

    let batches = sink.batches.lock().unwrap();
    let names: Vec<&str> = batches[0].iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["job-0", "job-1", "job-2", "job-3", "job-4"]);
}
