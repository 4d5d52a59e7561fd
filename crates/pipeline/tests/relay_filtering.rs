#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::batch::v1::Job;
use tokio::sync::mpsc;

use clusterlens_core::{AgentConfig, ConfigHandle};
use clusterlens_pipeline::{spawn_relay, IngestQueue};
use clusterlens_watch::RawEvent;

fn job(ns: &str, name: &str) -> Job {
    let mut job = Job::default();
    job.metadata.namespace = Some(ns.to_string());
    job.metadata.name = Some(name.to_string());
    job
}

async fn run_relay(cfg: AgentConfig, events: Vec<RawEvent>) -> Arc<IngestQueue> {
    let queue = Arc::new(IngestQueue::with_capacity(64));
    let (tx, rx) = mpsc::channel(16);
    let handle = spawn_relay(rx, Arc::clone(&queue), ConfigHandle::new(cfg));
    for ev in events {
        tx.send(ev).await.expect("send event");
    }
    drop(tx);
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("relay did not exit on channel close")
        .expect("relay panicked");
    queue
}

#[tokio::test]
async fn all_lifecycle_kinds_enqueue_one_record_each() {
    let events = vec![
        RawEvent::Added(job("batch", "a")),
        RawEvent::Updated {
            old: job("batch", "a"),
            new: job("batch", "a"),
        },
        RawEvent::Deleted(job("batch", "a")),
    ];
    let queue = run_relay(AgentConfig::default(), events).await;
    // deletions enqueue too; there is no tombstone handling
    assert_eq!(queue.len(), 3);
}

#[tokio::test]
async fn out_of_scope_namespaces_are_dropped() {
    let cfg = AgentConfig {
        exclude_namespaces: vec!["kube-system".into()],
        ..Default::default()
    };
    let events = vec![
        RawEvent::Added(job("kube-system", "sys")),
        RawEvent::Added(job("batch", "ok")),
    ];
    let queue = run_relay(cfg, events).await;

    assert_eq!(queue.len(), 1);
    assert_eq!(queue.get().await.unwrap().name, "ok");
}

#[tokio::test]
async fn include_list_limits_scope() {
    let cfg = AgentConfig {
        include_namespaces: vec!["etl".into()],
        ..Default::default()
    };
    let events = vec![
        RawEvent::Added(job("etl", "in")),
        RawEvent::Added(job("web", "out")),
    ];
    let queue = run_relay(cfg, events).await;
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn updates_filter_and_normalize_from_the_old_object() {
    let cfg = AgentConfig {
        cluster_name: "prod".into(),
        ..Default::default()
    };
    let mut old = job("etl", "renamed-before");
    old.metadata.labels = Some(
        [("phase".to_string(), "old".to_string())].into_iter().collect(),
    );
    let new = job("etl", "renamed-after");

    let queue = run_relay(cfg, vec![RawEvent::Updated { old, new }]).await;

    let rec = queue.get().await.unwrap();
    assert_eq!(rec.name, "renamed-before");
    assert_eq!(rec.labels, "phase:old;");
    assert_eq!(rec.cluster_name, "prod");
}
