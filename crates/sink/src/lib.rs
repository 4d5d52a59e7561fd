//! Upstream delivery boundary: sink traits, error taxonomy, and the REST
//! client talking to the monitoring controller.

#![forbid(unsafe_code)]

pub mod rest;
pub mod schema;

use async_trait::async_trait;
use thiserror::Error;

use clusterlens_core::MetricPoint;
use schema::SchemaDefWrapper;

/// Errors at the sink boundary. None of these are fatal to the pipeline;
/// every failure is logged and the next tick tries afresh.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("schema: {0}")]
    Schema(String),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

/// Destination for aggregated summary metrics, one batch per cycle.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn post_metrics(&self, batch: &[MetricPoint]) -> Result<(), SinkError>;
}

/// Destination for discrete job event records.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Idempotently ensure the schema exists before records are posted.
    async fn ensure_schema(&self, name: &str, def: &SchemaDefWrapper) -> Result<(), SinkError>;

    /// Deliver one serialized batch of records under the schema name.
    async fn post_events(&self, name: &str, payload: Vec<u8>) -> Result<(), SinkError>;
}

pub use rest::RestClient;
pub use schema::{job_schema, JobSchemaDef};
