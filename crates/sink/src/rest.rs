//! REST client for the monitoring controller's metrics and events APIs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use clusterlens_core::{AgentConfig, MetricPoint};

use crate::schema::SchemaDefWrapper;
use crate::{EventSink, MetricsSink, SinkError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const ACCOUNT_HEADER: &str = "X-Account-Name";
const API_KEY_HEADER: &str = "X-Api-Key";

/// Thin HTTP client over the controller's REST surface. Stateless between
/// calls; delivery is best-effort and retried only by the next tick.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    account_name: String,
    api_key: String,
}

impl RestClient {
    pub fn new(cfg: &AgentConfig) -> Result<Self, SinkError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.controller_url.trim_end_matches('/').to_string(),
            account_name: cfg.account_name.clone(),
            api_key: cfg.api_key.clone(),
        })
    }

    fn schema_url(&self, name: &str) -> String {
        format!("{}/events/schema/{}", self.base_url, name)
    }

    fn publish_url(&self, name: &str) -> String {
        format!("{}/events/publish/{}", self.base_url, name)
    }

    fn metrics_url(&self) -> String {
        format!("{}/metrics/publish", self.base_url)
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header(ACCOUNT_HEADER, &self.account_name)
            .header(API_KEY_HEADER, &self.api_key)
    }

    fn check(resp: &reqwest::Response) -> Result<(), SinkError> {
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(SinkError::Status {
                status: resp.status(),
                url: resp.url().to_string(),
            })
        }
    }
}

#[async_trait]
impl EventSink for RestClient {
    async fn ensure_schema(&self, name: &str, def: &SchemaDefWrapper) -> Result<(), SinkError> {
        let url = self.schema_url(name);
        let resp = self.auth(self.http.get(&url)).send().await?;
        match resp.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!(schema = %name, "schema missing; creating");
                let resp = self.auth(self.http.post(&url)).json(def).send().await?;
                Self::check(&resp)
            }
            status => Err(SinkError::Schema(format!(
                "schema lookup for {name} returned {status}"
            ))),
        }
    }

    async fn post_events(&self, name: &str, payload: Vec<u8>) -> Result<(), SinkError> {
        let url = self.publish_url(name);
        debug!(schema = %name, bytes = payload.len(), "posting event batch");
        let resp = self
            .auth(self.http.post(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;
        Self::check(&resp)
    }
}

#[async_trait]
impl MetricsSink for RestClient {
    async fn post_metrics(&self, batch: &[MetricPoint]) -> Result<(), SinkError> {
        let url = self.metrics_url();
        debug!(points = batch.len(), "posting metric batch");
        let resp = self.auth(self.http.post(&url)).json(batch).send().await?;
        Self::check(&resp)
    }
}
