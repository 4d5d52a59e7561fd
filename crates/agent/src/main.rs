//! clusterlens agent entry point: config, tracing, signals, pipeline run.

#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use clusterlens_core::{AgentConfig, ConfigHandle};
use clusterlens_pipeline::PipelineController;
use clusterlens_sink::{EventSink, MetricsSink, RestClient};

#[derive(Parser, Debug)]
#[command(name = "clusterlens-agent", version, about = "Kubernetes telemetry agent")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(fallback: &str) {
    let env = std::env::var("CLUSTERLENS_LOG").unwrap_or_else(|_| fallback.to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("CLUSTERLENS_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid CLUSTERLENS_METRICS_ADDR; expected host:port");
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AgentConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config from {}", path.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("parsing config from {}", path.display()))
        }
        None => Ok(AgentConfig::default()),
    }
}

/// Fire the cancellation token on SIGINT or SIGTERM.
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(error = %e, "failed to register SIGTERM handler");
                        let _ = ctrl_c.await;
                        cancel.cancel();
                        return;
                    }
                };
            tokio::select! {
                _ = ctrl_c => info!("received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received SIGINT, shutting down");
        }
        cancel.cancel();
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    init_metrics();

    let cfg = load_config(cli.config.as_ref())?;
    info!(
        cluster = %cfg.cluster_name,
        include = cfg.include_namespaces.len(),
        exclude = cfg.exclude_namespaces.len(),
        "starting clusterlens agent"
    );

    let client = kube::Client::try_default()
        .await
        .context("building kube client")?;
    let rest = Arc::new(RestClient::new(&cfg).context("building controller client")?);
    let config = ConfigHandle::new(cfg);

    let metrics_sink: Arc<dyn MetricsSink> = rest.clone();
    let event_sink: Arc<dyn EventSink> = rest;
    let controller = PipelineController::new(client, config, metrics_sink, event_sink);

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    controller.observe(cancel).await?;
    info!("clusterlens agent stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: AgentConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.event_batch_limit, 100);
        assert_eq!(cfg.aggregate_interval_secs, 45);
        assert_eq!(cfg.flush_interval_secs, 15);
        assert!(cfg.include_namespaces.is_empty());
        assert_eq!(cfg.job_schema_name, "k8s_jobs");
    }

    #[test]
    fn yaml_overrides_selected_fields() {
        let cfg: AgentConfig = serde_yaml::from_str(
            r#"
cluster_name: prod-east
include_namespaces: [etl, ml]
exclude_namespaces: [kube-system]
event_batch_limit: 50
controller_url: https://controller.example.com
"#,
        )
        .unwrap();
        assert_eq!(cfg.cluster_name, "prod-east");
        assert_eq!(cfg.include_namespaces, vec!["etl", "ml"]);
        assert_eq!(cfg.event_batch_limit, 50);
        // untouched fields keep their defaults
        assert_eq!(cfg.flush_interval_secs, 15);
        assert!(cfg.qualifies("etl"));
        assert!(!cfg.qualifies("kube-system"));
        assert!(!cfg.qualifies("web"));
    }
}
