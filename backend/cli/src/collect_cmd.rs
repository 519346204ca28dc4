//! `pagewatch collect`: run the collector service.

use std::path::PathBuf;

use anyhow::{Context, Result};
use pagewatch_collector::{start_server, CollectorState};
use pagewatch_config::{CollectorConfig, PageWatchConfig};
use tracing::info;

/// Collector settings with command-line flags applied on top.
pub fn effective_config(config: &PageWatchConfig, port: Option<u16>, log_dir: Option<PathBuf>) -> CollectorConfig {
    let mut collector = config.collector();
    if port.is_some() {
        collector.port = port;
    }
    if log_dir.is_some() {
        collector.log_dir = log_dir;
    }
    collector
}

pub async fn run(config: &PageWatchConfig, port: Option<u16>, log_dir: Option<PathBuf>) -> Result<()> {
    let collector = effective_config(config, port, log_dir);
    let bind = format!("{}:{}", collector.bind_address(), collector.port());
    let addr = tokio::net::lookup_host(&bind)
        .await
        .with_context(|| format!("invalid bind address {bind}"))?
        .next()
        .with_context(|| format!("{bind} did not resolve"))?;

    info!(
        addr = %addr,
        log_dir = %collector.log_dir().display(),
        field_limit = collector.field_limit(),
        "Starting PageWatch collector"
    );
    start_server(addr, CollectorState::from_config(&collector)).await
}
