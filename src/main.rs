//! fluxbuilder API Server
//!
//! Run with: cargo run --bin fluxbuilder
//!
//! # Configuration
//!
//! Read from `--config <path>` or the default locations, then overridden by
//! environment variables (see `fluxbuilder-cli config` for the template).
//! `RUST_LOG` overrides the configured log level.

use anyhow::Context;
use clap::Parser;
use fluxbuilder::api::{serve, AppState};
use fluxbuilder::config::Config;
use fluxbuilder::grafana::{GrafanaClient, GrafanaError};
use fluxbuilder::influx::InfluxClient;
use fluxbuilder::logging::init_tracing;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fluxbuilder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Flux query builder API server")]
struct Args {
    /// Config file (default: search standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {:?}", path))?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging);

    tracing::info!("Starting fluxbuilder API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("InfluxDB: {}", config.influxdb.url);

    let influx = Arc::new(InfluxClient::new(&config.influxdb).context("creating InfluxDB client")?);
    let mut state = AppState::new(influx, &config);

    match GrafanaClient::new(&config.grafana) {
        Ok(grafana) => {
            tracing::info!(
                "Grafana integration enabled: {}",
                config.grafana.url.as_deref().unwrap_or_default()
            );
            state = state.with_grafana(Arc::new(grafana));
        }
        Err(GrafanaError::NotConfigured) => {
            tracing::info!("Grafana integration disabled (set GRAFANA_URL and GRAFANA_API_TOKEN to enable)");
        }
        Err(e) => return Err(e).context("creating Grafana client"),
    }

    serve(state, &config.api).await?;

    tracing::info!("fluxbuilder API server stopped");
    Ok(())
}
