//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{ApiConfig, Config, GrafanaConfig};
use crate::grafana::GrafanaClient;
use crate::influx::InfluxApi;
use crate::session::SessionStore;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Database access used for login checks, listings and queries
    pub influx: Arc<dyn InfluxApi>,
    /// Dashboard publishing (optional)
    pub grafana: Option<Arc<GrafanaClient>>,
    /// Logged-in sessions and their builders
    pub sessions: Arc<SessionStore>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Datasource settings for dashboard publishing
    pub grafana_config: Arc<GrafanaConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create an AppState without Grafana integration
    pub fn new(influx: Arc<dyn InfluxApi>, config: &Config) -> Self {
        Self {
            influx,
            grafana: None,
            sessions: Arc::new(SessionStore::new(Duration::from_secs(
                config.api.session_ttl_secs,
            ))),
            config: Arc::new(config.api.clone()),
            grafana_config: Arc::new(config.grafana.clone()),
            start_time: Instant::now(),
        }
    }

    /// Attach a Grafana client
    pub fn with_grafana(mut self, grafana: Arc<GrafanaClient>) -> Self {
        self.grafana = Some(grafana);
        self
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if Grafana integration is available
    pub fn has_grafana(&self) -> bool {
        self.grafana.is_some()
    }
}
