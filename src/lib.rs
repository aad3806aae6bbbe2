//! # fluxbuilder
//!
//! Visual query building for InfluxDB: a structured, order-sensitive model of
//! Flux query parts kept in sync with the Flux text it compiles to, plus the
//! service around it.
//!
//! ## Features
//!
//! - **Bidirectional translation**: parts to Flux text and back, with
//!   verbatim fallback for anything outside the supported subset
//! - **Query builder**: bucket / measurement / field / range selection with
//!   cached listings and stale-result protection
//! - **InfluxDB v2 client**: buckets, schema listings, query and analyze
//! - **Grafana publishing**: one-click dashboards from generated queries
//!
//! ## Modules
//!
//! - [`flux`]: Part model, serializer, parser, editors and builder
//! - [`influx`]: InfluxDB v2 HTTP client
//! - [`grafana`]: Grafana HTTP client
//! - [`session`]: Login sessions
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust
//! use fluxbuilder::flux::{parse, to_text, Bucket, QueryBuilder};
//!
//! let mut builder = QueryBuilder::new();
//! builder.set_buckets(vec![Bucket::new("0a1b", "metrics")]);
//! builder.select_bucket(0);
//!
//! let text = builder.text();
//! assert!(text.starts_with("from(bucket: \"metrics\")"));
//! assert_eq!(parse(&text).bucket().map(|b| b.name.as_str()), Some("metrics"));
//! assert_eq!(to_text(&parse(&text)), text);
//! ```

pub mod api;
pub mod config;
pub mod flux;
pub mod grafana;
pub mod influx;
pub mod logging;
pub mod session;

// Re-export top-level types for convenience
pub use flux::{
    parse, to_text, Bucket, DateRange, Filter, FilterKind, FilterValue, QueryBuilder, QueryModel,
    QueryPart,
};

pub use influx::{Credentials, FluxTable, InfluxApi, InfluxClient, InfluxError};

pub use grafana::{GrafanaClient, GrafanaError};

pub use session::{SessionError, SessionStore};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError, GrafanaConfig, InfluxConfig, LoggingConfig};
