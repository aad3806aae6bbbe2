//! fluxbuilder REST API
//!
//! HTTP API layer, built with Axum.
//!
//! # Endpoints
//!
//! ## Auth
//! - `POST /api/v1/auth/login` - Exchange InfluxDB token + org for a session
//! - `GET /api/v1/auth/validate` - Check a session token
//! - `POST /api/v1/auth/logout` - End a session
//!
//! ## Flux
//! - `POST /api/v1/flux/render` - Model to Flux text
//! - `POST /api/v1/flux/parse` - Flux text to model
//!
//! ## Schema
//! - `GET /api/v1/buckets` - List buckets
//! - `GET /api/v1/buckets/:bucket/measurements` - List measurements
//! - `GET /api/v1/buckets/:bucket/measurements/:measurement/fields` - List fields
//!
//! ## Query
//! - `POST /api/v1/query/analyze` - Check Flux text for errors
//! - `POST /api/v1/query/run` - Execute Flux text
//!
//! ## Builder
//! - `GET /api/v1/builder` - Current builder state
//! - `POST /api/v1/builder/buckets/refresh` - Reload the bucket listing
//! - `POST /api/v1/builder/bucket` - Select a bucket
//! - `POST /api/v1/builder/measurement` - Select a measurement
//! - `POST /api/v1/builder/fields` - Select fields
//! - `POST /api/v1/builder/range` - Set the time range
//! - `PUT /api/v1/builder/text` - Replace the query with edited text
//! - `DELETE /api/v1/builder/parts/:index` - Remove a part
//! - `POST /api/v1/builder/reset` - Clear the builder
//!
//! ## Grafana
//! - `POST /api/v1/grafana/dashboard` - Publish a dashboard
//! - `GET /api/v1/grafana/datasources` - List datasources
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,no_run
//! use fluxbuilder::api::{serve, AppState};
//! use fluxbuilder::config::Config;
//! use fluxbuilder::influx::InfluxClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let influx = Arc::new(InfluxClient::new(&config.influxdb)?);
//!
//!     let state = AppState::new(influx, &config);
//!     serve(state, &config.api).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ApiConfig;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Auth routes
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/validate", get(routes::auth::validate))
        .route("/auth/logout", post(routes::auth::logout))
        // Flux translation routes
        .route("/flux/render", post(routes::flux::render))
        .route("/flux/parse", post(routes::flux::parse_text))
        // Schema routes
        .route("/buckets", get(routes::buckets::list_buckets))
        .route("/buckets/:bucket/measurements", get(routes::buckets::list_measurements))
        .route(
            "/buckets/:bucket/measurements/:measurement/fields",
            get(routes::buckets::list_fields),
        )
        // Query routes
        .route("/query/analyze", post(routes::query::analyze_query))
        .route("/query/run", post(routes::query::run_query))
        // Builder routes
        .route("/builder", get(routes::builder::get_builder))
        .route("/builder/buckets/refresh", post(routes::builder::refresh_buckets))
        .route("/builder/bucket", post(routes::builder::select_bucket))
        .route("/builder/measurement", post(routes::builder::select_measurement))
        .route("/builder/fields", post(routes::builder::select_fields))
        .route("/builder/range", post(routes::builder::select_range))
        .route("/builder/text", put(routes::builder::update_text))
        .route("/builder/parts/:index", delete(routes::builder::remove_part))
        .route("/builder/reset", post(routes::builder::reset))
        // Grafana routes
        .route("/grafana/dashboard", post(routes::grafana::create_dashboard))
        .route("/grafana/datasources", get(routes::grafana::list_datasources));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("fluxbuilder API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("fluxbuilder API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::flux::Bucket;
    use crate::influx::{AnalyzeError, Credentials, FluxTable, InfluxApi, InfluxError};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    struct MockInflux;

    fn listing(values: &[&str]) -> Vec<FluxTable> {
        vec![FluxTable {
            columns: vec!["result".into(), "table".into(), "_value".into()],
            rows: values
                .iter()
                .map(|v| vec!["_result".to_string(), "0".to_string(), v.to_string()])
                .collect(),
        }]
    }

    #[async_trait]
    impl InfluxApi for MockInflux {
        fn url(&self) -> &str {
            "http://influx.test"
        }

        async fn buckets(&self, credentials: &Credentials) -> Result<Vec<Bucket>, InfluxError> {
            if credentials.api_token != "good" {
                return Err(InfluxError::Unauthorized);
            }
            Ok(vec![Bucket::new("b1", "metrics"), Bucket::new("b2", "logs")])
        }

        async fn query(&self, _credentials: &Credentials, flux: &str) -> Result<Vec<FluxTable>, InfluxError> {
            if flux.contains("keep(columns: [\"_measurement\"])") {
                Ok(listing(&["cpu", "mem"]))
            } else if flux.contains("keep(columns: [\"_field\"])") {
                Ok(listing(&["usage_user", "usage_system"]))
            } else if flux.contains("broken") {
                Err(InfluxError::Api {
                    status: 400,
                    message: "compilation failed".into(),
                })
            } else {
                Ok(listing(&["42"]))
            }
        }

        async fn analyze(&self, _credentials: &Credentials, flux: &str) -> Result<Vec<AnalyzeError>, InfluxError> {
            if flux.contains("undefined") {
                Ok(vec![AnalyzeError {
                    line: 1,
                    column: 1,
                    character: 0,
                    message: "undefined identifier".into(),
                }])
            } else {
                Ok(Vec::new())
            }
        }
    }

    struct ListingOutage;

    #[async_trait]
    impl InfluxApi for ListingOutage {
        fn url(&self) -> &str {
            "http://influx.test"
        }

        async fn buckets(&self, _credentials: &Credentials) -> Result<Vec<Bucket>, InfluxError> {
            Ok(vec![Bucket::new("b1", "metrics")])
        }

        async fn query(&self, _credentials: &Credentials, _flux: &str) -> Result<Vec<FluxTable>, InfluxError> {
            Err(InfluxError::Unavailable)
        }

        async fn analyze(&self, _credentials: &Credentials, _flux: &str) -> Result<Vec<AnalyzeError>, InfluxError> {
            Ok(Vec::new())
        }
    }

    fn create_test_app() -> Router {
        let state = AppState::new(Arc::new(MockInflux), &Config::default());
        build_router(state)
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn login(app: &Router) -> String {
        let (status, body) = call(
            app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"apiToken": "good", "organization": "acme"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_live() {
        let app = create_test_app();
        let (status, _) = call(&app, "GET", "/health/live", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready() {
        let app = create_test_app();
        let (status, _) = call(&app, "GET", "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let app = create_test_app();
        login(&app).await;

        let (status, body) = call(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["sessions"], 1);
        assert_eq!(body["grafana"], false);
    }

    #[tokio::test]
    async fn test_flux_render() {
        let app = create_test_app();
        let model = json!({
            "parts": [
                {"type": "bucket", "id": "b1", "name": "metrics"},
                {"type": "dateRange", "start": "-1h"},
                {"type": "filter", "kind": "measurement", "value": "cpu"},
                {"type": "filter", "kind": "field", "value": ["usage_user"]}
            ]
        });

        let (status, body) = call(&app, "POST", "/api/v1/flux/render", None, Some(json!({"model": model}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["text"],
            "from(bucket: \"metrics\")\n    |> range(start: -1h)\n    |> filter(fn: (r) => r._measurement == \"cpu\")\n    |> filter(fn: (r) => r._field == \"usage_user\")\n    |> yield(name: \"result\")"
        );
    }

    #[tokio::test]
    async fn test_flux_parse() {
        let app = create_test_app();

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/flux/parse",
            None,
            Some(json!({"text": "from(bucket: \"metrics\")\n    |> range(start: -6h)"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["complex"], false);
        assert_eq!(body["model"]["parts"][0]["name"], "metrics");
        assert_eq!(body["model"]["parts"][1]["start"], "-6h");

        let (_, body) = call(
            &app,
            "POST",
            "/api/v1/flux/parse",
            None,
            Some(json!({"text": "from(bucket: \"metrics\")\n    |> sort()"})),
        )
        .await;
        assert_eq!(body["complex"], true);
        assert_eq!(body["model"]["parts"], json!([]));
        assert_eq!(body["model"]["rawText"], "from(bucket: \"metrics\")\n    |> sort()");
    }

    #[tokio::test]
    async fn test_login_validation() {
        let app = create_test_app();

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"apiToken": "", "organization": "acme"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"apiToken": "bad", "organization": "acme"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let app = create_test_app();
        let token = login(&app).await;

        let (status, body) = call(&app, "GET", "/api/v1/auth/validate", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["organization"], "acme");

        let (status, _) = call(&app, "POST", "/api/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call(&app, "GET", "/api/v1/auth/validate", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let app = create_test_app();

        let (status, _) = call(&app, "GET", "/api/v1/buckets", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, "GET", "/api/v1/builder", Some("made-up"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_schema_listings() {
        let app = create_test_app();
        let token = login(&app).await;

        let (status, body) = call(&app, "GET", "/api/v1/buckets", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["buckets"][0]["name"], "metrics");

        let (_, body) = call(&app, "GET", "/api/v1/buckets/metrics/measurements", Some(&token), None).await;
        assert_eq!(body["measurements"], json!(["cpu", "mem"]));

        let (_, body) = call(
            &app,
            "GET",
            "/api/v1/buckets/metrics/measurements/cpu/fields",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(body["measurement"], "cpu");
        assert_eq!(body["fields"], json!(["usage_user", "usage_system"]));
    }

    #[tokio::test]
    async fn test_query_routes() {
        let app = create_test_app();
        let token = login(&app).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/query/analyze",
            Some(&token),
            Some(json!({"query": "undefined()"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["errors"][0]["message"], "undefined identifier");

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/query/run",
            Some(&token),
            Some(json!({"query": "from(bucket: \"metrics\")"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tables"][0]["rows"][0][2], "42");

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/query/run",
            Some(&token),
            Some(json!({"query": "broken"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "QUERY_ERROR");

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/query/run",
            Some(&token),
            Some(json!({"query": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_builder_workflow() {
        let app = create_test_app();
        let token = login(&app).await;

        let (_, view) = call(&app, "GET", "/api/v1/builder", Some(&token), None).await;
        assert_eq!(view["text"], "");
        assert_eq!(view["titles"]["buckets"], "No buckets found");

        let (_, view) = call(&app, "POST", "/api/v1/builder/buckets/refresh", Some(&token), None).await;
        assert_eq!(view["buckets"][1]["name"], "logs");
        assert_eq!(view["titles"]["buckets"], "Select a bucket");

        let (status, view) = call(
            &app,
            "POST",
            "/api/v1/builder/bucket",
            Some(&token),
            Some(json!({"position": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["measurements"], json!(["cpu", "mem"]));
        assert_eq!(view["titles"]["dateRange"], "-1h");

        let (_, view) = call(
            &app,
            "POST",
            "/api/v1/builder/measurement",
            Some(&token),
            Some(json!({"position": 0})),
        )
        .await;
        assert_eq!(view["fields"], json!(["usage_user", "usage_system"]));

        let (_, view) = call(
            &app,
            "POST",
            "/api/v1/builder/fields",
            Some(&token),
            Some(json!({"positions": [0]})),
        )
        .await;
        assert_eq!(
            view["text"],
            "from(bucket: \"metrics\")\n    |> range(start: -1h)\n    |> filter(fn: (r) => r._measurement == \"cpu\")\n    |> filter(fn: (r) => r._field == \"usage_user\")\n    |> yield(name: \"result\")"
        );
        assert_eq!(view["titles"]["fields"], "usage_user");

        let (_, view) = call(
            &app,
            "POST",
            "/api/v1/builder/range",
            Some(&token),
            Some(json!({"start": "-7d", "stop": "now()"})),
        )
        .await;
        assert_eq!(view["model"]["parts"][1], json!({"type": "dateRange", "start": "-7d", "stop": "now()"}));

        let (_, view) = call(&app, "DELETE", "/api/v1/builder/parts/0", Some(&token), None).await;
        assert_eq!(view["measurements"], json!([]));
        assert_eq!(view["titles"]["measurements"], "Select a bucket first");

        let (_, view) = call(&app, "POST", "/api/v1/builder/reset", Some(&token), None).await;
        assert_eq!(view["model"]["parts"], json!([]));
    }

    #[tokio::test]
    async fn test_builder_text_edit() {
        let app = create_test_app();
        let token = login(&app).await;

        let (status, view) = call(
            &app,
            "PUT",
            "/api/v1/builder/text",
            Some(&token),
            Some(json!({"text": "from(bucket: \"metrics\")\n    |> group()"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["rawMode"], true);
        assert_eq!(view["text"], "from(bucket: \"metrics\")\n    |> group()");
    }

    #[tokio::test]
    async fn test_builder_invalid_positions() {
        let app = create_test_app();
        let token = login(&app).await;

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/builder/bucket",
            Some(&token),
            Some(json!({"position": 3})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "DELETE", "/api/v1/builder/parts/5", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/builder/range",
            Some(&token),
            Some(json!({"start": " "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_builder_selection_survives_listing_failure() {
        let state = AppState::new(Arc::new(ListingOutage), &Config::default());
        let app = build_router(state);
        let token = login(&app).await;

        call(&app, "POST", "/api/v1/builder/buckets/refresh", Some(&token), None).await;

        let (status, view) = call(
            &app,
            "POST",
            "/api/v1/builder/bucket",
            Some(&token),
            Some(json!({"position": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["measurements"], json!([]));
        assert_eq!(view["titles"]["buckets"], "metrics");
        assert_eq!(view["titles"]["measurements"], "No measurements found");
        assert_eq!(
            view["text"],
            "from(bucket: \"metrics\")\n    |> range(start: -1h)\n    |> yield(name: \"result\")"
        );

        let (_, view) = call(&app, "GET", "/api/v1/builder", Some(&token), None).await;
        assert_eq!(view["model"]["parts"][0]["name"], "metrics");
    }

    #[tokio::test]
    async fn test_grafana_not_configured() {
        let app = create_test_app();
        let token = login(&app).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/grafana/dashboard",
            Some(&token),
            Some(json!({"fluxQuery": "from(bucket: \"metrics\")", "title": "CPU"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "GRAFANA_NOT_CONFIGURED");
    }
}
