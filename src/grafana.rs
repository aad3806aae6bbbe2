//! Grafana HTTP API Client
//!
//! Publishes a generated Flux query as a dashboard with one time-series
//! panel, creating the InfluxDB datasource on first use. The query text is
//! passed through untouched.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::GrafanaConfig;

/// Grafana REST API client
pub struct GrafanaClient {
    client: Client,
    base_url: String,
    public_url: String,
    auth: GrafanaAuth,
}

#[derive(Clone)]
enum GrafanaAuth {
    Bearer(String),
    Basic { username: String, password: String },
}

/// Datasource summary as reported by Grafana
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datasource {
    pub id: i64,
    pub uid: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Settings for an InfluxDB (Flux) datasource
#[derive(Debug, Clone)]
pub struct DatasourceParams {
    pub name: String,
    /// InfluxDB URL as reachable from the Grafana server
    pub influx_url: String,
    pub organization: String,
    pub default_bucket: Option<String>,
    pub token: String,
}

/// Dashboard to create
#[derive(Debug, Clone)]
pub struct DashboardRequest {
    pub title: String,
    pub flux_query: String,
    pub datasource_uid: String,
    pub panel_title: Option<String>,
}

/// Identifiers of a created dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedDashboard {
    pub uid: String,
    /// Relative URL such as `/d/abc123/title`
    pub url: String,
}

impl GrafanaClient {
    /// Create a client; fails with `NotConfigured` without a URL or credentials
    pub fn new(config: &GrafanaConfig) -> Result<Self, GrafanaError> {
        let base_url = config
            .url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or(GrafanaError::NotConfigured)?;

        let auth = match (&config.api_token, &config.username, &config.password) {
            (Some(token), _, _) if !token.trim().is_empty() => GrafanaAuth::Bearer(token.clone()),
            (_, Some(username), Some(password)) => GrafanaAuth::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => return Err(GrafanaError::NotConfigured),
        };

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url,
            public_url: config.public_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Browser-facing URL for a relative Grafana path
    pub fn absolute_url(&self, relative: &str) -> String {
        if relative.starts_with('/') {
            format!("{}{}", self.public_url, relative)
        } else {
            format!("{}/{}", self.public_url, relative)
        }
    }

    /// Look up a datasource by name
    pub async fn datasource_by_name(&self, name: &str) -> Result<Option<Datasource>, GrafanaError> {
        let path = format!("/api/datasources/name/{}", urlencoding::encode(name));

        match self.send(self.request(self.client.get(self.endpoint(&path)))).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(GrafanaError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// All datasources
    pub async fn datasources(&self) -> Result<Vec<Datasource>, GrafanaError> {
        let request = self.request(self.client.get(self.endpoint("/api/datasources")));
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Create an InfluxDB v2 datasource speaking Flux
    pub async fn create_influx_datasource(&self, params: &DatasourceParams) -> Result<Datasource, GrafanaError> {
        let body = json!({
            "name": params.name,
            "type": "influxdb",
            "access": "proxy",
            "url": params.influx_url,
            "basicAuth": false,
            "jsonData": {
                "version": "Flux",
                "organization": params.organization,
                "defaultBucket": params.default_bucket,
                "httpMode": "POST"
            },
            "secureJsonData": {
                "token": params.token
            }
        });

        let request = self.request(self.client.post(self.endpoint("/api/datasources")).json(&body));
        let created: Value = self.send(request).await?.json().await?;

        // Newer Grafana nests the datasource; older versions return it flat
        let datasource = created.get("datasource").cloned().unwrap_or(created);
        serde_json::from_value(datasource)
            .map_err(|e| GrafanaError::UnexpectedResponse(format!("datasource: {}", e)))
    }

    /// Reuse the named datasource or create it
    pub async fn ensure_influx_datasource(&self, params: &DatasourceParams) -> Result<Datasource, GrafanaError> {
        if let Some(existing) = self.datasource_by_name(&params.name).await? {
            tracing::debug!(uid = %existing.uid, "reusing Grafana datasource");
            return Ok(existing);
        }

        let created = self.create_influx_datasource(params).await?;
        tracing::info!(uid = %created.uid, name = %created.name, "created Grafana datasource");
        Ok(created)
    }

    /// Create a dashboard with one Flux time-series panel
    pub async fn create_flux_dashboard(&self, request: &DashboardRequest) -> Result<CreatedDashboard, GrafanaError> {
        let body = dashboard_payload(request);
        let http = self.request(self.client.post(self.endpoint("/api/dashboards/db")).json(&body));
        let created: CreatedDashboard = self
            .send(http)
            .await?
            .json()
            .await
            .map_err(|e| GrafanaError::UnexpectedResponse(format!("dashboard: {}", e)))?;

        tracing::info!(uid = %created.uid, "created Grafana dashboard");
        Ok(created)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            GrafanaAuth::Bearer(token) => request.bearer_auth(token),
            GrafanaAuth::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GrafanaError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GrafanaError::Timeout
            } else if e.is_connect() {
                GrafanaError::Unavailable
            } else {
                GrafanaError::Request(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(GrafanaError::Api {
            status: status.as_u16(),
            message: text,
        })
    }
}

/// Request body for `POST /api/dashboards/db`
pub fn dashboard_payload(request: &DashboardRequest) -> Value {
    let datasource = json!({ "type": "influxdb", "uid": request.datasource_uid });

    json!({
        "dashboard": {
            "title": request.title,
            "uid": null,
            "timezone": "browser",
            "schemaVersion": 38,
            "version": 0,
            "panels": [{
                "id": 1,
                "title": request.panel_title.as_deref().unwrap_or("Flux Panel"),
                "type": "timeseries",
                "datasource": datasource,
                "gridPos": { "h": 10, "w": 24, "x": 0, "y": 0 },
                "targets": [{
                    "refId": "A",
                    "query": request.flux_query,
                    "queryType": "flux",
                    "datasource": datasource,
                    "resultFormat": "time_series"
                }],
                "options": {},
                "fieldConfig": { "defaults": {}, "overrides": [] }
            }]
        },
        "overwrite": true
    })
}

/// Errors that can occur when communicating with Grafana
#[derive(Error, Debug)]
pub enum GrafanaError {
    #[error("Grafana is not configured")]
    NotConfigured,

    #[error("Grafana unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected Grafana response: {0}")]
    UnexpectedResponse(String),
}

impl GrafanaError {
    /// HTTP status reported by Grafana, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GrafanaError::Api { status, .. } => StatusCode::from_u16(*status).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode as AxumStatus},
        response::{IntoResponse, Response as AxumResponse},
        routing::{get, post},
        Json, Router,
    };
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeGrafana {
        datasources: Mutex<Vec<Datasource>>,
        dashboards: Mutex<Vec<Value>>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer glsa_test")
    }

    async fn by_name(
        State(fake): State<Arc<FakeGrafana>>,
        headers: HeaderMap,
        Path(name): Path<String>,
    ) -> AxumResponse {
        if !authorized(&headers) {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        let found = fake
            .datasources
            .lock()
            .unwrap()
            .iter()
            .find(|ds| ds.name == name)
            .cloned();
        match found {
            Some(ds) => Json(ds).into_response(),
            None => (AxumStatus::NOT_FOUND, Json(json!({"message": "Data source not found"}))).into_response(),
        }
    }

    async fn list(State(fake): State<Arc<FakeGrafana>>) -> AxumResponse {
        Json(fake.datasources.lock().unwrap().clone()).into_response()
    }

    async fn create(State(fake): State<Arc<FakeGrafana>>, Json(body): Json<Value>) -> AxumResponse {
        let mut datasources = fake.datasources.lock().unwrap();
        let ds = Datasource {
            id: datasources.len() as i64 + 1,
            uid: format!("uid-{}", datasources.len() + 1),
            name: body["name"].as_str().unwrap_or_default().to_string(),
            kind: body["type"].as_str().unwrap_or_default().to_string(),
        };
        datasources.push(ds.clone());
        Json(json!({"datasource": ds, "id": ds.id, "message": "Datasource added", "name": ds.name}))
            .into_response()
    }

    async fn dashboard(State(fake): State<Arc<FakeGrafana>>, Json(body): Json<Value>) -> AxumResponse {
        fake.dashboards.lock().unwrap().push(body);
        Json(json!({"id": 7, "uid": "dash1", "url": "/d/dash1/cpu", "status": "success"})).into_response()
    }

    async fn spawn_fake_grafana() -> (String, Arc<FakeGrafana>) {
        let fake = Arc::new(FakeGrafana::default());
        let app = Router::new()
            .route("/api/datasources/name/:name", get(by_name))
            .route("/api/datasources", get(list).post(create))
            .route("/api/dashboards/db", post(dashboard))
            .with_state(Arc::clone(&fake));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), fake)
    }

    fn config_for(url: &str) -> GrafanaConfig {
        GrafanaConfig {
            url: Some(url.to_string()),
            api_token: Some("glsa_test".to_string()),
            ..Default::default()
        }
    }

    fn params() -> DatasourceParams {
        DatasourceParams {
            name: "InfluxDB-v2".into(),
            influx_url: "http://influxdb:8086".into(),
            organization: "acme".into(),
            default_bucket: Some("metrics".into()),
            token: "influx-token".into(),
        }
    }

    #[test]
    fn test_not_configured() {
        assert!(matches!(
            GrafanaClient::new(&GrafanaConfig::default()),
            Err(GrafanaError::NotConfigured)
        ));

        let no_auth = GrafanaConfig {
            url: Some("http://grafana:3000".into()),
            ..Default::default()
        };
        assert!(matches!(GrafanaClient::new(&no_auth), Err(GrafanaError::NotConfigured)));

        let basic = GrafanaConfig {
            url: Some("http://grafana:3000".into()),
            username: Some("admin".into()),
            password: Some("admin".into()),
            ..Default::default()
        };
        assert!(GrafanaClient::new(&basic).is_ok());
    }

    #[test]
    fn test_absolute_url() {
        let client = GrafanaClient::new(&GrafanaConfig {
            public_url: "http://localhost:3006/".into(),
            ..config_for("http://grafana:3000")
        })
        .unwrap();

        assert_eq!(client.absolute_url("/d/abc/cpu"), "http://localhost:3006/d/abc/cpu");
        assert_eq!(client.absolute_url("d/abc/cpu"), "http://localhost:3006/d/abc/cpu");
    }

    #[test]
    fn test_dashboard_payload() {
        let payload = dashboard_payload(&DashboardRequest {
            title: "CPU".into(),
            flux_query: "from(bucket: \"metrics\")".into(),
            datasource_uid: "ds1".into(),
            panel_title: None,
        });

        assert_eq!(payload["overwrite"], true);
        let panel = &payload["dashboard"]["panels"][0];
        assert_eq!(panel["type"], "timeseries");
        assert_eq!(panel["title"], "Flux Panel");
        assert_eq!(panel["targets"][0]["query"], "from(bucket: \"metrics\")");
        assert_eq!(panel["targets"][0]["queryType"], "flux");
        assert_eq!(panel["datasource"]["uid"], "ds1");
    }

    #[tokio::test]
    async fn test_ensure_datasource_creates_once() {
        let (url, fake) = spawn_fake_grafana().await;
        let client = GrafanaClient::new(&config_for(&url)).unwrap();

        let first = client.ensure_influx_datasource(&params()).await.unwrap();
        let second = client.ensure_influx_datasource(&params()).await.unwrap();

        assert_eq!(first.uid, "uid-1");
        assert_eq!(first, second);
        assert_eq!(fake.datasources.lock().unwrap().len(), 1);
        assert_eq!(client.datasources().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_datasource_is_none() {
        let (url, _fake) = spawn_fake_grafana().await;
        let client = GrafanaClient::new(&config_for(&url)).unwrap();

        assert!(client.datasource_by_name("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_token_is_api_error() {
        let (url, _fake) = spawn_fake_grafana().await;
        let client = GrafanaClient::new(&GrafanaConfig {
            api_token: Some("wrong".into()),
            ..config_for(&url)
        })
        .unwrap();

        let err = client.datasource_by_name("InfluxDB-v2").await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_create_dashboard() {
        let (url, fake) = spawn_fake_grafana().await;
        let client = GrafanaClient::new(&config_for(&url)).unwrap();

        let created = client
            .create_flux_dashboard(&DashboardRequest {
                title: "CPU".into(),
                flux_query: "from(bucket: \"metrics\")".into(),
                datasource_uid: "uid-1".into(),
                panel_title: Some("Usage".into()),
            })
            .await
            .unwrap();

        assert_eq!(
            created,
            CreatedDashboard {
                uid: "dash1".into(),
                url: "/d/dash1/cpu".into()
            }
        );
        let sent = fake.dashboards.lock().unwrap();
        assert_eq!(sent[0]["dashboard"]["panels"][0]["title"], "Usage");
    }
}
