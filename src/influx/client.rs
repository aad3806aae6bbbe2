//! InfluxDB v2 REST API Client

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::InfluxConfig;
use crate::flux::Bucket;
use crate::influx::{decode_annotated_csv, AnalyzeError, Credentials, FluxTable, InfluxApi, InfluxError};

/// reqwest-backed [`InfluxApi`]
pub struct InfluxClient {
    client: Client,
    base_url: String,
    schema_lookback: String,
}

impl InfluxClient {
    /// Create a client for the configured server
    pub fn new(config: &InfluxConfig) -> Result<Self, InfluxError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            schema_lookback: config.schema_lookback.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
        request.header(header::AUTHORIZATION, format!("Token {}", credentials.api_token))
    }

    /// Send a request, mapping transport failures and error statuses
    async fn send(&self, request: RequestBuilder) -> Result<Response, InfluxError> {
        let response = request.send().await.map_err(InfluxError::from_send)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(InfluxError::Unauthorized);
        }

        let text = response.text().await.unwrap_or_default();
        Err(InfluxError::Api {
            status: status.as_u16(),
            message: error_message(&text),
        })
    }
}

#[async_trait]
impl InfluxApi for InfluxClient {
    fn url(&self) -> &str {
        &self.base_url
    }

    fn schema_lookback(&self) -> &str {
        &self.schema_lookback
    }

    async fn buckets(&self, credentials: &Credentials) -> Result<Vec<Bucket>, InfluxError> {
        let request = self
            .client
            .get(self.endpoint("/api/v2/buckets"))
            .query(&[("org", credentials.organization.as_str()), ("limit", "100")]);

        let response = self.send(self.authorized(request, credentials)).await?;
        let body: BucketsResponse = response.json().await?;

        tracing::debug!(count = body.buckets.len(), "fetched buckets");
        Ok(body.buckets.into_iter().map(Bucket::from).collect())
    }

    async fn query(&self, credentials: &Credentials, flux: &str) -> Result<Vec<FluxTable>, InfluxError> {
        let request = self
            .client
            .post(self.endpoint("/api/v2/query"))
            .query(&[("org", credentials.organization.as_str())])
            .header(header::ACCEPT, "application/csv")
            .json(&json!({
                "query": flux,
                "type": "flux",
                "dialect": {
                    "annotations": ["datatype", "group", "default"],
                    "header": true,
                    "delimiter": ","
                }
            }));

        let response = self.send(self.authorized(request, credentials)).await?;
        let body = response.text().await?;
        let tables = decode_annotated_csv(&body)?;

        tracing::debug!(tables = tables.len(), "query complete");
        Ok(tables)
    }

    async fn analyze(&self, credentials: &Credentials, flux: &str) -> Result<Vec<AnalyzeError>, InfluxError> {
        let request = self
            .client
            .post(self.endpoint("/api/v2/query/analyze"))
            .query(&[("org", credentials.organization.as_str())])
            .json(&json!({ "query": flux, "type": "flux" }));

        let response = self.send(self.authorized(request, credentials)).await?;
        let body: AnalyzeResponse = response.json().await?;
        Ok(body.errors)
    }
}

// ============================================
// Response DTOs
// ============================================

#[derive(Debug, Deserialize)]
struct BucketsResponse {
    #[serde(default)]
    buckets: Vec<ListedBucket>,
}

#[derive(Debug, Deserialize)]
struct ListedBucket {
    #[serde(default)]
    id: Option<String>,
    name: String,
}

impl From<ListedBucket> for Bucket {
    fn from(listed: ListedBucket) -> Self {
        let id = listed.id.unwrap_or_else(|| listed.name.clone());
        Bucket::new(id, listed.name)
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    errors: Vec<AnalyzeError>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Message from an InfluxDB error body, or the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
