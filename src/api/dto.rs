//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flux::{Bucket, QueryBuilder, QueryModel, SelectionTitles};
use crate::grafana::Datasource;
use crate::influx::{AnalyzeError, FluxTable};

// ============================================
// AUTH DTOs
// ============================================

/// Login request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub organization: String,
}

/// Login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// Token validation response
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub message: String,
    pub organization: String,
}

// ============================================
// FLUX DTOs
// ============================================

/// Render a model to text
#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub model: QueryModel,
}

#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub text: String,
}

/// Parse text into a model
#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub model: QueryModel,
    /// True when the text was kept verbatim
    pub complex: bool,
}

// ============================================
// SCHEMA DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct BucketsResponse {
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Serialize)]
pub struct MeasurementsResponse {
    pub bucket: String,
    pub measurements: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FieldsResponse {
    pub bucket: String,
    pub measurement: String,
    pub fields: Vec<String>,
}

// ============================================
// QUERY DTOs
// ============================================

/// Flux text to analyze or run
#[derive(Debug, Deserialize)]
pub struct QueryTextRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub errors: Vec<AnalyzeError>,
}

#[derive(Debug, Serialize)]
pub struct RunQueryResponse {
    pub tables: Vec<FluxTable>,
}

// ============================================
// BUILDER DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    pub position: usize,
}

#[derive(Debug, Deserialize)]
pub struct PositionsRequest {
    #[serde(default)]
    pub positions: Vec<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RangeRequest {
    pub start: String,
    #[serde(default)]
    pub stop: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

/// Snapshot of a session's builder
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderView {
    pub model: QueryModel,
    pub text: String,
    pub raw_mode: bool,
    pub buckets: Vec<Bucket>,
    pub measurements: Vec<String>,
    pub fields: Vec<String>,
    pub titles: SelectionTitles,
    pub revision: u64,
}

impl From<&QueryBuilder> for BuilderView {
    fn from(builder: &QueryBuilder) -> Self {
        Self {
            model: builder.model().clone(),
            text: builder.text(),
            raw_mode: builder.model().is_raw(),
            buckets: builder.buckets().to_vec(),
            measurements: builder.measurements().to_vec(),
            fields: builder.fields().to_vec(),
            titles: builder.titles(),
            revision: builder.revision(),
        }
    }
}

// ============================================
// GRAFANA DTOs
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDashboardRequest {
    #[serde(default)]
    pub flux_query: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub panel_title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateDashboardResponse {
    pub success: bool,
    pub dashboard: DashboardLinks,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardLinks {
    pub uid: String,
    pub url: String,
    pub absolute_url: String,
}

#[derive(Debug, Serialize)]
pub struct DatasourcesResponse {
    pub message: String,
    pub datasources: Vec<Datasource>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub sessions: usize,
    pub grafana: bool,
}
