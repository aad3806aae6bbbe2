//! Grafana Routes
//!
//! - POST /api/v1/grafana/dashboard - Publish Flux text as a dashboard
//! - GET /api/v1/grafana/datasources - List datasources

use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;

use crate::api::dto::{
    CreateDashboardRequest, CreateDashboardResponse, DashboardLinks, DatasourcesResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::auth::authenticate;
use crate::api::state::AppState;
use crate::grafana::{DashboardRequest, DatasourceParams, GrafanaClient, GrafanaError};

fn grafana(state: &AppState) -> ApiResult<&GrafanaClient> {
    state
        .grafana
        .as_deref()
        .ok_or(ApiError::Grafana(GrafanaError::NotConfigured))
}

/// POST /api/v1/grafana/dashboard
///
/// Ensures the InfluxDB datasource exists using the session's credentials,
/// then creates the dashboard.
pub async fn create_dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateDashboardRequest>,
) -> ApiResult<Json<CreateDashboardResponse>> {
    let client = grafana(&state)?;

    if req.flux_query.trim().is_empty() {
        return Err(ApiError::Validation("Flux query is required".to_string()));
    }
    if req.title.trim().is_empty() {
        return Err(ApiError::Validation("Dashboard title is required".to_string()));
    }

    let auth = authenticate(&state, &headers).await?;

    let datasource = client
        .ensure_influx_datasource(&DatasourceParams {
            name: state.grafana_config.datasource_name.clone(),
            influx_url: state.grafana_config.datasource_influx_url.clone(),
            organization: auth.credentials.organization.clone(),
            default_bucket: Some(state.grafana_config.default_bucket.clone()),
            token: auth.credentials.api_token.clone(),
        })
        .await?;

    let created = client
        .create_flux_dashboard(&DashboardRequest {
            title: req.title,
            flux_query: req.flux_query,
            datasource_uid: datasource.uid,
            panel_title: req.panel_title.or_else(|| Some("Flux Query Result".to_string())),
        })
        .await?;

    let absolute_url = client.absolute_url(&created.url);

    Ok(Json(CreateDashboardResponse {
        success: true,
        dashboard: DashboardLinks {
            uid: created.uid,
            url: created.url,
            absolute_url,
        },
        message: "Dashboard created successfully".to_string(),
    }))
}

/// GET /api/v1/grafana/datasources
pub async fn list_datasources(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<DatasourcesResponse>> {
    let client = grafana(&state)?;
    authenticate(&state, &headers).await?;

    let datasources = client.datasources().await?;
    Ok(Json(DatasourcesResponse {
        message: "Datasources retrieved successfully".to_string(),
        datasources,
    }))
}
