//! Query Routes
//!
//! - POST /api/v1/query/analyze - Report errors in Flux text
//! - POST /api/v1/query/run - Execute Flux text

use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;

use crate::api::dto::{AnalyzeResponse, QueryTextRequest, RunQueryResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::auth::authenticate;
use crate::api::state::AppState;

fn require_query(req: &QueryTextRequest) -> ApiResult<&str> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(ApiError::Validation("query cannot be empty".to_string()));
    }
    Ok(query)
}

/// POST /api/v1/query/analyze
pub async fn analyze_query(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<QueryTextRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let auth = authenticate(&state, &headers).await?;
    let query = require_query(&req)?;

    let errors = state.influx.analyze(&auth.credentials, query).await?;
    Ok(Json(AnalyzeResponse { errors }))
}

/// POST /api/v1/query/run
pub async fn run_query(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<QueryTextRequest>,
) -> ApiResult<Json<RunQueryResponse>> {
    let auth = authenticate(&state, &headers).await?;
    let query = require_query(&req)?;

    let tables = state.influx.query(&auth.credentials, query).await?;
    tracing::debug!(tables = tables.len(), "query executed");
    Ok(Json(RunQueryResponse { tables }))
}
