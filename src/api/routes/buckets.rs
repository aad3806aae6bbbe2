//! Schema Routes
//!
//! - GET /api/v1/buckets
//! - GET /api/v1/buckets/:bucket/measurements
//! - GET /api/v1/buckets/:bucket/measurements/:measurement/fields

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{BucketsResponse, FieldsResponse, MeasurementsResponse};
use crate::api::error::ApiResult;
use crate::api::routes::auth::authenticate;
use crate::api::state::AppState;

/// GET /api/v1/buckets
pub async fn list_buckets(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<BucketsResponse>> {
    let auth = authenticate(&state, &headers).await?;
    let buckets = state.influx.buckets(&auth.credentials).await?;
    Ok(Json(BucketsResponse { buckets }))
}

/// GET /api/v1/buckets/:bucket/measurements
pub async fn list_measurements(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(bucket): Path<String>,
) -> ApiResult<Json<MeasurementsResponse>> {
    let auth = authenticate(&state, &headers).await?;
    let measurements = state.influx.measurements(&auth.credentials, &bucket).await?;
    Ok(Json(MeasurementsResponse {
        bucket,
        measurements,
    }))
}

/// GET /api/v1/buckets/:bucket/measurements/:measurement/fields
pub async fn list_fields(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((bucket, measurement)): Path<(String, String)>,
) -> ApiResult<Json<FieldsResponse>> {
    let auth = authenticate(&state, &headers).await?;
    let fields = state
        .influx
        .fields(&auth.credentials, &bucket, &measurement)
        .await?;
    Ok(Json(FieldsResponse {
        bucket,
        measurement,
        fields,
    }))
}
