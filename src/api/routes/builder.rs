//! Query Builder Routes
//!
//! Session-scoped selection workflow. Every route answers with the current
//! [`BuilderView`].
//!
//! Selecting a bucket or measurement updates the model first, then fetches
//! the dependent listing with the session lock released. The listing is
//! applied only if no other edit happened in between. A failed listing is
//! logged and leaves the selection in place with an empty listing.
//!
//! - GET /api/v1/builder
//! - POST /api/v1/builder/buckets/refresh
//! - POST /api/v1/builder/bucket
//! - POST /api/v1/builder/measurement
//! - POST /api/v1/builder/fields
//! - POST /api/v1/builder/range
//! - PUT /api/v1/builder/text
//! - DELETE /api/v1/builder/parts/:index
//! - POST /api/v1/builder/reset

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{BuilderView, PositionRequest, PositionsRequest, RangeRequest, TextRequest};
use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::auth::{authenticate, bearer_token};
use crate::api::state::AppState;
use crate::flux::QueryBuilder;

async fn view(state: &AppState, token: &str) -> ApiResult<Json<BuilderView>> {
    let view = state
        .sessions
        .with_builder(token, |builder| BuilderView::from(&*builder))
        .await?;
    Ok(Json(view))
}

async fn edit<R>(
    state: &AppState,
    token: &str,
    f: impl FnOnce(&mut QueryBuilder) -> R,
) -> ApiResult<R> {
    Ok(state.sessions.with_builder(token, f).await?)
}

/// GET /api/v1/builder
pub async fn get_builder(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<BuilderView>> {
    let token = bearer_token(&headers)?;
    view(&state, token).await
}

/// POST /api/v1/builder/buckets/refresh
pub async fn refresh_buckets(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<BuilderView>> {
    let auth = authenticate(&state, &headers).await?;
    let buckets = state.influx.buckets(&auth.credentials).await?;

    edit(&state, &auth.token, |builder| builder.set_buckets(buckets)).await?;
    view(&state, &auth.token).await
}

/// POST /api/v1/builder/bucket
pub async fn select_bucket(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PositionRequest>,
) -> ApiResult<Json<BuilderView>> {
    let auth = authenticate(&state, &headers).await?;

    let (bucket, revision) = edit(&state, &auth.token, |builder| {
        builder
            .select_bucket(req.position)
            .map(|bucket| (bucket, builder.revision()))
    })
    .await?
    .ok_or_else(|| ApiError::Validation(format!("no bucket listed at position {}", req.position)))?;

    match state.influx.measurements(&auth.credentials, &bucket.name).await {
        Ok(measurements) => {
            edit(&state, &auth.token, |builder| {
                builder.apply_measurements(revision, measurements)
            })
            .await?;
        }
        Err(e) => {
            tracing::warn!(bucket = %bucket.name, "Failed to list measurements: {}", e);
        }
    }

    view(&state, &auth.token).await
}

/// POST /api/v1/builder/measurement
pub async fn select_measurement(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PositionRequest>,
) -> ApiResult<Json<BuilderView>> {
    let auth = authenticate(&state, &headers).await?;

    let (lookup, revision) = edit(&state, &auth.token, |builder| {
        builder
            .select_measurement(req.position)
            .map(|lookup| (lookup, builder.revision()))
    })
    .await?
    .ok_or_else(|| {
        ApiError::Validation(format!(
            "no measurement listed at position {} or no bucket selected",
            req.position
        ))
    })?;

    match state
        .influx
        .fields(&auth.credentials, &lookup.bucket, &lookup.measurement)
        .await
    {
        Ok(fields) => {
            edit(&state, &auth.token, |builder| builder.apply_fields(revision, fields)).await?;
        }
        Err(e) => {
            tracing::warn!(
                bucket = %lookup.bucket,
                measurement = %lookup.measurement,
                "Failed to list fields: {}",
                e
            );
        }
    }

    view(&state, &auth.token).await
}

/// POST /api/v1/builder/fields
pub async fn select_fields(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PositionsRequest>,
) -> ApiResult<Json<BuilderView>> {
    let token = bearer_token(&headers)?;

    let changed = edit(&state, token, |builder| builder.select_fields(&req.positions)).await?;
    if !changed {
        return Err(ApiError::Validation(
            "none of the given positions are listed fields".to_string(),
        ));
    }
    view(&state, token).await
}

/// POST /api/v1/builder/range
pub async fn select_range(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RangeRequest>,
) -> ApiResult<Json<BuilderView>> {
    let token = bearer_token(&headers)?;

    let start = req.start.trim().to_string();
    if start.is_empty() {
        return Err(ApiError::Validation("start cannot be empty".to_string()));
    }
    let stop = req
        .stop
        .map(|stop| stop.trim().to_string())
        .filter(|stop| !stop.is_empty());

    edit(&state, token, |builder| builder.select_date_range(start, stop)).await?;
    view(&state, token).await
}

/// PUT /api/v1/builder/text
pub async fn update_text(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<TextRequest>,
) -> ApiResult<Json<BuilderView>> {
    let token = bearer_token(&headers)?;
    edit(&state, token, |builder| builder.update_text(&req.text)).await?;
    view(&state, token).await
}

/// DELETE /api/v1/builder/parts/:index
pub async fn remove_part(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(index): Path<usize>,
) -> ApiResult<Json<BuilderView>> {
    let token = bearer_token(&headers)?;

    edit(&state, token, |builder| builder.remove_part(index))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("part {}", index)))?;
    view(&state, token).await
}

/// POST /api/v1/builder/reset
pub async fn reset(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<BuilderView>> {
    let token = bearer_token(&headers)?;
    edit(&state, token, QueryBuilder::reset).await?;
    view(&state, token).await
}
