//! Auth Routes
//!
//! Login exchanges an InfluxDB API token and organization for a session
//! token. Every other protected route sends it as `Authorization: Bearer`.
//!
//! - POST /api/v1/auth/login
//! - GET /api/v1/auth/validate
//! - POST /api/v1/auth/logout

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{LoginRequest, LoginResponse, ValidateResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::influx::{Credentials, InfluxError};

/// Session resolved from a request's bearer token
pub struct Authenticated {
    pub token: String,
    pub credentials: Credentials,
}

/// Extract the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> ApiResult<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
}

/// Resolve the session behind the request's bearer token
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<Authenticated> {
    let token = bearer_token(headers)?.to_string();
    let credentials = state.sessions.credentials(&token).await?;
    Ok(Authenticated { token, credentials })
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let api_token = req.api_token.trim();
    let organization = req.organization.trim();

    if api_token.is_empty() || organization.is_empty() {
        return Err(ApiError::Validation(
            "apiToken and organization are required".to_string(),
        ));
    }

    let credentials = Credentials::new(api_token, organization);

    state.influx.validate(&credentials).await.map_err(|e| match e {
        InfluxError::Unauthorized | InfluxError::Api { status: 404, .. } => ApiError::Unauthorized(
            "Failed to validate InfluxDB credentials. Please check your token and organization."
                .to_string(),
        ),
        other => ApiError::Influx(other),
    })?;

    let issued = state.sessions.create(credentials).await;
    tracing::info!(organization, "login succeeded");

    Ok(Json(LoginResponse {
        success: true,
        token: issued.token,
        message: "Authentication successful".to_string(),
        expires_at: issued.expires_at,
    }))
}

/// GET /api/v1/auth/validate
pub async fn validate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<ValidateResponse>> {
    let auth = authenticate(&state, &headers).await?;

    Ok(Json(ValidateResponse {
        valid: true,
        message: "Token is valid".to_string(),
        organization: auth.credentials.organization,
    }))
}

/// POST /api/v1/auth/logout
///
/// Drops the session and its builder state.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let token = bearer_token(&headers)?;
    state.sessions.remove(token).await;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc123");
    }
}
