//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::grafana::GrafanaError;
use crate::influx::InfluxError;
use crate::session::SessionError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or malformed credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Token unknown or expired
    #[error("{0}")]
    Session(#[from] SessionError),

    /// InfluxDB call failed
    #[error("InfluxDB error: {0}")]
    Influx(#[from] InfluxError),

    /// Grafana call failed
    #[error("Grafana error: {0}")]
    Grafana(#[from] GrafanaError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Status code and machine-readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Session(SessionError::Expired) => (StatusCode::UNAUTHORIZED, "SESSION_EXPIRED"),
            ApiError::Session(SessionError::Unknown) => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            ApiError::Influx(e) => match e {
                InfluxError::Unauthorized => (StatusCode::UNAUTHORIZED, "INFLUX_UNAUTHORIZED"),
                InfluxError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "INFLUX_UNAVAILABLE"),
                InfluxError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "INFLUX_TIMEOUT"),
                InfluxError::Api { status, .. } if (400..500).contains(status) => {
                    (StatusCode::BAD_REQUEST, "QUERY_ERROR")
                }
                _ => (StatusCode::BAD_GATEWAY, "INFLUX_ERROR"),
            },
            ApiError::Grafana(e) => match e {
                GrafanaError::NotConfigured => {
                    (StatusCode::SERVICE_UNAVAILABLE, "GRAFANA_NOT_CONFIGURED")
                }
                GrafanaError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "GRAFANA_UNAVAILABLE"),
                GrafanaError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "GRAFANA_TIMEOUT"),
                _ => (StatusCode::BAD_GATEWAY, "GRAFANA_ERROR"),
            },
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let request_id = uuid::Uuid::new_v4().to_string();

        // Log the error
        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "request rejected"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("x".into()).status_and_code().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(SessionError::Expired).status_and_code(),
            (StatusCode::UNAUTHORIZED, "SESSION_EXPIRED")
        );
        assert_eq!(
            ApiError::from(InfluxError::Unauthorized).status_and_code().0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(InfluxError::Api {
                status: 400,
                message: "compilation failed".into()
            })
            .status_and_code()
            .1,
            "QUERY_ERROR"
        );
        assert_eq!(
            ApiError::from(InfluxError::Api {
                status: 500,
                message: "boom".into()
            })
            .status_and_code()
            .0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(GrafanaError::NotConfigured).status_and_code().0,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
