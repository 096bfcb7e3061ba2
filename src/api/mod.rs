//! HTTP surface for the feed service

pub mod server;

pub use server::{ApiServer, ApiServerConfig};

use crate::error::EuterpeError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type with HTTP status mapping
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Request body or parameters are invalid (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Activity cannot serve this operation (422)
    #[error("Unprocessable: {0}")]
    MissingGenre(String),

    /// Rebuild already in flight for this user (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Feed store or oracle unreachable (502)
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<EuterpeError> for ApiError {
    fn from(err: EuterpeError) -> Self {
        match &err {
            EuterpeError::NotFound(_) => ApiError::NotFound(err.to_string()),
            EuterpeError::MissingGenre(_) => ApiError::MissingGenre(err.to_string()),
            EuterpeError::RebuildInFlight(_) => ApiError::Conflict(err.to_string()),
            EuterpeError::StoreUnavailable(_)
            | EuterpeError::OracleUnavailable(_)
            | EuterpeError::Http(_) => ApiError::Upstream(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::MissingGenre(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "missing_genre", msg)
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "rebuild_in_flight", msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "upstream_unavailable", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let cases = [
            (
                EuterpeError::NotFound("post:Post:9".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                EuterpeError::MissingGenre("post:Post:9".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                EuterpeError::RebuildInFlight("alice".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                EuterpeError::StoreUnavailable("down".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                EuterpeError::StoreApi("rejected".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                EuterpeError::OracleUnavailable("down".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                EuterpeError::Ledger("disk".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let api_err: ApiError = err.into();
            let response = api_err.into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
