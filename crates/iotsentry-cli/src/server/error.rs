//! API error types and handling.

use std::collections::BTreeSet;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use iotsentry::SentryError;
use serde::Serialize;

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from client.
    BadRequest(String),
    /// Error from the iotsentry library.
    Sentry(SentryError),
    /// Server-side failure outside the library, such as a panicked worker.
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing: Option<BTreeSet<String>>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Sentry(e) => match e {
                SentryError::MissingFeatures { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                SentryError::ShapeMismatch { .. }
                | SentryError::ArtifactNotFound { .. }
                | SentryError::ArtifactCorrupt { .. }
                | SentryError::Io { .. }
                | SentryError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let body = match self {
            ApiError::BadRequest(message) => ErrorResponse {
                error: "bad_request".to_string(),
                message,
                missing: None,
            },
            ApiError::Internal(message) => ErrorResponse {
                error: "internal".to_string(),
                message,
                missing: None,
            },
            ApiError::Sentry(e) => {
                let error = e.kind().to_string();
                let message = e.to_string();
                let missing = match e {
                    SentryError::MissingFeatures { missing } => Some(missing),
                    _ => None,
                };
                ErrorResponse {
                    error,
                    message,
                    missing,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<SentryError> for ApiError {
    fn from(err: SentryError) -> Self {
        ApiError::Sentry(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Sentry(e) => write!(f, "{}", e),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let missing = ApiError::from(SentryError::MissingFeatures {
            missing: BTreeSet::new(),
        });
        assert_eq!(missing.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let internal = ApiError::from(SentryError::ShapeMismatch {
            expected: 1,
            actual: 0,
        });
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let parse = ApiError::from(SentryError::EmptyData("no rows".to_string()));
        assert_eq!(parse.status(), StatusCode::BAD_REQUEST);

        let worker = ApiError::Internal("worker panicked".to_string());
        assert_eq!(worker.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
