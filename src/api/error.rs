//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::{ClassifyError, Stage};

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No file uploaded")]
    NoFile,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Upload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, stage) = match &self {
            ApiError::NoFile => (
                StatusCode::BAD_REQUEST,
                "NO_FILE",
                "No file uploaded".to_string(),
                None,
            ),
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                detail.clone(),
                None,
            ),
            ApiError::PayloadTooLarge { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                format!("Upload exceeds the {limit} byte limit"),
                None,
            ),
            ApiError::Classify(err) if err.is_configuration_error() => {
                // Already logged by CoreState::classify; the client gets no detail
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    err.code(),
                    "The classifier is misconfigured".to_string(),
                    Some(err.stage()),
                )
            }
            ApiError::Classify(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                err.code(),
                err.to_string(),
                Some(err.stage()),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                stage,
            },
        };

        (status, Json(body)).into_response()
    }
}
