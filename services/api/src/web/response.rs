//! services/api/src/web/response.rs
//!
//! The JSON envelope every endpoint answers with, and the mapping from core
//! errors to HTTP statuses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;
use study_assistant_core::ports::PortError;
use tracing::error;
use utoipa::ToSchema;

/// The `error` member of a failed response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

/// `{ "success": true, "data": ... }` with the given status.
pub fn success<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(json!({ "success": true, "data": data }))).into_response()
}

/// A failed request, rendered as `{ "success": false, "error": { code, message } }`.
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub info: ErrorInfo,
}

impl ApiFailure {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            info: ErrorInfo {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn bad_request(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn internal(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }
}

impl From<PortError> for ApiFailure {
    fn from(e: PortError) -> Self {
        match &e {
            PortError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
            PortError::Unauthorized => {
                Self::new(StatusCode::FORBIDDEN, "UNAUTHORIZED", "Unauthorized access")
            }
            PortError::InvalidRange { .. } => {
                Self::bad_request("INVALID_PAGE_RANGE", e.to_string())
            }
            PortError::ExtractionFailed(_) => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "EXTRACTION_FAILED",
                e.to_string(),
            ),
            PortError::ChunkSummarizationFailed { .. } | PortError::Remote { .. } => {
                Self::new(StatusCode::BAD_GATEWAY, "GENERATION_ERROR", e.to_string())
            }
            PortError::Unexpected(_) => {
                error!("Unexpected failure: {}", e);
                Self::internal("INTERNAL_ERROR", "An internal error occurred")
            }
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "error": self.info })),
        )
            .into_response()
    }
}
