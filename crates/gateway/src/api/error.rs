//! Error responses.
//!
//! Every failure renders as `{"detail": "<description>"}`, the same body
//! shape FastAPI clients already parse.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use tc_threads::{ArchiveError, RegistryError};

use crate::runtime::TurnError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), detail = %self.detail, "request failed");
        } else {
            tracing::debug!(status = self.status.as_u16(), detail = %self.detail, "request rejected");
        }
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::InvalidThread => Self::bad_request(e.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<ArchiveError> for ApiError {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::InvalidName { .. } => Self::bad_request(e.to_string()),
            ArchiveError::NotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                detail: e.to_string(),
            },
            ArchiveError::Io(_) => Self::internal(e.to_string()),
        }
    }
}
