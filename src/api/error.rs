//! Error type for the HTTP handlers

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// API error type
///
/// Client mistakes map to 400; anything raised by the archive service, or by
/// reading its output, maps to 500. Every body is `{success: false, error}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Upload request without a `file` field (400)
    #[error("No file provided")]
    MissingFile,

    /// Status request without `jobId` (400)
    #[error("Job ID is required")]
    MissingJobId,

    /// Body could not be read as a multipart form (400)
    #[error("Invalid form data: {0}")]
    InvalidForm(String),

    /// Archive service or transport failure (500)
    #[error("{0:#}")]
    Upstream(#[from] anyhow::Error),

    /// Job output was not valid JSON (500)
    #[error("Malformed inventory output: {0}")]
    MalformedInventory(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile | ApiError::MissingJobId | ApiError::InvalidForm(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Upstream(_) | ApiError::MalformedInventory(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::InvalidForm(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", message);
        } else {
            tracing::debug!("Rejected request: {}", message);
        }

        let body = Json(json!({
            "success": false,
            "error": message,
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
    fn test_status_codes() {
        assert_eq!(ApiError::MissingFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::MissingJobId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Upstream(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_message_keeps_context_chain() {
        let err = anyhow::anyhow!("connection reset").context("Failed to describe job j1");
        assert_eq!(
            ApiError::from(err).to_string(),
            "Failed to describe job j1: connection reset"
        );
    }
}
