//! Request-boundary error taxonomy and its HTTP rendering.
//!
//! Component code below the handlers stays on `anyhow`; handlers translate
//! failures at the boundary into an [`ApiError`], which fixes the status code
//! and the body shape in one place.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Everything a handler can answer a failed request with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request itself is unusable: missing fields, unknown session.
    /// Rendered as 400 with a structured body.
    #[error("{0}")]
    Validation(String),

    /// An upstream step failed after a valid request. Rendered as 500 with a
    /// structured body.
    #[error("{message}")]
    Upstream {
        message: String,
        /// The upstream cause; the full error chain when verbose errors are
        /// enabled.
        details: String,
    },

    /// Failure on the raw-download route, rendered as plain text so the
    /// caller saving to a file sees the message instead of an HTML blob.
    #[error("{message}")]
    Download { status: StatusCode, message: String },
}

impl ApiError {
    /// Upstream failure. `details` always names the upstream cause; `verbose`
    /// expands it to the full context chain.
    pub fn upstream(message: impl Into<String>, err: &anyhow::Error, verbose: bool) -> Self {
        Self::Upstream {
            message: message.into(),
            details: if verbose {
                format!("{err:#}")
            } else {
                err.to_string()
            },
        }
    }

    /// Plain-text 400 on the download route.
    pub fn download_rejected(message: impl Into<String>) -> Self {
        Self::Download {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Plain-text 500 on the download route.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::Download {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Upstream { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message, "details": details })),
            )
                .into_response(),
            ApiError::Download { status, message } => (status, message).into_response(),
        }
    }
}

// ---- Tests ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_validation_renders_400_json() {
        let response = ApiError::Validation("url is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = serde_json::from_str(&body_of(response).await).unwrap();
        assert_eq!(body["error"], "url is required");
    }

    #[tokio::test]
    async fn test_upstream_always_carries_details() {
        let err = anyhow::anyhow!("connect timed out").context("failed to fetch page");

        // Default mode names the cause without the underlying chain.
        let quiet = ApiError::upstream("login attempt failed", &err, false).into_response();
        assert_eq!(quiet.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_str(&body_of(quiet).await).unwrap();
        assert_eq!(body["error"], "login attempt failed");
        assert_eq!(body["details"], "failed to fetch page");

        // Verbose mode expands to the whole chain.
        let verbose = ApiError::upstream("login attempt failed", &err, true).into_response();
        let body: serde_json::Value = serde_json::from_str(&body_of(verbose).await).unwrap();
        let details = body["details"].as_str().unwrap();
        assert!(details.contains("failed to fetch page"));
        assert!(details.contains("connect timed out"));
    }

    #[tokio::test]
    async fn test_download_errors_are_plain_text() {
        let rejected = ApiError::download_rejected("invalid or expired session").into_response();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
        let content_type = rejected
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(body_of(rejected).await, "invalid or expired session");

        let failed = ApiError::download_failed("download failed: boom").into_response();
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
