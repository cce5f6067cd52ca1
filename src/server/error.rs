//! server::error
//!
//! The JSON error envelope.
//!
//! Every failure is reported as
//!
//! ```json
//! {"error": "Failed to fetch file metadata", "details": "metadata lookup for 'a.json' failed with status 404: Not Found"}
//! ```
//!
//! `error` is a stable summary, `details` the full message of the underlying
//! error. Neither ever contains the bearer credential.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::resolve::ResolveError;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Resolve(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn envelope(&self) -> ErrorResponse {
        match self {
            ApiError::Resolve(err) => ErrorResponse {
                error: err.summary().to_string(),
                details: err.to_string(),
            },
            ApiError::BadRequest(msg) => ErrorResponse {
                error: "Bad request".to_string(),
                details: msg.clone(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let invalid: ApiError = ResolveError::InvalidPath {
            path: "..".to_string(),
            reason: "path escapes the repository".to_string(),
        }
        .into();
        assert_eq!(invalid.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let timeout: ApiError = ResolveError::Timeout {
            url: "https://api.github.com/x".to_string(),
        }
        .into();
        assert_eq!(timeout.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let upstream: ApiError = ResolveError::UpstreamMetadata {
            path: "a.json".to_string(),
            status: 404,
            body: "Not Found".to_string(),
        }
        .into();
        assert_eq!(upstream.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let query = ApiError::BadRequest("stream must be true or false".to_string());
        assert_eq!(query.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn envelope_carries_summary_and_details() {
        let err: ApiError = ResolveError::UpstreamLfs {
            url: "https://media.test/o/r/main/a.json".to_string(),
            status: 404,
        }
        .into();
        let body = err.envelope();
        assert_eq!(body.error, "Failed to fetch LFS content");
        assert!(body.details.contains("404"));
    }
}
