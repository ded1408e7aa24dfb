//! HTTP error mapping.

use deepsearch_core::DeepSearchError;
use log::error;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use serde_json::json;
use thiserror::Error;

/// Errors returned by request handlers.
///
/// Internal failures are logged in full; clients only see a generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> Status {
        match self {
            ApiError::Unauthorized => Status::Unauthorized,
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }
}

impl From<DeepSearchError> for ApiError {
    fn from(err: DeepSearchError) -> Self {
        match err {
            DeepSearchError::InvalidRequest(message) => ApiError::BadRequest(message),
            DeepSearchError::ChatNotFound(_) => ApiError::NotFound("chat not found".to_string()),
            DeepSearchError::VersionConflict { .. } => {
                ApiError::Conflict("chat was modified concurrently".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let message = match &self {
            ApiError::Internal(detail) => {
                error!(
                    "request failed (method={}, uri={}): {}",
                    request.method(),
                    request.uri(),
                    detail
                );
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (self.status(), Json(json!({ "error": message }))).respond_to(request)
    }
}

/// Startup failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid listen address: {0}")]
    InvalidAddress(String),
    #[error("server failed: {0}")]
    Launch(String),
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use deepsearch_core::DeepSearchError;
    use pretty_assertions::assert_eq;
    use rocket::http::Status;

    #[test]
    fn core_errors_map_to_statuses() {
        let cases = [
            (
                DeepSearchError::InvalidRequest("messages cannot be empty".to_string()),
                Status::BadRequest,
            ),
            (
                DeepSearchError::ChatNotFound("c1".to_string()),
                Status::NotFound,
            ),
            (
                DeepSearchError::VersionConflict {
                    chat_id: "c1".to_string(),
                    expected: 3,
                },
                Status::Conflict,
            ),
            (
                DeepSearchError::State("disk full".to_string()),
                Status::InternalServerError,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn not_found_hides_chat_id() {
        let err = ApiError::from(DeepSearchError::ChatNotFound("secret".to_string()));
        assert_eq!(err.to_string(), "chat not found");
    }
}
