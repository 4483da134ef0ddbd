use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::warn;

use studyhub_common::StudyHubError;

/// Errors surfaced to HTTP callers. Internal failures are logged and
/// answered with a generic message.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Operation failed")]
    Internal(#[source] StudyHubError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl From<StudyHubError> for ApiError {
    fn from(err: StudyHubError) -> Self {
        match err {
            StudyHubError::Validation(message) => ApiError::BadRequest(message),
            StudyHubError::Unauthorized => ApiError::Unauthorized,
            err @ StudyHubError::StoreUnavailable(_) => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(e) => {
                warn!(error = %e, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(serde_json::json!({ "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = ApiError::from(StudyHubError::Validation("No user email provided".into()));
        assert_eq!(err.to_string(), "No user email provided");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failure_hides_detail() {
        let err = ApiError::from(StudyHubError::StoreUnavailable(sqlx::Error::PoolTimedOut));
        assert_eq!(err.to_string(), "Operation failed");
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
