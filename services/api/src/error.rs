//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use social::SocialError;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Unauthorized access
    #[error("Unauthorized")]
    Unauthorized,

    /// Friendship or leaderboard rule violation, or storage failure
    #[error(transparent)]
    Social(#[from] SocialError),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Social(err) => match err {
                SocialError::InvalidTarget(_) | SocialError::InvalidArgument(_) => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                SocialError::DuplicateRequest(_) => (StatusCode::CONFLICT, err.to_string()),
                SocialError::RequestNotFound(_)
                | SocialError::NotFriends(_)
                | SocialError::UserNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                SocialError::Database(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Social(SocialError::Database(e)) = &self {
            error!("Database error: {}", e);
        }

        let (status, error_message) = self.status_and_message();

        let body = Json(json!({
            "success": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
