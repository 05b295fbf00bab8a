use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure taxonomy shared by every component. Nothing in the core retries
/// or substitutes a default; all of these propagate to the caller.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("password hashing failed")]
    HashingFailed,

    #[error("token signing failed")]
    SigningFailed,

    /// Covers wrong password, unknown email and malformed stored hashes
    /// uniformly so the response never leaks which one it was.
    #[error("invalid email or password")]
    InvalidCredential,

    #[error("email already registered")]
    DuplicateEmail,

    #[error("token expired")]
    TokenExpired,

    #[error("invalid token")]
    TokenInvalid,

    #[error("user not found")]
    NotFound,

    #[error("directory read failed: {0}")]
    ReadFailed(String),

    #[error("directory write failed: {0}")]
    WriteFailed(String),

    #[error("object delete failed: {0}")]
    DeleteFailed(String),

    #[error("object upload failed: {0}")]
    UploadFailed(String),

    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            // NotFound on a current-user lookup means the token outlived the
            // account; treat it like any other failed authentication.
            AppError::InvalidCredential
            | AppError::TokenExpired
            | AppError::TokenInvalid
            | AppError::NotFound => StatusCode::UNAUTHORIZED,
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::HashingFailed
            | AppError::SigningFailed
            | AppError::ReadFailed(_)
            | AppError::WriteFailed(_)
            | AppError::DeleteFailed(_)
            | AppError::UploadFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Infrastructure details stay in the logs, not in the response body.
    fn public_message(&self) -> String {
        match self {
            AppError::ReadFailed(_)
            | AppError::WriteFailed(_)
            | AppError::DeleteFailed(_)
            | AppError::UploadFailed(_)
            | AppError::HashingFailed
            | AppError::SigningFailed => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
