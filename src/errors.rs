use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::BookingStatus;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("booking {0} already exists")]
    AlreadyExists(String),

    #[error("booking {0} not found")]
    NotFound(String),

    #[error("booking {id} is {actual}, expected {expected}")]
    Conflict {
        id: String,
        expected: BookingStatus,
        actual: BookingStatus,
    },

    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("booking {booking_id} saved but notification failed: {reason}")]
    NotificationFailed { booking_id: String, reason: String },

    #[error("upload rejected: {0}")]
    Upload(String),

    #[error("upload too large: {0}")]
    UploadTooLarge(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(id) => AppError::AlreadyExists(id),
            StoreError::NotFound(id) => AppError::NotFound(format!("booking {id}")),
            e @ (StoreError::Conflict { .. } | StoreError::IllegalTransition { .. }) => {
                AppError::Conflict(e.to_string())
            }
            StoreError::Database(e) => AppError::Database(e),
            e @ (StoreError::Corrupt(_) | StoreError::Encoding(_)) => {
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Transport(_) => StatusCode::BAD_GATEWAY,
            AppError::NotificationFailed { .. } => StatusCode::BAD_GATEWAY,
            AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            AppError::NotificationFailed { booking_id, .. } => serde_json::json!({
                "success": false,
                "bookingId": booking_id,
                "error": self.to_string(),
            }),
            _ => serde_json::json!({ "success": false, "error": self.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}
