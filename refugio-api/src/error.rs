use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use refugio_core::BookingError;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    /// HTTP mapping for the engine's taxonomy. Unavailable dates are a
    /// business outcome (409), not a server fault.
    pub fn from_booking(err: BookingError) -> Self {
        match err {
            BookingError::InvalidDates(msg) => AppError::ValidationError(msg),
            BookingError::Unavailable => AppError::ConflictError("dates unavailable".to_string()),
            BookingError::LockContention => AppError::ConflictError(err.to_string()),
            BookingError::HoldNotFound(_) | BookingError::CabinNotFound(_) => {
                AppError::NotFoundError(err.to_string())
            }
            BookingError::Storage(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
