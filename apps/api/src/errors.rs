use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    /// A field path that does not name any updatable part of a resume.
    #[error("Unknown field path: {}", .0.join("."))]
    UnknownPath(Vec<String>),

    #[error("{collection} index {index} out of bounds (length {len})")]
    IndexOutOfBounds {
        collection: &'static str,
        index: usize,
        len: usize,
    },

    #[error(
        "Sorry, you've reached the limit for resume refinement. Please try again after the limit resets."
    )]
    QuotaExhausted,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::UnknownPath(_)
            | AppError::IndexOutOfBounds { .. } => StatusCode::BAD_REQUEST,
            AppError::QuotaExhausted => StatusCode::FORBIDDEN,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                "A database error occurred".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                self.to_string()
            }
            _ => {
                tracing::debug!("Request rejected ({status}): {self}");
                self.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
