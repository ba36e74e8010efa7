use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use burrow_core::ValidationError;
use burrow_shortener::{PipelineError, ShortenerError};
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid request body: {0}")]
    Body(String),
    #[error("short code not found")]
    NotFound,
    #[error("short code has been deleted")]
    Gone,
    #[error(transparent)]
    Service(ShortenerError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("delete pipeline is busy, try again later")]
    Busy,
}

impl From<ShortenerError> for AppError {
    fn from(value: ShortenerError) -> Self {
        match value {
            ShortenerError::Validation(err) => Self::Validation(err),
            other => Self::Service(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        Self::Body(value.body_text())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            // Unknown codes answer 400 like malformed ones.
            AppError::Validation(_) | AppError::Body(_) | AppError::NotFound => {
                StatusCode::BAD_REQUEST
            }
            AppError::Gone => StatusCode::GONE,
            AppError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Pipeline(_) | AppError::Busy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}
