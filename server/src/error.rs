//! Error types for the store and HTTP layers.
//!
//! `StoreError` is what a `TodoStore` returns. `ApiError` is what handlers
//! return; it renders as `{"error": "..."}` with the matching status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised by a `TodoStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// A uniqueness rule was violated, e.g. a duplicate category name.
    #[error("{0}")]
    Conflict(String),

    /// The blocking task running the store call did not complete.
    #[error("store task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad input shape or range. Maps to 400.
    #[error("{0}")]
    Validation(String),

    /// The addressed record does not exist. Maps to 404.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Underlying store failure. Maps to 500 with the raw message.
    #[error(transparent)]
    Store(StoreError),

    /// CSV rendering failed. Maps to 500.
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ApiError::Validation(msg),
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(error = %message, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %message, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
