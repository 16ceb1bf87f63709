//! ==============================================================================
//! error.rs - uniform error envelope
//! ==============================================================================
//!
//! purpose:
//!     every failure the api returns is shaped the same way:
//!
//!         { "timestamp": ..., "status": 400, "error": "...", "path": "/api/sensors" }
//!
//!     - validation problems -> 400 with the violation message
//!     - data source problems -> 503 with a fixed message (driver text is
//!       logged, never returned)
//!
//! relationships:
//!     - used by: api.rs
//!     - wraps: sampler::SamplerError
//!
//! ==============================================================================

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::sampler::SamplerError;

pub const DATA_SOURCE_UNAVAILABLE: &str = "Data source unavailable";

/// a rejected `count` parameter
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Count must be at least 1")]
    BelowMinimum,
    #[error("Count must not exceed 10,000")]
    AboveMaximum,
    #[error("Count must be a valid integer")]
    NotAnInteger,
    #[error("{0}")]
    MalformedQuery(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("data source unavailable: {0}")]
    DataSource(#[from] SamplerError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::DataSource(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// message safe to show to clients
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Validation(e) => e.to_string(),
            ApiError::DataSource(_) => DATA_SOURCE_UNAVAILABLE.to_string(),
        }
    }

    /// attach the request path so the error can be rendered
    pub fn at(self, path: impl Into<String>) -> ErrorResponse {
        ErrorResponse { error: self, path: path.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub error: String,
    pub path: String,
}

/// an ApiError bound to the path it happened on
#[derive(Debug)]
pub struct ErrorResponse {
    pub error: ApiError,
    pub path: String,
}

impl ErrorResponse {
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            timestamp: Utc::now(),
            status: self.error.status().as_u16(),
            error: self.error.public_message(),
            path: self.path.clone(),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        match &self.error {
            ApiError::Validation(e) => {
                tracing::debug!(path = %self.path, "rejected request: {e}");
            }
            ApiError::DataSource(e) => {
                tracing::error!(path = %self.path, kind = e.kind(), "data source failure: {e}");
            }
        }
        (self.error.status(), Json(self.body())).into_response()
    }
}
