//! Request and startup error types.
//!
//! Upstream failures live in [`crate::providers::ProviderError`].

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// A query that cannot be turned into a bounding box. Surfaced as `400`.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidRequest {
    #[error("Missing required parameter '{0}'")]
    MissingParameter(&'static str),
    #[error("Parameter '{name}' is not a finite number: {value:?}")]
    NotANumber { name: &'static str, value: String },
    #[error("Parameter '{name}' out of range [{min}, {max}]: {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("Parameter 'size' must not be negative: {0}")]
    NegativeSize(f64),
}

impl IntoResponse for InvalidRequest {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Fatal problems while preparing the service. The process does not start.
#[derive(Debug, Error)]
pub enum StartupConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
