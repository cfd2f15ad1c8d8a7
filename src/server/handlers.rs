//! HTTP request handlers for the web server.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::AppState;
use crate::error::InvalidRequest;
use crate::fusion::SearchQuery;

/// Raw query parameters; validated by [`SearchQuery::from_params`].
#[derive(Debug, Default, Deserialize)]
pub struct FuseParams {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub size: Option<String>,
}

/// Fuse business results and map features for the requested box.
pub async fn fuse(
    State(state): State<AppState>,
    Query(params): Query<FuseParams>,
) -> Result<impl IntoResponse, InvalidRequest> {
    let query = SearchQuery::from_params(
        params.lat.as_deref(),
        params.lon.as_deref(),
        params.size.as_deref(),
    )
    .inspect_err(|e| tracing::debug!("Rejected request: {}", e))?;

    let result = state.fuser.fuse(&query).await;
    Ok((result.status(), Json(result)))
}

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}
