//! OpenStreetMap features via the Overpass API.
//!
//! Issues a "map call" for the box: every node inside it plus the ways and
//! relations that reference those nodes, as Overpass JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::http::{read_json, with_retry};
use super::{GeoProvider, ProviderError};
use crate::error::StartupConfigError;
use crate::geo::BoundingBox;

const PROVIDER: &str = "osm";

/// Overpass API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverpassConfig {
    /// Interpreter endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Server-side query timeout in seconds (`[timeout:N]`).
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u32,
}

fn default_endpoint() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_query_timeout() -> u32 {
    25
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            query_timeout_secs: default_query_timeout(),
        }
    }
}

impl OverpassConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `OVERPASS_ENDPOINT`: interpreter endpoint
    /// - `OVERPASS_QUERY_TIMEOUT`: server-side timeout in seconds
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("OVERPASS_ENDPOINT") {
            self.endpoint = val;
        }
        if let Ok(val) = std::env::var("OVERPASS_QUERY_TIMEOUT") {
            if let Ok(n) = val.parse() {
                self.query_timeout_secs = n;
            }
        }
        self
    }
}

/// Overpass QL for all map data inside `bbox`.
pub fn map_query(bbox: &BoundingBox, timeout_secs: u32) -> String {
    format!(
        "[out:json][timeout:{}];(node({});<;>;);out body;",
        timeout_secs,
        bbox.to_overpass_bbox()
    )
}

/// Map feature adapter.
pub struct OverpassClient {
    client: Client,
    endpoint: Url,
    config: OverpassConfig,
    retries: u32,
    timeout: Duration,
}

impl OverpassClient {
    pub fn new(
        client: Client,
        config: OverpassConfig,
        retries: u32,
        timeout: Duration,
    ) -> Result<Self, StartupConfigError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            StartupConfigError::Invalid(format!("overpass endpoint '{}': {}", config.endpoint, e))
        })?;

        Ok(Self {
            client,
            endpoint,
            config,
            retries,
            timeout,
        })
    }

    pub fn config(&self) -> &OverpassConfig {
        &self.config
    }

    async fn interpret(&self, query: &str) -> Result<Value, ProviderError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e, self.timeout))?;

        read_json(PROVIDER, resp).await
    }
}

#[async_trait]
impl GeoProvider for OverpassClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn query(&self, bbox: &BoundingBox) -> Result<Value, ProviderError> {
        let query = map_query(bbox, self.config.query_timeout_secs);
        debug!("Overpass query: {}", query);
        with_retry(PROVIDER, self.retries, || self.interpret(&query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{compute_bounding_box, GeoPoint};
    use crate::providers::test_support::spawn_upstream;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn client_for(endpoint: String, retries: u32) -> OverpassClient {
        let config = OverpassConfig {
            endpoint,
            ..Default::default()
        };
        let timeout = Duration::from_secs(5);
        let http = crate::providers::http::build_client("geofuse-test", timeout).unwrap();
        OverpassClient::new(http, config, retries, timeout).unwrap()
    }

    #[test]
    fn test_map_query() {
        let bbox = BoundingBox {
            south_west: GeoPoint::new(37.5, -122.5),
            north_east: GeoPoint::new(38.0, -122.25),
        };
        assert_eq!(
            map_query(&bbox, 25),
            "[out:json][timeout:25];(node(37.5,-122.5,38,-122.25);<;>;);out body;"
        );
    }

    #[tokio::test]
    async fn test_query_posts_map_call() {
        let captured: Arc<Mutex<Vec<String>>> = Arc::default();
        let router = Router::new()
            .route(
                "/api/interpreter",
                post(
                    |State(captured): State<Arc<Mutex<Vec<String>>>>,
                     Form(form): Form<HashMap<String, String>>| async move {
                        captured
                            .lock()
                            .unwrap()
                            .push(form.get("data").cloned().unwrap_or_default());
                        Json(serde_json::json!({
                            "version": 0.6,
                            "elements": [{"type": "node", "id": 1, "lat": 37.7866, "lon": -122.3965}]
                        }))
                    },
                ),
            )
            .with_state(captured.clone());
        let base = spawn_upstream(router).await;
        let client = client_for(format!("{}/api/interpreter", base), 0);

        let bbox = compute_bounding_box(GeoPoint::new(37.786660, -122.396559), 0.005);
        let payload = client.query(&bbox).await.unwrap();

        assert_eq!(payload["elements"][0]["id"], 1);
        let queries = captured.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0], map_query(&bbox, 25));
    }

    #[tokio::test]
    async fn test_gateway_error_is_retried_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let router = Router::new()
            .route(
                "/api/interpreter",
                post(|State(calls): State<Arc<AtomicU32>>| async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::GATEWAY_TIMEOUT, "{}".to_string())
                    } else {
                        (StatusCode::OK, "{\"elements\": []}".to_string())
                    }
                }),
            )
            .with_state(calls.clone());
        let base = spawn_upstream(router).await;
        let client = client_for(format!("{}/api/interpreter", base), 1);

        let bbox = compute_bounding_box(GeoPoint::new(0.0, 0.0), 0.01);
        let payload = client.query(&bbox).await.unwrap();

        assert_eq!(payload["elements"], serde_json::json!([]));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let router = Router::new()
            .route(
                "/api/interpreter",
                post(|State(calls): State<Arc<AtomicU32>>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::INTERNAL_SERVER_ERROR, "runtime error")
                }),
            )
            .with_state(calls.clone());
        let base = spawn_upstream(router).await;
        let client = client_for(format!("{}/api/interpreter", base), 1);

        let bbox = compute_bounding_box(GeoPoint::new(0.0, 0.0), 0.01);
        let err = client.query(&bbox).await.unwrap_err();

        assert_eq!(err.provider(), "osm");
        assert!(matches!(err, ProviderError::Rejected { status: 500, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
