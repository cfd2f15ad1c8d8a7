//! Yelp business search by bounding box.
//!
//! Requests are signed with OAuth 1.0a and the response body is passed
//! through unmodified.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::http::{read_json, with_retry};
use super::oauth::OAuthSigner;
use super::{GeoProvider, ProviderError};
use crate::credentials::Credentials;
use crate::error::StartupConfigError;
use crate::geo::BoundingBox;

const PROVIDER: &str = "yelp";

/// Business search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YelpConfig {
    /// Search endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Search term sent with every query.
    #[serde(default = "default_term")]
    pub term: String,
    /// Maximum number of businesses to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Comma-separated Yelp category filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_filter: Option<String>,
}

fn default_endpoint() -> String {
    "https://api.yelp.com/v2/search".to_string()
}

fn default_term() -> String {
    "food".to_string()
}

impl Default for YelpConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            term: default_term(),
            limit: None,
            category_filter: None,
        }
    }
}

impl YelpConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `YELP_ENDPOINT`: search endpoint
    /// - `YELP_SEARCH_TERM`: search term
    /// - `YELP_LIMIT`: maximum number of results
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("YELP_ENDPOINT") {
            self.endpoint = val;
        }
        if let Ok(val) = std::env::var("YELP_SEARCH_TERM") {
            self.term = val;
        }
        if let Ok(val) = std::env::var("YELP_LIMIT") {
            if let Ok(n) = val.parse() {
                self.limit = Some(n);
            }
        }
        self
    }
}

/// Business search adapter.
pub struct YelpClient {
    client: Client,
    endpoint: Url,
    config: YelpConfig,
    signer: OAuthSigner,
    retries: u32,
    timeout: Duration,
}

impl YelpClient {
    pub fn new(
        client: Client,
        config: YelpConfig,
        credentials: Credentials,
        retries: u32,
        timeout: Duration,
    ) -> Result<Self, StartupConfigError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            StartupConfigError::Invalid(format!("yelp endpoint '{}': {}", config.endpoint, e))
        })?;

        Ok(Self {
            client,
            endpoint,
            config,
            signer: OAuthSigner::new(credentials),
            retries,
            timeout,
        })
    }

    pub fn config(&self) -> &YelpConfig {
        &self.config
    }

    /// Query parameters for a bounding-box search.
    fn search_params(&self, bbox: &BoundingBox) -> Vec<(String, String)> {
        let center = bbox.center();
        let mut params = vec![
            ("term".to_string(), self.config.term.clone()),
            ("bounds".to_string(), bbox.to_yelp_bounds()),
            ("latitude".to_string(), center.latitude.to_string()),
            ("longitude".to_string(), center.longitude.to_string()),
        ];
        if let Some(limit) = self.config.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(ref categories) = self.config.category_filter {
            params.push(("category_filter".to_string(), categories.clone()));
        }
        params
    }

    async fn search_once(&self, params: &[(String, String)]) -> Result<Value, ProviderError> {
        let authorization = self
            .signer
            .authorization_header("GET", &self.endpoint, params);

        let resp = self
            .client
            .get(self.endpoint.clone())
            .query(params)
            .header(AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e, self.timeout))?;

        read_json(PROVIDER, resp).await
    }
}

#[async_trait]
impl GeoProvider for YelpClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn query(&self, bbox: &BoundingBox) -> Result<Value, ProviderError> {
        let params = self.search_params(bbox);
        debug!("Searching yelp for '{}' in {}", self.config.term, bbox);
        with_retry(PROVIDER, self.retries, || self.search_once(&params)).await
    }
}
