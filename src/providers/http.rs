//! Shared HTTP plumbing for provider adapters.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, warn};

use super::ProviderError;

pub const USER_AGENT: &str = concat!("geofuse/", env!("CARGO_PKG_VERSION"));

/// Pause before a retry; grows linearly with the attempt number.
const RETRY_DELAY: Duration = Duration::from_millis(200);

/// Build the HTTP client shared by both adapters.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Turn a provider response into its raw JSON payload.
pub async fn read_json(provider: &str, resp: Response) -> Result<Value, ProviderError> {
    let status = resp.status();
    let body = resp
        .bytes()
        .await
        .map_err(|e| ProviderError::unavailable(provider, e.to_string()))?;

    if !status.is_success() {
        return Err(ProviderError::rejected(
            provider,
            status.as_u16(),
            &String::from_utf8_lossy(&body),
        ));
    }

    serde_json::from_slice(&body).map_err(|e| ProviderError::malformed(provider, e.to_string()))
}

/// Run `attempt` once, then up to `retries` more times while the error is transient.
pub async fn with_retry<T, F, Fut>(
    provider: &str,
    retries: u32,
    mut attempt: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut tries = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && tries < retries => {
                tries += 1;
                warn!("{} (retry {}/{})", err, tries, retries);
                tokio::time::sleep(RETRY_DELAY * tries).await;
            }
            Err(err) => {
                debug!("{} failed after {} attempt(s)", provider, tries + 1);
                return Err(err);
            }
        }
    }
}
