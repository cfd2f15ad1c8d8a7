//! Fan a bounding-box query out to both providers and assemble one document.
//!
//! Both providers always receive the same [`BoundingBox`]. A provider that
//! fails or times out is replaced by an error marker under its key while the
//! other payload is still returned.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::credentials::Credentials;
use crate::error::{InvalidRequest, StartupConfigError};
use crate::geo::{angular_degrees_to_meters, compute_bounding_box, BoundingBox, GeoPoint};
use crate::providers::http::build_client;
use crate::providers::{GeoProvider, OverpassClient, ProviderError, YelpClient};

/// A center point plus the side length of the box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchQuery {
    pub center: GeoPoint,
    pub size: f64,
}

impl SearchQuery {
    pub fn new(center: GeoPoint, size: f64) -> Self {
        Self { center, size }
    }

    /// Build a query from raw `lat`, `lon` and `size` parameter values.
    pub fn from_params(
        lat: Option<&str>,
        lon: Option<&str>,
        size: Option<&str>,
    ) -> Result<Self, InvalidRequest> {
        let lat = parse_param("lat", lat)?;
        let lon = parse_param("lon", lon)?;
        let size = parse_param("size", size)?;
        Self::try_new(GeoPoint::new(lat, lon), size)
    }

    /// Build a query, rejecting non-finite values, out-of-range coordinates
    /// and negative sizes.
    pub fn try_new(center: GeoPoint, size: f64) -> Result<Self, InvalidRequest> {
        check_finite("lat", center.latitude)?;
        check_finite("lon", center.longitude)?;
        check_finite("size", size)?;

        check_range("lat", center.latitude, -90.0, 90.0)?;
        check_range("lon", center.longitude, -180.0, 180.0)?;
        if size < 0.0 {
            return Err(InvalidRequest::NegativeSize(size));
        }

        Ok(Self::new(center, size))
    }

    pub fn bounding_box(&self) -> BoundingBox {
        compute_bounding_box(self.center, self.size)
    }
}

fn parse_param(name: &'static str, raw: Option<&str>) -> Result<f64, InvalidRequest> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(InvalidRequest::MissingParameter(name))?;

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(InvalidRequest::NotANumber {
            name,
            value: raw.to_string(),
        }),
    }
}

fn check_finite(name: &'static str, value: f64) -> Result<(), InvalidRequest> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InvalidRequest::NotANumber {
            name,
            value: value.to_string(),
        })
    }
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), InvalidRequest> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(InvalidRequest::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

/// Error marker emitted in place of a provider payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub kind: &'static str,
    pub message: String,
}

impl From<&ProviderError> for ProviderFailure {
    fn from(err: &ProviderError) -> Self {
        Self {
            provider: err.provider().to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// What one provider contributed to a fused result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProviderOutcome {
    /// Raw provider payload, unmodified.
    Payload(Value),
    Failed { error: ProviderFailure },
}

impl ProviderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Payload(_))
    }

    fn timed_out(&self) -> bool {
        matches!(self, Self::Failed { error } if error.kind == ProviderError::KIND_TIMEOUT)
    }
}

/// Business results and map features for one query, under stable keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedResult {
    pub yelp: ProviderOutcome,
    pub osm: ProviderOutcome,
}

impl FusedResult {
    /// HTTP status for this result.
    ///
    /// `200` while at least one provider answered; otherwise `504` when every
    /// provider timed out and `502` for any other combination of failures.
    pub fn status(&self) -> StatusCode {
        if self.yelp.is_success() || self.osm.is_success() {
            StatusCode::OK
        } else if self.yelp.timed_out() && self.osm.timed_out() {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::BAD_GATEWAY
        }
    }

    pub fn is_complete(&self) -> bool {
        self.yelp.is_success() && self.osm.is_success()
    }
}

/// Combines a business-search provider and a map-feature provider.
pub struct Fuser {
    business: Arc<dyn GeoProvider>,
    map: Arc<dyn GeoProvider>,
    timeout: Duration,
}

impl Fuser {
    pub fn new(business: Arc<dyn GeoProvider>, map: Arc<dyn GeoProvider>, timeout: Duration) -> Self {
        Self {
            business,
            map,
            timeout,
        }
    }

    /// Wire up the Yelp and Overpass adapters from resolved settings.
    pub fn from_settings(
        settings: &Settings,
        credentials: Credentials,
    ) -> Result<Self, StartupConfigError> {
        let client = build_client(&settings.user_agent, settings.provider_timeout)?;

        let business = YelpClient::new(
            client.clone(),
            settings.yelp.clone(),
            credentials,
            settings.retries,
            settings.provider_timeout,
        )?;
        let map = OverpassClient::new(
            client,
            settings.overpass.clone(),
            settings.retries,
            settings.provider_timeout,
        )?;

        info!(
            "Providers ready: yelp={} osm={} (timeout {:?}, {} retries)",
            settings.yelp.endpoint,
            settings.overpass.endpoint,
            settings.provider_timeout,
            settings.retries
        );

        Ok(Self::new(
            Arc::new(business),
            Arc::new(map),
            settings.provider_timeout,
        ))
    }

    /// Query both providers concurrently with the same bounding box.
    pub async fn fuse(&self, query: &SearchQuery) -> FusedResult {
        let bbox = query.bounding_box();
        debug!(
            "Fusing {} (side ~{:.0} m)",
            bbox,
            angular_degrees_to_meters(query.size)
        );

        let (yelp, osm) = tokio::join!(
            self.run(self.business.as_ref(), &bbox),
            self.run(self.map.as_ref(), &bbox),
        );

        let result = FusedResult { yelp, osm };
        if result.is_complete() {
            info!("Fused results for {}", bbox);
        } else {
            warn!("Partial results for {} (status {})", bbox, result.status());
        }
        result
    }

    async fn run(&self, provider: &dyn GeoProvider, bbox: &BoundingBox) -> ProviderOutcome {
        let outcome = match tokio::time::timeout(self.timeout, provider.query(bbox)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timed_out(provider.name(), self.timeout)),
        };

        match outcome {
            Ok(payload) => ProviderOutcome::Payload(payload),
            Err(err) => {
                warn!("Provider {} failed: {}", provider.name(), err);
                ProviderOutcome::Failed {
                    error: ProviderFailure::from(&err),
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_doubles::{Reply, StubProvider};
    use super::*;
    use serde_json::json;

    fn fuser(business: &Arc<StubProvider>, map: &Arc<StubProvider>) -> Fuser {
        Fuser::new(business.clone(), map.clone(), Duration::from_millis(200))
    }

    fn reference_query() -> SearchQuery {
        SearchQuery::new(GeoPoint::new(37.786660, -122.396559), 0.005)
    }

    #[tokio::test]
    async fn test_both_providers_see_identical_box() {
        let yelp = Arc::new(StubProvider::ok("yelp", json!({"businesses": []})));
        let osm = Arc::new(StubProvider::ok("osm", json!({"elements": []})));

        let query = reference_query();
        fuser(&yelp, &osm).fuse(&query).await;

        let yelp_seen = yelp.seen();
        let osm_seen = osm.seen();
        assert_eq!(yelp_seen.len(), 1);
        assert_eq!(osm_seen.len(), 1);
        assert_eq!(yelp_seen[0], osm_seen[0]);
        assert_eq!(yelp_seen[0], query.bounding_box());
    }

    #[tokio::test]
    async fn test_full_success_passes_payloads_through() {
        let yelp_payload = json!({"total": 2, "businesses": [{"id": "a"}, {"id": "b"}]});
        let osm_payload = json!({"version": 0.6, "elements": [{"type": "node", "id": 7}]});
        let yelp = Arc::new(StubProvider::ok("yelp", yelp_payload.clone()));
        let osm = Arc::new(StubProvider::ok("osm", osm_payload.clone()));

        let result = fuser(&yelp, &osm).fuse(&reference_query()).await;

        assert_eq!(result.status(), StatusCode::OK);
        assert!(result.is_complete());
        let doc = serde_json::to_value(&result).unwrap();
        assert_eq!(doc, json!({"yelp": yelp_payload, "osm": osm_payload}));
    }

    #[tokio::test]
    async fn test_single_failure_yields_partial_result() {
        let cases = [(true, false), (false, true)];
        for (yelp_fails, osm_fails) in cases {
            let yelp = Arc::new(if yelp_fails {
                StubProvider::failing("yelp")
            } else {
                StubProvider::ok("yelp", json!({"businesses": []}))
            });
            let osm = Arc::new(if osm_fails {
                StubProvider::failing("osm")
            } else {
                StubProvider::ok("osm", json!({"elements": []}))
            });

            let result = fuser(&yelp, &osm).fuse(&reference_query()).await;
            assert_eq!(result.status(), StatusCode::OK);
            assert!(!result.is_complete());

            let doc = serde_json::to_value(&result).unwrap();
            let (failed, ok) = if yelp_fails { ("yelp", "osm") } else { ("osm", "yelp") };
            assert_eq!(doc[failed]["error"]["provider"], failed);
            assert_eq!(doc[failed]["error"]["kind"], "unavailable");
            assert!(doc[ok].get("error").is_none());
        }
    }

    #[tokio::test]
    async fn test_total_failure_is_bad_gateway() {
        let yelp = Arc::new(StubProvider::new(
            "yelp",
            Reply::Fail(ProviderError::rejected("yelp", 401, "invalid signature")),
        ));
        let osm = Arc::new(StubProvider::failing("osm"));

        let result = fuser(&yelp, &osm).fuse(&reference_query()).await;
        assert_eq!(result.status(), StatusCode::BAD_GATEWAY);

        let doc = serde_json::to_value(&result).unwrap();
        assert_eq!(doc["yelp"]["error"]["kind"], "rejected");
        assert_eq!(doc["osm"]["error"]["kind"], "unavailable");
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_without_blocking_other() {
        let yelp = Arc::new(StubProvider::new("yelp", Reply::Hang));
        let osm = Arc::new(StubProvider::ok("osm", json!({"elements": [1, 2, 3]})));

        let result = fuser(&yelp, &osm).fuse(&reference_query()).await;

        assert_eq!(result.status(), StatusCode::OK);
        assert!(matches!(
            &result.yelp,
            ProviderOutcome::Failed { error } if error.kind == "timeout" && error.provider == "yelp"
        ));
        assert_eq!(result.osm, ProviderOutcome::Payload(json!({"elements": [1, 2, 3]})));
    }

    #[tokio::test]
    async fn test_all_timeouts_is_gateway_timeout() {
        let yelp = Arc::new(StubProvider::new("yelp", Reply::Hang));
        let osm = Arc::new(StubProvider::new("osm", Reply::Hang));

        let result = fuser(&yelp, &osm).fuse(&reference_query()).await;
        assert_eq!(result.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_from_params_valid() {
        let query =
            SearchQuery::from_params(Some("37.786660"), Some("-122.396559"), Some("0.005")).unwrap();
        assert_eq!(query, reference_query());
    }

    #[test]
    fn test_from_params_rejects_bad_input() {
        assert_eq!(
            SearchQuery::from_params(None, Some("1"), Some("1")),
            Err(InvalidRequest::MissingParameter("lat"))
        );
        assert_eq!(
            SearchQuery::from_params(Some("1"), Some(" "), Some("1")),
            Err(InvalidRequest::MissingParameter("lon"))
        );
        assert!(matches!(
            SearchQuery::from_params(Some("1"), Some("2"), Some("big")),
            Err(InvalidRequest::NotANumber { name: "size", .. })
        ));
        assert!(matches!(
            SearchQuery::from_params(Some("NaN"), Some("2"), Some("1")),
            Err(InvalidRequest::NotANumber { name: "lat", .. })
        ));
        assert!(matches!(
            SearchQuery::from_params(Some("91"), Some("2"), Some("1")),
            Err(InvalidRequest::OutOfRange { name: "lat", .. })
        ));
        assert!(matches!(
            SearchQuery::from_params(Some("1"), Some("-180.5"), Some("1")),
            Err(InvalidRequest::OutOfRange { name: "lon", .. })
        ));
        assert_eq!(
            SearchQuery::from_params(Some("1"), Some("2"), Some("-0.5")),
            Err(InvalidRequest::NegativeSize(-0.5))
        );
    }

    #[test]
    fn test_try_new_rejects_non_finite() {
        assert!(matches!(
            SearchQuery::try_new(GeoPoint::new(1.0, 2.0), f64::NAN),
            Err(InvalidRequest::NotANumber { name: "size", .. })
        ));
        assert!(matches!(
            SearchQuery::try_new(GeoPoint::new(f64::INFINITY, 2.0), 1.0),
            Err(InvalidRequest::NotANumber { name: "lat", .. })
        ));
    }

    #[test]
    fn test_zero_size_is_valid() {
        let query = SearchQuery::from_params(Some("10"), Some("20"), Some("0")).unwrap();
        let bbox = query.bounding_box();
        assert_eq!(bbox.south_west, query.center);
        assert_eq!(bbox.north_east, query.center);
    }
}
