//! Upstream geodata providers.
//!
//! Each provider takes a [`BoundingBox`] and returns its native JSON payload
//! untouched:
//! - [`YelpClient`]: business search by bounding box
//! - [`OverpassClient`]: OpenStreetMap map features by bounding box

mod error;
pub mod http;
pub mod oauth;
pub mod overpass;
pub mod yelp;

use async_trait::async_trait;
use serde_json::Value;

use crate::geo::BoundingBox;

pub use error::ProviderError;
pub use overpass::{OverpassClient, OverpassConfig};
pub use yelp::{YelpClient, YelpConfig};

/// A geodata service that can be queried by bounding box.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Short name used to tag errors and log lines.
    fn name(&self) -> &str;

    /// Fetch everything the provider knows inside `bbox`.
    async fn query(&self, bbox: &BoundingBox) -> Result<Value, ProviderError>;
}
