//! Geographic primitives: points, bounding boxes, and degree conversions.
//!
//! Boxes are squares in latitude/longitude degree space, not geodesic
//! squares. Antimeridian and pole wraparound are not handled.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (spherical approximation).
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Rectangular region defined by its south-west and north-east corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl BoundingBox {
    /// Center of the box.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.south_west.latitude + self.north_east.latitude) / 2.0,
            (self.south_west.longitude + self.north_east.longitude) / 2.0,
        )
    }

    /// Side length of the box in degrees of latitude.
    pub fn height_degrees(&self) -> f64 {
        self.north_east.latitude - self.south_west.latitude
    }

    /// Overpass QL bbox filter order: `south,west,north,east`.
    pub fn to_overpass_bbox(&self) -> String {
        format!(
            "{},{},{},{}",
            self.south_west.latitude,
            self.south_west.longitude,
            self.north_east.latitude,
            self.north_east.longitude
        )
    }

    /// Yelp `bounds` parameter: `sw_latitude,sw_longitude|ne_latitude,ne_longitude`.
    pub fn to_yelp_bounds(&self) -> String {
        format!(
            "{},{}|{},{}",
            self.south_west.latitude,
            self.south_west.longitude,
            self.north_east.latitude,
            self.north_east.longitude
        )
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sw={} ne={}", self.south_west, self.north_east)
    }
}

/// Convert an angular distance in degrees to meters along a great circle.
///
/// Linear in `degrees`; callers are expected to pass non-negative values.
pub fn angular_degrees_to_meters(degrees: f64) -> f64 {
    degrees * PI / 180.0 * EARTH_RADIUS_METERS
}

/// Compute the box of side `size` degrees centered on `center`.
///
/// A `size` of zero yields a degenerate box whose corners both equal `center`.
pub fn compute_bounding_box(center: GeoPoint, size: f64) -> BoundingBox {
    let half = size / 2.0;
    BoundingBox {
        south_west: GeoPoint::new(center.latitude - half, center.longitude - half),
        north_east: GeoPoint::new(center.latitude + half, center.longitude + half),
    }
}
