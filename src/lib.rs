//! geofuse - bounding-box fusion of business search and OpenStreetMap data.
//!
//! Given a center point and a box size, geofuse queries the Yelp search API
//! and the Overpass API for the same box concurrently and returns both
//! payloads in a single JSON document.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fusion;
pub mod geo;
pub mod providers;
pub mod server;
