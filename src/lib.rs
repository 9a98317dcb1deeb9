//! # Trip Matcher
//!
//! Trip endpoint matching and situation data handling for transit maps.
//!
//! This library provides:
//! - Matching of trip-planning route endpoints against reference points
//!   (stops, incidents, situations) within a per-axis tolerance
//! - GeoJSON feature collection loading with per-feature validation
//! - County / situation type / severity filtering
//! - Journey planner response decoding into trip collections
//! - Latest-wins trip search session state
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel matching with rayon
//! - **`http`** - Enable the async map backend client
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use trip_matcher::{feature::parse_feature_collection, find_matches, MatchConfig, MatchOutcome};
//!
//! let trip = parse_feature_collection(r#"{"type": "FeatureCollection", "features": [
//!     {"type": "Feature", "properties": {},
//!      "geometry": {"type": "LineString", "coordinates": [[18.9553, 69.6496], [18.9600, 69.6500]]}}
//! ]}"#).unwrap();
//!
//! let situations = parse_feature_collection(r#"{"type": "FeatureCollection", "features": [
//!     {"type": "Feature", "properties": {},
//!      "geometry": {"type": "Point", "coordinates": [18.95531, 69.64961]}}
//! ]}"#).unwrap();
//!
//! match find_matches(Some(&trip), Some(&situations), &MatchConfig::default()).unwrap() {
//!     MatchOutcome::Matches(matches) => println!("{} situations along the trip", matches.len()),
//!     MatchOutcome::NoMatches => println!("No situations along the trip"),
//!     MatchOutcome::NoData => println!("Nothing to match"),
//! }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{MatchError, Result};

pub mod geo_utils;

pub mod feature;
pub use feature::{parse_feature_collection, reference_points, trip_endpoints};

pub mod matching;
pub use matching::{
    find_matches, match_coordinates, match_points, matches_to_feature_collection, Match,
    MatchConfig, MatchOutcome,
};
#[cfg(feature = "parallel")]
pub use matching::match_coordinates_parallel;

pub mod spatial_index;
pub use spatial_index::IndexedReferences;

pub mod filters;
pub use filters::{split_by_geometry, FeatureFilter, FilterOptions};

pub mod trip;
pub use trip::{decode_polyline, trip_collection_from_journey, JourneyResponse, TripResponse};

pub mod session;
pub use session::{MapSession, SearchResolution, SearchTicket};

// HTTP module for trip search and location fetching
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{ClientConfig, MapClient, SearchController};

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate in GeoJSON axis order.
///
/// # Example
/// ```
/// use trip_matcher::Coordinate;
/// let tromso = Coordinate::new(18.9553, 69.6496);
/// assert_eq!(tromso.to_position(), vec![18.9553, 69.6496]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub lng: f64,
    pub lat: f64,
}

impl Coordinate {
    /// Create a new coordinate from longitude and latitude.
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Check if the coordinate is finite and within WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat >= -90.0
            && self.lat <= 90.0
            && self.lng >= -180.0
            && self.lng <= 180.0
    }

    /// GeoJSON position `[lng, lat]`.
    pub fn to_position(&self) -> Vec<f64> {
        vec![self.lng, self.lat]
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self::new(lng, lat)
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.lng, c.lat]
    }
}

// ============================================================================
// Tests
// ============================================================================
