//! # Geographic Utilities
//!
//! Small coordinate helpers shared by the matcher, the spatial index and the
//! filters.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`within_tolerance`] | Per-axis tolerance test used by the matcher |
//! | [`haversine_distance`] | Great-circle distance between two coordinates |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//!
//! ## Example
//!
//! ```rust
//! use trip_matcher::{Coordinate, geo_utils};
//!
//! let stop = Coordinate::new(18.9553, 69.6496);      // Tromsø
//! let incident = Coordinate::new(18.95531, 69.64961);
//!
//! assert!(geo_utils::within_tolerance(&stop, &incident, 0.0001));
//!
//! let dist = geo_utils::haversine_distance(&stop, &incident);
//! assert!(dist < 2.0);
//! ```
//!
//! ## Coordinate System
//!
//! All functions expect WGS84 coordinates in degrees, ordered `(lng, lat)` the
//! way GeoJSON positions are.

use geo::{Distance, Haversine, Point};

use crate::Coordinate;

// =============================================================================
// Distance Functions
// =============================================================================

/// Check whether two coordinates agree on both axes within `tolerance` degrees.
///
/// This is a per-axis test, not a Euclidean radius: the longitude difference
/// and the latitude difference must each be strictly below `tolerance`.
///
/// # Example
///
/// ```rust
/// use trip_matcher::{Coordinate, geo_utils};
///
/// let a = Coordinate::new(10.0, 60.0);
/// let b = Coordinate::new(10.00005, 60.00005);
/// assert!(geo_utils::within_tolerance(&a, &b, 0.0001));
///
/// let c = Coordinate::new(10.0001, 60.0);
/// assert!(!geo_utils::within_tolerance(&a, &c, 0.0001));
/// ```
#[inline]
pub fn within_tolerance(a: &Coordinate, b: &Coordinate, tolerance: f64) -> bool {
    (a.lng - b.lng).abs() < tolerance && (a.lat - b.lat).abs() < tolerance
}

/// Calculate the great-circle distance between two coordinates using the
/// Haversine formula.
///
/// Returns the distance in meters along the Earth's surface (spherical Earth,
/// radius 6,371 km).
///
/// # Example
///
/// ```rust
/// use trip_matcher::{Coordinate, geo_utils};
///
/// let tromso = Coordinate::new(18.9553, 69.6496);
/// let oslo = Coordinate::new(10.7522, 59.9139);
///
/// let distance = geo_utils::haversine_distance(&tromso, &oslo);
/// assert!((distance - 1_150_000.0).abs() < 20_000.0);
/// ```
#[inline]
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let point1 = Point::new(a.lng, a.lat);
    let point2 = Point::new(b.lng, b.lat);
    Haversine::distance(point1, point2)
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Uses the longitude scale at `latitude`, which is the larger of the two
/// degree values, so a square window built from it always covers the metric
/// radius on both axes.
///
/// # Notes
///
/// - At the equator, 1 degree ≈ 111,320 meters
/// - The cosine factor is clamped at 0.1 so polar latitudes stay finite
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = 111_320.0 * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

// =============================================================================
// Unit Tests
// =============================================================================
