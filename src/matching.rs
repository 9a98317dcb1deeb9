//! Trip endpoint matching.
//!
//! Every endpoint of every trip LineString is compared against every
//! reference point. A pair matches when both the longitude difference and the
//! latitude difference are strictly below [`MatchConfig::tolerance`]. All
//! qualifying pairs are reported in trip-major order; nothing is deduplicated.
//!
//! Inputs are a few dozen points per search, so the nested loop is the
//! default. [`crate::IndexedReferences`] answers the same question from an
//! R-tree when reference sets grow.

use geojson::{FeatureCollection, JsonObject};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::feature::{point_feature, reference_points, trip_endpoints};
use crate::geo_utils::{haversine_distance, meters_to_degrees, within_tolerance};
use crate::{feature, Coordinate};

/// Default per-axis tolerance in degrees (~11m of latitude).
pub const DEFAULT_TOLERANCE: f64 = 0.0001;

/// Configuration for coordinate matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Maximum per-axis difference in degrees for two coordinates to match.
    /// Must be finite and positive, see [`MatchConfig::validate`]. Default: 0.0001
    pub tolerance: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl MatchConfig {
    /// Config with an explicit tolerance in degrees.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Derive the degree tolerance from a metric one at a reference latitude.
    ///
    /// The longitude scale is used for both axes, so the window is at least
    /// `meters` wide in each direction.
    ///
    /// ```
    /// use trip_matcher::MatchConfig;
    /// let config = MatchConfig::from_meters(50.0, 69.65);
    /// assert!(config.tolerance > 0.0004 && config.tolerance < 0.002);
    /// ```
    pub fn from_meters(meters: f64, latitude: f64) -> Self {
        Self {
            tolerance: meters_to_degrees(meters, latitude),
        }
    }

    /// Check that the tolerance is finite and positive.
    ///
    /// A zero, negative or NaN tolerance would make even coincident points
    /// fail to match.
    pub fn validate(&self) -> Result<()> {
        if self.tolerance.is_finite() && self.tolerance > 0.0 {
            Ok(())
        } else {
            Err(MatchError::InvalidConfig(format!(
                "tolerance must be finite and positive, got {}",
                self.tolerance
            )))
        }
    }
}

/// A trip point and a reference point that agree within the tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub trip_coordinate: Coordinate,
    pub reference_coordinate: Coordinate,
    /// Position of the trip point in the extracted endpoint list
    pub trip_index: usize,
    /// Position of the reference point in the reference collection
    pub reference_index: usize,
    /// Great-circle distance between the two points in meters
    pub distance_meters: f64,
}

impl Match {
    pub(crate) fn new(
        trip_index: usize,
        trip_coordinate: Coordinate,
        reference_index: usize,
        reference_coordinate: Coordinate,
    ) -> Self {
        Self {
            trip_coordinate,
            reference_coordinate,
            trip_index,
            reference_index,
            distance_meters: haversine_distance(&trip_coordinate, &reference_coordinate),
        }
    }
}

/// What a caller gets back from [`find_matches`].
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// No trip or no reference collection was provided.
    NoData,
    /// Both collections were provided and nothing is within tolerance.
    NoMatches,
    /// At least one pair is within tolerance.
    Matches(Vec<Match>),
}

impl MatchOutcome {
    /// Matches found, empty for `NoData` and `NoMatches`.
    pub fn matches(&self) -> &[Match] {
        match self {
            MatchOutcome::Matches(m) => m,
            _ => &[],
        }
    }

    fn from_matches(matches: Vec<Match>) -> Self {
        if matches.is_empty() {
            MatchOutcome::NoMatches
        } else {
            MatchOutcome::Matches(matches)
        }
    }
}

// ============================================================================
// Core Functions
// ============================================================================

/// Match already-extracted points.
///
/// Outer loop over `trip`, inner loop over `reference`; O(T·R). The config
/// is taken as is; the collection-level entry points validate it first.
///
/// # Example
/// ```
/// use trip_matcher::{match_points, Coordinate, MatchConfig};
///
/// let trip = [Coordinate::new(18.9553, 69.6496), Coordinate::new(18.9600, 69.6500)];
/// let reference = [Coordinate::new(18.95531, 69.64961), Coordinate::new(20.0, 70.0)];
///
/// let matches = match_points(&trip, &reference, &MatchConfig::default());
/// assert_eq!(matches.len(), 1);
/// assert_eq!(matches[0].trip_coordinate, trip[0]);
/// assert_eq!(matches[0].reference_coordinate, reference[0]);
/// ```
pub fn match_points(trip: &[Coordinate], reference: &[Coordinate], config: &MatchConfig) -> Vec<Match> {
    trip.iter()
        .enumerate()
        .flat_map(|(ti, t)| {
            reference
                .iter()
                .enumerate()
                .filter(move |(_, r)| within_tolerance(t, r, config.tolerance))
                .map(move |(ri, r)| Match::new(ti, *t, ri, *r))
        })
        .collect()
}

/// Match the endpoints of every trip LineString against the reference points.
///
/// # Errors
/// [`MatchError::InvalidConfig`] for a non-positive tolerance,
/// [`MatchError::InvalidFeature`] when either collection holds a malformed
/// feature. Empty collections produce an empty list.
pub fn match_coordinates(
    trip: &FeatureCollection,
    reference: &FeatureCollection,
    config: &MatchConfig,
) -> Result<Vec<Match>> {
    config.validate()?;
    let trip_points = trip_endpoints(trip)?;
    let references = reference_points(reference)?;

    let matches = match_points(&trip_points, &references, config);

    debug!(
        "Matched {} trip points against {} reference points (tolerance {}): {} matches",
        trip_points.len(),
        references.len(),
        config.tolerance,
        matches.len()
    );

    Ok(matches)
}

/// Match trip points in parallel.
///
/// Same output, in the same order, as [`match_coordinates`].
#[cfg(feature = "parallel")]
pub fn match_coordinates_parallel(
    trip: &FeatureCollection,
    reference: &FeatureCollection,
    config: &MatchConfig,
) -> Result<Vec<Match>> {
    use rayon::prelude::*;

    config.validate()?;
    let trip_points = trip_endpoints(trip)?;
    let references = reference_points(reference)?;

    let matches: Vec<Match> = trip_points
        .par_iter()
        .enumerate()
        .flat_map_iter(|(ti, t)| {
            references
                .iter()
                .enumerate()
                .filter(move |(_, r)| within_tolerance(t, r, config.tolerance))
                .map(move |(ri, r)| Match::new(ti, *t, ri, *r))
        })
        .collect();

    Ok(matches)
}

/// Caller-facing matching entry point.
///
/// Reports a missing collection as [`MatchOutcome::NoData`] and an empty
/// result as [`MatchOutcome::NoMatches`]; neither is an error. An invalid
/// config is, even when there is nothing to match yet.
pub fn find_matches(
    trip: Option<&FeatureCollection>,
    reference: Option<&FeatureCollection>,
    config: &MatchConfig,
) -> Result<MatchOutcome> {
    config.validate()?;

    let (Some(trip), Some(reference)) = (trip, reference) else {
        debug!("Skipping match: trip or reference data not loaded");
        return Ok(MatchOutcome::NoData);
    };

    let outcome = MatchOutcome::from_matches(match_coordinates(trip, reference, config)?);
    if outcome == MatchOutcome::NoMatches {
        info!("No reference points found along the trip");
    }
    Ok(outcome)
}

/// Convert matches into a Point collection for display.
///
/// One feature per match, placed at the reference coordinate.
pub fn matches_to_feature_collection(matches: &[Match]) -> FeatureCollection {
    let features = matches
        .iter()
        .map(|m| {
            let mut properties = JsonObject::new();
            properties.insert("tripCoordinate".to_string(), m.trip_coordinate.to_position().into());
            properties.insert(
                "referenceCoordinate".to_string(),
                m.reference_coordinate.to_position().into(),
            );
            properties.insert("tripIndex".to_string(), m.trip_index.into());
            properties.insert("referenceIndex".to_string(), m.reference_index.into());
            properties.insert("distanceMeters".to_string(), m.distance_meters.into());
            point_feature(m.reference_coordinate, properties)
        })
        .collect();

    feature::collection_of(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{collection_of, line_feature};

    fn trip_of(lines: &[&[Coordinate]]) -> FeatureCollection {
        collection_of(lines.iter().map(|l| line_feature(l, JsonObject::new())).collect())
    }

    fn points_of(points: &[Coordinate]) -> FeatureCollection {
        collection_of(points.iter().map(|p| point_feature(*p, JsonObject::new())).collect())
    }

    #[test]
    fn test_tromso_scenario() {
        let trip = trip_of(&[&[Coordinate::new(18.9553, 69.6496), Coordinate::new(18.9600, 69.6500)]]);
        let reference = points_of(&[Coordinate::new(18.95531, 69.64961), Coordinate::new(20.0, 70.0)]);

        let matches = match_coordinates(&trip, &reference, &MatchConfig::with_tolerance(0.0001)).unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].trip_coordinate, Coordinate::new(18.9553, 69.6496));
        assert_eq!(matches[0].reference_coordinate, Coordinate::new(18.95531, 69.64961));
        assert_eq!(matches[0].trip_index, 0);
        assert_eq!(matches[0].reference_index, 0);
        assert!(matches[0].distance_meters < 2.0);
    }

    #[test]
    fn test_coincident_points_always_match() {
        let p = Coordinate::new(10.0, 60.0);
        for tolerance in [1e-9, 0.0001, 1.0] {
            let matches = match_points(&[p], &[p], &MatchConfig::with_tolerance(tolerance));
            assert_eq!(matches.len(), 1);
        }
    }

    #[test]
    fn test_non_positive_tolerance_is_rejected() {
        let p = Coordinate::new(10.0, 60.0);
        let trip = trip_of(&[&[p, p]]);
        let reference = points_of(&[p]);

        let zero: MatchConfig = serde_json::from_str(r#"{"tolerance": 0.0}"#).unwrap();
        for config in [zero, MatchConfig::with_tolerance(-0.0001), MatchConfig::with_tolerance(f64::NAN)] {
            assert!(matches!(config.validate(), Err(MatchError::InvalidConfig(_))));
            assert!(matches!(
                find_matches(Some(&trip), Some(&reference), &config),
                Err(MatchError::InvalidConfig(_))
            ));
            assert!(matches!(find_matches(None, None, &config), Err(MatchError::InvalidConfig(_))));
            assert!(match_coordinates(&trip, &reference, &config).is_err());
        }

        assert!(MatchConfig::default().validate().is_ok());
        assert!(MatchConfig::from_meters(50.0, 69.65).validate().is_ok());
    }

    #[test]
    fn test_outside_tolerance_on_either_axis() {
        let t = Coordinate::new(10.0, 60.0);
        let config = MatchConfig::with_tolerance(0.001);
        let lng_off = Coordinate::new(10.002, 60.0);
        let lat_off = Coordinate::new(10.0, 59.998);
        assert!(match_points(&[t], &[lng_off, lat_off], &config).is_empty());
    }

    #[test]
    fn test_swapping_roles_gives_same_pairs() {
        let a = [Coordinate::new(10.0, 60.0), Coordinate::new(11.0, 61.0)];
        let b = [Coordinate::new(11.00001, 61.00002), Coordinate::new(10.00003, 59.99999)];
        let config = MatchConfig::default();

        let mut forward: Vec<(usize, usize)> = match_points(&a, &b, &config)
            .iter()
            .map(|m| (m.trip_index, m.reference_index))
            .collect();
        let mut backward: Vec<(usize, usize)> = match_points(&b, &a, &config)
            .iter()
            .map(|m| (m.reference_index, m.trip_index))
            .collect();
        forward.sort();
        backward.sort();

        assert_eq!(forward, vec![(0, 1), (1, 0)]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_empty_inputs() {
        let trip = trip_of(&[&[Coordinate::new(10.0, 60.0), Coordinate::new(10.1, 60.1)]]);
        let reference = points_of(&[Coordinate::new(10.0, 60.0)]);
        let empty = collection_of(vec![]);
        let config = MatchConfig::default();

        assert!(match_coordinates(&empty, &reference, &config).unwrap().is_empty());
        assert!(match_coordinates(&trip, &empty, &config).unwrap().is_empty());
    }

    #[test]
    fn test_duplicates_are_reported() {
        // Start and end at the same place, two identical reference points
        let p = Coordinate::new(10.0, 60.0);
        let trip = trip_of(&[&[p, p]]);
        let reference = points_of(&[p, p]);

        let matches = match_coordinates(&trip, &reference, &MatchConfig::default()).unwrap();
        let order: Vec<(usize, usize)> = matches.iter().map(|m| (m.trip_index, m.reference_index)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_idempotent() {
        let trip = trip_of(&[&[Coordinate::new(10.0, 60.0), Coordinate::new(10.1, 60.1)]]);
        let reference = points_of(&[Coordinate::new(10.1, 60.1), Coordinate::new(10.0, 60.0)]);
        let config = MatchConfig::default();
        let first = match_coordinates(&trip, &reference, &config).unwrap();
        let second = match_coordinates(&trip, &reference, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_find_matches_outcomes() {
        let trip = trip_of(&[&[Coordinate::new(10.0, 60.0), Coordinate::new(10.1, 60.1)]]);
        let near = points_of(&[Coordinate::new(10.0, 60.0)]);
        let far = points_of(&[Coordinate::new(20.0, 70.0)]);
        let config = MatchConfig::default();

        assert_eq!(find_matches(None, Some(&near), &config).unwrap(), MatchOutcome::NoData);
        assert_eq!(find_matches(Some(&trip), None, &config).unwrap(), MatchOutcome::NoData);
        assert_eq!(find_matches(Some(&trip), Some(&far), &config).unwrap(), MatchOutcome::NoMatches);

        let outcome = find_matches(Some(&trip), Some(&near), &config).unwrap();
        assert_eq!(outcome.matches().len(), 1);
    }

    #[test]
    fn test_find_matches_invalid_feature() {
        let empty: &[Coordinate] = &[];
        let trip = trip_of(&[empty]);
        let reference = points_of(&[Coordinate::new(10.0, 60.0)]);
        let err = find_matches(Some(&trip), Some(&reference), &MatchConfig::default()).unwrap_err();
        assert!(matches!(err, MatchError::InvalidFeature { index: 0, .. }));
    }

    #[test]
    fn test_matches_to_feature_collection() {
        let m = Match::new(0, Coordinate::new(10.0, 60.0), 3, Coordinate::new(10.00001, 60.00001));
        let fc = matches_to_feature_collection(&[m]);

        assert_eq!(fc.features.len(), 1);
        let feature = &fc.features[0];
        assert_eq!(
            feature.property("referenceCoordinate"),
            Some(&serde_json::json!([10.00001, 60.00001]))
        );
        assert_eq!(feature.property("referenceIndex"), Some(&serde_json::json!(3)));
        let points = reference_points(&fc).unwrap();
        assert_eq!(points, vec![Coordinate::new(10.00001, 60.00001)]);
    }

    #[test]
    fn test_match_serializes_camel_case() {
        let m = Match::new(0, Coordinate::new(10.0, 60.0), 0, Coordinate::new(10.0, 60.0));
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["tripCoordinate"], serde_json::json!([10.0, 60.0]));
        assert_eq!(json["referenceCoordinate"], serde_json::json!([10.0, 60.0]));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let trip = trip_of(&[
            &[Coordinate::new(10.0, 60.0), Coordinate::new(10.1, 60.1)],
            &[Coordinate::new(10.1, 60.1), Coordinate::new(10.0, 60.0)],
        ]);
        let reference = points_of(&[Coordinate::new(10.0, 60.0), Coordinate::new(10.1, 60.1)]);
        let config = MatchConfig::default();
        assert_eq!(
            match_coordinates(&trip, &reference, &config).unwrap(),
            match_coordinates_parallel(&trip, &reference, &config).unwrap()
        );
    }
}
