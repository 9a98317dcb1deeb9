//! R-tree backed reference lookup.
//!
//! Produces exactly the output of [`crate::match_points`], including order,
//! but answers each trip point with an envelope query instead of a scan.
//! Worth it once reference sets reach the hundreds (all situations in a
//! county) and many trip searches reuse the same references.

use log::debug;
use rstar::{RTree, RTreeObject, AABB};

use crate::geo_utils::within_tolerance;
use crate::matching::{Match, MatchConfig};
use crate::Coordinate;

/// Reference point wrapper for R-tree indexing.
#[derive(Debug, Clone)]
struct IndexedPoint {
    /// Position in the reference collection
    index: usize,
    coordinate: Coordinate,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.coordinate.lng, self.coordinate.lat])
    }
}

/// Reference points bulk-loaded into an R-tree.
#[derive(Debug)]
pub struct IndexedReferences {
    tree: RTree<IndexedPoint>,
}

impl IndexedReferences {
    /// Build the index from reference points in collection order.
    pub fn new(references: &[Coordinate]) -> Self {
        let points: Vec<IndexedPoint> = references
            .iter()
            .enumerate()
            .map(|(index, coordinate)| IndexedPoint {
                index,
                coordinate: *coordinate,
            })
            .collect();

        debug!("Indexed {} reference points", points.len());

        Self {
            tree: RTree::bulk_load(points),
        }
    }

    /// Number of indexed reference points.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    fn hits(&self, point: &Coordinate, tolerance: f64) -> Vec<&IndexedPoint> {
        let search = AABB::from_corners(
            [point.lng - tolerance, point.lat - tolerance],
            [point.lng + tolerance, point.lat + tolerance],
        );

        // The envelope is closed; the strict per-axis check trims the boundary.
        let mut hits: Vec<&IndexedPoint> = self
            .tree
            .locate_in_envelope(&search)
            .filter(|p| within_tolerance(point, &p.coordinate, tolerance))
            .collect();
        hits.sort_unstable_by_key(|p| p.index);
        hits
    }

    /// Indices of the reference points within tolerance of `point`, ascending.
    pub fn candidates(&self, point: &Coordinate, tolerance: f64) -> Vec<usize> {
        self.hits(point, tolerance).into_iter().map(|p| p.index).collect()
    }

    /// Match trip points against the index.
    ///
    /// ```
    /// use trip_matcher::{match_points, Coordinate, IndexedReferences, MatchConfig};
    ///
    /// let reference = [Coordinate::new(18.95531, 69.64961), Coordinate::new(20.0, 70.0)];
    /// let trip = [Coordinate::new(18.9553, 69.6496)];
    /// let config = MatchConfig::default();
    ///
    /// let index = IndexedReferences::new(&reference);
    /// assert_eq!(index.match_points(&trip, &config), match_points(&trip, &reference, &config));
    /// ```
    pub fn match_points(&self, trip: &[Coordinate], config: &MatchConfig) -> Vec<Match> {
        trip.iter()
            .enumerate()
            .flat_map(|(ti, t)| {
                self.hits(t, config.tolerance)
                    .into_iter()
                    .map(move |p| Match::new(ti, *t, p.index, p.coordinate))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_points;

    fn grid(n: usize, step: f64) -> Vec<Coordinate> {
        (0..n)
            .flat_map(|i| (0..n).map(move |j| Coordinate::new(18.9 + i as f64 * step, 69.6 + j as f64 * step)))
            .collect()
    }

    #[test]
    fn test_empty_index() {
        let index = IndexedReferences::new(&[]);
        assert!(index.is_empty());
        assert!(index
            .match_points(&[Coordinate::new(18.9, 69.6)], &MatchConfig::default())
            .is_empty());
    }

    #[test]
    fn test_index_equals_brute_force() {
        let references = grid(20, 0.00004);
        let trip = vec![
            Coordinate::new(18.9001, 69.6002),
            Coordinate::new(18.9, 69.6),
            Coordinate::new(18.90076, 69.60076),
            Coordinate::new(25.0, 60.0),
        ];
        let config = MatchConfig::default();

        let index = IndexedReferences::new(&references);
        assert_eq!(index.len(), 400);

        let expected = match_points(&trip, &references, &config);
        assert!(!expected.is_empty());
        assert_eq!(index.match_points(&trip, &config), expected);
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let references = vec![Coordinate::new(0.5, 0.0)];
        let index = IndexedReferences::new(&references);
        assert!(index.candidates(&Coordinate::new(0.0, 0.0), 0.5).is_empty());
        assert_eq!(index.candidates(&Coordinate::new(0.0, 0.0), 0.75), vec![0]);
    }

    #[test]
    fn test_duplicate_references_kept() {
        let p = Coordinate::new(10.0, 60.0);
        let index = IndexedReferences::new(&[p, p, p]);
        assert_eq!(index.candidates(&p, 0.0001), vec![0, 1, 2]);
    }
}
