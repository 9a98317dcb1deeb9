//! Basic example of matching trip endpoints against situations.
//!
//! Run with: cargo run --example basic_matching

use trip_matcher::{
    find_matches, matches_to_feature_collection, parse_feature_collection, MatchConfig,
    MatchOutcome,
};

const TRIP: &str = r#"{"type": "FeatureCollection", "features": [
    {"type": "Feature", "properties": {"mode": "bus", "lineName": "Sentrum"},
     "geometry": {"type": "LineString", "coordinates": [[18.9553, 69.6496], [18.9575, 69.6498], [18.9600, 69.6500]]}}
]}"#;

const SITUATIONS: &str = r#"{"type": "FeatureCollection", "features": [
    {"type": "Feature", "properties": {"name": "Roadworks", "severity": "high"},
     "geometry": {"type": "Point", "coordinates": [18.95531, 69.64961]}},
    {"type": "Feature", "properties": {"name": "Closed lane", "severity": "low"},
     "geometry": {"type": "Point", "coordinates": [20.0, 70.0]}}
]}"#;

fn main() {
    let trip = parse_feature_collection(TRIP).expect("trip collection");
    let situations = parse_feature_collection(SITUATIONS).expect("situation collection");

    println!("Trip Matching Example\n");

    for config in [MatchConfig::default(), MatchConfig::from_meters(500.0, 69.65)] {
        println!("Tolerance: {:.6} degrees", config.tolerance);

        match find_matches(Some(&trip), Some(&situations), &config) {
            Ok(MatchOutcome::Matches(matches)) => {
                for m in &matches {
                    println!(
                        "   trip point #{} {:?} ~ situation #{} {:?} ({:.1}m)",
                        m.trip_index,
                        m.trip_coordinate,
                        m.reference_index,
                        m.reference_coordinate,
                        m.distance_meters
                    );
                }
                let display = matches_to_feature_collection(&matches);
                println!("   {} features ready for display\n", display.features.len());
            }
            Ok(MatchOutcome::NoMatches) => println!("   No situations along the trip\n"),
            Ok(MatchOutcome::NoData) => println!("   Nothing to match\n"),
            Err(e) => println!("   Error: {}\n", e),
        }
    }
}
