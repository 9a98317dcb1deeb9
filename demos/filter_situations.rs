//! Example of filtering situations and listing dropdown options.
//!
//! Run with: cargo run --example filter_situations

use trip_matcher::{parse_feature_collection, split_by_geometry, FeatureFilter, FilterOptions};

const SITUATIONS: &str = r#"{"type": "FeatureCollection", "features": [
    {"type": "Feature", "properties": {"county": "Troms", "situation_type": "Roadworks", "severity": "low"},
     "geometry": {"type": "Point", "coordinates": [18.95, 69.65]}},
    {"type": "Feature", "properties": {"county": "Oslo", "situation_type": "Accident", "severity": "highest"},
     "geometry": {"type": "Point", "coordinates": [10.75, 59.91]}},
    {"type": "Feature", "properties": {"county": "Troms", "situation_type": "Accident", "severity": "high"},
     "geometry": {"type": "LineString", "coordinates": [[18.9, 69.6], [19.0, 69.7]]}}
]}"#;

fn main() {
    let situations = parse_feature_collection(SITUATIONS).expect("situation collection");

    let options = FilterOptions::from_collection(&situations);
    println!("Counties:        {:?}", options.counties);
    println!("Situation types: {:?}", options.situation_types);
    println!("Severities:      {:?}\n", options.severities);

    let filter = FeatureFilter {
        county: Some("troms".to_string()),
        ..Default::default()
    };
    let filtered = filter.apply(&situations);
    let (points, lines) = split_by_geometry(&filtered);

    println!("Filter {:?}", filter.query_pairs());
    println!("   {} points, {} lines", points.len(), lines.len());
}
