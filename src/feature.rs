//! GeoJSON feature collection loading and point extraction.
//!
//! Trip collections contribute the first and last position of every
//! LineString; reference collections contribute one position per feature.
//! Malformed features are reported as [`MatchError::InvalidFeature`] with the
//! offending feature's index instead of being skipped.

use geojson::{Feature, FeatureCollection, JsonObject, Value};
use log::debug;

use crate::error::{MatchError, Result};
use crate::Coordinate;

/// Parse a GeoJSON feature collection from a JSON string.
///
/// Each feature is validated on its own so that a malformed entry is reported
/// with its position in the `features` array.
///
/// # Example
/// ```
/// use trip_matcher::feature::parse_feature_collection;
///
/// let fc = parse_feature_collection(r#"{
///     "type": "FeatureCollection",
///     "features": [
///         {"type": "Feature", "geometry": {"type": "Point", "coordinates": [18.9553, 69.6496]}, "properties": {}}
///     ]
/// }"#).unwrap();
/// assert_eq!(fc.features.len(), 1);
/// ```
pub fn parse_feature_collection(json: &str) -> Result<FeatureCollection> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    feature_collection_from_value(value)
}

/// Build a feature collection from an already-parsed JSON value.
pub fn feature_collection_from_value(value: serde_json::Value) -> Result<FeatureCollection> {
    let serde_json::Value::Object(mut object) = value else {
        return Err(MatchError::InvalidCollection("expected a JSON object".to_string()));
    };

    if let Some(kind) = object.get("type") {
        if kind.as_str() != Some("FeatureCollection") {
            return Err(MatchError::InvalidCollection(format!(
                "expected type FeatureCollection, found {}",
                kind
            )));
        }
    }

    let features = match object.remove("features") {
        Some(serde_json::Value::Array(features)) => features,
        Some(_) => {
            return Err(MatchError::InvalidCollection("\"features\" is not an array".to_string()))
        }
        None => return Err(MatchError::InvalidCollection("missing \"features\"".to_string())),
    };

    let features = features
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            Feature::from_json_value(raw)
                .map_err(|e| MatchError::invalid_feature(index, e.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Parsed feature collection with {} features", features.len());

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Read a GeoJSON position as a coordinate.
///
/// Extra dimensions (altitude) are ignored; fewer than two values or values
/// outside WGS84 range are rejected.
pub fn position_to_coordinate(index: usize, position: &[f64]) -> Result<Coordinate> {
    match position {
        [lng, lat, ..] => {
            let coordinate = Coordinate::new(*lng, *lat);
            if coordinate.is_valid() {
                Ok(coordinate)
            } else {
                Err(MatchError::invalid_feature(
                    index,
                    format!("coordinate [{}, {}] out of range", lng, lat),
                ))
            }
        }
        _ => Err(MatchError::invalid_feature(
            index,
            format!("position has {} values, expected [lng, lat]", position.len()),
        )),
    }
}

fn geometry_value(index: usize, feature: &Feature) -> Result<&Value> {
    feature
        .geometry
        .as_ref()
        .map(|g| &g.value)
        .ok_or_else(|| MatchError::invalid_feature(index, "missing geometry"))
}

/// Short GeoJSON name of a geometry value, for messages.
pub fn geometry_kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Extract the candidate trip points: first and last position of every
/// LineString feature, in feature order.
///
/// Features of other geometry kinds are skipped. A single-position line
/// contributes the same coordinate twice.
///
/// # Errors
/// [`MatchError::InvalidFeature`] for a feature without geometry or a
/// LineString without positions.
pub fn trip_endpoints(collection: &FeatureCollection) -> Result<Vec<Coordinate>> {
    let mut points = Vec::with_capacity(collection.features.len() * 2);

    for (index, feature) in collection.features.iter().enumerate() {
        let Value::LineString(line) = geometry_value(index, feature)? else {
            continue;
        };

        let (Some(first), Some(last)) = (line.first(), line.last()) else {
            return Err(MatchError::invalid_feature(index, "LineString has no coordinates"));
        };

        points.push(position_to_coordinate(index, first)?);
        points.push(position_to_coordinate(index, last)?);
    }

    Ok(points)
}

/// Extract one reference point per feature.
///
/// No geometry filtering is applied: every feature is expected to carry a
/// single `[lng, lat]` position, and anything else is an invalid feature.
pub fn reference_points(collection: &FeatureCollection) -> Result<Vec<Coordinate>> {
    collection
        .features
        .iter()
        .enumerate()
        .map(|(index, feature)| match geometry_value(index, feature)? {
            Value::Point(position) => position_to_coordinate(index, position),
            other => Err(MatchError::invalid_feature(
                index,
                format!(
                    "expected a single [lng, lat] position, found {} coordinates",
                    geometry_kind(other)
                ),
            )),
        })
        .collect()
}

/// Build a Point feature at `coordinate` with the given properties.
pub fn point_feature(coordinate: Coordinate, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(Value::Point(coordinate.to_position()))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Build a LineString feature through `coordinates` with the given properties.
pub fn line_feature(coordinates: &[Coordinate], properties: JsonObject) -> Feature {
    let positions = coordinates.iter().map(|c| c.to_position()).collect();
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(Value::LineString(positions))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Wrap features into a collection.
pub fn collection_of(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
