//! Trip planning results.
//!
//! Journey planner responses list trip patterns made of legs; each leg with
//! an encoded `pointsOnLink` polyline becomes one LineString feature. The
//! backend trip endpoint wraps such a collection as `{"geojson": ...}`.

use geojson::{FeatureCollection, JsonObject};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::feature::{collection_of, feature_collection_from_value, line_feature};
use crate::Coordinate;

/// GraphQL query sent to the journey planner. Place ids and the pattern
/// count travel as variables.
pub const JOURNEY_QUERY: &str = r#"query Trip($from: String!, $to: String!, $numTripPatterns: Int!) {
  trip(from: {place: $from}, to: {place: $to}, numTripPatterns: $numTripPatterns) {
    tripPatterns {
      legs {
        mode
        distance
        line { id name }
        fromPlace { name latitude longitude }
        toPlace { name latitude longitude }
        pointsOnLink { points }
      }
    }
  }
}"#;

/// Build the journey planner request body.
pub fn journey_request(from: &str, to: &str, num_trip_patterns: u32) -> serde_json::Value {
    serde_json::json!({
        "query": JOURNEY_QUERY,
        "variables": {
            "from": from,
            "to": to,
            "numTripPatterns": num_trip_patterns,
        }
    })
}

// ============================================================================
// Journey planner response
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JourneyResponse {
    pub data: Option<JourneyData>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JourneyData {
    pub trip: Option<Trip>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    #[serde(default)]
    pub trip_patterns: Vec<TripPattern>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TripPattern {
    #[serde(default)]
    pub legs: Vec<Leg>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub mode: String,
    #[serde(default)]
    pub distance: f64,
    pub line: Option<Line>,
    pub from_place: Option<Place>,
    pub to_place: Option<Place>,
    pub points_on_link: Option<PointsOnLink>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Line {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Place {
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PointsOnLink {
    pub points: String,
}

/// Convert every leg with geometry into a LineString feature.
///
/// Properties: `mode`, `lineName` (null for walking legs), `distance`,
/// `fromPlace`, `toPlace`.
///
/// # Errors
/// [`MatchError::InvalidPolyline`] if a leg's polyline is corrupt.
pub fn trip_collection_from_journey(response: &JourneyResponse) -> Result<FeatureCollection> {
    let patterns = response
        .data
        .as_ref()
        .and_then(|d| d.trip.as_ref())
        .map(|t| t.trip_patterns.as_slice())
        .unwrap_or_default();

    let mut features = Vec::new();

    for leg in patterns.iter().flat_map(|p| p.legs.iter()) {
        let Some(link) = leg.points_on_link.as_ref() else {
            continue;
        };

        let coordinates = decode_polyline(&link.points)?;
        if coordinates.is_empty() {
            warn!("Skipping {} leg with empty geometry", leg.mode);
            continue;
        }

        let mut properties = JsonObject::new();
        properties.insert("mode".to_string(), leg.mode.clone().into());
        properties.insert(
            "lineName".to_string(),
            leg.line.as_ref().and_then(|l| l.name.clone()).into(),
        );
        properties.insert("distance".to_string(), leg.distance.into());
        properties.insert(
            "fromPlace".to_string(),
            leg.from_place.as_ref().and_then(|p| p.name.clone()).into(),
        );
        properties.insert(
            "toPlace".to_string(),
            leg.to_place.as_ref().and_then(|p| p.name.clone()).into(),
        );

        features.push(line_feature(&coordinates, properties));
    }

    debug!(
        "Built trip collection with {} legs from {} patterns",
        features.len(),
        patterns.len()
    );

    Ok(collection_of(features))
}

// ============================================================================
// Backend trip endpoint
// ============================================================================

/// Payload of the backend trip search endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TripResponse {
    /// Trip collection, absent or null when no route was found.
    #[serde(default)]
    pub geojson: Option<serde_json::Value>,
}

impl TripResponse {
    /// Response carrying a trip collection.
    pub fn with_collection(collection: &FeatureCollection) -> Result<Self> {
        Ok(Self {
            geojson: Some(serde_json::to_value(collection)?),
        })
    }

    /// Validate and return the trip collection, `None` when no route was found.
    pub fn into_collection(self) -> Result<Option<FeatureCollection>> {
        match self.geojson {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => feature_collection_from_value(value).map(Some),
        }
    }
}

// ============================================================================
// Encoded polyline
// ============================================================================

const POLYLINE_PRECISION: f64 = 1e5;

fn decode_value(bytes: &[u8], pos: &mut usize) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let Some(&byte) = bytes.get(*pos) else {
            return Err(MatchError::InvalidPolyline(format!("truncated value at byte {}", *pos)));
        };
        if !(63..=126).contains(&byte) {
            return Err(MatchError::InvalidPolyline(format!(
                "invalid character {:?} at byte {}",
                byte as char, *pos
            )));
        }
        if shift > 30 {
            return Err(MatchError::InvalidPolyline(format!("value too long at byte {}", *pos)));
        }

        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        *pos += 1;

        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

/// Decode a Google encoded polyline (precision 5).
///
/// The encoding stores `(lat, lng)`; the result is in GeoJSON order. Points
/// outside WGS84 range are rejected.
///
/// # Example
/// ```
/// use trip_matcher::{decode_polyline, Coordinate};
///
/// let coords = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
/// assert_eq!(coords[0], Coordinate::new(-120.2, 38.5));
/// assert_eq!(coords.len(), 3);
/// ```
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coordinate>> {
    let bytes = encoded.as_bytes();
    let mut pos = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut coordinates = Vec::new();

    while pos < bytes.len() {
        let start = pos;
        lat = lat
            .checked_add(decode_value(bytes, &mut pos)?)
            .ok_or_else(|| MatchError::InvalidPolyline(format!("latitude overflow at byte {}", start)))?;
        lng = lng
            .checked_add(decode_value(bytes, &mut pos)?)
            .ok_or_else(|| MatchError::InvalidPolyline(format!("longitude overflow at byte {}", start)))?;

        let coordinate = Coordinate::new(lng as f64 / POLYLINE_PRECISION, lat as f64 / POLYLINE_PRECISION);
        if !coordinate.is_valid() {
            return Err(MatchError::InvalidPolyline(format!(
                "point [{}, {}] at byte {} out of range",
                coordinate.lng, coordinate.lat, start
            )));
        }
        coordinates.push(coordinate);
    }

    Ok(coordinates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::trip_endpoints;
    use serde_json::json;

    fn approx(a: Coordinate, b: Coordinate) -> bool {
        (a.lng - b.lng).abs() < 1e-9 && (a.lat - b.lat).abs() < 1e-9
    }

    #[test]
    fn test_decode_reference_polyline() {
        let coords = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        let expected = [
            Coordinate::new(-120.2, 38.5),
            Coordinate::new(-120.95, 40.7),
            Coordinate::new(-126.453, 43.252),
        ];
        assert_eq!(coords.len(), 3);
        for (c, e) in coords.iter().zip(expected) {
            assert!(approx(*c, e), "{:?} != {:?}", c, e);
        }
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_polyline("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_truncated() {
        // Latitude present, longitude missing
        assert!(matches!(decode_polyline("_p~iF"), Err(MatchError::InvalidPolyline(_))));
        // Continuation bit set on the last byte
        assert!(matches!(decode_polyline("_p~i"), Err(MatchError::InvalidPolyline(_))));
    }

    #[test]
    fn test_decode_invalid_character() {
        assert!(matches!(decode_polyline("_p~iF ps|U"), Err(MatchError::InvalidPolyline(_))));
    }

    #[test]
    fn test_decode_out_of_range() {
        // Latitude 100, longitude 10
        let err = decode_polyline("_gjaR_c`|@").unwrap_err();
        assert!(matches!(err, MatchError::InvalidPolyline(ref msg) if msg.contains("out of range")));
    }

    fn journey() -> JourneyResponse {
        serde_json::from_value(json!({
            "data": {"trip": {"tripPatterns": [{"legs": [
                {"mode": "foot", "distance": 120.5, "line": null,
                 "fromPlace": {"name": "Origin", "latitude": 38.5, "longitude": -120.2},
                 "toPlace": {"name": "Stop A", "latitude": 43.252, "longitude": -126.453},
                 "pointsOnLink": {"points": "_p~iF~ps|U_ulLnnqC_mqNvxq`@"}},
                {"mode": "bus", "distance": 5000.0, "line": {"id": "TRO:Line:42", "name": "Sentrum"},
                 "fromPlace": {"name": "Stop A", "latitude": 43.252, "longitude": -126.453},
                 "toPlace": {"name": "Stop B", "latitude": 43.252, "longitude": -126.453},
                 "pointsOnLink": null}
            ]}]}}
        }))
        .unwrap()
    }

    #[test]
    fn test_trip_collection_from_journey() {
        let fc = trip_collection_from_journey(&journey()).unwrap();
        assert_eq!(fc.features.len(), 1);

        let leg = &fc.features[0];
        assert_eq!(leg.property("mode"), Some(&json!("foot")));
        assert_eq!(leg.property("lineName"), Some(&json!(null)));
        assert_eq!(leg.property("distance"), Some(&json!(120.5)));
        assert_eq!(leg.property("toPlace"), Some(&json!("Stop A")));

        let endpoints = trip_endpoints(&fc).unwrap();
        assert!(approx(endpoints[0], Coordinate::new(-120.2, 38.5)));
        assert!(approx(endpoints[1], Coordinate::new(-126.453, 43.252)));
    }

    #[test]
    fn test_trip_collection_without_data() {
        let fc = trip_collection_from_journey(&JourneyResponse::default()).unwrap();
        assert!(fc.features.is_empty());
    }

    #[test]
    fn test_trip_response_variants() {
        let missing: TripResponse = serde_json::from_str("{}").unwrap();
        assert!(missing.into_collection().unwrap().is_none());

        let null: TripResponse = serde_json::from_str(r#"{"geojson": null}"#).unwrap();
        assert!(null.into_collection().unwrap().is_none());

        let fc = trip_collection_from_journey(&journey()).unwrap();
        let found = TripResponse::with_collection(&fc)
            .unwrap()
            .into_collection()
            .unwrap()
            .unwrap();
        assert_eq!(found.features.len(), 1);

        let broken: TripResponse = serde_json::from_str(r#"{"geojson": {"features": 3}}"#).unwrap();
        assert!(matches!(broken.into_collection(), Err(MatchError::InvalidCollection(_))));
    }

    #[test]
    fn test_journey_request_uses_variables() {
        let body = journey_request("NSR:StopPlace:1", "NSR:StopPlace:2", 3);
        assert_eq!(body["variables"]["from"], json!("NSR:StopPlace:1"));
        assert_eq!(body["variables"]["numTripPatterns"], json!(3));
        assert!(body["query"].as_str().unwrap().contains("pointsOnLink"));
    }
}
