//! Situation feature filtering.
//!
//! Selections compare against feature properties after trimming and
//! lowercasing both sides. An unset or blank selection matches everything.

use geojson::{Feature, FeatureCollection, Value};
use log::debug;
use serde::{Deserialize, Serialize};

pub const COUNTY: &str = "county";
pub const SITUATION_TYPE: &str = "situation_type";
pub const SEVERITY: &str = "severity";

/// Current dropdown selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFilter {
    pub county: Option<String>,
    pub situation_type: Option<String>,
    pub severity: Option<String>,
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn selection(value: &Option<String>) -> Option<String> {
    value.as_deref().map(normalize).filter(|v| !v.is_empty())
}

fn property_str<'a>(feature: &'a Feature, key: &str) -> Option<&'a str> {
    feature.property(key).and_then(|v| v.as_str())
}

fn property_matches(feature: &Feature, key: &str, wanted: &Option<String>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => property_str(feature, key).map(normalize).as_deref() == Some(wanted.as_str()),
    }
}

impl FeatureFilter {
    /// True when no selection is active.
    pub fn is_empty(&self) -> bool {
        selection(&self.county).is_none()
            && selection(&self.situation_type).is_none()
            && selection(&self.severity).is_none()
    }

    /// Check a single feature against every active selection.
    pub fn matches(&self, feature: &Feature) -> bool {
        property_matches(feature, COUNTY, &selection(&self.county))
            && property_matches(feature, SITUATION_TYPE, &selection(&self.situation_type))
            && property_matches(feature, SEVERITY, &selection(&self.severity))
    }

    /// Features that pass the filter, in collection order.
    pub fn apply(&self, collection: &FeatureCollection) -> FeatureCollection {
        let county = selection(&self.county);
        let situation = selection(&self.situation_type);
        let severity = selection(&self.severity);

        let features: Vec<Feature> = collection
            .features
            .iter()
            .filter(|f| {
                property_matches(f, COUNTY, &county)
                    && property_matches(f, SITUATION_TYPE, &situation)
                    && property_matches(f, SEVERITY, &severity)
            })
            .cloned()
            .collect();

        debug!(
            "Filter {:?} kept {}/{} features",
            self,
            features.len(),
            collection.features.len()
        );

        crate::feature::collection_of(features)
    }

    /// Active selections as query parameters for the locations endpoint.
    ///
    /// Values are sent as typed (trimmed), the server compares case-insensitively.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        [
            (COUNTY, &self.county),
            (SITUATION_TYPE, &self.situation_type),
            (SEVERITY, &self.severity),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            let value = value.as_deref()?.trim();
            (!value.is_empty()).then(|| (key, value.to_string()))
        })
        .collect()
    }
}

/// Distinct values available for each dropdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    pub counties: Vec<String>,
    pub situation_types: Vec<String>,
    pub severities: Vec<String>,
}

impl FilterOptions {
    /// Collect distinct non-empty values in first-seen order.
    pub fn from_collection(collection: &FeatureCollection) -> Self {
        let mut options = FilterOptions::default();

        for feature in &collection.features {
            push_unique(&mut options.counties, property_str(feature, COUNTY));
            push_unique(&mut options.situation_types, property_str(feature, SITUATION_TYPE));
            push_unique(&mut options.severities, property_str(feature, SEVERITY));
        }

        options
    }
}

fn push_unique(values: &mut Vec<String>, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }
}

/// Partition features into Point features and LineString features.
///
/// Features with other or missing geometry are left out of both.
pub fn split_by_geometry(collection: &FeatureCollection) -> (Vec<&Feature>, Vec<&Feature>) {
    let mut points = Vec::new();
    let mut lines = Vec::new();

    for feature in &collection.features {
        match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::Point(_)) => points.push(feature),
            Some(Value::LineString(_)) => lines.push(feature),
            _ => {}
        }
    }

    (points, lines)
}
