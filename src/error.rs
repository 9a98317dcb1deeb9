//! Error types for feature loading, matching and trip search.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MatchError>;

/// Errors raised while reading feature collections or fetching map data.
///
/// An empty match list is never an error; see [`crate::MatchOutcome`].
#[derive(Debug, Error)]
pub enum MatchError {
    /// A feature could not be read: missing geometry, missing or ill-shaped
    /// coordinates, an empty LineString or coordinates outside WGS84 range.
    #[error("invalid feature at index {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },

    /// The document is not a GeoJSON feature collection.
    #[error("invalid feature collection: {0}")]
    InvalidCollection(String),

    /// An encoded polyline ended mid-value or overflowed.
    #[error("invalid encoded polyline: {0}")]
    InvalidPolyline(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport or status failure talking to the map backend.
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(String),

    /// The request did not complete within the configured timeout.
    #[cfg(feature = "http")]
    #[error("request timed out")]
    Timeout,
}

impl MatchError {
    pub(crate) fn invalid_feature(index: usize, reason: impl Into<String>) -> Self {
        MatchError::InvalidFeature {
            index,
            reason: reason.into(),
        }
    }

    /// True for malformed-input errors (as opposed to transport failures).
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            MatchError::InvalidFeature { .. }
                | MatchError::InvalidCollection(_)
                | MatchError::InvalidPolyline(_)
                | MatchError::Json(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_feature_message() {
        let err = MatchError::invalid_feature(3, "missing geometry");
        assert_eq!(err.to_string(), "invalid feature at index 3: missing geometry");
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_json_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: MatchError = json_err.into();
        assert!(matches!(err, MatchError::Json(_)));
    }
}
