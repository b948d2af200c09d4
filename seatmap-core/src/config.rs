//! Venue configuration: row table, blocking rules and allocation caps.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::allocation::AllocationConfig;
use crate::blocking::BlockingRules;
use crate::rows::{RowLayout, RowLayoutConfig};
use crate::{SeatMapError, SeatMapResult};

/// Everything venue-specific the engines need.
///
/// Missing sections in JSON fall back to the canonical hall defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VenueConfig {
    /// Per-row seat counts and aisle split.
    pub rows: RowLayoutConfig,
    /// Wheelchair segments, adjacency depth and cap.
    pub blocking: BlockingRules,
    /// Free-mode cap and wheelchair group markers.
    pub allocation: AllocationConfig,
}

impl VenueConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON or an invalid table.
    pub fn from_json(json: &str) -> SeatMapResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> SeatMapResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        tracing::debug!("Loading venue config from {}", path.display());
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> SeatMapResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the whole configuration for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`SeatMapError::InvalidConfig`] for broken row splits,
    /// repeated rows, empty or overlapping wheelchair segments, or a
    /// zero cap.
    pub fn validate(&self) -> SeatMapResult<()> {
        self.row_layout()?;

        let mut segments = self.blocking.wheelchair_segments.clone();
        segments.sort_by_key(|r| r.first);
        for range in &segments {
            if range.first > range.last {
                return Err(SeatMapError::InvalidConfig(format!(
                    "wheelchair segment {}..={} is empty",
                    range.first, range.last
                )));
            }
        }
        if let Some(pair) = segments.windows(2).find(|w| w[1].first <= w[0].last) {
            return Err(SeatMapError::InvalidConfig(format!(
                "wheelchair segments {}..={} and {}..={} overlap",
                pair[0].first, pair[0].last, pair[1].first, pair[1].last
            )));
        }

        if self.blocking.wheelchair_cap == 0 || self.allocation.wheelchair_free_mode_cap == 0 {
            return Err(SeatMapError::InvalidConfig(
                "wheelchair caps must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the validated row lookup table.
    ///
    /// # Errors
    ///
    /// Returns an error if the row table is invalid.
    pub fn row_layout(&self) -> SeatMapResult<RowLayout> {
        RowLayout::new(&self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::RowRange;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = VenueConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.blocking.wheelchair_cap, 15);
        assert_eq!(config.allocation.wheelchair_free_mode_cap, 25);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = VenueConfig::from_json(r#"{"blocking":{"wheelchairCap":4}}"#).expect("valid");
        assert_eq!(config.blocking.wheelchair_cap, 4);
        assert_eq!(config.blocking.adjacency_rows, 2);
        assert_eq!(config.row_layout().expect("rows").get(1).total_seats, 86);
    }

    #[test]
    fn test_overlapping_segments_rejected() {
        let mut config = VenueConfig::default();
        config.blocking.wheelchair_segments = vec![RowRange::new(1, 10), RowRange::new(10, 20)];
        assert!(matches!(
            config.validate(),
            Err(SeatMapError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        assert!(matches!(
            VenueConfig::from_json("{rows:"),
            Err(SeatMapError::Serialization(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let config = VenueConfig::default();
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(config.to_json().expect("json").as_bytes())
            .expect("write");

        let loaded = VenueConfig::from_file(file.path()).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            VenueConfig::from_file("/nonexistent/venue.json"),
            Err(SeatMapError::Io(_))
        ));
    }
}
