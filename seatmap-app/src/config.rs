//! Controller configuration.

use seatmap_core::VenueConfig;
use seatmap_renderer::{RendererConfig, ViewportConfig};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// Everything a [`SeatMap`](crate::SeatMap) is created from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeatMapConfig {
    /// Row table, blocking rules and allocation caps.
    pub venue: VenueConfig,
    /// Zoom limits and gesture thresholds.
    pub viewport: ViewportConfig,
    /// Raster and color settings.
    pub renderer: RendererConfig,
    /// Initial screen width in CSS pixels.
    pub screen_width: f32,
    /// Initial screen height in CSS pixels.
    pub screen_height: f32,
}

impl Default for SeatMapConfig {
    fn default() -> Self {
        Self {
            venue: VenueConfig::default(),
            viewport: ViewportConfig::default(),
            renderer: RendererConfig::default(),
            screen_width: 800.0,
            screen_height: 600.0,
        }
    }
}

impl SeatMapConfig {
    /// Parse and validate a JSON configuration; missing sections take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON or inconsistent venue,
    /// viewport or renderer settings.
    pub fn from_json(json: &str) -> AppResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section.
    ///
    /// # Errors
    ///
    /// Returns the first section error found.
    pub fn validate(&self) -> AppResult<()> {
        self.venue.validate()?;
        self.viewport.validate()?;
        self.renderer.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppError;
    use seatmap_renderer::RenderError;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SeatMapConfig::from_json(
            r#"{"screenWidth": 1024, "viewport": {"clickZoomScale": 3.0}}"#,
        )
        .expect("config");
        assert!((config.screen_width - 1024.0).abs() < f32::EPSILON);
        assert!((config.screen_height - 600.0).abs() < f32::EPSILON);
        assert!((config.viewport.click_zoom_scale - 3.0).abs() < f32::EPSILON);
        assert_eq!(config.venue, VenueConfig::default());
    }

    #[test]
    fn test_invalid_sections_rejected() {
        let err = SeatMapConfig::from_json(r#"{"renderer": {"maxTextureEdge": 0}}"#)
            .expect_err("zero texture edge");
        assert!(matches!(err, AppError::Render(_)));

        for viewport in [
            r#"{"viewport": {"zoomStep": 0}}"#,
            r#"{"viewport": {"maxScale": -1}}"#,
            r#"{"viewport": {"minInteractiveScale": 8, "maxScale": 5}}"#,
        ] {
            let err = SeatMapConfig::from_json(viewport).expect_err(viewport);
            assert!(matches!(err, AppError::Render(RenderError::Config(_))));
        }

        let err = SeatMapConfig::from_json("{").expect_err("malformed");
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
