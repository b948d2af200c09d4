//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A raster surface could not be allocated.
    #[error("Failed to allocate {width}x{height} pixmap")]
    Pixmap {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },

    /// A configured color string is not understood.
    #[error("Invalid color {0:?}")]
    Color(String),

    /// Renderer configuration is inconsistent.
    #[error("Invalid renderer configuration: {0}")]
    Config(String),

    /// Encoding a frame failed.
    #[error("Export failed: {0}")]
    Export(String),
}
