//! Application error types.

use seatmap_core::SeatMapError;
use seatmap_renderer::RenderError;
use thiserror::Error;

/// Result type for seat map controller operations.
pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by the [`SeatMap`](crate::SeatMap) controller.
#[derive(Debug, Error)]
pub enum AppError {
    /// Parsing, configuration or lookup failed in the core.
    #[error(transparent)]
    Core(#[from] SeatMapError),

    /// Renderer setup or drawing failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Controller configuration could not be (de)serialized.
    #[error("Config serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The operation needs a loaded document.
    #[error("No seat map loaded")]
    NotLoaded,

    /// A reservation needs a shopping session id.
    #[error("No shopping session set")]
    NoSession,
}
