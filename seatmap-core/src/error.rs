//! Error types for seat map operations.

use thiserror::Error;

/// Result type for seat map operations.
pub type SeatMapResult<T> = Result<T, SeatMapError>;

/// Errors that can occur in seat map operations.
///
/// Allocation shortfalls are not errors; they come back as a failed
/// [`Allocation`](crate::Allocation).
#[derive(Debug, Error)]
pub enum SeatMapError {
    /// The enriched document is not well-formed XML.
    #[error("Document parse error: {0}")]
    Document(#[from] roxmltree::Error),

    /// A seat id was referenced that the document does not contain.
    #[error("Seat not found: {0}")]
    SeatNotFound(String),

    /// A seat group id was referenced that is not loaded.
    #[error("Seat group not found: {0}")]
    GroupNotFound(String),

    /// A row or venue configuration violates its invariants.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration or wire payload (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading a configuration file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
