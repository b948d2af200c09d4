//! # Seat Map Application
//!
//! Wires the seat model, blocking and allocation engines of
//! `seatmap-core` to the viewport and renderer of `seatmap-renderer`,
//! and keeps the blocked set in step with the booking backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  input / frames   ┌───────────────────────────────┐
//! │ Host (UI)    │ ────────────────► │ SeatMap                       │
//! │              │ ◄──────────────── │  document, blocked, selection │
//! └──────────────┘  SeatMapListener  │  viewport, gestures, renderer │
//!                                    └──────────────┬────────────────┘
//!                                                   │ tickets / events
//!                                    ┌──────────────▼────────────────┐
//!                                    │ ReservationSync<A: Api>       │
//!                                    └───────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use seatmap_app::{SeatMap, SeatMapConfig};
//! use seatmap_core::{InputEvent, PointerPhase, SeatGroup};
//!
//! # fn main() -> Result<(), seatmap_app::AppError> {
//! let mut map = SeatMap::new(SeatMapConfig::default())?;
//! map.load("show-1", "<svg/>", vec![SeatGroup::new("parkett", "Parkett")])?;
//!
//! map.handle_input(&InputEvent::pointer(PointerPhase::Down, 400.0, 300.0, 0));
//! map.handle_input(&InputEvent::pointer(PointerPhase::Up, 400.0, 300.0, 40));
//!
//! let mut frame = map.create_target()?;
//! map.on_animation_frame(16, &mut frame)?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod seatmap;
pub mod sync;

pub use config::SeatMapConfig;
pub use error::{AppError, AppResult};
pub use seatmap::{SeatMap, SeatMapListener, SelectionChange};
pub use sync::{
    ApiError, BlockedSeats, ReservationApi, ReservationOutcome, ReservationSync, SyncError,
    SyncResult,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
