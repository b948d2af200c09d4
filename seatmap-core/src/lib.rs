//! # Seat Map Core
//!
//! Seat map logic for venue booking: the geometry model parsed from an
//! enriched SVG, the row segmentation table, blocking rules and
//! best-seat allocation. No rendering and no async.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                seatmap-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Geometry Model  │  Row Layout              │
//! │  - Seats, legends│  - Seat counts           │
//! │  - Path parsing  │  - Aisle split           │
//! ├─────────────────────────────────────────────┤
//! │  Propagator      │  Allocator               │
//! │  - Linkage       │  - In-segment blocks     │
//! │  - Adjacency/cap │  - Cross-aisle, fallback │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod allocation;
pub mod blocking;
pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod geometry;
pub mod path;
pub mod reservation;
pub mod rows;
pub mod seat;

pub use allocation::{Allocation, AllocationConfig, AllocationQuality, SeatAllocator, TicketRequest};
pub use blocking::{BlockedSet, BlockingRules, ConstraintPropagator, PropagationInput, RowRange};
pub use config::VenueConfig;
pub use document::{DocumentId, SeatMapDocument};
pub use error::{SeatMapError, SeatMapResult};
pub use event::{InputEvent, KeyModifiers, PointerPhase, TouchEvent, TouchPhase, TouchPoint};
pub use geometry::{Bounds, Point};
pub use path::{arc_to_cubics, parse_path, path_bounds, PathSegment};
pub use reservation::{
    FetchSequencer, FetchTicket, ReservationData, ReservationEvent, ReservationRequest,
    SeatReservation,
};
pub use rows::{RowConfig, RowLayout, RowLayoutConfig};
pub use seat::{
    GroupId, LegendElement, Rotation, RowRef, Seat, SeatGroup, SeatId, SeatType, ShapeGeometry,
};

/// Seat map core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
