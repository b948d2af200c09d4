//! # Reservation Synchronization
//!
//! Async access to the booking API with the stale-response guard.
//!
//! ## Flow
//!
//! ```text
//! SeatMap::begin_blocked_fetch ──► ticket
//!        ReservationSync::fetch_blocked(show, ticket).await
//!            ├─ superseded ──► None (dropped)
//!            └─ current    ──► SeatMap::apply_blocked_fetch
//!
//! ReservationSync::reserve(request).await
//!     ├─ ok       ──► Reserved
//!     └─ conflict ──► re-fetch blocked ──► Conflicted ──► SeatMap::prune_conflicts
//! ```

use async_trait::async_trait;
use seatmap_core::{FetchSequencer, FetchTicket, ReservationData, ReservationRequest, SeatId};
use thiserror::Error;

/// Errors reported by a [`ReservationApi`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Some requested seats were taken in the meantime.
    #[error("Reservation conflict: {0}")]
    Conflict(String),

    /// The request did not reach the server or the response was unusable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The show does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type for reservation sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors from [`ReservationSync`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// The booking API failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Booking API consumed by the seat map.
#[async_trait]
pub trait ReservationApi: Send + Sync {
    /// Seats currently unavailable for a show.
    async fn blocked_seats(&self, show_id: &str) -> Result<Vec<SeatId>, ApiError>;

    /// Hold seats for a session.
    async fn create_reservation(
        &self,
        request: &ReservationRequest,
    ) -> Result<ReservationData, ApiError>;
}

/// A blocked-seat fetch that was still current when it completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedSeats {
    /// Ticket the fetch was issued with.
    pub ticket: FetchTicket,
    /// Blocked seat ids.
    pub seat_ids: Vec<SeatId>,
}

/// Outcome of [`ReservationSync::reserve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// The seats are held.
    Reserved(ReservationData),
    /// Someone was faster; the authoritative blocked set was re-fetched.
    Conflicted {
        /// Current blocked seats of the show.
        blocked: Vec<SeatId>,
        /// Requested seats that are blocked now.
        conflicting: Vec<SeatId>,
    },
}

/// Booking API client bound to a seat map's fetch sequencer.
#[derive(Debug, Clone)]
pub struct ReservationSync<A> {
    api: A,
    sequencer: FetchSequencer,
}

impl<A: ReservationApi> ReservationSync<A> {
    /// Create a sync client sharing `sequencer` with the seat map.
    #[must_use]
    pub fn new(api: A, sequencer: FetchSequencer) -> Self {
        Self { api, sequencer }
    }

    /// The wrapped API.
    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Fetch the blocked seats for `ticket`.
    ///
    /// Returns `None` if a newer fetch was issued (or a new document was
    /// loaded) while this one was in flight.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn fetch_blocked(
        &self,
        show_id: &str,
        ticket: FetchTicket,
    ) -> SyncResult<Option<BlockedSeats>> {
        let seat_ids = self.api.blocked_seats(show_id).await?;
        let latest = self.sequencer.latest();
        if ticket.token != latest {
            tracing::debug!(
                "Dropping blocked seats for {show_id}: ticket {} superseded by {latest}",
                ticket.token
            );
            return Ok(None);
        }
        tracing::debug!("Fetched {} blocked seats for {show_id}", seat_ids.len());
        Ok(Some(BlockedSeats { ticket, seat_ids }))
    }

    /// Create a reservation; on conflict, re-fetch the blocked set.
    ///
    /// # Errors
    ///
    /// Returns an error for non-conflict API failures or a failed re-fetch.
    pub async fn reserve(&self, request: &ReservationRequest) -> SyncResult<ReservationOutcome> {
        match self.api.create_reservation(request).await {
            Ok(data) => {
                tracing::info!(
                    "Reservation {} holds {} seats",
                    data.reservation_id,
                    data.seat_ids.len()
                );
                Ok(ReservationOutcome::Reserved(data))
            }
            Err(ApiError::Conflict(reason)) => {
                tracing::warn!("Reservation conflict for show {}: {reason}", request.show_id);
                let blocked = self.api.blocked_seats(&request.show_id).await?;
                let conflicting = request
                    .seat_ids()
                    .filter(|id| blocked.contains(id))
                    .cloned()
                    .collect();
                Ok(ReservationOutcome::Conflicted {
                    blocked,
                    conflicting,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
