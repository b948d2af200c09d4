//! Reservation wire types and the stale-fetch guard.
//!
//! Field names follow the booking API's camelCase JSON.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::DocumentId;
use crate::seat::SeatId;

/// One seat of a reservation request with the price it is booked at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatReservation {
    /// Seat to reserve.
    pub seat_id: SeatId,
    /// Price the seat is booked at.
    pub price_id: String,
}

/// Request to hold seats for a shopping session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    /// Show the seats belong to.
    pub show_id: String,
    /// Seats with prices.
    pub seat_reservations: Vec<SeatReservation>,
    /// Shopping session holding the reservation.
    pub session_id: String,
}

impl ReservationRequest {
    /// Seat ids in request order.
    pub fn seat_ids(&self) -> impl Iterator<Item = &SeatId> {
        self.seat_reservations.iter().map(|r| &r.seat_id)
    }
}

/// Confirmed reservation returned by the booking API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationData {
    /// Server-side reservation id.
    pub reservation_id: String,
    /// Seats held by the reservation.
    pub seat_ids: Vec<SeatId>,
    /// Expiry as unix milliseconds, if the server reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<u64>,
}

/// Realtime notification about other shoppers' reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReservationEvent {
    /// Seats were reserved by some session.
    #[serde(rename = "reservation:created", rename_all = "camelCase")]
    Created {
        /// Show the seats belong to.
        show_id: String,
        /// Reserved seats.
        seat_ids: Vec<SeatId>,
        /// Session that reserved them.
        session_id: String,
    },
    /// A reservation timed out.
    #[serde(rename = "reservation:expired", rename_all = "camelCase")]
    Expired {
        /// Show the seats belong to.
        show_id: String,
        /// Seats that are free again.
        seat_ids: Vec<SeatId>,
    },
    /// A reservation was given up.
    #[serde(rename = "reservation:released", rename_all = "camelCase")]
    Released {
        /// Show the seats belong to.
        show_id: String,
        /// Seats that are free again.
        seat_ids: Vec<SeatId>,
    },
}

impl ReservationEvent {
    /// Show the event refers to.
    #[must_use]
    pub fn show_id(&self) -> &str {
        match self {
            Self::Created { show_id, .. }
            | Self::Expired { show_id, .. }
            | Self::Released { show_id, .. } => show_id,
        }
    }

    /// Seats the event refers to.
    #[must_use]
    pub fn seat_ids(&self) -> &[SeatId] {
        match self {
            Self::Created { seat_ids, .. }
            | Self::Expired { seat_ids, .. }
            | Self::Released { seat_ids, .. } => seat_ids,
        }
    }

    /// Whether the seats become blocked (as opposed to freed).
    #[must_use]
    pub const fn blocks(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    /// Whether the event should change this client's blocked set.
    ///
    /// Events for other shows and echoes of the own session are ignored.
    #[must_use]
    pub fn applies_to(&self, show_id: &str, own_session: Option<&str>) -> bool {
        if self.show_id() != show_id {
            return false;
        }
        match (self, own_session) {
            (Self::Created { session_id, .. }, Some(own)) => session_id != own,
            _ => true,
        }
    }
}

/// Ticket identifying one blocked-seat fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    /// Monotonic request number.
    pub token: u64,
    /// Document that was loaded when the fetch was issued.
    pub document: DocumentId,
}

/// Issues monotonically increasing fetch tokens.
///
/// Clones share the counter, so a clone can be handed to an async task
/// while the owner keeps validating responses.
#[derive(Debug, Clone, Default)]
pub struct FetchSequencer {
    latest: Arc<AtomicU64>,
}

impl FetchSequencer {
    /// Create a sequencer with no fetch issued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a new fetch; all earlier tickets become stale.
    #[must_use]
    pub fn issue(&self, document: DocumentId) -> FetchTicket {
        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!("Issued fetch ticket {token} for document {document}");
        FetchTicket { token, document }
    }

    /// Make every outstanding ticket stale.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }

    /// Most recently issued token.
    #[must_use]
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Whether a response for `ticket` may be applied to `loaded`.
    #[must_use]
    pub fn is_current(&self, ticket: &FetchTicket, loaded: DocumentId) -> bool {
        let current = ticket.token == self.latest() && ticket.document == loaded;
        if !current {
            tracing::warn!(
                "Discarding stale fetch {} (latest {}, document {})",
                ticket.token,
                self.latest(),
                ticket.document
            );
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_names() {
        let json = r#"{"type":"reservation:created","showId":"s1","seatIds":["A-1"],"sessionId":"x"}"#;
        let event: ReservationEvent = serde_json::from_str(json).expect("parse");
        assert!(event.blocks());
        assert_eq!(event.seat_ids(), &[SeatId::from("A-1")]);

        let json = r#"{"type":"reservation:released","showId":"s1","seatIds":["A-1"]}"#;
        let event: ReservationEvent = serde_json::from_str(json).expect("parse");
        assert!(!event.blocks());
        assert_eq!(event.show_id(), "s1");
    }

    #[test]
    fn test_event_relevance() {
        let event = ReservationEvent::Created {
            show_id: "s1".to_string(),
            seat_ids: vec![],
            session_id: "me".to_string(),
        };
        assert!(!event.applies_to("s2", None));
        assert!(!event.applies_to("s1", Some("me")));
        assert!(event.applies_to("s1", Some("other")));
        assert!(event.applies_to("s1", None));
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = ReservationRequest {
            show_id: "s1".to_string(),
            seat_reservations: vec![SeatReservation {
                seat_id: SeatId::from("A-1"),
                price_id: "p".to_string(),
            }],
            session_id: "me".to_string(),
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["seatReservations"][0]["seatId"], "A-1");
        assert_eq!(request.seat_ids().count(), 1);
    }

    #[test]
    fn test_only_latest_ticket_is_current() {
        let sequencer = FetchSequencer::new();
        let document = DocumentId::new();
        let first = sequencer.issue(document);
        let second = sequencer.clone().issue(document);

        assert!(!sequencer.is_current(&first, document));
        assert!(sequencer.is_current(&second, document));
        assert!(!sequencer.is_current(&second, DocumentId::new()));

        sequencer.invalidate();
        assert!(!sequencer.is_current(&second, document));
    }
}
