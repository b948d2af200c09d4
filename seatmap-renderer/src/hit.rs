//! Bounding-box hit testing in world coordinates.

use seatmap_core::{Bounds, Point, Seat};

/// First seat whose bounding box contains `world`.
///
/// Seat boxes do not meaningfully overlap, so document order decides ties.
#[must_use]
pub fn hit_test(seats: &[Seat], world: Point) -> Option<&Seat> {
    seats.iter().find(|seat| seat.bounds.contains(world))
}

/// Seats whose center lies inside `rect`, in document order.
pub fn seats_in_rect(seats: &[Seat], rect: Bounds) -> impl Iterator<Item = &Seat> {
    seats.iter().filter(move |seat| rect.contains(seat.center()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatmap_core::RowRef;

    fn seats() -> Vec<Seat> {
        vec![
            Seat::new("A", RowRef::Number(1), 1, Bounds::from_xywh(0.0, 0.0, 10.0, 10.0)),
            Seat::new("B", RowRef::Number(1), 2, Bounds::from_xywh(8.0, 0.0, 10.0, 10.0)),
            Seat::new("C", RowRef::Number(2), 1, Bounds::from_xywh(0.0, 20.0, 10.0, 10.0)),
        ]
    }

    #[test]
    fn test_first_match_wins() {
        let seats = seats();
        let hit = hit_test(&seats, Point::new(9.0, 5.0)).expect("hit");
        assert_eq!(hit.id.as_str(), "A");
        assert_eq!(
            hit_test(&seats, Point::new(15.0, 5.0)).map(|s| s.id.as_str()),
            Some("B")
        );
        assert!(hit_test(&seats, Point::new(50.0, 50.0)).is_none());
    }

    #[test]
    fn test_rect_uses_centers() {
        let seats = seats();
        let rect = Bounds::from_corners(Point::new(-1.0, -1.0), Point::new(12.0, 6.0));
        let ids: Vec<_> = seats_in_rect(&seats, rect).map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["A"]);
    }

    #[test]
    fn test_arc_seat_is_hit_inside_its_bulge() {
        let doc = seatmap_core::SeatMapDocument::parse(
            r#"<svg><path data-seat-id="S" data-row="1" data-row-position="1"
                     d="M0 10 A5 5 0 0 1 10 10 Z"/></svg>"#,
        )
        .expect("valid");
        let hit = hit_test(doc.seats(), Point::new(5.0, 7.0)).expect("hit");
        assert_eq!(hit.id.as_str(), "S");
    }
}
