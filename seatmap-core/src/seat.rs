//! Seats, legend shapes and seat groups - the shared data model.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, Point};
use crate::path::PathSegment;

/// Stable seat identifier as stamped into the enriched document.
///
/// Ids order *naturally*: digit runs compare by numeric value, so
/// `A-2 < A-10`. This is the "seat-id order" used by allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatId(String);

impl SeatId {
    /// Create a seat id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SeatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeatId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SeatId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialOrd for SeatId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SeatId {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(self.0.as_bytes(), other.0.as_bytes())
    }
}

fn natural_cmp(mut a: &[u8], mut b: &[u8]) -> Ordering {
    loop {
        match (a.first(), b.first()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let (num_a, rest_a) = a.split_at(a.iter().take_while(|c| c.is_ascii_digit()).count());
                let (num_b, rest_b) = b.split_at(b.iter().take_while(|c| c.is_ascii_digit()).count());
                let trim_a = &num_a[num_a.iter().take_while(|&&c| c == b'0').count()..];
                let trim_b = &num_b[num_b.iter().take_while(|&&c| c == b'0').count()..];
                let ord = trim_a
                    .len()
                    .cmp(&trim_b.len())
                    .then_with(|| trim_a.cmp(trim_b))
                    .then_with(|| num_a.len().cmp(&num_b.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
                a = rest_a;
                b = rest_b;
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(y);
                }
                a = &a[1..];
                b = &b[1..];
            }
        }
    }
}

/// Identifier of a price/seat group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Create a group id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Seat category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatType {
    /// Ordinary seat.
    #[default]
    Normal,
    /// Wheelchair space.
    Wheelchair,
    /// Wheelchair space at the side of the hall (symbolic row).
    WheelchairSide,
    /// Companion seat next to a wheelchair space.
    WheelchairAccompaniment,
    /// Seat sold through best-available booking only.
    Bestplatz,
}

impl SeatType {
    /// Whether the seat belongs to the wheelchair family.
    #[must_use]
    pub const fn is_wheelchair_family(self) -> bool {
        matches!(
            self,
            Self::Wheelchair | Self::WheelchairSide | Self::WheelchairAccompaniment
        )
    }
}

impl FromStr for SeatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "" | "normal" | "seat" => Ok(Self::Normal),
            "wheelchair" => Ok(Self::Wheelchair),
            "wheelchair_side" => Ok(Self::WheelchairSide),
            "wheelchair_accompaniment" => Ok(Self::WheelchairAccompaniment),
            "bestplatz" => Ok(Self::Bestplatz),
            other => Err(format!("unknown seat type: {other}")),
        }
    }
}

/// A seat's row: numbered rows take part in segment allocation,
/// named rows (side and companion areas) do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowRef {
    /// Numbered row, 1-based from the front.
    Number(u32),
    /// Symbolic row name.
    Named(String),
}

impl RowRef {
    /// The row number, if the row is numbered.
    #[must_use]
    pub fn number(&self) -> Option<u32> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Named(_) => None,
        }
    }
}

impl From<&str> for RowRef {
    fn from(s: &str) -> Self {
        s.trim()
            .parse::<u32>()
            .map_or_else(|_| Self::Named(s.trim().to_string()), Self::Number)
    }
}

impl std::fmt::Display for RowRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Opaque vector geometry of a shape, used only for rasterizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeGeometry {
    /// Axis-aligned (optionally rounded) rectangle.
    Rect {
        /// Rectangle extent.
        bounds: Bounds,
        /// Corner radius.
        corner_radius: f32,
    },
    /// Arbitrary outline.
    Path {
        /// Absolute segments.
        segments: Vec<PathSegment>,
    },
}

/// A bookable seat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    /// Globally unique id.
    pub id: SeatId,
    /// Seat category.
    pub seat_type: SeatType,
    /// Row the seat sits in.
    pub row: RowRef,
    /// 1-based position within the row.
    pub row_position: u32,
    /// Seat that must be booked jointly with this one.
    pub linked_seat_id: Option<SeatId>,
    /// World-space bounding box.
    pub bounds: Bounds,
    /// Outline for rasterizing.
    pub shape: ShapeGeometry,
    /// Price/seat group owning this seat.
    pub group_id: Option<GroupId>,
    /// Fill taken from the document (presentation only).
    pub color: Option<String>,
}

impl Seat {
    /// Create a rectangular seat; convenient for tests and synthetic maps.
    #[must_use]
    pub fn new(id: impl Into<SeatId>, row: RowRef, row_position: u32, bounds: Bounds) -> Self {
        Self {
            id: id.into(),
            seat_type: SeatType::Normal,
            row,
            row_position,
            linked_seat_id: None,
            bounds,
            shape: ShapeGeometry::Rect {
                bounds,
                corner_radius: 0.0,
            },
            group_id: None,
            color: None,
        }
    }

    /// Set the seat type.
    #[must_use]
    pub fn with_type(mut self, seat_type: SeatType) -> Self {
        self.seat_type = seat_type;
        self
    }

    /// Set the owning group.
    #[must_use]
    pub fn with_group(mut self, group_id: impl Into<GroupId>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Link this seat to an anchor seat.
    #[must_use]
    pub fn with_link(mut self, linked: impl Into<SeatId>) -> Self {
        self.linked_seat_id = Some(linked.into());
        self
    }

    /// Center of the bounding box.
    #[must_use]
    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    /// Numeric row, if any.
    #[must_use]
    pub fn row_number(&self) -> Option<u32> {
        self.row.number()
    }
}

/// Rotation applied to a legend shape, in degrees about a pivot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Angle in degrees, clockwise in screen space.
    pub degrees: f32,
    /// Pivot point.
    pub pivot: Point,
}

impl Rotation {
    /// Rotate a point about the pivot.
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        let (sin, cos) = self.degrees.to_radians().sin_cos();
        let dx = p.x - self.pivot.x;
        let dy = p.y - self.pivot.y;
        Point::new(
            self.pivot.x + dx * cos - dy * sin,
            self.pivot.y + dx * sin + dy * cos,
        )
    }
}

/// Decorative or informational shape; never bookable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendElement {
    /// World-space bounds (after rotation).
    pub bounds: Bounds,
    /// Untransformed outline.
    pub shape: ShapeGeometry,
    /// Optional rotation transform.
    pub rotation: Option<Rotation>,
    /// Fill color.
    pub fill: Option<String>,
    /// Stroke color.
    pub stroke: Option<String>,
}

/// A named collection of seats sharing a price list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatGroup {
    /// Group id, matched against [`Seat::group_id`].
    pub id: GroupId,
    /// Display name; also identifies the wheelchair group.
    pub name: String,
    /// Fill color for unblocked seats of this group.
    pub color: Option<String>,
    /// Whether `reserved_seats` currently count as blocked.
    #[serde(default)]
    pub reservation_active: bool,
    /// Seats held by this group's reservation.
    #[serde(default)]
    pub reserved_seats: BTreeSet<SeatId>,
}

impl SeatGroup {
    /// Create a group without reservations.
    #[must_use]
    pub fn new(id: impl Into<GroupId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
            reservation_active: false,
            reserved_seats: BTreeSet::new(),
        }
    }

    /// Set the fill color.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Attach an active reservation.
    #[must_use]
    pub fn with_reservation<I, S>(mut self, seats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SeatId>,
    {
        self.reservation_active = true;
        self.reserved_seats = seats.into_iter().map(Into::into).collect();
        self
    }

    /// Reserved seats that currently count as blocked.
    pub fn active_reservations(&self) -> impl Iterator<Item = &SeatId> {
        self.reserved_seats
            .iter()
            .filter(move |_| self.reservation_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_id_natural_order() {
        let mut ids: Vec<SeatId> = ["A-10", "A-2", "A-1", "B-1", "A-02"]
            .into_iter()
            .map(SeatId::from)
            .collect();
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(SeatId::as_str).collect();
        assert_eq!(sorted, ["A-1", "A-2", "A-02", "A-10", "B-1"]);
    }

    #[test]
    fn test_seat_id_order_consistent_with_eq() {
        assert_eq!(SeatId::from("s7").cmp(&SeatId::from("s7")), Ordering::Equal);
        assert_ne!(SeatId::from("s07").cmp(&SeatId::from("s7")), Ordering::Equal);
    }

    #[test]
    fn test_seat_type_parsing() {
        assert_eq!("wheelchair-side".parse::<SeatType>(), Ok(SeatType::WheelchairSide));
        assert_eq!("".parse::<SeatType>(), Ok(SeatType::Normal));
        assert!("throne".parse::<SeatType>().is_err());
        assert!(SeatType::WheelchairAccompaniment.is_wheelchair_family());
        assert!(!SeatType::Bestplatz.is_wheelchair_family());
    }

    #[test]
    fn test_row_ref_from_str() {
        assert_eq!(RowRef::from("12"), RowRef::Number(12));
        assert_eq!(RowRef::from("Loge L"), RowRef::Named("Loge L".to_string()));
    }

    #[test]
    fn test_inactive_reservation_is_ignored() {
        let mut group = SeatGroup::new("g1", "Parkett").with_reservation(["a", "b"]);
        assert_eq!(group.active_reservations().count(), 2);
        group.reservation_active = false;
        assert_eq!(group.active_reservations().count(), 0);
    }

    #[test]
    fn test_rotation_quarter_turn() {
        let rot = Rotation {
            degrees: 90.0,
            pivot: Point::new(0.0, 0.0),
        };
        let p = rot.apply(Point::new(1.0, 0.0));
        assert!(p.x.abs() < 1e-5);
        assert!((p.y - 1.0).abs() < 1e-5);
    }
}
