//! Parsing of the enriched seat map document.
//!
//! The document is an SVG whose seat shapes were stamped offline with
//! booking attributes:
//!
//! ```text
//! <g data-group="parkett" fill="#4e79a7">
//!   <rect data-seat-id="P-1-41" data-type="normal"
//!         data-row="1" data-row-position="41"
//!         x="410" y="100" width="9" height="9"/>
//!   <path data-seat-id="R-1" data-type="wheelchair" data-row="3"
//!         data-row-position="2" data-linked-seat-id="R-2" d="..."/>
//! </g>
//! <g data-legend="stage"><rect .../></g>
//! ```
//!
//! Shapes under a `data-legend` marker become [`LegendElement`]s; other
//! shapes without a seat id are ignored.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Bounds, Point};
use crate::path::{parse_path, path_bounds};
use crate::seat::{GroupId, LegendElement, Rotation, RowRef, Seat, SeatId, SeatType, ShapeGeometry};
use crate::SeatMapResult;

/// Identity of a loaded document.
///
/// Every load gets a fresh id, so async responses issued against an
/// earlier document can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new unique document id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parsed seats and legends with an id index.
#[derive(Debug, Clone)]
pub struct SeatMapDocument {
    id: DocumentId,
    seats: Vec<Seat>,
    legends: Vec<LegendElement>,
    index: HashMap<SeatId, usize>,
}

impl SeatMapDocument {
    /// Parse an enriched SVG document.
    ///
    /// Unsupported shapes are skipped with a warning. A document without
    /// any eligible shape parses to an empty map.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not well-formed XML.
    pub fn parse(svg: &str) -> SeatMapResult<Self> {
        let xml = roxmltree::Document::parse(svg)?;
        let mut seats = Vec::new();
        let mut legends = Vec::new();

        for node in xml.descendants().filter(roxmltree::Node::is_element) {
            let in_legend = node
                .ancestors()
                .any(|n| n.attribute("data-legend").is_some());

            if in_legend {
                if let Some(legend) = parse_legend(node) {
                    legends.push(legend);
                }
                continue;
            }

            let Some(id) = seat_id_of(node) else {
                continue;
            };
            if let Some(seat) = parse_seat(node, id) {
                seats.push(seat);
            }
        }

        let document = Self::from_parts(seats, legends);
        tracing::info!(
            "Parsed seat map {}: {} seats, {} legend shapes",
            document.id,
            document.seats.len(),
            document.legends.len()
        );
        Ok(document)
    }

    /// Build a document from already-parsed records.
    ///
    /// Enforces the model invariants: duplicate ids keep the first seat,
    /// links to unknown seats are dropped.
    #[must_use]
    pub fn from_parts(seats: Vec<Seat>, legends: Vec<LegendElement>) -> Self {
        let mut unique = Vec::with_capacity(seats.len());
        let mut index = HashMap::with_capacity(seats.len());
        for seat in seats {
            if index.contains_key(&seat.id) {
                tracing::warn!("Duplicate seat id {}, keeping the first", seat.id);
                continue;
            }
            index.insert(seat.id.clone(), unique.len());
            unique.push(seat);
        }

        for seat in &mut unique {
            if let Some(linked) = &seat.linked_seat_id {
                if !index.contains_key(linked) {
                    tracing::warn!("Seat {} links to unknown seat {linked}, dropping link", seat.id);
                    seat.linked_seat_id = None;
                }
            }
        }

        let mut positions = HashSet::new();
        for seat in &unique {
            if !positions.insert((&seat.row, seat.row_position)) {
                tracing::warn!(
                    "Seat {} repeats row {} position {}",
                    seat.id,
                    seat.row,
                    seat.row_position
                );
            }
        }

        Self {
            id: DocumentId::new(),
            seats: unique,
            legends,
            index,
        }
    }

    /// Identity of this load.
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// All seats in document order.
    #[must_use]
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// All legend shapes in document order.
    #[must_use]
    pub fn legends(&self) -> &[LegendElement] {
        &self.legends
    }

    /// Look up a seat by id.
    #[must_use]
    pub fn seat(&self, id: &SeatId) -> Option<&Seat> {
        self.index.get(id).map(|&i| &self.seats[i])
    }

    /// Whether a seat id exists.
    #[must_use]
    pub fn contains(&self, id: &SeatId) -> bool {
        self.index.contains_key(id)
    }

    /// Seats owned by a group, in document order.
    pub fn seats_in_group<'a>(&'a self, group: &'a GroupId) -> impl Iterator<Item = &'a Seat> {
        self.seats
            .iter()
            .filter(move |s| s.group_id.as_ref() == Some(group))
    }

    /// Number of seats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// Whether the document has no seats.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Union of every seat and legend box; `None` for an empty document.
    #[must_use]
    pub fn world_bounds(&self) -> Option<Bounds> {
        self.seats
            .iter()
            .map(|s| s.bounds)
            .chain(self.legends.iter().map(|l| l.bounds))
            .reduce(|acc, b| acc.union(&b))
    }
}

fn seat_id_of(node: roxmltree::Node<'_, '_>) -> Option<SeatId> {
    if let Some(id) = node.attribute("data-seat-id") {
        return Some(SeatId::new(id));
    }
    // Older exports put the seat id into the plain `id` attribute.
    if node.attribute("data-row").is_some() {
        return node.attribute("id").map(SeatId::new);
    }
    None
}

fn inherited<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.ancestors()
        .find_map(|n| n.attribute(name))
        .filter(|v| !v.eq_ignore_ascii_case("none"))
}

fn parse_seat(node: roxmltree::Node<'_, '_>, id: SeatId) -> Option<Seat> {
    let Some((shape, bounds)) = parse_shape(node) else {
        tracing::warn!(
            "Seat {id} uses unsupported shape <{}>, skipping",
            node.tag_name().name()
        );
        return None;
    };

    let Some(row) = node.attribute("data-row").map(RowRef::from) else {
        tracing::warn!("Seat {id} has no row, skipping");
        return None;
    };
    let Some(row_position) = node
        .attribute("data-row-position")
        .and_then(|p| p.trim().parse::<u32>().ok())
    else {
        tracing::warn!("Seat {id} has no valid row position, skipping");
        return None;
    };

    let seat_type = node
        .attribute("data-type")
        .map_or(Ok(SeatType::Normal), |t| t.parse::<SeatType>())
        .unwrap_or_else(|e| {
            tracing::warn!("Seat {id}: {e}, treating as normal");
            SeatType::Normal
        });

    Some(Seat {
        seat_type,
        row,
        row_position,
        linked_seat_id: node
            .attribute("data-linked-seat-id")
            .filter(|l| !l.trim().is_empty())
            .map(SeatId::new),
        bounds,
        shape,
        group_id: inherited(node, "data-group").map(GroupId::new),
        color: inherited(node, "fill").map(str::to_string),
        id,
    })
}

fn parse_legend(node: roxmltree::Node<'_, '_>) -> Option<LegendElement> {
    let tag = node.tag_name().name();
    let Some((shape, raw_bounds)) = parse_shape(node) else {
        if !matches!(tag, "g" | "title" | "desc" | "defs") {
            tracing::debug!("Skipping unsupported legend shape <{tag}>");
        }
        return None;
    };

    let rotation = node.attribute("transform").and_then(parse_rotation);
    let bounds = match rotation {
        Some(rot) => {
            let corners = [
                Point::new(raw_bounds.min_x, raw_bounds.min_y),
                Point::new(raw_bounds.max_x, raw_bounds.min_y),
                Point::new(raw_bounds.max_x, raw_bounds.max_y),
                Point::new(raw_bounds.min_x, raw_bounds.max_y),
            ];
            Bounds::from_points(corners.map(|c| rot.apply(c))).unwrap_or(raw_bounds)
        }
        None => raw_bounds,
    };

    Some(LegendElement {
        bounds,
        shape,
        rotation,
        fill: inherited(node, "fill").map(str::to_string),
        stroke: inherited(node, "stroke").map(str::to_string),
    })
}

fn parse_shape(node: roxmltree::Node<'_, '_>) -> Option<(ShapeGeometry, Bounds)> {
    match node.tag_name().name() {
        "rect" => {
            let num = |name: &str| {
                node.attribute(name)
                    .and_then(|v| v.trim().trim_end_matches("px").parse::<f32>().ok())
            };
            let bounds = Bounds::from_xywh(
                num("x").unwrap_or(0.0),
                num("y").unwrap_or(0.0),
                num("width").unwrap_or(f32::NAN),
                num("height").unwrap_or(f32::NAN),
            );
            let bounds = if bounds.is_finite() {
                bounds
            } else {
                tracing::debug!("rect without finite size, using fallback bounds");
                Bounds::FALLBACK
            };
            let corner_radius = num("rx").or_else(|| num("ry")).unwrap_or(0.0).max(0.0);
            Some((
                ShapeGeometry::Rect {
                    bounds,
                    corner_radius,
                },
                bounds,
            ))
        }
        "path" => {
            let segments = parse_path(node.attribute("d").unwrap_or_default());
            let bounds = path_bounds(&segments).unwrap_or_else(|| {
                tracing::debug!("path without finite extent, using fallback bounds");
                Bounds::FALLBACK
            });
            Some((ShapeGeometry::Path { segments }, bounds))
        }
        _ => None,
    }
}

/// Parse `rotate(a)` or `rotate(a cx cy)`; other transforms are ignored.
fn parse_rotation(transform: &str) -> Option<Rotation> {
    let start = transform.find("rotate(")? + "rotate(".len();
    let end = start + transform[start..].find(')')?;
    let args: Vec<f32> = transform[start..end]
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    match args.as_slice() {
        [deg] => Some(Rotation {
            degrees: *deg,
            pivot: Point::default(),
        }),
        [deg, cx, cy] => Some(Rotation {
            degrees: *deg,
            pivot: Point::new(*cx, *cy),
        }),
        _ => {
            tracing::debug!("Ignoring malformed rotation {transform:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg">
        <g data-group="parkett" fill="#4e79a7">
          <rect data-seat-id="P-1" data-type="normal" data-row="1" data-row-position="1"
                x="0" y="0" width="10" height="10"/>
          <rect data-seat-id="P-2" data-row="1" data-row-position="2"
                x="12" y="0" width="10" height="10" fill="#ff0000"/>
          <path data-seat-id="W-1" data-type="wheelchair" data-row="3" data-row-position="1"
                data-linked-seat-id="P-1" d="M0 40 C0 30 10 30 10 40 Z"/>
          <circle data-seat-id="C-1" data-row="1" data-row-position="9" r="4"/>
        </g>
        <g data-legend="stage" fill="#333">
          <rect x="0" y="100" width="40" height="10"/>
          <text x="0" y="0">Stage</text>
        </g>
        <rect x="500" y="500" width="5" height="5"/>
      </svg>"##;

    #[test]
    fn test_parse_seats_and_legends() {
        let doc = SeatMapDocument::parse(SVG).expect("valid document");
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.legends().len(), 1);

        let p1 = doc.seat(&SeatId::from("P-1")).expect("P-1");
        assert_eq!(p1.row, RowRef::Number(1));
        assert_eq!(p1.group_id, Some(GroupId::from("parkett")));
        assert_eq!(p1.color.as_deref(), Some("#4e79a7"));
        assert_eq!(p1.bounds, Bounds::new(0.0, 0.0, 10.0, 10.0));

        let p2 = doc.seat(&SeatId::from("P-2")).expect("P-2");
        assert_eq!(p2.color.as_deref(), Some("#ff0000"));

        let w1 = doc.seat(&SeatId::from("W-1")).expect("W-1");
        assert_eq!(w1.seat_type, SeatType::Wheelchair);
        assert_eq!(w1.linked_seat_id, Some(SeatId::from("P-1")));
        assert_eq!(w1.bounds, Bounds::new(0.0, 30.0, 10.0, 40.0));
    }

    #[test]
    fn test_unsupported_shape_is_skipped() {
        let doc = SeatMapDocument::parse(SVG).expect("valid document");
        assert!(!doc.contains(&SeatId::from("C-1")));
    }

    #[test]
    fn test_world_bounds_cover_legends() {
        let doc = SeatMapDocument::parse(SVG).expect("valid document");
        let world = doc.world_bounds().expect("non-empty");
        assert_eq!(world, Bounds::new(0.0, 0.0, 40.0, 110.0));
    }

    #[test]
    fn test_empty_document_is_valid() {
        let doc = SeatMapDocument::parse("<svg/>").expect("valid");
        assert!(doc.is_empty());
        assert!(doc.world_bounds().is_none());
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(SeatMapDocument::parse("<svg><rect></svg>").is_err());
    }

    #[test]
    fn test_degenerate_path_falls_back_to_default_box() {
        let doc = SeatMapDocument::parse(
            r#"<svg><path data-seat-id="X" data-row="1" data-row-position="1" d="Z"/></svg>"#,
        )
        .expect("valid");
        assert_eq!(doc.seats()[0].bounds, Bounds::FALLBACK);
    }

    #[test]
    fn test_dangling_link_and_duplicates() {
        let svg = r#"<svg>
            <rect data-seat-id="A" data-row="1" data-row-position="1" data-linked-seat-id="ghost"
                  width="1" height="1"/>
            <rect data-seat-id="A" data-row="1" data-row-position="2" width="1" height="1"/>
        </svg>"#;
        let doc = SeatMapDocument::parse(svg).expect("valid");
        assert_eq!(doc.len(), 1);
        assert!(doc.seats()[0].linked_seat_id.is_none());
        assert_eq!(doc.seats()[0].row_position, 1);
    }

    #[test]
    fn test_legend_rotation_expands_bounds() {
        let svg = r#"<svg><rect data-legend="door" x="0" y="0" width="10" height="2"
                     transform="rotate(90 0 0)"/></svg>"#;
        let doc = SeatMapDocument::parse(svg).expect("valid");
        let legend = &doc.legends()[0];
        assert!(legend.rotation.is_some());
        assert!((legend.bounds.height() - 10.0).abs() < 1e-4);
        assert!((legend.bounds.width() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_plain_id_attribute_fallback() {
        let svg = r#"<svg><rect id="legacy-7" data-row="2" data-row-position="7"
                     width="1" height="1"/></svg>"#;
        let doc = SeatMapDocument::parse(svg).expect("valid");
        assert!(doc.contains(&SeatId::from("legacy-7")));
    }
}
