//! Constraint propagation: from explicitly blocked seats to every seat
//! that must be treated as unavailable.
//!
//! ```text
//!  base = caller-blocked ∪ active group reservations
//!    │
//!    ├─ wheelchair adjacency: rows ±1, ±2 at the same position,
//!    │  same wheelchair segment
//!    ├─ wheelchair cap: cap reached → every free wheelchair seat
//!    └─ linkage closure: anchor unavailable → dependent unavailable
//!    ▼
//!  effective = base ∪ propagated
//! ```
//!
//! The result is a pure function of set membership; iteration order of
//! the inputs never changes the output.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::document::SeatMapDocument;
use crate::seat::{SeatGroup, SeatId};

/// Inclusive range of row numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    /// First row in the range.
    pub first: u32,
    /// Last row in the range.
    pub last: u32,
}

impl RowRange {
    /// Create a range.
    #[must_use]
    pub const fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    /// Whether the row lies inside the range.
    #[must_use]
    pub const fn contains(&self, row: u32) -> bool {
        row >= self.first && row <= self.last
    }
}

/// Venue-specific blocking constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockingRules {
    /// Wheelchair segments; adjacency never crosses a segment boundary.
    pub wheelchair_segments: Vec<RowRange>,
    /// How many rows in front and behind a committed wheelchair seat are withheld.
    pub adjacency_rows: u32,
    /// Committed wheelchair seats after which all others are withheld.
    pub wheelchair_cap: usize,
}

impl Default for BlockingRules {
    fn default() -> Self {
        Self {
            wheelchair_segments: vec![
                RowRange::new(1, 10),
                RowRange::new(11, 25),
                RowRange::new(26, 40),
            ],
            adjacency_rows: 2,
            wheelchair_cap: 15,
        }
    }
}

impl BlockingRules {
    fn segment_of(&self, row: u32) -> Option<usize> {
        self.wheelchair_segments
            .iter()
            .position(|range| range.contains(row))
    }
}

/// Everything the propagator looks at.
#[derive(Debug, Clone, Copy)]
pub struct PropagationInput<'a> {
    /// The loaded seats.
    pub document: &'a SeatMapDocument,
    /// Caller-supplied blocked ids.
    pub base_blocked: &'a BTreeSet<SeatId>,
    /// Seat groups; their reservations count while active.
    pub groups: &'a [SeatGroup],
    /// The user's current selection.
    pub selected: &'a BTreeSet<SeatId>,
}

/// Derived set of unavailable seats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockedSet {
    base: BTreeSet<SeatId>,
    propagated: BTreeSet<SeatId>,
}

impl BlockedSet {
    /// Explicitly blocked and reserved seats.
    #[must_use]
    pub fn base(&self) -> &BTreeSet<SeatId> {
        &self.base
    }

    /// Seats blocked only by a rule; disjoint from [`Self::base`].
    #[must_use]
    pub fn propagated(&self) -> &BTreeSet<SeatId> {
        &self.propagated
    }

    /// Whether a seat is unavailable.
    #[must_use]
    pub fn contains(&self, id: &SeatId) -> bool {
        self.base.contains(id) || self.propagated.contains(id)
    }

    /// Number of unavailable seats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.base.len() + self.propagated.len()
    }

    /// Whether nothing is blocked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.propagated.is_empty()
    }

    /// All unavailable seats in seat-id order.
    pub fn iter(&self) -> impl Iterator<Item = &SeatId> {
        self.base.union(&self.propagated)
    }

    /// The effective set as one owned set.
    #[must_use]
    pub fn to_set(&self) -> BTreeSet<SeatId> {
        self.iter().cloned().collect()
    }

    /// Seats blocked here but not in `previous`.
    #[must_use]
    pub fn newly_blocked(&self, previous: &BlockedSet) -> Vec<SeatId> {
        self.iter()
            .filter(|id| !previous.contains(id))
            .cloned()
            .collect()
    }
}

/// Applies [`BlockingRules`] to produce a [`BlockedSet`].
#[derive(Debug, Clone, Default)]
pub struct ConstraintPropagator {
    rules: BlockingRules,
}

impl ConstraintPropagator {
    /// Create a propagator.
    #[must_use]
    pub fn new(rules: BlockingRules) -> Self {
        Self { rules }
    }

    /// The active rules.
    #[must_use]
    pub fn rules(&self) -> &BlockingRules {
        &self.rules
    }

    /// Compute the effective blocked set.
    #[must_use]
    pub fn propagate(&self, input: &PropagationInput<'_>) -> BlockedSet {
        let mut base: BTreeSet<SeatId> = input.base_blocked.clone();
        for group in input.groups {
            base.extend(group.active_reservations().cloned());
        }

        let mut auto = BTreeSet::new();
        let is_free = |id: &SeatId, auto: &BTreeSet<SeatId>| {
            !base.contains(id) && !input.selected.contains(id) && !auto.contains(id)
        };

        let wheelchair: Vec<_> = input
            .document
            .seats()
            .iter()
            .filter(|s| s.seat_type.is_wheelchair_family())
            .collect();
        let committed: Vec<_> = wheelchair
            .iter()
            .filter(|s| base.contains(&s.id) || input.selected.contains(&s.id))
            .collect();

        // Adjacency: same position, nearby rows, same segment.
        let by_position: HashMap<(u32, u32), &SeatId> = wheelchair
            .iter()
            .filter_map(|s| s.row_number().map(|r| ((r, s.row_position), &s.id)))
            .collect();
        let depth = self.rules.adjacency_rows;
        for seat in &committed {
            let Some(row) = seat.row_number() else {
                continue;
            };
            let Some(segment) = self.rules.segment_of(row) else {
                continue;
            };
            let neighbours = (1..=depth)
                .flat_map(|d| [row.checked_sub(d), row.checked_add(d)])
                .flatten()
                .filter(|&r| self.rules.segment_of(r) == Some(segment));
            for neighbour_row in neighbours {
                if let Some(&id) = by_position.get(&(neighbour_row, seat.row_position)) {
                    if is_free(id, &auto) {
                        tracing::trace!("{id} withheld next to wheelchair seat {}", seat.id);
                        auto.insert(id.clone());
                    }
                }
            }
        }

        // Venue-wide capacity.
        if committed.len() >= self.rules.wheelchair_cap {
            tracing::debug!(
                "Wheelchair cap reached ({} >= {}), withholding the rest",
                committed.len(),
                self.rules.wheelchair_cap
            );
            for seat in &wheelchair {
                if is_free(&seat.id, &auto) {
                    auto.insert(seat.id.clone());
                }
            }
        }

        // Linkage, closed over everything that is unavailable so far.
        loop {
            let newly: Vec<SeatId> = input
                .document
                .seats()
                .iter()
                .filter(|s| !base.contains(&s.id) && !auto.contains(&s.id))
                .filter(|s| {
                    s.linked_seat_id
                        .as_ref()
                        .is_some_and(|anchor| base.contains(anchor) || auto.contains(anchor))
                })
                .map(|s| s.id.clone())
                .collect();
            if newly.is_empty() {
                break;
            }
            auto.extend(newly);
        }

        tracing::debug!(
            "Blocked set: {} base, {} propagated",
            base.len(),
            auto.len()
        );
        BlockedSet {
            base,
            propagated: auto,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;
    use crate::seat::{RowRef, Seat, SeatType};

    fn seat(id: &str, row: u32, pos: u32) -> Seat {
        #[allow(clippy::cast_precision_loss)]
        let bounds = Bounds::from_xywh(pos as f32 * 10.0, row as f32 * 10.0, 8.0, 8.0);
        Seat::new(id, RowRef::Number(row), pos, bounds)
    }

    fn wheelchair_column(rows: std::ops::RangeInclusive<u32>) -> Vec<Seat> {
        rows.map(|r| seat(&format!("W{r}"), r, 1).with_type(SeatType::Wheelchair))
            .collect()
    }

    fn ids(list: &[&str]) -> BTreeSet<SeatId> {
        list.iter().map(|s| SeatId::from(*s)).collect()
    }

    fn run(
        doc: &SeatMapDocument,
        base: &BTreeSet<SeatId>,
        selected: &BTreeSet<SeatId>,
    ) -> BlockedSet {
        ConstraintPropagator::default().propagate(&PropagationInput {
            document: doc,
            base_blocked: base,
            groups: &[],
            selected,
        })
    }

    #[test]
    fn test_linked_seat_follows_anchor() {
        let doc = SeatMapDocument::from_parts(
            vec![seat("A", 1, 1).with_link("B"), seat("B", 1, 2)],
            vec![],
        );
        let groups = [SeatGroup::new("g", "Parkett").with_reservation(["B"])];
        let blocked = ConstraintPropagator::default().propagate(&PropagationInput {
            document: &doc,
            base_blocked: &BTreeSet::new(),
            groups: &groups,
            selected: &BTreeSet::new(),
        });
        assert!(blocked.base().contains(&SeatId::from("B")));
        assert!(blocked.propagated().contains(&SeatId::from("A")));
    }

    #[test]
    fn test_linkage_is_one_directional() {
        let doc = SeatMapDocument::from_parts(
            vec![seat("A", 1, 1).with_link("B"), seat("B", 1, 2)],
            vec![],
        );
        let blocked = run(&doc, &ids(&["A"]), &BTreeSet::new());
        assert!(!blocked.contains(&SeatId::from("B")));
    }

    #[test]
    fn test_adjacency_stays_inside_segment() {
        // Segment 1 is rows 1-10, segment 2 starts at row 11.
        let doc = SeatMapDocument::from_parts(wheelchair_column(7..=13), vec![]);
        let blocked = run(&doc, &ids(&["W10"]), &BTreeSet::new());
        let expected = ids(&["W8", "W9"]);
        assert_eq!(blocked.propagated(), &expected);
    }

    #[test]
    fn test_selected_wheelchair_withholds_neighbours() {
        let doc = SeatMapDocument::from_parts(wheelchair_column(1..=6), vec![]);
        let blocked = run(&doc, &BTreeSet::new(), &ids(&["W3"]));
        assert_eq!(blocked.propagated(), &ids(&["W1", "W2", "W4", "W5"]));
        assert!(!blocked.contains(&SeatId::from("W3")));
    }

    #[test]
    fn test_cap_blocks_remaining_wheelchair_seats() {
        let mut seats = Vec::new();
        for i in 1..=25 {
            // One seat per row position so adjacency never applies.
            seats.push(seat(&format!("W{i}"), 1, i).with_type(SeatType::Wheelchair));
        }
        seats.push(seat("N1", 2, 1));
        let doc = SeatMapDocument::from_parts(seats, vec![]);
        let base: BTreeSet<SeatId> = (1..=15).map(|i| SeatId::new(format!("W{i}"))).collect();

        let blocked = run(&doc, &base, &BTreeSet::new());
        assert_eq!(blocked.propagated().len(), 10);
        assert!(!blocked.contains(&SeatId::from("N1")));

        let below_cap: BTreeSet<SeatId> = base.iter().take(14).cloned().collect();
        let blocked = run(&doc, &below_cap, &BTreeSet::new());
        assert!(blocked.propagated().is_empty());
    }

    #[test]
    fn test_propagation_is_idempotent() {
        let mut seats = wheelchair_column(1..=12);
        seats.push(
            seat("C1", 4, 2)
                .with_type(SeatType::WheelchairAccompaniment)
                .with_link("W4"),
        );
        let doc = SeatMapDocument::from_parts(seats, vec![]);
        let base = ids(&["W4", "W11"]);
        let first = run(&doc, &base, &ids(&["W1"]));
        let second = run(&doc, &base, &ids(&["W1"]));
        assert_eq!(first, second);
        assert!(first.contains(&SeatId::from("C1")));
    }

    #[test]
    fn test_linkage_closes_over_rule_blocked_anchor() {
        let mut seats = wheelchair_column(1..=3);
        seats.push(seat("C2", 2, 2).with_link("W2"));
        let doc = SeatMapDocument::from_parts(seats, vec![]);
        // W1 committed -> W2 withheld by adjacency -> C2 follows its anchor.
        let blocked = run(&doc, &ids(&["W1"]), &BTreeSet::new());
        assert!(blocked.propagated().contains(&SeatId::from("W2")));
        assert!(blocked.propagated().contains(&SeatId::from("C2")));
    }

    #[test]
    fn test_newly_blocked_diff() {
        let doc = SeatMapDocument::from_parts(wheelchair_column(1..=3), vec![]);
        let before = run(&doc, &BTreeSet::new(), &BTreeSet::new());
        let after = run(&doc, &ids(&["W1"]), &BTreeSet::new());
        assert_eq!(
            after.newly_blocked(&before),
            vec![SeatId::from("W1"), SeatId::from("W2"), SeatId::from("W3")]
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        const ROWS: u32 = 14;
        const COLUMNS: u32 = 2;
        const COMPANIONS: usize = 6;
        const SEATS: usize = (ROWS * COLUMNS) as usize + COMPANIONS;

        /// Wheelchair seats in rows 1-14 (crossing the first segment
        /// boundary) plus companions linked to random earlier seats.
        fn venue(links: &[usize]) -> SeatMapDocument {
            let mut seats: Vec<Seat> = (1..=ROWS)
                .flat_map(|r| {
                    (1..=COLUMNS)
                        .map(move |p| seat(&format!("W{r}-{p}"), r, p).with_type(SeatType::Wheelchair))
                })
                .collect();
            for (n, pick) in (1u32..).zip(links) {
                let anchor = seats[pick % seats.len()].id.clone();
                seats.push(seat(&format!("C{n}"), 50, n).with_link(anchor));
            }
            SeatMapDocument::from_parts(seats, vec![])
        }

        fn pick(doc: &SeatMapDocument, mask: &[bool]) -> BTreeSet<SeatId> {
            doc.seats()
                .iter()
                .zip(mask)
                .filter(|&(_, &on)| on)
                .map(|(s, _)| s.id.clone())
                .collect()
        }

        fn arb_input() -> impl Strategy<Value = (Vec<usize>, Vec<bool>, Vec<bool>, usize)> {
            (
                prop::collection::vec(0usize..1000, COMPANIONS),
                prop::collection::vec(prop::bool::weighted(0.2), SEATS),
                prop::collection::vec(prop::bool::weighted(0.1), SEATS),
                1usize..20,
            )
        }

        proptest! {
            #[test]
            fn prop_propagation_invariants((links, base_mask, selected_mask, cap) in arb_input()) {
                let doc = venue(&links);
                let base = pick(&doc, &base_mask);
                let selected: BTreeSet<SeatId> = pick(&doc, &selected_mask)
                    .difference(&base)
                    .cloned()
                    .collect();
                let propagator = ConstraintPropagator::new(BlockingRules {
                    wheelchair_cap: cap,
                    ..BlockingRules::default()
                });
                let input = PropagationInput {
                    document: &doc,
                    base_blocked: &base,
                    groups: &[],
                    selected: &selected,
                };
                let blocked = propagator.propagate(&input);

                // Identical inputs, identical output, in any document order.
                prop_assert_eq!(&propagator.propagate(&input), &blocked);
                let mut reversed = doc.seats().to_vec();
                reversed.reverse();
                let reversed = SeatMapDocument::from_parts(reversed, vec![]);
                prop_assert_eq!(
                    &propagator.propagate(&PropagationInput { document: &reversed, ..input }),
                    &blocked
                );

                for seat in doc.seats() {
                    if let Some(anchor) = &seat.linked_seat_id {
                        if blocked.contains(anchor) {
                            prop_assert!(blocked.contains(&seat.id), "{} free while {} is blocked", seat.id, anchor);
                        }
                    }
                }

                let unavailable = |id: &SeatId| blocked.contains(id) || selected.contains(id);
                let wheelchair: Vec<&Seat> = doc
                    .seats()
                    .iter()
                    .filter(|s| s.seat_type.is_wheelchair_family())
                    .collect();
                let committed: Vec<&&Seat> = wheelchair
                    .iter()
                    .filter(|s| base.contains(&s.id) || selected.contains(&s.id))
                    .collect();
                if committed.len() >= cap {
                    prop_assert!(wheelchair.iter().all(|s| unavailable(&s.id)));
                }

                let rules = propagator.rules();
                for seat in &committed {
                    let row = seat.row_number().expect("numbered row");
                    for other in &wheelchair {
                        let Some(other_row) = other.row_number() else { continue };
                        let near = other_row != row
                            && other_row.abs_diff(row) <= rules.adjacency_rows
                            && other.row_position == seat.row_position
                            && rules.segment_of(other_row).is_some()
                            && rules.segment_of(other_row) == rules.segment_of(row);
                        if near {
                            prop_assert!(unavailable(&other.id), "{} next to {} is free", other.id, seat.id);
                        }
                    }
                }
            }
        }
    }
}
