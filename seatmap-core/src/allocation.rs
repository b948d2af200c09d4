//! Best-seat allocation inside the segmented row layout.
//!
//! [`SeatAllocator::allocate`] tries, in order:
//!
//! 1. a contiguous block inside one aisle segment, searched outward
//!    from the aisle, picking the block closest to the row centre;
//! 2. a block spanning the aisle, only for rows where neither segment
//!    is large enough on its own;
//! 3. the first available seats in seat-id order.
//!
//! Rows are tried front to back; the first row with a hit wins. A
//! request is never partially served.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::document::SeatMapDocument;
use crate::rows::{RowConfig, RowLayout};
use crate::seat::{GroupId, Seat, SeatGroup, SeatId, SeatType};

/// Allocation constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AllocationConfig {
    /// Case-insensitive name fragments that identify the wheelchair group.
    pub wheelchair_group_markers: Vec<String>,
    /// Wheelchair-family seats that may be unavailable before free mode stops.
    pub wheelchair_free_mode_cap: usize,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            wheelchair_group_markers: vec!["rollstuhl".to_string(), "wheelchair".to_string()],
            wheelchair_free_mode_cap: 25,
        }
    }
}

/// How good an allocation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationQuality {
    /// All seats adjacent inside one segment.
    Contiguous,
    /// Adjacent seats on both sides of the aisle.
    CrossAisle,
    /// Seats taken individually.
    Scattered,
    /// Nothing allocated.
    Failed,
}

/// Result of an allocation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    /// Whether seats were allocated.
    pub success: bool,
    /// Allocated seats, in row-position order where applicable.
    pub allocated_seat_ids: Vec<SeatId>,
    /// Human-readable explanation.
    pub message: String,
    /// Quality tier of the result.
    pub quality: AllocationQuality,
}

impl Allocation {
    fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::debug!("Allocation failed: {message}");
        Self {
            success: false,
            allocated_seat_ids: Vec::new(),
            message,
            quality: AllocationQuality::Failed,
        }
    }

    fn allocated(ids: Vec<SeatId>, quality: AllocationQuality, message: String) -> Self {
        tracing::debug!("Allocated {} seats ({quality:?}): {message}", ids.len());
        Self {
            success: true,
            allocated_seat_ids: ids,
            message,
            quality,
        }
    }
}

/// One line of a booking: a quantity of seats in one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    /// Group to allocate from.
    pub group_id: GroupId,
    /// Seats wanted.
    pub quantity: u32,
}

/// Available seats of one numbered row, keyed by position.
type RowSeats<'a> = HashMap<u32, &'a Seat>;

/// Allocates seats for a group against a blocked set.
#[derive(Debug, Clone, Copy)]
pub struct SeatAllocator<'a> {
    document: &'a SeatMapDocument,
    layout: &'a RowLayout,
    config: &'a AllocationConfig,
}

impl<'a> SeatAllocator<'a> {
    /// Create an allocator over a loaded document.
    #[must_use]
    pub fn new(
        document: &'a SeatMapDocument,
        layout: &'a RowLayout,
        config: &'a AllocationConfig,
    ) -> Self {
        Self {
            document,
            layout,
            config,
        }
    }

    /// Allocate `quantity` best-fit seats of `group`.
    ///
    /// The group's active reservations count as blocked in addition to
    /// `blocked`. The returned ids are always group seats and never blocked.
    #[must_use]
    pub fn allocate(
        &self,
        group: &SeatGroup,
        quantity: u32,
        blocked: &BTreeSet<SeatId>,
    ) -> Allocation {
        if quantity == 0 {
            return Allocation::failed("Requested quantity must be positive");
        }

        let available: Vec<&Seat> = self
            .document
            .seats_in_group(&group.id)
            .filter(|s| !is_unavailable(group, blocked, &s.id))
            .collect();
        if available.len() < quantity as usize {
            return Allocation::failed(format!(
                "Only {} seats available in {}, {quantity} requested",
                available.len(),
                group.name
            ));
        }

        let mut rows: BTreeMap<u32, RowSeats<'_>> = BTreeMap::new();
        for seat in &available {
            if let Some(row) = seat.row_number() {
                rows.entry(row).or_default().insert(seat.row_position, *seat);
            }
        }

        for (&row, seats) in &rows {
            let config = self.layout.get(row);
            if let Some(positions) = best_block_in_segments(&config, seats, quantity) {
                return Allocation::allocated(
                    ids_at(seats, &positions),
                    AllocationQuality::Contiguous,
                    format!("{quantity} seats together in row {row}"),
                );
            }
        }

        for (&row, seats) in &rows {
            let config = self.layout.get(row);
            if quantity <= config.left_size() || quantity <= config.right_size() {
                continue;
            }
            if let Some(positions) = block_across_aisle(&config, seats, quantity) {
                return Allocation::allocated(
                    ids_at(seats, &positions),
                    AllocationQuality::CrossAisle,
                    format!("{quantity} seats across the aisle in row {row}"),
                );
            }
        }

        let mut fallback = available;
        fallback.sort_by(|a, b| a.id.cmp(&b.id));
        let ids = fallback
            .into_iter()
            .take(quantity as usize)
            .map(|s| s.id.clone())
            .collect();
        Allocation::allocated(
            ids,
            AllocationQuality::Scattered,
            format!("No {quantity} adjacent seats free in {}, seats assigned individually", group.name),
        )
    }

    /// Greedy allocation for unconstrained free seating.
    ///
    /// Ordinary groups take normal seats; the wheelchair group takes
    /// wheelchair-family seats and is capped at
    /// `wheelchair_free_mode_cap - already unavailable`.
    #[must_use]
    pub fn allocate_free_mode(
        &self,
        group: &SeatGroup,
        quantity: u32,
        blocked: &BTreeSet<SeatId>,
    ) -> Allocation {
        if quantity == 0 {
            return Allocation::failed("Requested quantity must be positive");
        }

        let wheelchair_group = self.is_wheelchair_group(group);
        let allowed = |t: SeatType| {
            if wheelchair_group {
                t.is_wheelchair_family()
            } else {
                t == SeatType::Normal
            }
        };

        let (unavailable, mut free): (Vec<&Seat>, Vec<&Seat>) = self
            .document
            .seats_in_group(&group.id)
            .filter(|s| allowed(s.seat_type))
            .partition(|s| is_unavailable(group, blocked, &s.id));

        let wanted = quantity as usize;
        let effective = if wheelchair_group {
            wanted.min(
                self.config
                    .wheelchair_free_mode_cap
                    .saturating_sub(unavailable.len()),
            )
        } else {
            wanted
        };
        if effective == 0 {
            return Allocation::failed(format!(
                "Wheelchair capacity of {} reached",
                self.config.wheelchair_free_mode_cap
            ));
        }
        if free.len() < effective {
            return Allocation::failed(format!(
                "Only {} seats available in {}, {effective} requested",
                free.len(),
                group.name
            ));
        }

        free.sort_by(|a, b| a.id.cmp(&b.id));
        let ids: Vec<SeatId> = free
            .into_iter()
            .take(effective)
            .map(|s| s.id.clone())
            .collect();
        let message = if effective < wanted {
            format!("{effective} of {wanted} seats allocated, wheelchair capacity limit")
        } else {
            format!("{effective} seats allocated in {}", group.name)
        };
        Allocation::allocated(ids, AllocationQuality::Scattered, message)
    }

    /// Allocate several ticket lines in one transaction.
    ///
    /// Each successful line's seats are blocked for the following lines.
    /// Repeated lines for the same group are merged into one result.
    #[must_use]
    pub fn allocate_for_tickets(
        &self,
        requests: &[TicketRequest],
        groups: &[SeatGroup],
        blocked: &BTreeSet<SeatId>,
    ) -> BTreeMap<GroupId, Allocation> {
        let mut blocked = blocked.clone();
        let mut results: BTreeMap<GroupId, Allocation> = BTreeMap::new();

        for request in requests {
            let result = match groups.iter().find(|g| g.id == request.group_id) {
                Some(group) => self.allocate(group, request.quantity, &blocked),
                None => Allocation::failed(format!("Unknown seat group {}", request.group_id)),
            };
            blocked.extend(result.allocated_seat_ids.iter().cloned());

            match results.get_mut(&request.group_id) {
                Some(existing) => {
                    existing.success &= result.success;
                    existing.allocated_seat_ids.extend(result.allocated_seat_ids);
                    existing.message = format!("{}; {}", existing.message, result.message);
                    if !result.success {
                        existing.quality = AllocationQuality::Failed;
                    }
                }
                None => {
                    results.insert(request.group_id.clone(), result);
                }
            }
        }
        results
    }

    /// Whether the group is the wheelchair group, judged by its name.
    #[must_use]
    pub fn is_wheelchair_group(&self, group: &SeatGroup) -> bool {
        let name = group.name.to_lowercase();
        self.config
            .wheelchair_group_markers
            .iter()
            .any(|marker| name.contains(&marker.to_lowercase()))
    }
}

fn is_unavailable(group: &SeatGroup, blocked: &BTreeSet<SeatId>, id: &SeatId) -> bool {
    blocked.contains(id) || (group.reservation_active && group.reserved_seats.contains(id))
}

fn ids_at(seats: &RowSeats<'_>, positions: &[u32]) -> Vec<SeatId> {
    positions
        .iter()
        .filter_map(|p| seats.get(p).map(|s| s.id.clone()))
        .collect()
}

fn all_free(seats: &RowSeats<'_>, first: u32, last: u32) -> bool {
    (first..=last).all(|p| seats.contains_key(&p))
}

fn block_center(first: u32, last: u32) -> f64 {
    f64::from(first + last) / 2.0
}

/// Contiguous block inside one segment, closest to the row centre.
fn best_block_in_segments(config: &RowConfig, seats: &RowSeats<'_>, quantity: u32) -> Option<Vec<u32>> {
    // Left: blocks ending at the aisle first, then shifting outward.
    let left = (quantity..=config.left_segment_end)
        .rev()
        .map(|end| (end + 1 - quantity, end))
        .find(|&(first, last)| all_free(seats, first, last));

    // Right: blocks starting at the aisle first, then shifting outward.
    let right = if quantity <= config.right_size() {
        (config.right_segment_start..=config.total_seats + 1 - quantity)
            .map(|start| (start, start + quantity - 1))
            .find(|&(first, last)| all_free(seats, first, last))
    } else {
        None
    };

    let center = config.center();
    let (first, last) = match (left, right) {
        (Some(l), Some(r)) => {
            let left_distance = (block_center(l.0, l.1) - center).abs();
            let right_distance = (block_center(r.0, r.1) - center).abs();
            if left_distance <= right_distance {
                l
            } else {
                r
            }
        }
        (Some(block), None) | (None, Some(block)) => block,
        (None, None) => return None,
    };
    Some((first..=last).collect())
}

/// First feasible split of the block across the aisle.
fn block_across_aisle(config: &RowConfig, seats: &RowSeats<'_>, quantity: u32) -> Option<Vec<u32>> {
    (1..quantity).find_map(|left_count| {
        let right_count = quantity - left_count;
        if left_count > config.left_size() || right_count > config.right_size() {
            return None;
        }
        let left_first = config.left_segment_end + 1 - left_count;
        let right_last = config.right_segment_start + right_count - 1;
        let feasible = all_free(seats, left_first, config.left_segment_end)
            && all_free(seats, config.right_segment_start, right_last);
        feasible.then(|| {
            (left_first..=config.left_segment_end)
                .chain(config.right_segment_start..=right_last)
                .collect()
        })
    })
}
