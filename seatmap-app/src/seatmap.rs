//! The interactive seat map controller.
//!
//! [`SeatMap`] owns every piece of mutable state: the loaded document,
//! the blocked and selected sets, the viewport and gesture machine, the
//! renderer and its frame scheduler. Hosts feed it input events and
//! frame callbacks; it reports selection changes through a
//! [`SeatMapListener`].

use std::collections::{BTreeMap, BTreeSet};

use seatmap_core::{
    Allocation, BlockedSet, Bounds, ConstraintPropagator, DocumentId, FetchSequencer, FetchTicket,
    GroupId, InputEvent, Point, PropagationInput, ReservationEvent, ReservationRequest, RowLayout,
    Seat, SeatAllocator, SeatGroup, SeatId, SeatMapDocument, SeatMapError, SeatReservation,
    TicketRequest, VenueConfig,
};
use seatmap_renderer::{
    hit_test, is_selectable_type, seats_in_rect, FrameInput, FrameScheduler, GestureController,
    GestureMode, GestureOutcome, Renderer, Viewport,
};
use tiny_skia::Pixmap;

use crate::config::SeatMapConfig;
use crate::error::{AppError, AppResult};

/// Callbacks to the checkout layer. All methods default to no-ops.
pub trait SeatMapListener {
    /// A seat joined the selection.
    fn on_seat_selected(&mut self, _seat_id: &SeatId, _group_id: Option<&GroupId>, _seat: &Seat) {}

    /// A seat left the selection, by the user or because it became blocked.
    fn on_seat_deselected(&mut self, _seat_id: &SeatId) {}

    /// A document was loaded.
    fn on_seats_parsed(&mut self, _seats: &[Seat]) {}
}

/// Effect of [`SeatMap::toggle_seat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    /// The seat was added.
    Selected,
    /// The seat was removed.
    Deselected,
    /// The seat is blocked or not selectable in the current mode.
    Ignored,
}

/// Interactive seat map for one show at a time.
pub struct SeatMap {
    venue: VenueConfig,
    layout: RowLayout,
    propagator: ConstraintPropagator,
    viewport: Viewport,
    gestures: GestureController,
    renderer: Renderer,
    scheduler: FrameScheduler,
    sequencer: FetchSequencer,
    listener: Option<Box<dyn SeatMapListener>>,
    show_id: Option<String>,
    session_id: Option<String>,
    document: Option<SeatMapDocument>,
    groups: Vec<SeatGroup>,
    base_blocked: BTreeSet<SeatId>,
    blocked: BlockedSet,
    selected: BTreeSet<SeatId>,
    hovered: Option<SeatId>,
    wheelchair_mode: bool,
}

impl std::fmt::Debug for SeatMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeatMap")
            .field("show_id", &self.show_id)
            .field("seats", &self.document.as_ref().map_or(0, SeatMapDocument::len))
            .field("blocked", &self.blocked.len())
            .field("selected", &self.selected.len())
            .field("wheelchair_mode", &self.wheelchair_mode)
            .field("gesture", &self.gestures.mode())
            .finish_non_exhaustive()
    }
}

impl SeatMap {
    /// Create an empty seat map.
    ///
    /// # Errors
    ///
    /// Returns an error if the venue, viewport or renderer configuration
    /// is invalid.
    pub fn new(config: SeatMapConfig) -> AppResult<Self> {
        config.validate()?;
        let layout = config.venue.row_layout()?;
        let renderer = Renderer::new(config.renderer)?;
        let viewport = Viewport::new(
            config.viewport,
            Bounds::FALLBACK,
            config.screen_width,
            config.screen_height,
        );
        Ok(Self {
            propagator: ConstraintPropagator::new(config.venue.blocking.clone()),
            venue: config.venue,
            layout,
            viewport,
            gestures: GestureController::new(),
            renderer,
            scheduler: FrameScheduler::new(),
            sequencer: FetchSequencer::new(),
            listener: None,
            show_id: None,
            session_id: None,
            document: None,
            groups: Vec::new(),
            base_blocked: BTreeSet::new(),
            blocked: BlockedSet::default(),
            selected: BTreeSet::new(),
            hovered: None,
            wheelchair_mode: false,
        })
    }

    /// Install the checkout callbacks.
    pub fn set_listener(&mut self, listener: Box<dyn SeatMapListener>) {
        self.listener = Some(listener);
    }

    /// Shopping session whose own reservation events are ignored.
    pub fn set_session_id(&mut self, session_id: Option<String>) {
        self.session_id = session_id;
    }

    /// Load a show's enriched SVG.
    ///
    /// Selection, hover and blocked seats of the previous show are
    /// dropped without callbacks, and outstanding blocked-seat fetches
    /// become stale.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not well-formed.
    pub fn load(
        &mut self,
        show_id: impl Into<String>,
        svg: &str,
        groups: Vec<SeatGroup>,
    ) -> AppResult<DocumentId> {
        let document = SeatMapDocument::parse(svg)?;
        let id = document.id();
        let show_id = show_id.into();

        self.sequencer.invalidate();
        self.viewport
            .set_world_bounds(document.world_bounds().unwrap_or(Bounds::FALLBACK));
        self.gestures.reset();
        self.renderer.reset_layers();
        self.selected.clear();
        self.hovered = None;
        self.base_blocked.clear();
        self.blocked = BlockedSet::default();
        self.groups = groups;

        tracing::info!(
            "Loaded show {show_id}: {} seats, {} legends",
            document.len(),
            document.legends().len()
        );
        self.show_id = Some(show_id);
        self.document = Some(document);
        self.recompute_blocked();

        if let (Some(listener), Some(document)) = (self.listener.as_mut(), self.document.as_ref()) {
            listener.on_seats_parsed(document.seats());
        }
        self.request_redraw();
        Ok(id)
    }

    /// Replace the caller-supplied blocked ids.
    ///
    /// Returns the seats dropped from the selection because they became blocked.
    pub fn set_base_blocked(&mut self, ids: impl IntoIterator<Item = SeatId>) -> Vec<SeatId> {
        self.base_blocked = ids.into_iter().collect();
        self.recompute_blocked()
    }

    /// Replace the seat groups (colors and reservations).
    pub fn set_seat_groups(&mut self, groups: Vec<SeatGroup>) -> Vec<SeatId> {
        self.groups = groups;
        self.renderer.invalidate_base();
        self.recompute_blocked()
    }

    /// Switch wheelchair mode.
    ///
    /// Leaving the mode deselects every selected wheelchair-family seat.
    pub fn set_wheelchair_mode(&mut self, enabled: bool) -> Vec<SeatId> {
        if self.wheelchair_mode == enabled {
            return Vec::new();
        }
        tracing::debug!("Wheelchair mode {}", if enabled { "on" } else { "off" });
        self.wheelchair_mode = enabled;
        self.renderer.invalidate_all();
        self.hovered = None;

        let mut dropped = Vec::new();
        if !enabled {
            if let Some(document) = &self.document {
                dropped = self
                    .selected
                    .iter()
                    .filter(|id| {
                        document
                            .seat(id)
                            .is_some_and(|s| s.seat_type.is_wheelchair_family())
                    })
                    .cloned()
                    .collect();
            }
            for id in &dropped {
                self.selected.remove(id);
            }
            self.notify_deselected(&dropped);
        }
        dropped.extend(self.recompute_blocked());
        self.request_redraw();
        dropped
    }

    /// Toggle one seat's selection.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotLoaded`] without a document and
    /// [`SeatMapError::SeatNotFound`] for an unknown id.
    pub fn toggle_seat(&mut self, id: &SeatId) -> AppResult<SelectionChange> {
        let document = self.document.as_ref().ok_or(AppError::NotLoaded)?;
        let seat = document
            .seat(id)
            .ok_or_else(|| SeatMapError::SeatNotFound(id.to_string()))?;

        if self.selected.remove(id) {
            self.notify_deselected(std::slice::from_ref(id));
            self.recompute_blocked();
            return Ok(SelectionChange::Deselected);
        }
        if self.blocked.contains(id) || !is_selectable_type(seat, self.wheelchair_mode) {
            tracing::debug!("Seat {id} is not selectable");
            return Ok(SelectionChange::Ignored);
        }
        let added = self.add_to_selection([id.clone()], true);
        Ok(if added.is_empty() {
            SelectionChange::Ignored
        } else {
            SelectionChange::Selected
        })
    }

    /// Add seats to the selection; blocked and ineligible ones are skipped.
    ///
    /// Returns the seats actually added.
    pub fn select_seats(&mut self, ids: impl IntoIterator<Item = SeatId>) -> Vec<SeatId> {
        self.add_to_selection(ids, true)
    }

    /// Add every eligible seat whose center lies in a world rectangle.
    pub fn select_in_rect(&mut self, world: Bounds) -> Vec<SeatId> {
        let Some(document) = &self.document else {
            return Vec::new();
        };
        let ids: Vec<SeatId> = seats_in_rect(document.seats(), world)
            .map(|s| s.id.clone())
            .collect();
        self.select_seats(ids)
    }

    /// Deselect everything.
    pub fn clear_selection(&mut self) {
        let ids: Vec<SeatId> = std::mem::take(&mut self.selected).into_iter().collect();
        if ids.is_empty() {
            return;
        }
        self.notify_deselected(&ids);
        self.recompute_blocked();
    }

    /// Feed a pointer, touch or hover event.
    pub fn handle_input(&mut self, event: &InputEvent) -> GestureOutcome {
        if self.document.is_none() {
            return GestureOutcome::None;
        }
        if let InputEvent::Hover { position } = event {
            self.update_hover(*position);
            return GestureOutcome::None;
        }

        let outcome = self.gestures.handle(event, &mut self.viewport);
        match outcome {
            GestureOutcome::Tap { world } => self.tap(world),
            GestureOutcome::RectSelect { world } => {
                let added = self.select_in_rect(world);
                tracing::debug!("Rectangle selected {} seats", added.len());
                self.request_redraw();
            }
            GestureOutcome::Redraw | GestureOutcome::ZoomStarted | GestureOutcome::GestureEnded => {
                self.request_redraw();
            }
            GestureOutcome::None => {}
        }
        outcome
    }

    /// Display-refresh callback: advance animations and draw if a frame is pending.
    ///
    /// Returns whether a frame was drawn.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer raster cannot be allocated.
    pub fn on_animation_frame(&mut self, now_ms: u64, target: &mut Pixmap) -> AppResult<bool> {
        if !self.scheduler.begin_frame() {
            return Ok(false);
        }
        if self.gestures.advance(now_ms, &mut self.viewport) == GestureOutcome::Redraw {
            self.scheduler.request_frame();
        }
        let Some(document) = self.document.as_ref() else {
            return Ok(false);
        };
        let input = FrameInput {
            document,
            blocked: &self.blocked,
            groups: &self.groups,
            selected: &self.selected,
            hovered: self.hovered.as_ref(),
            drag_rect: self.gestures.drag_rect(),
            wheelchair_mode: self.wheelchair_mode,
            gesture_active: self.gestures.is_interacting(),
        };
        self.renderer.render_frame(target, &self.viewport, &input)?;
        Ok(true)
    }

    /// Frame buffer sized for the current screen.
    ///
    /// # Errors
    ///
    /// Returns an error if the pixmap cannot be allocated.
    pub fn create_target(&self) -> AppResult<Pixmap> {
        Ok(self.renderer.create_target(&self.viewport)?)
    }

    /// One zoom step in about the screen center.
    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
        self.request_redraw();
    }

    /// One zoom step out about the screen center.
    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
        self.request_redraw();
    }

    /// Fit the whole map to the screen.
    pub fn reset_view(&mut self) {
        self.viewport.reset_view();
        self.request_redraw();
    }

    /// The host surface changed size.
    pub fn resize(&mut self, screen_width: f32, screen_height: f32) {
        self.viewport.resize(screen_width, screen_height);
        self.request_redraw();
    }

    /// Best-fit allocation in one group; successful seats are selected.
    ///
    /// Selected seats count as unavailable.
    ///
    /// # Errors
    ///
    /// Returns an error without a document or for an unknown group.
    pub fn allocate_best(&mut self, group_id: &GroupId, quantity: u32) -> AppResult<Allocation> {
        let allocation = {
            let (allocator, group) = self.allocator_for(group_id)?;
            allocator.allocate(group, quantity, &self.unavailable())
        };
        self.apply_allocation(&allocation);
        Ok(allocation)
    }

    /// Greedy free-seating allocation in one group; successful seats are selected.
    ///
    /// # Errors
    ///
    /// Returns an error without a document or for an unknown group.
    pub fn allocate_free(&mut self, group_id: &GroupId, quantity: u32) -> AppResult<Allocation> {
        let allocation = {
            let (allocator, group) = self.allocator_for(group_id)?;
            allocator.allocate_free_mode(group, quantity, &self.unavailable())
        };
        self.apply_allocation(&allocation);
        Ok(allocation)
    }

    /// Allocate several ticket lines in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotLoaded`] without a document.
    pub fn allocate_tickets(
        &mut self,
        requests: &[TicketRequest],
    ) -> AppResult<BTreeMap<GroupId, Allocation>> {
        let results = {
            let document = self.document.as_ref().ok_or(AppError::NotLoaded)?;
            SeatAllocator::new(document, &self.layout, &self.venue.allocation).allocate_for_tickets(
                requests,
                &self.groups,
                &self.unavailable(),
            )
        };
        for allocation in results.values() {
            self.apply_allocation(allocation);
        }
        Ok(results)
    }

    /// Apply a realtime reservation event.
    ///
    /// Returns whether the event concerned this show and session.
    pub fn apply_reservation_event(&mut self, event: &ReservationEvent) -> bool {
        let Some(show_id) = self.show_id.as_deref() else {
            return false;
        };
        if !event.applies_to(show_id, self.session_id.as_deref()) {
            tracing::trace!("Ignoring reservation event for show {}", event.show_id());
            return false;
        }
        if event.blocks() {
            self.base_blocked.extend(event.seat_ids().iter().cloned());
        } else {
            for id in event.seat_ids() {
                self.base_blocked.remove(id);
            }
        }
        self.recompute_blocked();
        true
    }

    /// Ticket for a blocked-seat fetch of the loaded show.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotLoaded`] without a document.
    pub fn begin_blocked_fetch(&self) -> AppResult<FetchTicket> {
        let document = self.document.as_ref().ok_or(AppError::NotLoaded)?;
        Ok(self.sequencer.issue(document.id()))
    }

    /// Apply a blocked-seat fetch unless a newer fetch or another
    /// document superseded it.
    pub fn apply_blocked_fetch(
        &mut self,
        ticket: &FetchTicket,
        ids: impl IntoIterator<Item = SeatId>,
    ) -> bool {
        let Some(document) = &self.document else {
            return false;
        };
        if !self.sequencer.is_current(ticket, document.id()) {
            return false;
        }
        self.set_base_blocked(ids);
        true
    }

    /// Take the authoritative blocked set after a reservation conflict.
    ///
    /// Only selected seats that are now blocked are deselected; they are returned.
    pub fn prune_conflicts(&mut self, authoritative: impl IntoIterator<Item = SeatId>) -> Vec<SeatId> {
        let dropped = self.set_base_blocked(authoritative);
        if !dropped.is_empty() {
            tracing::warn!("Reservation conflict removed {} seats from the selection", dropped.len());
        }
        dropped
    }

    /// Reservation request for the current selection.
    ///
    /// # Errors
    ///
    /// Returns an error without a loaded show or session.
    pub fn reservation_request(
        &self,
        price_for: impl Fn(&Seat) -> String,
    ) -> AppResult<ReservationRequest> {
        let document = self.document.as_ref().ok_or(AppError::NotLoaded)?;
        let show_id = self.show_id.clone().ok_or(AppError::NotLoaded)?;
        let session_id = self.session_id.clone().ok_or(AppError::NoSession)?;
        let seat_reservations = self
            .selected
            .iter()
            .filter_map(|id| document.seat(id))
            .map(|seat| SeatReservation {
                seat_id: seat.id.clone(),
                price_id: price_for(seat),
            })
            .collect();
        Ok(ReservationRequest {
            show_id,
            seat_reservations,
            session_id,
        })
    }

    /// Ask for a redraw. Returns `true` if the host must schedule the
    /// frame callback.
    pub fn request_redraw(&mut self) -> bool {
        self.scheduler.request_frame()
    }

    /// Whether a frame callback is pending.
    #[must_use]
    pub fn frame_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// The loaded document.
    #[must_use]
    pub fn document(&self) -> Option<&SeatMapDocument> {
        self.document.as_ref()
    }

    /// Loaded show id.
    #[must_use]
    pub fn show_id(&self) -> Option<&str> {
        self.show_id.as_deref()
    }

    /// Current seat groups.
    #[must_use]
    pub fn groups(&self) -> &[SeatGroup] {
        &self.groups
    }

    /// Current selection.
    #[must_use]
    pub fn selected(&self) -> &BTreeSet<SeatId> {
        &self.selected
    }

    /// Effective blocked set.
    #[must_use]
    pub fn blocked(&self) -> &BlockedSet {
        &self.blocked
    }

    /// Seat under the pointer, if selectable.
    #[must_use]
    pub fn hovered(&self) -> Option<&SeatId> {
        self.hovered.as_ref()
    }

    /// Current transform.
    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Current gesture.
    #[must_use]
    pub fn gesture_mode(&self) -> GestureMode {
        self.gestures.mode()
    }

    /// Whether wheelchair mode is on.
    #[must_use]
    pub fn wheelchair_mode(&self) -> bool {
        self.wheelchair_mode
    }

    /// The renderer, for layer statistics.
    #[must_use]
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Frame scheduler counters.
    #[must_use]
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Shared fetch sequencer, for handing to a [`ReservationSync`](crate::ReservationSync).
    #[must_use]
    pub fn sequencer(&self) -> &FetchSequencer {
        &self.sequencer
    }

    fn allocator_for(&self, group_id: &GroupId) -> AppResult<(SeatAllocator<'_>, &SeatGroup)> {
        let document = self.document.as_ref().ok_or(AppError::NotLoaded)?;
        let group = self
            .groups
            .iter()
            .find(|g| &g.id == group_id)
            .ok_or_else(|| SeatMapError::GroupNotFound(group_id.to_string()))?;
        Ok((
            SeatAllocator::new(document, &self.layout, &self.venue.allocation),
            group,
        ))
    }

    fn unavailable(&self) -> BTreeSet<SeatId> {
        let mut ids = self.blocked.to_set();
        ids.extend(self.selected.iter().cloned());
        ids
    }

    fn apply_allocation(&mut self, allocation: &Allocation) {
        if !allocation.success {
            return;
        }
        let added = self.add_to_selection(allocation.allocated_seat_ids.iter().cloned(), false);
        tracing::info!(
            "Allocation selected {} of {} seats ({:?})",
            added.len(),
            allocation.allocated_seat_ids.len(),
            allocation.quality
        );
    }

    fn add_to_selection(
        &mut self,
        ids: impl IntoIterator<Item = SeatId>,
        respect_mode: bool,
    ) -> Vec<SeatId> {
        let Some(document) = self.document.as_ref() else {
            return Vec::new();
        };
        // Wheelchair picks can trip the cap mid-batch, so re-derive as we go.
        let mut blocked = self.blocked.clone();
        let mut added = Vec::new();
        for id in ids {
            let Some(seat) = document.seat(&id) else {
                tracing::warn!("Cannot select unknown seat {id}");
                continue;
            };
            if self.selected.contains(&id) || blocked.contains(&id) {
                continue;
            }
            if respect_mode && !is_selectable_type(seat, self.wheelchair_mode) {
                continue;
            }
            self.selected.insert(id.clone());
            if seat.seat_type.is_wheelchair_family() {
                blocked = self.propagator.propagate(&PropagationInput {
                    document,
                    base_blocked: &self.base_blocked,
                    groups: &self.groups,
                    selected: &self.selected,
                });
            }
            added.push(id);
        }

        if !added.is_empty() {
            self.notify_selected(&added);
            self.recompute_blocked();
        }
        added
    }

    fn tap(&mut self, world: Point) {
        let Some(id) = self
            .document
            .as_ref()
            .and_then(|d| hit_test(d.seats(), world))
            .map(|s| s.id.clone())
        else {
            return;
        };
        match self.toggle_seat(&id) {
            Ok(change) => tracing::debug!("Tap on {id}: {change:?}"),
            Err(e) => tracing::warn!("Tap on {id} failed: {e}"),
        }
    }

    fn update_hover(&mut self, position: Option<Point>) {
        let hovered = match (position, self.document.as_ref()) {
            (Some(p), Some(document)) if self.viewport.is_interactive() => {
                hit_test(document.seats(), self.viewport.screen_to_world(p))
                    .filter(|seat| {
                        !self.blocked.contains(&seat.id)
                            && is_selectable_type(seat, self.wheelchair_mode)
                    })
                    .map(|seat| seat.id.clone())
            }
            _ => None,
        };
        if hovered != self.hovered {
            self.hovered = hovered;
            self.request_redraw();
        }
    }

    /// Re-derive the blocked set; selected seats that end up blocked are
    /// deselected until the result is stable.
    fn recompute_blocked(&mut self) -> Vec<SeatId> {
        let Some(document) = self.document.as_ref() else {
            return Vec::new();
        };
        let mut dropped = Vec::new();
        loop {
            let blocked = self.propagator.propagate(&PropagationInput {
                document,
                base_blocked: &self.base_blocked,
                groups: &self.groups,
                selected: &self.selected,
            });
            let conflicting: Vec<SeatId> = self
                .selected
                .iter()
                .filter(|id| blocked.contains(id))
                .cloned()
                .collect();
            if conflicting.is_empty() {
                if blocked != self.blocked {
                    self.blocked = blocked;
                    self.renderer.invalidate_blocked();
                }
                break;
            }
            for id in &conflicting {
                self.selected.remove(id);
            }
            dropped.extend(conflicting);
        }

        if self.hovered.as_ref().is_some_and(|id| self.blocked.contains(id)) {
            self.hovered = None;
        }
        if !dropped.is_empty() {
            tracing::info!("{} selected seats became blocked", dropped.len());
            self.notify_deselected(&dropped);
        }
        self.request_redraw();
        dropped
    }

    fn notify_selected(&mut self, ids: &[SeatId]) {
        let (Some(listener), Some(document)) = (self.listener.as_mut(), self.document.as_ref())
        else {
            return;
        };
        for id in ids {
            if let Some(seat) = document.seat(id) {
                listener.on_seat_selected(id, seat.group_id.as_ref(), seat);
            }
        }
    }

    fn notify_deselected(&mut self, ids: &[SeatId]) {
        if let Some(listener) = self.listener.as_mut() {
            for id in ids {
                listener.on_seat_deselected(id);
            }
        }
    }
}
