//! Pointer and touch gesture recognition.
//!
//! ```text
//!            down (scale >= 2)           move > threshold
//!   Idle ─────────────────────► Panning ───────────────► Panning (dragging)
//!    │ │  down + shift/ctrl/meta (scale >= 2)                  │ up
//!    │ └──────────────────────► RectSelecting ── up ──► RectSelect
//!    │  second touch
//!    ├──────────────────────► Pinching ── last touch up ──► Idle (+cooldown)
//!    │  tap (scale < 2)
//!    └──────────────────────► AnimatedZoom ── finished ──► Idle
//! ```
//!
//! The controller mutates the [`Viewport`] directly for pan, pinch and
//! animation frames, and reports everything else as a [`GestureOutcome`]
//! for the owner to resolve (seat taps, rectangle selection).

use seatmap_core::{Bounds, InputEvent, KeyModifiers, Point, PointerPhase, TouchEvent, TouchPhase, TouchPoint};

use crate::viewport::{AnimatedZoom, Viewport};

/// Externally visible gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureMode {
    /// No gesture in progress.
    Idle,
    /// One pointer is down at interactive scale.
    Panning,
    /// Two touches are down.
    Pinching,
    /// The click-to-zoom animation is running.
    AnimatedZoom,
    /// A modifier drag is drawing a selection rectangle.
    RectSelecting,
}

/// What an input event amounted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    /// Nothing to do.
    None,
    /// Transform or overlay changed; draw a frame.
    Redraw,
    /// A tap at interactive scale, in world units.
    Tap {
        /// Tapped world point.
        world: Point,
    },
    /// A finished selection rectangle, in world units.
    RectSelect {
        /// Selected world rectangle.
        world: Bounds,
    },
    /// The click-to-zoom animation started.
    ZoomStarted,
    /// A pan, pinch or animation ended; deferred work may run now.
    GestureEnded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Idle,
    /// Pointer down below interactive scale; a tap candidate.
    Pressed {
        start: Point,
    },
    Panning {
        start: Point,
        offset_at_start: Point,
        dragging: bool,
    },
    Pinching {
        initial_distance: f32,
        initial_scale: f32,
        anchor: Point,
    },
    Animating(AnimatedZoom),
    RectSelecting {
        start: Point,
        current: Point,
    },
}

/// Gesture state machine over one viewport.
#[derive(Debug, Clone)]
pub struct GestureController {
    state: State,
    last_point: Point,
    cooldown_until_ms: u64,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureController {
    /// Create an idle controller.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            last_point: Point::default(),
            cooldown_until_ms: 0,
        }
    }

    /// Current gesture mode.
    #[must_use]
    pub fn mode(&self) -> GestureMode {
        match self.state {
            State::Idle | State::Pressed { .. } => GestureMode::Idle,
            State::Panning { .. } => GestureMode::Panning,
            State::Pinching { .. } => GestureMode::Pinching,
            State::Animating(_) => GestureMode::AnimatedZoom,
            State::RectSelecting { .. } => GestureMode::RectSelecting,
        }
    }

    /// Whether the transform is changing continuously, so layer
    /// rebuilds should wait.
    #[must_use]
    pub fn is_interacting(&self) -> bool {
        matches!(
            self.state,
            State::Panning { dragging: true, .. } | State::Pinching { .. } | State::Animating(_)
        )
    }

    /// Whether the click-to-zoom animation is running.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        matches!(self.state, State::Animating(_))
    }

    /// Selection rectangle in screen coordinates while dragging one.
    #[must_use]
    pub fn drag_rect(&self) -> Option<Bounds> {
        match self.state {
            State::RectSelecting { start, current } => Some(Bounds::from_corners(start, current)),
            _ => None,
        }
    }

    /// Whether taps are suppressed after a pinch.
    #[must_use]
    pub fn in_cooldown(&self, now_ms: u64) -> bool {
        now_ms < self.cooldown_until_ms
    }

    /// Abandon any gesture, e.g. when a new document is loaded.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.cooldown_until_ms = 0;
    }

    /// Feed one input event.
    pub fn handle(&mut self, event: &InputEvent, viewport: &mut Viewport) -> GestureOutcome {
        if self.is_animating() {
            return GestureOutcome::None;
        }
        match event {
            InputEvent::Pointer {
                phase,
                x,
                y,
                modifiers,
                timestamp_ms,
            } => {
                let p = Point::new(*x, *y);
                match phase {
                    PointerPhase::Down => self.press(p, *modifiers, viewport),
                    PointerPhase::Move => self.drag(p, viewport),
                    PointerPhase::Up => self.release(p, *timestamp_ms, viewport),
                    PointerPhase::Cancel => self.cancel(),
                }
            }
            InputEvent::Touch(touch) => self.touch(touch, viewport),
            InputEvent::Hover { .. } => GestureOutcome::None,
        }
    }

    /// Drive the click-to-zoom animation from the frame callback.
    pub fn advance(&mut self, now_ms: u64, viewport: &mut Viewport) -> GestureOutcome {
        let State::Animating(animation) = self.state else {
            return GestureOutcome::None;
        };
        let (scale, offset, finished) = animation.sample(now_ms);
        viewport.set_transform(scale, offset);
        if finished {
            tracing::debug!("Zoom animation finished at scale {scale:.2}");
            self.state = State::Idle;
            GestureOutcome::GestureEnded
        } else {
            GestureOutcome::Redraw
        }
    }

    fn touch(&mut self, touch: &TouchEvent, viewport: &mut Viewport) -> GestureOutcome {
        let now = touch.timestamp_ms;
        let pinching = matches!(self.state, State::Pinching { .. });
        match (touch.phase, touch.touches.as_slice()) {
            (TouchPhase::Start | TouchPhase::Move, [a, b, ..]) if !pinching => {
                self.begin_pinch(a, b, viewport)
            }
            (TouchPhase::Move, [a, b, ..]) => self.update_pinch(a, b, viewport),
            (TouchPhase::End | TouchPhase::Cancel, rest) if pinching => {
                if rest.is_empty() || touch.phase == TouchPhase::Cancel {
                    self.state = State::Idle;
                    self.cooldown_until_ms = now + viewport.config().pinch_cooldown_ms;
                    tracing::debug!("Pinch ended at scale {:.2}", viewport.scale());
                    GestureOutcome::GestureEnded
                } else {
                    GestureOutcome::None
                }
            }
            (_, _) if pinching => GestureOutcome::None,
            (TouchPhase::Start, [t]) => self.press(t.position(), KeyModifiers::NONE, viewport),
            (TouchPhase::Move, [t]) => self.drag(t.position(), viewport),
            (TouchPhase::End, _) => self.release(self.last_point, now, viewport),
            (TouchPhase::Cancel, _) => self.cancel(),
            _ => GestureOutcome::None,
        }
    }

    fn press(&mut self, p: Point, modifiers: KeyModifiers, viewport: &Viewport) -> GestureOutcome {
        if !matches!(self.state, State::Idle) {
            return GestureOutcome::None;
        }
        self.last_point = p;
        // Seat picking starts at interactive scale.
        if modifiers.selects_rectangle() && viewport.is_interactive() {
            self.state = State::RectSelecting {
                start: p,
                current: p,
            };
            return GestureOutcome::Redraw;
        }
        self.state = if viewport.is_interactive() {
            State::Panning {
                start: p,
                offset_at_start: viewport.offset(),
                dragging: false,
            }
        } else {
            State::Pressed { start: p }
        };
        GestureOutcome::None
    }

    fn drag(&mut self, p: Point, viewport: &mut Viewport) -> GestureOutcome {
        self.last_point = p;
        let threshold = viewport.config().drag_threshold;
        match &mut self.state {
            State::Panning {
                start,
                offset_at_start,
                dragging,
            } => {
                if !*dragging && p.distance(*start) < threshold {
                    return GestureOutcome::None;
                }
                if !*dragging {
                    tracing::trace!("Pan started");
                    *dragging = true;
                }
                viewport.set_offset(Point::new(
                    offset_at_start.x + (p.x - start.x),
                    offset_at_start.y + (p.y - start.y),
                ));
                GestureOutcome::Redraw
            }
            State::RectSelecting { current, .. } => {
                *current = p;
                GestureOutcome::Redraw
            }
            _ => GestureOutcome::None,
        }
    }

    fn release(&mut self, p: Point, now_ms: u64, viewport: &Viewport) -> GestureOutcome {
        let threshold = viewport.config().drag_threshold;
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Panning { dragging: true, .. } => GestureOutcome::GestureEnded,
            State::Panning { .. } => {
                if self.in_cooldown(now_ms) {
                    return GestureOutcome::None;
                }
                GestureOutcome::Tap {
                    world: viewport.screen_to_world(p),
                }
            }
            State::Pressed { start } => {
                if self.in_cooldown(now_ms) || p.distance(start) >= threshold {
                    return GestureOutcome::None;
                }
                let (scale, offset) = viewport.click_zoom_target(p);
                tracing::debug!("Zooming to {scale:.2} around {p:?}");
                self.state = State::Animating(AnimatedZoom::new(viewport, scale, offset, now_ms));
                GestureOutcome::ZoomStarted
            }
            State::RectSelecting { start, .. } => GestureOutcome::RectSelect {
                world: Bounds::from_corners(
                    viewport.screen_to_world(start),
                    viewport.screen_to_world(p),
                ),
            },
            other => {
                self.state = other;
                GestureOutcome::None
            }
        }
    }

    fn cancel(&mut self) -> GestureOutcome {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Panning { dragging: true, .. } => GestureOutcome::GestureEnded,
            State::RectSelecting { .. } => GestureOutcome::Redraw,
            _ => GestureOutcome::None,
        }
    }

    fn begin_pinch(&mut self, a: &TouchPoint, b: &TouchPoint, viewport: &Viewport) -> GestureOutcome {
        let (pa, pb) = (a.position(), b.position());
        self.state = State::Pinching {
            initial_distance: pa.distance(pb).max(1.0),
            initial_scale: viewport.scale(),
            anchor: viewport.screen_to_world(pa.midpoint(pb)),
        };
        tracing::trace!("Pinch started");
        GestureOutcome::Redraw
    }

    fn update_pinch(&mut self, a: &TouchPoint, b: &TouchPoint, viewport: &mut Viewport) -> GestureOutcome {
        let State::Pinching {
            initial_distance,
            initial_scale,
            anchor,
        } = self.state
        else {
            return GestureOutcome::None;
        };
        let (pa, pb) = (a.position(), b.position());
        let scale = viewport.clamp_scale(initial_scale * pa.distance(pb) / initial_distance);
        let mid = pa.midpoint(pb);
        let offset = Point::new(mid.x - anchor.x * scale, mid.y - anchor.y * scale);
        viewport.set_transform(scale, viewport.clamped_offset(scale, offset));
        GestureOutcome::Redraw
    }
}
