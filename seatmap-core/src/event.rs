//! Input events for seat map interaction.
//!
//! Coordinates are screen pixels (CSS pixels, before device pixel ratio).

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Phase of a touch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    /// Touch started (finger down).
    Start,
    /// Touch moved (finger dragging).
    Move,
    /// Touch ended (finger up).
    End,
    /// Touch cancelled (e.g., palm rejection).
    Cancel,
}

/// A single touch point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Touch identifier (for multi-touch).
    pub id: u32,
    /// X position in screen coordinates.
    pub x: f32,
    /// Y position in screen coordinates.
    pub y: f32,
}

impl TouchPoint {
    /// Create a touch point.
    #[must_use]
    pub const fn new(id: u32, x: f32, y: f32) -> Self {
        Self { id, x, y }
    }

    /// Position as a point.
    #[must_use]
    pub const fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A touch event with the touches that are still down afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    /// Phase of this touch event.
    pub phase: TouchPhase,
    /// All current touch points.
    ///
    /// For [`TouchPhase::End`] these are the remaining touches.
    pub touches: Vec<TouchPoint>,
    /// Timestamp in milliseconds.
    pub timestamp_ms: u64,
}

impl TouchEvent {
    /// Create a new touch event.
    #[must_use]
    pub fn new(phase: TouchPhase, touches: Vec<TouchPoint>, timestamp_ms: u64) -> Self {
        Self {
            phase,
            touches,
            timestamp_ms,
        }
    }

    /// Get the primary (first) touch point.
    #[must_use]
    pub fn primary_touch(&self) -> Option<&TouchPoint> {
        self.touches.first()
    }

    /// Check if this is a multi-touch event.
    #[must_use]
    pub fn is_multi_touch(&self) -> bool {
        self.touches.len() > 1
    }
}

/// Pointer (mouse/pen) phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed.
    Down,
    /// Pointer moved while pressed.
    Move,
    /// Button released.
    Up,
    /// Pointer capture lost.
    Cancel,
}

/// All input events the seat map can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    /// Raw touch event.
    Touch(TouchEvent),

    /// Pointer (mouse) event with a pressed button.
    Pointer {
        /// Phase of the pointer interaction.
        phase: PointerPhase,
        /// X coordinate.
        x: f32,
        /// Y coordinate.
        y: f32,
        /// Active modifier keys.
        modifiers: KeyModifiers,
        /// Timestamp in milliseconds.
        timestamp_ms: u64,
    },

    /// Pointer moved without a pressed button, or left the surface.
    Hover {
        /// Pointer position, `None` when it left the surface.
        position: Option<Point>,
    },
}

impl InputEvent {
    /// Pointer event shorthand without modifiers.
    #[must_use]
    pub const fn pointer(phase: PointerPhase, x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self::Pointer {
            phase,
            x,
            y,
            modifiers: KeyModifiers::NONE,
            timestamp_ms,
        }
    }
}

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct KeyModifiers {
    /// Shift key pressed.
    pub shift: bool,
    /// Control key pressed.
    pub ctrl: bool,
    /// Alt/Option key pressed.
    pub alt: bool,
    /// Meta/Command key pressed.
    pub meta: bool,
}

impl KeyModifiers {
    /// No modifier held.
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Whether a drag with these modifiers selects a rectangle.
    #[must_use]
    pub const fn selects_rectangle(&self) -> bool {
        self.shift || self.ctrl || self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_modifiers() {
        assert!(!KeyModifiers::NONE.selects_rectangle());
        assert!(KeyModifiers {
            meta: true,
            ..KeyModifiers::default()
        }
        .selects_rectangle());
        assert!(!KeyModifiers {
            alt: true,
            ..KeyModifiers::default()
        }
        .selects_rectangle());
    }

    #[test]
    fn test_event_json_shape() {
        let event = InputEvent::pointer(PointerPhase::Down, 3.0, 4.0, 10);
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "Pointer");
        assert_eq!(json["data"]["phase"], "down");
    }

    #[test]
    fn test_multi_touch() {
        let event = TouchEvent::new(
            TouchPhase::Start,
            vec![TouchPoint::new(0, 0.0, 0.0), TouchPoint::new(1, 5.0, 5.0)],
            0,
        );
        assert!(event.is_multi_touch());
        assert_eq!(event.primary_touch().map(|t| t.id), Some(0));
    }
}
