//! Parsed colors used while drawing.

use tiny_skia::Color;

use crate::shapes::parse_color;
use crate::{RenderError, RenderResult, RendererConfig};

/// Renderer colors, parsed once from [`RendererConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    /// Frame background.
    pub background: Color,
    /// Seats without a group or own fill.
    pub seat: Color,
    /// Seats not selectable in the current mode.
    pub inactive_seat: Color,
    /// Blocked seats outside wheelchair mode.
    pub blocked: Color,
    /// Blocked seats in wheelchair mode.
    pub wheelchair_blocked: Color,
    /// Selected seat fill.
    pub selected: Color,
    /// Selected seat outline.
    pub selected_stroke: Color,
    /// Checkmark glyph.
    pub checkmark: Color,
    /// Hover overlay.
    pub hover: Color,
    /// Drag rectangle fill.
    pub drag_fill: Color,
    /// Drag rectangle outline.
    pub drag_stroke: Color,
    /// Legend shapes without their own fill.
    pub legend: Color,
}

impl Palette {
    /// Parse every configured color.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Color`] naming the first unparsable value.
    pub fn from_config(config: &RendererConfig) -> RenderResult<Self> {
        let c = |value: &str| parse_color(value).ok_or_else(|| RenderError::Color(value.to_string()));
        Ok(Self {
            background: c(&config.background_color)?,
            seat: c(&config.seat_color)?,
            inactive_seat: c(&config.inactive_seat_color)?,
            blocked: c(&config.blocked_color)?,
            wheelchair_blocked: c(&config.wheelchair_blocked_color)?,
            selected: c(&config.selected_color)?,
            selected_stroke: c(&config.selected_stroke_color)?,
            checkmark: c(&config.checkmark_color)?,
            hover: c(&config.hover_color)?,
            drag_fill: c(&config.drag_fill_color)?,
            drag_stroke: c(&config.drag_stroke_color)?,
            legend: c(&config.legend_color)?,
        })
    }

    /// Blocked-seat color for the given mode.
    #[must_use]
    pub fn blocked_for(&self, wheelchair_mode: bool) -> Color {
        if wheelchair_mode {
            self.wheelchair_blocked
        } else {
            self.blocked
        }
    }
}
