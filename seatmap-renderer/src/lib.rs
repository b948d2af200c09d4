//! # Seat Map Renderer
//!
//! Viewport, cached raster layers, hit testing and gesture handling on
//! top of tiny-skia.
//!
//! ## Frame Composition
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  drag rectangle          (screen space)     │
//! ├─────────────────────────────────────────────┤
//! │  hover, selection, legends (vector, live)   │
//! ├─────────────────────────────────────────────┤
//! │  blocked layer           (raster, nearest)  │
//! ├─────────────────────────────────────────────┤
//! │  base layer              (raster, bilinear) │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Raster layers are rebuilt only when invalidated and never while a
//! pan, pinch or zoom animation is running.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod frame;
pub mod gesture;
pub mod hit;
pub mod layers;
pub mod shapes;
pub mod style;
pub mod viewport;

use std::collections::BTreeSet;

pub use error::{RenderError, RenderResult};
pub use frame::FrameScheduler;
pub use gesture::{GestureController, GestureMode, GestureOutcome};
pub use hit::{hit_test, seats_in_rect};
pub use layers::{is_selectable_type, Invalidation, LayerCache, LayerInput, LayerStats, RasterLayer};
pub use style::Palette;
pub use viewport::{AnimatedZoom, Viewport, ViewportConfig};

use seatmap_core::{BlockedSet, Bounds, SeatGroup, SeatId, SeatMapDocument};
use serde::{Deserialize, Serialize};
use tiny_skia::{FillRule, FilterQuality, Paint, Pixmap, PixmapPaint, Stroke, Transform};

use crate::shapes::{checkmark_path, rect_path, shape_path};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RendererConfig {
    /// Device pixels per screen unit.
    pub device_pixel_ratio: f32,
    /// Largest raster edge in pixels.
    pub max_texture_edge: u32,
    /// Scale growth that triggers a sharper raster.
    pub resolution_step: f32,
    /// Interpolate the base layer when blitting.
    pub smooth_base_blit: bool,
    /// Background color.
    pub background_color: String,
    /// Seat fill when neither group nor document gives one.
    pub seat_color: String,
    /// Seats not selectable in the current mode.
    pub inactive_seat_color: String,
    /// Blocked seats.
    pub blocked_color: String,
    /// Blocked seats while wheelchair mode is active.
    pub wheelchair_blocked_color: String,
    /// Selected seat fill.
    pub selected_color: String,
    /// Selected seat outline.
    pub selected_stroke_color: String,
    /// Checkmark on selected seats.
    pub checkmark_color: String,
    /// Hover overlay.
    pub hover_color: String,
    /// Drag rectangle fill.
    pub drag_fill_color: String,
    /// Drag rectangle outline.
    pub drag_stroke_color: String,
    /// Legend fill fallback.
    pub legend_color: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            max_texture_edge: 4096,
            resolution_step: 1.25,
            smooth_base_blit: true,
            background_color: "#ffffff".to_string(),
            seat_color: "#9aa5b1".to_string(),
            inactive_seat_color: "#dde1e6".to_string(),
            blocked_color: "#c3c8ce".to_string(),
            wheelchair_blocked_color: "#e8b4b4".to_string(),
            selected_color: "#2b8a3e".to_string(),
            selected_stroke_color: "#1b5e20".to_string(),
            checkmark_color: "#ffffff".to_string(),
            hover_color: "rgba(0, 0, 0, 0.2)".to_string(),
            drag_fill_color: "rgba(51, 154, 240, 0.15)".to_string(),
            drag_stroke_color: "#339af0".to_string(),
            legend_color: "#868e96".to_string(),
        }
    }
}

impl RendererConfig {
    /// Check numeric settings and colors.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Config`] for out-of-range numbers and
    /// [`RenderError::Color`] for unparsable colors.
    pub fn validate(&self) -> RenderResult<()> {
        if !self.device_pixel_ratio.is_finite() || self.device_pixel_ratio <= 0.0 {
            return Err(RenderError::Config(format!(
                "device pixel ratio must be positive, got {}",
                self.device_pixel_ratio
            )));
        }
        if self.max_texture_edge == 0 {
            return Err(RenderError::Config("max texture edge must be non-zero".into()));
        }
        if !self.resolution_step.is_finite() || self.resolution_step < 1.0 {
            return Err(RenderError::Config(format!(
                "resolution step must be at least 1, got {}",
                self.resolution_step
            )));
        }
        Palette::from_config(self).map(|_| ())
    }
}

/// Everything one frame is drawn from.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    /// Loaded document.
    pub document: &'a SeatMapDocument,
    /// Effective blocked set.
    pub blocked: &'a BlockedSet,
    /// Seat groups, for colors.
    pub groups: &'a [SeatGroup],
    /// Current selection.
    pub selected: &'a BTreeSet<SeatId>,
    /// Seat under the pointer.
    pub hovered: Option<&'a SeatId>,
    /// Selection rectangle in screen units.
    pub drag_rect: Option<Bounds>,
    /// Whether wheelchair-family seats are selectable.
    pub wheelchair_mode: bool,
    /// Whether a gesture is moving the transform.
    pub gesture_active: bool,
}

/// The main renderer interface.
#[derive(Debug)]
pub struct Renderer {
    config: RendererConfig,
    palette: Palette,
    layers: LayerCache,
    frame_count: u64,
}

impl Renderer {
    /// Create a renderer with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: RendererConfig) -> RenderResult<Self> {
        config.validate()?;
        let palette = Palette::from_config(&config)?;
        Ok(Self {
            config,
            palette,
            layers: LayerCache::new(),
            frame_count: 0,
        })
    }

    /// Get the renderer configuration.
    #[must_use]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Layer cache, for inspection.
    #[must_use]
    pub fn layers(&self) -> &LayerCache {
        &self.layers
    }

    /// Get the current frame count.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Group colors changed.
    pub fn invalidate_base(&mut self) {
        self.layers.invalidate_base();
    }

    /// The effective blocked set changed.
    pub fn invalidate_blocked(&mut self) {
        self.layers.invalidate_blocked();
    }

    /// Wheelchair mode toggled; both layers depend on it.
    pub fn invalidate_all(&mut self) {
        self.layers.invalidate_all();
    }

    /// Forget all rasters, e.g. for a new document.
    pub fn reset_layers(&mut self) {
        self.layers.reset();
    }

    /// Change the device pixel ratio; rasters are rebuilt at the new density.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Config`] for a non-positive ratio.
    pub fn set_device_pixel_ratio(&mut self, ratio: f32) -> RenderResult<()> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(RenderError::Config(format!(
                "device pixel ratio must be positive, got {ratio}"
            )));
        }
        if (ratio - self.config.device_pixel_ratio).abs() > f32::EPSILON {
            self.config.device_pixel_ratio = ratio;
            self.layers.invalidate_resolution();
        }
        Ok(())
    }

    /// Allocate a frame buffer matching the viewport in device pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if the pixmap cannot be allocated.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn create_target(&self, viewport: &Viewport) -> RenderResult<Pixmap> {
        let (w, h) = viewport.screen_size();
        let width = (w * self.config.device_pixel_ratio).ceil().max(1.0) as u32;
        let height = (h * self.config.device_pixel_ratio).ceil().max(1.0) as u32;
        Pixmap::new(width, height).ok_or(RenderError::Pixmap { width, height })
    }

    /// Draw one frame into `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer rebuild cannot allocate its raster.
    pub fn render_frame(
        &mut self,
        target: &mut Pixmap,
        viewport: &Viewport,
        input: &FrameInput<'_>,
    ) -> RenderResult<()> {
        self.layers
            .observe_scale(viewport.scale(), self.config.resolution_step);
        if self.layers.is_dirty() {
            let have_layers = self.layers.base().is_some() && self.layers.blocked().is_some();
            if input.gesture_active && have_layers {
                self.layers.defer();
            } else {
                let layer_input = LayerInput {
                    document: input.document,
                    blocked: input.blocked,
                    groups: input.groups,
                    wheelchair_mode: input.wheelchair_mode,
                };
                self.layers.rebuild(
                    &layer_input,
                    viewport.world_bounds(),
                    &self.palette,
                    &self.config,
                )?;
            }
        }

        let dpr = self.config.device_pixel_ratio;
        target.fill(self.palette.background);

        if let Some(base) = self.layers.base() {
            let quality = if self.config.smooth_base_blit {
                FilterQuality::Bilinear
            } else {
                FilterQuality::Nearest
            };
            blit(target, base, viewport, dpr, quality);
        }
        if let Some(blocked) = self.layers.blocked() {
            blit(target, blocked, viewport, dpr, FilterQuality::Nearest);
        }

        let view = view_transform(viewport, dpr);
        self.draw_legends(target, input.document, view, viewport.scale());
        self.draw_selection(target, input, view, viewport.scale());
        self.draw_hover(target, input, view);
        if let Some(rect) = input.drag_rect {
            self.draw_drag_rect(target, rect, dpr);
        }

        self.frame_count += 1;
        tracing::trace!("Frame {} drawn", self.frame_count);
        Ok(())
    }

    /// Encode a rendered frame as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Export`] if encoding fails.
    pub fn snapshot_png(frame: &Pixmap) -> RenderResult<Vec<u8>> {
        frame
            .encode_png()
            .map_err(|e| RenderError::Export(e.to_string()))
    }

    fn draw_legends(&self, target: &mut Pixmap, document: &SeatMapDocument, view: Transform, scale: f32) {
        for legend in document.legends() {
            let Some(path) = shape_path(&legend.shape) else {
                continue;
            };
            let transform = legend.rotation.map_or(view, |r| {
                view.pre_concat(Transform::from_rotate_at(r.degrees, r.pivot.x, r.pivot.y))
            });
            let fill = legend
                .fill
                .as_deref()
                .and_then(shapes::parse_color)
                .unwrap_or(self.palette.legend);
            target.fill_path(&path, &paint(fill), FillRule::Winding, transform, None);

            if let Some(stroke_color) = legend.stroke.as_deref().and_then(shapes::parse_color) {
                let stroke = Stroke {
                    width: 1.0 / scale,
                    ..Stroke::default()
                };
                target.stroke_path(&path, &paint(stroke_color), &stroke, transform, None);
            }
        }
    }

    fn draw_selection(&self, target: &mut Pixmap, input: &FrameInput<'_>, view: Transform, scale: f32) {
        let outline = Stroke {
            width: 2.0 / scale,
            ..Stroke::default()
        };
        for id in input.selected {
            let Some(seat) = input.document.seat(id) else {
                continue;
            };
            let Some(path) = shape_path(&seat.shape) else {
                continue;
            };
            target.fill_path(&path, &paint(self.palette.selected), FillRule::Winding, view, None);
            target.stroke_path(&path, &paint(self.palette.selected_stroke), &outline, view, None);

            if let Some(check) = checkmark_path(&seat.bounds) {
                let stroke = Stroke {
                    width: seat.bounds.width().min(seat.bounds.height()) * 0.12,
                    line_cap: tiny_skia::LineCap::Round,
                    line_join: tiny_skia::LineJoin::Round,
                    ..Stroke::default()
                };
                target.stroke_path(&check, &paint(self.palette.checkmark), &stroke, view, None);
            }
        }
    }

    fn draw_hover(&self, target: &mut Pixmap, input: &FrameInput<'_>, view: Transform) {
        let Some(seat) = input.hovered.and_then(|id| input.document.seat(id)) else {
            return;
        };
        if let Some(path) = shape_path(&seat.shape) {
            target.fill_path(&path, &paint(self.palette.hover), FillRule::Winding, view, None);
        }
    }

    fn draw_drag_rect(&self, target: &mut Pixmap, rect: Bounds, dpr: f32) {
        let Some(path) = rect_path(&rect) else {
            return;
        };
        let transform = Transform::from_scale(dpr, dpr);
        target.fill_path(&path, &paint(self.palette.drag_fill), FillRule::Winding, transform, None);
        target.stroke_path(
            &path,
            &paint(self.palette.drag_stroke),
            &Stroke::default(),
            transform,
            None,
        );
    }
}

fn paint(color: tiny_skia::Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

fn view_transform(viewport: &Viewport, dpr: f32) -> Transform {
    let scale = viewport.scale() * dpr;
    let offset = viewport.offset();
    Transform::from_row(scale, 0.0, 0.0, scale, offset.x * dpr, offset.y * dpr)
}

fn blit(target: &mut Pixmap, layer: &RasterLayer, viewport: &Viewport, dpr: f32, quality: FilterQuality) {
    let paint = PixmapPaint {
        quality,
        ..PixmapPaint::default()
    };
    target.draw_pixmap(
        0,
        0,
        layer.pixmap().as_ref(),
        &paint,
        layer.blit_transform(viewport, dpr),
        None,
    );
}
