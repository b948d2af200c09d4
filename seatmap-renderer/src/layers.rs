//! Cached raster layers for seats.
//!
//! Two world-aligned pixmaps are kept: the base layer with every free
//! seat in its group color and the blocked layer with every unavailable
//! seat. Each is rebuilt only when its invalidation flag is set; the
//! raster resolution follows the largest scale seen so far and only
//! grows in steps, so zooming does not re-rasterize on every tick.

use std::collections::{BTreeMap, HashMap};

use seatmap_core::{BlockedSet, Bounds, GroupId, Point, Seat, SeatGroup, SeatMapDocument};
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::shapes::{parse_color, push_shape};
use crate::style::Palette;
use crate::viewport::Viewport;
use crate::{RenderError, RenderResult, RendererConfig};

/// Which cached layers must be rebuilt before the next blit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Invalidation {
    /// Group colors or mode changed.
    pub base: bool,
    /// Effective blocked set or mode changed.
    pub blocked: bool,
    /// Raster resolution tier changed; implies both layers.
    pub resolution: bool,
}

impl Invalidation {
    /// Everything dirty.
    pub const ALL: Self = Self {
        base: true,
        blocked: true,
        resolution: true,
    };

    /// Whether any flag is set.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.base || self.blocked || self.resolution
    }
}

/// Rebuild counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerStats {
    /// Base layer rasterizations.
    pub base_rebuilds: u64,
    /// Blocked layer rasterizations.
    pub blocked_rebuilds: u64,
    /// Resolution tier increases.
    pub resolution_changes: u64,
    /// Frames that skipped a pending rebuild because a gesture was running.
    pub deferred_frames: u64,
}

/// One rasterized layer and how it maps back to world units.
#[derive(Debug, Clone)]
pub struct RasterLayer {
    pixmap: Pixmap,
    scale: f32,
    origin: Point,
}

impl RasterLayer {
    /// The raster.
    #[must_use]
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Raster pixels per world unit.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// World point at raster pixel (0, 0).
    #[must_use]
    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Transform that draws this raster at the viewport's live transform.
    #[must_use]
    pub fn blit_transform(&self, viewport: &Viewport, device_pixel_ratio: f32) -> Transform {
        let scale = viewport.scale();
        let offset = viewport.offset();
        let k = device_pixel_ratio * scale / self.scale;
        Transform::from_row(
            k,
            0.0,
            0.0,
            k,
            device_pixel_ratio * (offset.x + scale * self.origin.x),
            device_pixel_ratio * (offset.y + scale * self.origin.y),
        )
    }
}

/// What the layers are rasterized from.
#[derive(Debug, Clone, Copy)]
pub struct LayerInput<'a> {
    /// Loaded seats.
    pub document: &'a SeatMapDocument,
    /// Effective blocked set.
    pub blocked: &'a BlockedSet,
    /// Seat groups, for colors.
    pub groups: &'a [SeatGroup],
    /// Whether wheelchair-family seats are selectable.
    pub wheelchair_mode: bool,
}

/// Whether a seat can be selected in the given mode.
#[must_use]
pub fn is_selectable_type(seat: &Seat, wheelchair_mode: bool) -> bool {
    wheelchair_mode || !seat.seat_type.is_wheelchair_family()
}

/// Base and blocked raster layers with their invalidation table.
#[derive(Debug, Clone)]
pub struct LayerCache {
    base: Option<RasterLayer>,
    blocked: Option<RasterLayer>,
    dirty: Invalidation,
    cached_max_scale: f32,
    stats: LayerStats,
}

impl Default for LayerCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerCache {
    /// Create an empty cache; the first rebuild rasterizes everything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: None,
            blocked: None,
            dirty: Invalidation::ALL,
            cached_max_scale: 0.0,
            stats: LayerStats::default(),
        }
    }

    /// Drop both layers and the resolution tier, e.g. for a new document.
    pub fn reset(&mut self) {
        self.base = None;
        self.blocked = None;
        self.dirty = Invalidation::ALL;
        self.cached_max_scale = 0.0;
    }

    /// Mark the base layer stale.
    pub fn invalidate_base(&mut self) {
        self.dirty.base = true;
    }

    /// Mark the blocked layer stale.
    pub fn invalidate_blocked(&mut self) {
        self.dirty.blocked = true;
    }

    /// Mark both layers stale at the current resolution.
    pub fn invalidate_all(&mut self) {
        self.dirty.base = true;
        self.dirty.blocked = true;
    }

    /// Force re-rasterization at a freshly computed resolution.
    pub fn invalidate_resolution(&mut self) {
        self.dirty.resolution = true;
    }

    /// Pending invalidation flags.
    #[must_use]
    pub fn dirty(&self) -> Invalidation {
        self.dirty
    }

    /// Whether a rebuild is pending.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.any()
    }

    /// Largest viewport scale the resolution tier was chosen for.
    #[must_use]
    pub fn cached_max_scale(&self) -> f32 {
        self.cached_max_scale
    }

    /// Rebuild counters.
    #[must_use]
    pub fn stats(&self) -> &LayerStats {
        &self.stats
    }

    /// Base layer, if rasterized.
    #[must_use]
    pub fn base(&self) -> Option<&RasterLayer> {
        self.base.as_ref()
    }

    /// Blocked layer, if rasterized.
    #[must_use]
    pub fn blocked(&self) -> Option<&RasterLayer> {
        self.blocked.as_ref()
    }

    /// Feed the live viewport scale; bumps the resolution tier when the
    /// scale exceeds `step` times the cached one.
    pub fn observe_scale(&mut self, live_scale: f32, step: f32) -> bool {
        if !live_scale.is_finite() || live_scale <= 0.0 {
            return false;
        }
        if self.cached_max_scale > 0.0 && live_scale <= self.cached_max_scale * step {
            return false;
        }
        tracing::debug!(
            "Raster resolution tier {:.3} -> {:.3}",
            self.cached_max_scale,
            live_scale
        );
        self.cached_max_scale = live_scale;
        self.dirty.resolution = true;
        self.stats.resolution_changes += 1;
        true
    }

    /// Record a frame that had to skip a pending rebuild.
    pub fn defer(&mut self) {
        self.stats.deferred_frames += 1;
    }

    /// Rebuild whatever is dirty.
    ///
    /// # Errors
    ///
    /// Returns an error if a pixmap cannot be allocated.
    pub fn rebuild(
        &mut self,
        input: &LayerInput<'_>,
        world: Bounds,
        palette: &Palette,
        config: &RendererConfig,
    ) -> RenderResult<()> {
        if !self.dirty.any() {
            return Ok(());
        }
        if self.cached_max_scale <= 0.0 {
            self.cached_max_scale = 1.0;
        }
        let resolution = self.dirty.resolution || self.base.is_none() || self.blocked.is_none();
        let (width, height, scale) = raster_size(
            world,
            config.device_pixel_ratio * self.cached_max_scale,
            config.max_texture_edge,
        );

        if resolution || self.dirty.base {
            self.base = Some(rasterize_base(input, world, palette, width, height, scale)?);
            self.stats.base_rebuilds += 1;
        }
        if resolution || self.dirty.blocked {
            self.blocked = Some(rasterize_blocked(input, world, palette, width, height, scale)?);
            self.stats.blocked_rebuilds += 1;
        }
        tracing::debug!(
            "Rebuilt layers {width}x{height} at {scale:.3} px/unit ({:?})",
            self.dirty
        );
        self.dirty = Invalidation::default();
        Ok(())
    }
}

/// Raster size for `world` at `target` px/unit, clamped to `max_edge`.
///
/// Returns `(width, height, applied_scale)`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn raster_size(world: Bounds, target: f32, max_edge: u32) -> (u32, u32, f32) {
    let target = if target.is_finite() && target > 0.0 { target } else { 1.0 };
    let w = world.width().max(f32::EPSILON) * target;
    let h = world.height().max(f32::EPSILON) * target;
    let max = max_edge.max(1) as f32;
    let factor = (max / w).min(max / h).min(1.0);
    let applied = target * factor;
    let width = (w * factor - 1e-3).ceil().clamp(1.0, max) as u32;
    let height = (h * factor - 1e-3).ceil().clamp(1.0, max) as u32;
    (width, height, applied)
}

fn new_layer(width: u32, height: u32, scale: f32, world: Bounds) -> RenderResult<RasterLayer> {
    let pixmap = Pixmap::new(width, height).ok_or(RenderError::Pixmap { width, height })?;
    Ok(RasterLayer {
        pixmap,
        scale,
        origin: Point::new(world.min_x, world.min_y),
    })
}

fn world_transform(layer: &RasterLayer) -> Transform {
    Transform::from_row(
        layer.scale,
        0.0,
        0.0,
        layer.scale,
        -layer.origin.x * layer.scale,
        -layer.origin.y * layer.scale,
    )
}

fn color_key(color: Color) -> [u8; 4] {
    let c = color.to_color_u8();
    [c.red(), c.green(), c.blue(), c.alpha()]
}

fn rasterize_base(
    input: &LayerInput<'_>,
    world: Bounds,
    palette: &Palette,
    width: u32,
    height: u32,
    scale: f32,
) -> RenderResult<RasterLayer> {
    let mut layer = new_layer(width, height, scale, world)?;
    let transform = world_transform(&layer);

    let group_colors: HashMap<&GroupId, Color> = input
        .groups
        .iter()
        .filter_map(|g| g.color.as_deref().and_then(parse_color).map(|c| (&g.id, c)))
        .collect();

    // One path per color keeps paint switches to a minimum.
    let mut batches: BTreeMap<[u8; 4], (Color, PathBuilder)> = BTreeMap::new();
    for seat in input.document.seats() {
        if input.blocked.contains(&seat.id) {
            continue;
        }
        let color = if is_selectable_type(seat, input.wheelchair_mode) {
            seat.group_id
                .as_ref()
                .and_then(|g| group_colors.get(g).copied())
                .or_else(|| seat.color.as_deref().and_then(parse_color))
                .unwrap_or(palette.seat)
        } else {
            palette.inactive_seat
        };
        let (_, pb) = batches
            .entry(color_key(color))
            .or_insert_with(|| (color, PathBuilder::new()));
        push_shape(pb, &seat.shape);
    }

    let batch_count = batches.len();
    for (_, (color, pb)) in batches {
        if let Some(path) = pb.finish() {
            let mut paint = Paint::default();
            paint.set_color(color);
            paint.anti_alias = true;
            layer
                .pixmap
                .fill_path(&path, &paint, FillRule::Winding, transform, None);
        }
    }
    tracing::trace!("Base layer drawn in {batch_count} color batches");
    Ok(layer)
}

fn rasterize_blocked(
    input: &LayerInput<'_>,
    world: Bounds,
    palette: &Palette,
    width: u32,
    height: u32,
    scale: f32,
) -> RenderResult<RasterLayer> {
    let mut layer = new_layer(width, height, scale, world)?;
    let transform = world_transform(&layer);

    let mut pb = PathBuilder::new();
    for seat in input.document.seats() {
        if input.blocked.contains(&seat.id) {
            push_shape(&mut pb, &seat.shape);
        }
    }

    if let Some(path) = pb.finish() {
        let mut paint = Paint::default();
        paint.set_color(palette.blocked_for(input.wheelchair_mode));
        paint.anti_alias = true;
        layer
            .pixmap
            .fill_path(&path, &paint, FillRule::Winding, transform, None);
        // One raster pixel wide, hides seams when the layer is scaled down.
        let stroke = Stroke {
            width: 1.0 / scale,
            ..Stroke::default()
        };
        layer
            .pixmap
            .stroke_path(&path, &paint, &stroke, transform, None);
    }
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatmap_core::{ConstraintPropagator, PropagationInput, RowRef, SeatId, SeatType};
    use std::collections::BTreeSet;

    fn document() -> SeatMapDocument {
        SeatMapDocument::from_parts(
            vec![
                Seat::new("A", RowRef::Number(1), 1, Bounds::from_xywh(0.0, 0.0, 10.0, 10.0))
                    .with_group("g"),
                Seat::new("B", RowRef::Number(1), 2, Bounds::from_xywh(20.0, 0.0, 10.0, 10.0))
                    .with_group("g"),
                Seat::new("W", RowRef::Number(1), 3, Bounds::from_xywh(40.0, 0.0, 10.0, 10.0))
                    .with_group("g")
                    .with_type(SeatType::Wheelchair),
            ],
            vec![],
        )
    }

    fn blocked(doc: &SeatMapDocument, ids: &[&str]) -> BlockedSet {
        let base: BTreeSet<SeatId> = ids.iter().map(|s| SeatId::from(*s)).collect();
        ConstraintPropagator::default().propagate(&PropagationInput {
            document: doc,
            base_blocked: &base,
            groups: &[],
            selected: &BTreeSet::new(),
        })
    }

    fn alpha_at(layer: &RasterLayer, world: Point) -> u8 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x, y) = (
            ((world.x - layer.origin().x) * layer.scale()) as u32,
            ((world.y - layer.origin().y) * layer.scale()) as u32,
        );
        layer.pixmap().pixel(x, y).map_or(0, |p| p.alpha())
    }

    #[test]
    fn test_raster_size_clamps_to_max_edge() {
        let world = Bounds::new(0.0, 0.0, 1000.0, 250.0);
        let (w, h, scale) = raster_size(world, 8.0, 4096);
        assert_eq!((w, h), (4096, 1024));
        assert!((scale - 4.096).abs() < 1e-4);

        let (w, h, scale) = raster_size(world, 2.0, 4096);
        assert_eq!((w, h), (2000, 500));
        assert!((scale - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_resolution_grows_in_steps() {
        let mut cache = LayerCache::new();
        assert!(cache.observe_scale(1.0, 1.25));
        assert!(!cache.observe_scale(1.2, 1.25));
        assert!(!cache.observe_scale(0.5, 1.25));
        assert!(cache.observe_scale(1.3, 1.25));
        assert!((cache.cached_max_scale() - 1.3).abs() < f32::EPSILON);
        assert_eq!(cache.stats().resolution_changes, 2);
    }

    #[test]
    fn test_layers_split_free_and_blocked_seats() {
        let doc = document();
        let blocked = blocked(&doc, &["B"]);
        let groups = [SeatGroup::new("g", "Parkett").with_color("#ff0000")];
        let config = RendererConfig::default();
        let palette = Palette::from_config(&config).expect("palette");
        let world = doc.world_bounds().expect("bounds");

        let mut cache = LayerCache::new();
        cache.observe_scale(1.0, config.resolution_step);
        cache
            .rebuild(
                &LayerInput {
                    document: &doc,
                    blocked: &blocked,
                    groups: &groups,
                    wheelchair_mode: false,
                },
                world,
                &palette,
                &config,
            )
            .expect("rebuild");
        assert!(!cache.is_dirty());

        let base = cache.base().expect("base");
        let blocked_layer = cache.blocked().expect("blocked");
        let a = Point::new(5.0, 5.0);
        let b = Point::new(25.0, 5.0);
        assert_eq!(alpha_at(base, a), 255);
        assert_eq!(alpha_at(base, b), 0);
        assert_eq!(alpha_at(blocked_layer, a), 0);
        assert_eq!(alpha_at(blocked_layer, b), 255);

        let red = base.pixmap().pixel(5, 5).expect("pixel");
        assert_eq!(red.red(), 255);
        // Wheelchair seat is free but drawn inactive outside wheelchair mode.
        let w = base.pixmap().pixel(45, 5).expect("pixel");
        assert_ne!(w.red(), 255);
    }

    #[test]
    fn test_only_dirty_layer_is_rebuilt() {
        let doc = document();
        let blocked = blocked(&doc, &[]);
        let config = RendererConfig::default();
        let palette = Palette::from_config(&config).expect("palette");
        let world = doc.world_bounds().expect("bounds");
        let input = LayerInput {
            document: &doc,
            blocked: &blocked,
            groups: &[],
            wheelchair_mode: false,
        };

        let mut cache = LayerCache::new();
        cache.rebuild(&input, world, &palette, &config).expect("rebuild");
        cache.invalidate_blocked();
        cache.rebuild(&input, world, &palette, &config).expect("rebuild");

        assert_eq!(cache.stats().base_rebuilds, 1);
        assert_eq!(cache.stats().blocked_rebuilds, 2);
    }
}
