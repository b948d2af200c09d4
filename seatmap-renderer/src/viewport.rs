//! Pan/zoom transform between world units and screen pixels.
//!
//! ```text
//! screen = offset + scale * world
//! world  = (screen - offset) / scale
//! ```
//!
//! Screen coordinates are CSS pixels; the device pixel ratio is applied
//! by the renderer only.

use seatmap_core::{Bounds, Point};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// Interaction constants for the viewport and gestures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportConfig {
    /// Scale from which panning and seat selection are enabled.
    pub min_interactive_scale: f32,
    /// Target scale of the click-to-zoom animation.
    pub click_zoom_scale: f32,
    /// Upper scale limit.
    pub max_scale: f32,
    /// Factor applied by one zoom-in/zoom-out step.
    pub zoom_step: f32,
    /// Duration of the click-to-zoom animation.
    pub zoom_animation_ms: u64,
    /// Taps ignored for this long after a pinch ends.
    pub pinch_cooldown_ms: u64,
    /// Pointer travel below which a press stays a tap.
    pub drag_threshold: f32,
    /// How far content may be dragged past the screen edge.
    pub overscroll_margin: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_interactive_scale: 2.0,
            click_zoom_scale: 3.5,
            max_scale: 5.0,
            zoom_step: 1.5,
            zoom_animation_ms: 300,
            pinch_cooldown_ms: 300,
            drag_threshold: 5.0,
            overscroll_margin: 48.0,
        }
    }
}

impl ViewportConfig {
    /// Check scale limits and thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Config`] when a scale is not positive, the
    /// zoom step does not zoom, the interactive or click-zoom scale lies
    /// above `max_scale`, or the click-zoom target would leave the map
    /// non-interactive.
    pub fn validate(&self) -> RenderResult<()> {
        let positive = |name: &str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(RenderError::Config(format!("{name} must be positive, got {value}")))
            }
        };
        positive("max scale", self.max_scale)?;
        positive("min interactive scale", self.min_interactive_scale)?;
        positive("click zoom scale", self.click_zoom_scale)?;

        if !self.zoom_step.is_finite() || self.zoom_step <= 1.0 {
            return Err(RenderError::Config(format!(
                "zoom step must be greater than 1, got {}",
                self.zoom_step
            )));
        }
        if self.min_interactive_scale > self.max_scale {
            return Err(RenderError::Config(format!(
                "min interactive scale {} exceeds max scale {}",
                self.min_interactive_scale, self.max_scale
            )));
        }
        if self.click_zoom_scale > self.max_scale
            || self.click_zoom_scale < self.min_interactive_scale
        {
            return Err(RenderError::Config(format!(
                "click zoom scale {} outside [{}, {}]",
                self.click_zoom_scale, self.min_interactive_scale, self.max_scale
            )));
        }
        for (name, value) in [
            ("drag threshold", self.drag_threshold),
            ("overscroll margin", self.overscroll_margin),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(RenderError::Config(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Current pan/zoom state over a fixed world rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    config: ViewportConfig,
    scale: f32,
    offset: Point,
    world: Bounds,
    screen_width: f32,
    screen_height: f32,
}

impl Viewport {
    /// Create a viewport showing the whole world centered on screen.
    #[must_use]
    pub fn new(config: ViewportConfig, world: Bounds, screen_width: f32, screen_height: f32) -> Self {
        let mut viewport = Self {
            config,
            scale: 1.0,
            offset: Point::default(),
            world,
            screen_width: screen_width.max(1.0),
            screen_height: screen_height.max(1.0),
        };
        viewport.reset_view();
        viewport
    }

    /// Interaction constants.
    #[must_use]
    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Current scale (screen pixels per world unit).
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Current translation in screen pixels.
    #[must_use]
    pub fn offset(&self) -> Point {
        self.offset
    }

    /// World rectangle covered by seats and legends.
    #[must_use]
    pub fn world_bounds(&self) -> Bounds {
        self.world
    }

    /// Screen size in CSS pixels.
    #[must_use]
    pub fn screen_size(&self) -> (f32, f32) {
        (self.screen_width, self.screen_height)
    }

    /// Screen center in CSS pixels.
    #[must_use]
    pub fn screen_center(&self) -> Point {
        Point::new(self.screen_width / 2.0, self.screen_height / 2.0)
    }

    /// Whether panning and seat selection are enabled at this scale.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.scale >= self.config.min_interactive_scale
    }

    /// Replace the world rectangle and fit it to the screen.
    pub fn set_world_bounds(&mut self, world: Bounds) {
        self.world = world;
        self.reset_view();
    }

    /// Map a world point to screen pixels.
    #[must_use]
    pub fn world_to_screen(&self, p: Point) -> Point {
        Point::new(
            self.offset.x + self.scale * p.x,
            self.offset.y + self.scale * p.y,
        )
    }

    /// Map a screen point to world units.
    #[must_use]
    pub fn screen_to_world(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.offset.x) / self.scale,
            (p.y - self.offset.y) / self.scale,
        )
    }

    /// Scale at which the whole world fits the screen.
    #[must_use]
    pub fn fit_scale(&self) -> f32 {
        let w = self.world.width().max(f32::EPSILON);
        let h = self.world.height().max(f32::EPSILON);
        let fit = (self.screen_width / w).min(self.screen_height / h);
        if fit.is_finite() && fit > 0.0 {
            fit
        } else {
            1.0
        }
    }

    /// Clamp a scale into `[fit, max]`.
    #[must_use]
    pub fn clamp_scale(&self, scale: f32) -> f32 {
        let max = self.config.max_scale;
        let min = self.fit_scale().min(max);
        scale.clamp(min, max)
    }

    /// Fit the world to the screen and center it.
    pub fn reset_view(&mut self) {
        self.scale = self.fit_scale();
        let center = self.world.center();
        let screen = self.screen_center();
        self.offset = Point::new(
            screen.x - self.scale * center.x,
            screen.y - self.scale * center.y,
        );
        tracing::debug!("Viewport reset to scale {:.3}", self.scale);
    }

    /// Zoom to `scale` keeping the world point under `anchor` fixed.
    pub fn zoom_about(&mut self, anchor: Point, scale: f32) {
        let world = self.screen_to_world(anchor);
        self.scale = self.clamp_scale(scale);
        self.offset = self.clamped_offset(
            self.scale,
            Point::new(
                anchor.x - world.x * self.scale,
                anchor.y - world.y * self.scale,
            ),
        );
    }

    /// One zoom step in, about the screen center.
    pub fn zoom_in(&mut self) {
        self.zoom_about(self.screen_center(), self.scale * self.config.zoom_step);
    }

    /// One zoom step out, about the screen center.
    pub fn zoom_out(&mut self) {
        self.zoom_about(self.screen_center(), self.scale / self.config.zoom_step);
    }

    /// Move the content by a screen delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        let target = Point::new(self.offset.x + dx, self.offset.y + dy);
        self.set_offset(target);
    }

    /// Set the translation, clamped to the overscroll margin.
    pub fn set_offset(&mut self, offset: Point) {
        self.offset = self.clamped_offset(self.scale, offset);
    }

    /// Set scale and offset verbatim; used while animating.
    pub fn set_transform(&mut self, scale: f32, offset: Point) {
        if scale.is_finite() && scale > 0.0 && offset.is_finite() {
            self.scale = scale;
            self.offset = offset;
        }
    }

    /// Adapt to a new screen size, keeping the centered world point.
    pub fn resize(&mut self, screen_width: f32, screen_height: f32) {
        let focus = self.screen_to_world(self.screen_center());
        self.screen_width = screen_width.max(1.0);
        self.screen_height = screen_height.max(1.0);
        self.scale = self.clamp_scale(self.scale);
        let center = self.screen_center();
        self.offset = self.clamped_offset(
            self.scale,
            Point::new(center.x - focus.x * self.scale, center.y - focus.y * self.scale),
        );
    }

    /// Transform the click-to-zoom animation ends at: the tapped world
    /// point centered at the click-zoom scale.
    #[must_use]
    pub fn click_zoom_target(&self, tap: Point) -> (f32, Point) {
        let world = self.screen_to_world(tap);
        let scale = self.clamp_scale(self.config.click_zoom_scale);
        let center = self.screen_center();
        let offset = self.clamped_offset(
            scale,
            Point::new(center.x - world.x * scale, center.y - world.y * scale),
        );
        (scale, offset)
    }

    /// Clamp an offset so the content keeps at least the overscroll
    /// margin inside the screen on every side.
    #[must_use]
    pub fn clamped_offset(&self, scale: f32, offset: Point) -> Point {
        let margin = self.config.overscroll_margin;
        let axis = |value: f32, screen: f32, min: f32, max: f32| {
            let a = screen - margin - scale * max;
            let b = margin - scale * min;
            value.clamp(a.min(b), a.max(b))
        };
        Point::new(
            axis(offset.x, self.screen_width, self.world.min_x, self.world.max_x),
            axis(offset.y, self.screen_height, self.world.min_y, self.world.max_y),
        )
    }
}

/// Quartic ease-out: fast start, soft landing.
#[must_use]
pub fn ease_out_quart(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(4)
}

/// A running click-to-zoom animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedZoom {
    start_ms: u64,
    duration_ms: u64,
    from_scale: f32,
    from_offset: Point,
    to_scale: f32,
    to_offset: Point,
}

impl AnimatedZoom {
    /// Animate from the viewport's current transform toward a target.
    #[must_use]
    pub fn new(viewport: &Viewport, to_scale: f32, to_offset: Point, start_ms: u64) -> Self {
        Self {
            start_ms,
            duration_ms: viewport.config().zoom_animation_ms,
            from_scale: viewport.scale(),
            from_offset: viewport.offset(),
            to_scale,
            to_offset,
        }
    }

    /// Target transform.
    #[must_use]
    pub fn target(&self) -> (f32, Point) {
        (self.to_scale, self.to_offset)
    }

    /// Transform at `now_ms` and whether the animation has finished.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn sample(&self, now_ms: u64) -> (f32, Point, bool) {
        let elapsed = now_ms.saturating_sub(self.start_ms);
        if self.duration_ms == 0 || elapsed >= self.duration_ms {
            return (self.to_scale, self.to_offset, true);
        }
        let k = ease_out_quart(elapsed as f32 / self.duration_ms as f32);
        let lerp = |a: f32, b: f32| a + (b - a) * k;
        (
            lerp(self.from_scale, self.to_scale),
            Point::new(
                lerp(self.from_offset.x, self.to_offset.x),
                lerp(self.from_offset.y, self.to_offset.y),
            ),
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(
            ViewportConfig::default(),
            Bounds::new(0.0, 0.0, 1000.0, 500.0),
            800.0,
            600.0,
        )
    }

    #[test]
    fn test_config_validation() {
        assert!(ViewportConfig::default().validate().is_ok());

        let broken = [
            ViewportConfig {
                zoom_step: 0.0,
                ..ViewportConfig::default()
            },
            ViewportConfig {
                zoom_step: 1.0,
                ..ViewportConfig::default()
            },
            ViewportConfig {
                max_scale: 0.0,
                ..ViewportConfig::default()
            },
            ViewportConfig {
                min_interactive_scale: 6.0,
                ..ViewportConfig::default()
            },
            ViewportConfig {
                click_zoom_scale: 1.5,
                ..ViewportConfig::default()
            },
            ViewportConfig {
                drag_threshold: f32::NAN,
                ..ViewportConfig::default()
            },
        ];
        for config in broken {
            assert!(
                matches!(config.validate(), Err(RenderError::Config(_))),
                "{config:?} accepted"
            );
        }
    }

    #[test]
    fn test_fit_and_center() {
        let vp = viewport();
        assert!((vp.scale() - 0.8).abs() < 1e-6);
        let center = vp.world_to_screen(Point::new(500.0, 250.0));
        assert!((center.x - 400.0).abs() < 1e-3);
        assert!((center.y - 300.0).abs() < 1e-3);
        assert!(!vp.is_interactive());
    }

    #[test]
    fn test_screen_world_round_trip() {
        let mut vp = viewport();
        vp.zoom_about(Point::new(123.0, 77.0), 3.3);
        for p in [Point::new(0.0, 0.0), Point::new(512.5, 31.25), Point::new(-40.0, 900.0)] {
            let back = vp.screen_to_world(vp.world_to_screen(p));
            assert!(back.distance(p) < 1e-3, "{p:?} -> {back:?}");
        }
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut vp = viewport();
        let anchor = Point::new(400.0, 300.0);
        let before = vp.screen_to_world(anchor);
        vp.zoom_about(anchor, 4.0);
        let after = vp.screen_to_world(anchor);
        assert!(before.distance(after) < 1e-3);
        assert!((vp.scale() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_scale_is_clamped() {
        let mut vp = viewport();
        vp.zoom_about(vp.screen_center(), 50.0);
        assert!((vp.scale() - 5.0).abs() < 1e-6);
        vp.zoom_about(vp.screen_center(), 0.01);
        assert!((vp.scale() - vp.fit_scale()).abs() < 1e-6);
    }

    #[test]
    fn test_pan_is_clamped_to_margin() {
        let mut vp = viewport();
        vp.zoom_about(vp.screen_center(), 4.0);
        vp.pan_by(1.0e6, 0.0);
        // Left world edge may move at most `margin` into the screen.
        let left = vp.world_to_screen(Point::new(0.0, 0.0));
        assert!((left.x - 48.0).abs() < 1e-3);
        vp.pan_by(-1.0e7, 0.0);
        let right = vp.world_to_screen(Point::new(1000.0, 0.0));
        assert!((right.x - (800.0 - 48.0)).abs() < 1e-2);
    }

    #[test]
    fn test_zoom_steps() {
        let mut vp = viewport();
        let fit = vp.scale();
        vp.zoom_in();
        assert!((vp.scale() - fit * 1.5).abs() < 1e-5);
        vp.zoom_out();
        assert!((vp.scale() - fit).abs() < 1e-5);
    }

    #[test]
    fn test_easing_endpoints() {
        assert!(ease_out_quart(0.0).abs() < f32::EPSILON);
        assert!((ease_out_quart(1.0) - 1.0).abs() < f32::EPSILON);
        assert!(ease_out_quart(0.5) > 0.9);
    }

    #[test]
    fn test_animation_reaches_target() {
        let vp = viewport();
        let (scale, offset) = vp.click_zoom_target(Point::new(400.0, 300.0));
        let anim = AnimatedZoom::new(&vp, scale, offset, 1_000);

        let (mid_scale, _, done) = anim.sample(1_150);
        assert!(!done);
        assert!(mid_scale > vp.scale() && mid_scale < scale);

        let (end_scale, end_offset, done) = anim.sample(1_300);
        assert!(done);
        assert!((end_scale - 3.5).abs() < 1e-6);
        assert_eq!(end_offset, offset);
    }

    #[test]
    fn test_resize_keeps_center() {
        let mut vp = viewport();
        vp.zoom_about(vp.screen_center(), 3.0);
        let focus = vp.screen_to_world(vp.screen_center());
        vp.resize(1024.0, 768.0);
        let after = vp.screen_to_world(vp.screen_center());
        assert!(focus.distance(after) < 1e-2);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone, Copy)]
        enum Step {
            ZoomIn,
            ZoomOut,
            Pan(f32, f32),
            ZoomAbout(f32, f32, f32),
            Resize(f32, f32),
        }

        fn arb_step() -> impl Strategy<Value = Step> {
            prop_oneof![
                Just(Step::ZoomIn),
                Just(Step::ZoomOut),
                (-500.0f32..500.0, -500.0f32..500.0).prop_map(|(dx, dy)| Step::Pan(dx, dy)),
                (0.0f32..1000.0, 0.0f32..1000.0, 0.1f32..8.0)
                    .prop_map(|(x, y, s)| Step::ZoomAbout(x, y, s)),
                (100.0f32..2000.0, 100.0f32..2000.0).prop_map(|(w, h)| Step::Resize(w, h)),
            ]
        }

        proptest! {
            #[test]
            fn prop_screen_world_round_trip(
                origin in (-1000.0f32..1000.0, -1000.0f32..1000.0),
                size in (1.0f32..2000.0, 1.0f32..2000.0),
                screen in (100.0f32..2000.0, 100.0f32..2000.0),
                steps in prop::collection::vec(arb_step(), 0..8),
                p in (-5000.0f32..5000.0, -5000.0f32..5000.0),
            ) {
                let world = Bounds::from_xywh(origin.0, origin.1, size.0, size.1);
                let mut vp = Viewport::new(ViewportConfig::default(), world, screen.0, screen.1);
                for step in steps {
                    match step {
                        Step::ZoomIn => vp.zoom_in(),
                        Step::ZoomOut => vp.zoom_out(),
                        Step::Pan(dx, dy) => vp.pan_by(dx, dy),
                        Step::ZoomAbout(x, y, s) => vp.zoom_about(Point::new(x, y), vp.scale() * s),
                        Step::Resize(w, h) => vp.resize(w, h),
                    }
                }

                let point = Point::new(p.0, p.1);
                let back = vp.screen_to_world(vp.world_to_screen(point));
                let offset = vp.offset();
                let magnitude = 1.0
                    + p.0.abs().max(p.1.abs())
                    + offset.x.abs().max(offset.y.abs()) / vp.scale();
                prop_assert!(
                    point.distance(back) <= 1e-5 * magnitude,
                    "{:?} came back as {:?} at scale {}", point, back, vp.scale()
                );
                prop_assert!(vp.scale().is_finite() && vp.scale() > 0.0);
            }
        }
    }
}
