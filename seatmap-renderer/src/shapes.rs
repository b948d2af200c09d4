//! Conversion of seat and legend geometry into tiny-skia paths.

use seatmap_core::{arc_to_cubics, Bounds, PathSegment, ShapeGeometry};
use tiny_skia::{Color, Path, PathBuilder, Rect};

/// Cubic approximation constant for a quarter circle.
const KAPPA: f32 = 0.552_284_8;

/// Build a raster path for a shape, in world units.
///
/// Returns `None` for degenerate shapes that enclose no area.
#[must_use]
pub fn shape_path(shape: &ShapeGeometry) -> Option<Path> {
    let mut pb = PathBuilder::new();
    push_shape(&mut pb, shape);
    pb.finish()
}

/// Append a shape to an existing builder.
///
/// Seats of one color are batched into a single path this way.
pub fn push_shape(pb: &mut PathBuilder, shape: &ShapeGeometry) {
    match shape {
        ShapeGeometry::Rect {
            bounds,
            corner_radius,
        } => push_rect(pb, bounds, *corner_radius),
        ShapeGeometry::Path { segments } => push_segments(pb, segments),
    }
}

fn push_rect(pb: &mut PathBuilder, bounds: &Bounds, corner_radius: f32) {
    let r = corner_radius
        .min(bounds.width() / 2.0)
        .min(bounds.height() / 2.0)
        .max(0.0);
    if r <= f32::EPSILON {
        if let Some(rect) = Rect::from_ltrb(bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y)
        {
            pb.push_rect(rect);
        }
        return;
    }

    let (l, t, rt, b) = (bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y);
    let k = r * KAPPA;
    pb.move_to(l + r, t);
    pb.line_to(rt - r, t);
    pb.cubic_to(rt - r + k, t, rt, t + r - k, rt, t + r);
    pb.line_to(rt, b - r);
    pb.cubic_to(rt, b - r + k, rt - r + k, b, rt - r, b);
    pb.line_to(l + r, b);
    pb.cubic_to(l + r - k, b, l, b - r + k, l, b - r);
    pb.line_to(l, t + r);
    pb.cubic_to(l, t + r - k, l + r - k, t, l + r, t);
    pb.close();
}

fn push_segments(pb: &mut PathBuilder, segments: &[PathSegment]) {
    for segment in segments {
        match *segment {
            PathSegment::MoveTo { to } => pb.move_to(to.x, to.y),
            PathSegment::LineTo { to } => pb.line_to(to.x, to.y),
            PathSegment::QuadTo { ctrl, to } => pb.quad_to(ctrl.x, ctrl.y, to.x, to.y),
            PathSegment::CubicTo { ctrl1, ctrl2, to } => {
                pb.cubic_to(ctrl1.x, ctrl1.y, ctrl2.x, ctrl2.y, to.x, to.y);
            }
            PathSegment::ArcTo {
                from,
                radii,
                x_rotation,
                large_arc,
                sweep,
                to,
            } => match arc_to_cubics(from, radii, x_rotation, large_arc, sweep, to) {
                Some(cubics) => {
                    for [c1, c2, end] in cubics {
                        pb.cubic_to(c1.x, c1.y, c2.x, c2.y, end.x, end.y);
                    }
                }
                None => pb.line_to(to.x, to.y),
            },
            PathSegment::Close => pb.close(),
        }
    }
}

/// Checkmark glyph inside a seat's bounds, for stroking.
#[must_use]
pub fn checkmark_path(bounds: &Bounds) -> Option<Path> {
    let at = |fx: f32, fy: f32| {
        (
            bounds.min_x + bounds.width() * fx,
            bounds.min_y + bounds.height() * fy,
        )
    };
    let mut pb = PathBuilder::new();
    let (x, y) = at(0.25, 0.52);
    pb.move_to(x, y);
    let (x, y) = at(0.43, 0.70);
    pb.line_to(x, y);
    let (x, y) = at(0.76, 0.32);
    pb.line_to(x, y);
    pb.finish()
}

/// Axis-aligned rectangle path; `None` for empty or non-finite bounds.
#[must_use]
pub fn rect_path(bounds: &Bounds) -> Option<Path> {
    Rect::from_ltrb(bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y)
        .map(PathBuilder::from_rect)
}

/// Parse a CSS-style color: `#rgb`, `#rrggbb`, `#rrggbbaa`,
/// `rgb(r, g, b)`, `rgba(r, g, b, a)` or a handful of keywords.
#[must_use]
pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }

    let lower = value.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        let channel = |s: &str| s.parse::<u8>().ok();
        return match parts.as_slice() {
            [r, g, b] => Some(Color::from_rgba8(channel(*r)?, channel(*g)?, channel(*b)?, 255)),
            [r, g, b, a] => {
                let alpha = a.parse::<f32>().ok()?.clamp(0.0, 1.0);
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let alpha = (alpha * 255.0).round() as u8;
                Some(Color::from_rgba8(channel(*r)?, channel(*g)?, channel(*b)?, alpha))
            }
            _ => None,
        };
    }

    match lower.as_str() {
        "black" => Some(Color::BLACK),
        "white" => Some(Color::WHITE),
        "transparent" => Some(Color::TRANSPARENT),
        "red" => Some(Color::from_rgba8(255, 0, 0, 255)),
        "green" => Some(Color::from_rgba8(0, 128, 0, 255)),
        "blue" => Some(Color::from_rgba8(0, 0, 255, 255)),
        "gray" | "grey" => Some(Color::from_rgba8(128, 128, 128, 255)),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let byte = |s: &str| u8::from_str_radix(s, 16).ok();
    let nibble = |s: &str| byte(s).map(|v| v * 17);
    match hex.len() {
        3 => Some(Color::from_rgba8(
            nibble(&hex[0..1])?,
            nibble(&hex[1..2])?,
            nibble(&hex[2..3])?,
            255,
        )),
        6 => Some(Color::from_rgba8(
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
            255,
        )),
        8 => Some(Color::from_rgba8(
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
            byte(&hex[6..8])?,
        )),
        _ => None,
    }
}
