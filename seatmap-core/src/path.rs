//! SVG path data parsing and bounding-box extraction.
//!
//! Path data is resolved into absolute [`PathSegment`]s once at load time.
//! The renderer turns the segments into raster paths; the geometry model
//! derives seat bounds from them.
//!
//! Bounds track every end point *and* every control point, arcs included
//! via their cubic approximation, so a curved seat outline is never
//! under-estimated. The result may be slightly
//! larger than the tight curve hull, which is fine for hit testing.

use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, Point};

/// One absolute path segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PathSegment {
    /// Start a new subpath.
    MoveTo {
        /// Target point.
        to: Point,
    },
    /// Straight line.
    LineTo {
        /// Target point.
        to: Point,
    },
    /// Quadratic Bézier.
    QuadTo {
        /// Control point.
        ctrl: Point,
        /// Target point.
        to: Point,
    },
    /// Cubic Bézier.
    CubicTo {
        /// First control point.
        ctrl1: Point,
        /// Second control point.
        ctrl2: Point,
        /// Target point.
        to: Point,
    },
    /// Elliptical arc in SVG endpoint parameterization.
    ArcTo {
        /// Start point (the cursor before this segment).
        from: Point,
        /// Radii (rx, ry).
        radii: Point,
        /// X-axis rotation in degrees.
        x_rotation: f32,
        /// Large-arc flag.
        large_arc: bool,
        /// Sweep flag.
        sweep: bool,
        /// Target point.
        to: Point,
    },
    /// Close the current subpath.
    Close,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            bytes: src.as_bytes(),
            src,
            pos: 0,
        }
    }

    fn skip_separators(&mut self) {
        while let Some(b) = self.bytes.get(self.pos) {
            if matches!(b, b' ' | b'\n' | b'\r' | b'\t' | b',') {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_separators();
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn number(&mut self) -> Option<f32> {
        self.skip_separators();
        let start = self.pos;
        let mut end = start;
        if matches!(self.bytes.get(end), Some(b'+' | b'-')) {
            end += 1;
        }
        let mut digits = 0;
        while self.bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
            digits += 1;
        }
        if self.bytes.get(end) == Some(&b'.') {
            end += 1;
            while self.bytes.get(end).is_some_and(u8::is_ascii_digit) {
                end += 1;
                digits += 1;
            }
        }
        if digits == 0 {
            return None;
        }
        if matches!(self.bytes.get(end), Some(b'e' | b'E')) {
            let mut exp_end = end + 1;
            if matches!(self.bytes.get(exp_end), Some(b'+' | b'-')) {
                exp_end += 1;
            }
            let exp_digits_start = exp_end;
            while self.bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
                exp_end += 1;
            }
            if exp_end > exp_digits_start {
                end = exp_end;
            }
        }
        let value = self.src[start..end].parse::<f32>().ok()?;
        self.pos = end;
        Some(value)
    }

    fn pair(&mut self) -> Option<Point> {
        let save = self.pos;
        let parsed = self
            .number()
            .and_then(|x| self.number().map(|y| Point::new(x, y)));
        if parsed.is_none() {
            self.pos = save;
        }
        parsed
    }

    /// Arc flags may be packed without separators (`a1 1 0 011 1`).
    fn flag(&mut self) -> Option<bool> {
        self.skip_separators();
        let flag = match self.peek()? {
            b'0' => false,
            b'1' => true,
            _ => return None,
        };
        self.pos += 1;
        Some(flag)
    }
}

/// Parse SVG path data into absolute segments.
///
/// Parsing stops at the first unsupported command or malformed
/// argument list; the segments read up to that point are kept.
#[must_use]
pub fn parse_path(d: &str) -> Vec<PathSegment> {
    let mut cur = Cursor::new(d);
    let mut segments = Vec::new();

    let mut pen = Point::default();
    let mut subpath_start = Point::default();
    let mut last_cubic_ctrl: Option<Point> = None;
    let mut last_quad_ctrl: Option<Point> = None;
    let mut command: Option<u8> = None;

    while !cur.at_end() {
        let Some(next) = cur.peek() else { break };
        if next.is_ascii_alphabetic() {
            command = Some(next);
            cur.pos += 1;
        } else if command.is_none() {
            tracing::warn!("path data does not start with a command: {d:?}");
            break;
        }
        let Some(cmd) = command else { break };
        let relative = cmd.is_ascii_lowercase();
        let base = if relative { pen } else { Point::default() };
        let offset = |p: Point| Point::new(base.x + p.x, base.y + p.y);

        let parsed = match cmd.to_ascii_uppercase() {
            b'M' => cur.pair().map(|p| {
                pen = offset(p);
                subpath_start = pen;
                // Extra coordinate pairs after a moveto are implicit linetos.
                command = Some(if relative { b'l' } else { b'L' });
                PathSegment::MoveTo { to: pen }
            }),
            b'L' => cur.pair().map(|p| {
                pen = offset(p);
                PathSegment::LineTo { to: pen }
            }),
            b'H' => cur.number().map(|x| {
                pen = Point::new(if relative { pen.x + x } else { x }, pen.y);
                PathSegment::LineTo { to: pen }
            }),
            b'V' => cur.number().map(|y| {
                pen = Point::new(pen.x, if relative { pen.y + y } else { y });
                PathSegment::LineTo { to: pen }
            }),
            b'C' => cur.pair().and_then(|c1| {
                let c2 = cur.pair()?;
                let to = cur.pair()?;
                let seg = PathSegment::CubicTo {
                    ctrl1: offset(c1),
                    ctrl2: offset(c2),
                    to: offset(to),
                };
                last_cubic_ctrl = Some(offset(c2));
                pen = offset(to);
                Some(seg)
            }),
            b'S' => cur.pair().and_then(|c2| {
                let to = cur.pair()?;
                let ctrl1 = reflect(last_cubic_ctrl, pen);
                let seg = PathSegment::CubicTo {
                    ctrl1,
                    ctrl2: offset(c2),
                    to: offset(to),
                };
                last_cubic_ctrl = Some(offset(c2));
                pen = offset(to);
                Some(seg)
            }),
            b'Q' => cur.pair().and_then(|c| {
                let to = cur.pair()?;
                let seg = PathSegment::QuadTo {
                    ctrl: offset(c),
                    to: offset(to),
                };
                last_quad_ctrl = Some(offset(c));
                pen = offset(to);
                Some(seg)
            }),
            b'T' => cur.pair().map(|to| {
                let ctrl = reflect(last_quad_ctrl, pen);
                let seg = PathSegment::QuadTo {
                    ctrl,
                    to: offset(to),
                };
                last_quad_ctrl = Some(ctrl);
                pen = offset(to);
                seg
            }),
            b'A' => cur.pair().and_then(|radii| {
                let x_rotation = cur.number()?;
                let large_arc = cur.flag()?;
                let sweep = cur.flag()?;
                let to = cur.pair()?;
                let seg = PathSegment::ArcTo {
                    from: pen,
                    radii: Point::new(radii.x.abs(), radii.y.abs()),
                    x_rotation,
                    large_arc,
                    sweep,
                    to: offset(to),
                };
                pen = offset(to);
                Some(seg)
            }),
            b'Z' => {
                pen = subpath_start;
                // Z takes no arguments, so it can never repeat implicitly.
                command = None;
                Some(PathSegment::Close)
            }
            other => {
                tracing::warn!("unsupported path command {:?}, skipping rest", other as char);
                break;
            }
        };

        let Some(segment) = parsed else {
            tracing::warn!(
                "malformed arguments for path command {:?} at offset {}",
                cmd as char,
                cur.pos
            );
            break;
        };

        if !matches!(segment, PathSegment::CubicTo { .. }) {
            last_cubic_ctrl = None;
        }
        if !matches!(segment, PathSegment::QuadTo { .. }) {
            last_quad_ctrl = None;
        }
        segments.push(segment);
    }

    segments
}

fn reflect(ctrl: Option<Point>, pen: Point) -> Point {
    ctrl.map_or(pen, |c| Point::new(2.0 * pen.x - c.x, 2.0 * pen.y - c.y))
}

/// Bounding box over every end and control point of the segments.
///
/// Arcs enter through their cubic approximation, so a bulge past the
/// end points is covered.
///
/// Returns `None` when the segments contain no finite point.
#[must_use]
pub fn path_bounds(segments: &[PathSegment]) -> Option<Bounds> {
    let mut points = Vec::with_capacity(segments.len() * 3);
    for segment in segments {
        match *segment {
            PathSegment::MoveTo { to } | PathSegment::LineTo { to } => points.push(to),
            PathSegment::QuadTo { ctrl, to } => points.extend([ctrl, to]),
            PathSegment::CubicTo { ctrl1, ctrl2, to } => points.extend([ctrl1, ctrl2, to]),
            PathSegment::ArcTo {
                from,
                radii,
                x_rotation,
                large_arc,
                sweep,
                to,
            } => {
                points.extend([from, to]);
                if let Some(cubics) = arc_to_cubics(from, radii, x_rotation, large_arc, sweep, to) {
                    points.extend(cubics.into_iter().flatten());
                }
            }
            PathSegment::Close => {}
        }
    }
    Bounds::from_points(points)
}

/// Convert an SVG endpoint arc into cubic Béziers `[ctrl1, ctrl2, end]`.
///
/// Returns `None` when the arc degenerates to a straight line (zero
/// radius) and an empty list when start and end coincide.
#[must_use]
pub fn arc_to_cubics(
    from: Point,
    radii: Point,
    x_rotation: f32,
    large_arc: bool,
    sweep: bool,
    to: Point,
) -> Option<Vec<[Point; 3]>> {
    if from == to {
        return Some(Vec::new());
    }
    let (mut rx, mut ry) = (radii.x.abs(), radii.y.abs());
    if rx <= f32::EPSILON || ry <= f32::EPSILON {
        return None;
    }

    let (sin, cos) = x_rotation.to_radians().sin_cos();
    let dx = (from.x - to.x) / 2.0;
    let dy = (from.y - to.y) / 2.0;
    let x1 = cos * dx + sin * dy;
    let y1 = -sin * dx + cos * dy;

    // Scale radii up when they cannot span the endpoints.
    let lambda = (x1 * x1) / (rx * rx) + (y1 * y1) / (ry * ry);
    if lambda > 1.0 {
        let s = lambda.sqrt();
        rx *= s;
        ry *= s;
    }

    let num = rx * rx * ry * ry - rx * rx * y1 * y1 - ry * ry * x1 * x1;
    let den = rx * rx * y1 * y1 + ry * ry * x1 * x1;
    let sign = if large_arc == sweep { -1.0 } else { 1.0 };
    let coef = sign * (num / den).max(0.0).sqrt();
    let cxp = coef * rx * y1 / ry;
    let cyp = -coef * ry * x1 / rx;
    let cx = cos * cxp - sin * cyp + (from.x + to.x) / 2.0;
    let cy = sin * cxp + cos * cyp + (from.y + to.y) / 2.0;

    let angle = |ux: f32, uy: f32, vx: f32, vy: f32| (ux * vy - uy * vx).atan2(ux * vx + uy * vy);
    let theta = angle(1.0, 0.0, (x1 - cxp) / rx, (y1 - cyp) / ry);
    let mut delta = angle(
        (x1 - cxp) / rx,
        (y1 - cyp) / ry,
        (-x1 - cxp) / rx,
        (-y1 - cyp) / ry,
    );
    if !sweep && delta > 0.0 {
        delta -= std::f32::consts::TAU;
    } else if sweep && delta < 0.0 {
        delta += std::f32::consts::TAU;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pieces = (delta.abs() / std::f32::consts::FRAC_PI_2 - 1e-3).ceil().max(1.0) as u32;
    #[allow(clippy::cast_precision_loss)]
    let step = delta / pieces as f32;
    let t = 4.0 / 3.0 * (step / 4.0).tan();

    let point = |a: f32| {
        let (s, c) = a.sin_cos();
        Point::new(
            cx + rx * c * cos - ry * s * sin,
            cy + rx * c * sin + ry * s * cos,
        )
    };
    let tangent = |a: f32| {
        let (s, c) = a.sin_cos();
        Point::new(-rx * s * cos - ry * c * sin, -rx * s * sin + ry * c * cos)
    };

    let mut cubics = Vec::with_capacity(pieces as usize);
    for i in 0..pieces {
        #[allow(clippy::cast_precision_loss)]
        let a1 = theta + step * i as f32;
        let a2 = a1 + step;
        let (p1, d1) = (point(a1), tangent(a1));
        let (p2, d2) = (point(a2), tangent(a2));
        let end = if i + 1 == pieces { to } else { p2 };
        cubics.push([
            Point::new(p1.x + t * d1.x, p1.y + t * d1.y),
            Point::new(p2.x - t * d2.x, p2.y - t * d2.y),
            end,
        ]);
    }
    Some(cubics)
}
