//! World-space geometry primitives shared by parsing, hit testing and rendering.

use serde::{Deserialize, Serialize};

/// A 2D point in world or screen units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(&self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Midpoint between two points.
    #[must_use]
    pub fn midpoint(&self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Whether both coordinates are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle given by its min and max corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    pub min_x: f32,
    /// Top edge.
    pub min_y: f32,
    /// Right edge.
    pub max_x: f32,
    /// Bottom edge.
    pub max_y: f32,
}

impl Bounds {
    /// Box used when a shape yields no finite extent.
    pub const FALLBACK: Bounds = Bounds {
        min_x: 0.0,
        min_y: 0.0,
        max_x: 10.0,
        max_y: 10.0,
    };

    /// Create bounds from its edges.
    #[must_use]
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create bounds from an origin and a size.
    #[must_use]
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Create normalized bounds spanning two arbitrary corners.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    /// Smallest box containing every finite point, or `None` if there is none.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut bounds: Option<Bounds> = None;
        for p in points.into_iter().filter(Point::is_finite) {
            match bounds.as_mut() {
                Some(b) => b.include_point(p),
                None => bounds = Some(Self::new(p.x, p.y, p.x, p.y)),
            }
        }
        bounds
    }

    /// Grow the box to cover a point.
    pub fn include_point(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    /// Smallest box covering both boxes.
    #[must_use]
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Width of the box.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    /// Height of the box.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Box midpoint.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Whether all four edges are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::FALLBACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points_skips_non_finite() {
        let b = Bounds::from_points([
            Point::new(f32::NAN, 0.0),
            Point::new(2.0, 3.0),
            Point::new(-1.0, 8.0),
        ])
        .expect("finite points");
        assert_eq!(b, Bounds::new(-1.0, 3.0, 2.0, 8.0));
    }

    #[test]
    fn test_from_points_empty() {
        assert!(Bounds::from_points(std::iter::empty()).is_none());
        assert!(Bounds::from_points([Point::new(f32::INFINITY, 1.0)]).is_none());
    }

    #[test]
    fn test_center_and_contains() {
        let b = Bounds::from_xywh(10.0, 20.0, 4.0, 6.0);
        assert_eq!(b.center(), Point::new(12.0, 23.0));
        assert!(b.contains(Point::new(14.0, 26.0)));
        assert!(!b.contains(Point::new(14.1, 26.0)));
    }

    #[test]
    fn test_from_corners_normalizes() {
        let b = Bounds::from_corners(Point::new(5.0, 1.0), Point::new(1.0, 5.0));
        assert_eq!(b, Bounds::new(1.0, 1.0, 5.0, 5.0));
    }
}
