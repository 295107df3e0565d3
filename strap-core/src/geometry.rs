//! Plane geometry primitives in logical canvas units.

use serde::{Deserialize, Serialize};

/// A point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Rect {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if a point is inside the rectangle (edges included).
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// A straight line segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start point.
    pub from: Point,
    /// End point.
    pub to: Point,
}

impl Segment {
    /// Create a segment.
    #[must_use]
    pub const fn new(from: Point, to: Point) -> Self {
        Self { from, to }
    }

    /// Segment length.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.from.distance(self.to)
    }
}

/// Number of chords used to approximate curve length.
const ARC_LENGTH_STEPS: usize = 64;

/// A quadratic Bézier curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadCurve {
    /// Start point.
    pub start: Point,
    /// Control point.
    pub control: Point,
    /// End point.
    pub end: Point,
}

impl QuadCurve {
    /// Create a curve.
    #[must_use]
    pub const fn new(start: Point, control: Point, end: Point) -> Self {
        Self {
            start,
            control,
            end,
        }
    }

    /// Point at parameter `t` in `[0, 1]`.
    #[must_use]
    pub fn point(&self, t: f32) -> Point {
        let u = 1.0 - t;
        Point::new(
            u * u * self.start.x + 2.0 * u * t * self.control.x + t * t * self.end.x,
            u * u * self.start.y + 2.0 * u * t * self.control.y + t * t * self.end.y,
        )
    }

    /// Derivative at parameter `t`.
    #[must_use]
    pub fn tangent(&self, t: f32) -> Point {
        let u = 1.0 - t;
        Point::new(
            2.0 * u * (self.control.x - self.start.x) + 2.0 * t * (self.end.x - self.control.x),
            2.0 * u * (self.control.y - self.start.y) + 2.0 * t * (self.end.y - self.control.y),
        )
    }

    /// Tangent direction at `t` in radians.
    #[must_use]
    pub fn angle(&self, t: f32) -> f32 {
        let d = self.tangent(t);
        d.y.atan2(d.x)
    }

    /// SVG path data (`M … Q …`).
    #[must_use]
    pub fn to_path_data(&self) -> String {
        format!(
            "M {} {} Q {} {} {} {}",
            self.start.x, self.start.y, self.control.x, self.control.y, self.end.x, self.end.y
        )
    }

    #[allow(clippy::cast_precision_loss)]
    fn samples(&self) -> impl Iterator<Item = (f32, Point)> + '_ {
        (0..=ARC_LENGTH_STEPS).map(move |i| {
            let t = i as f32 / ARC_LENGTH_STEPS as f32;
            (t, self.point(t))
        })
    }

    /// Polyline approximation of the curve length.
    #[must_use]
    pub fn arc_length(&self) -> f32 {
        let mut total = 0.0;
        let mut prev = self.start;
        for (_, p) in self.samples().skip(1) {
            total += prev.distance(p);
            prev = p;
        }
        total
    }

    /// Parameter `t` at which the curve has travelled `distance` units.
    ///
    /// Distances outside the curve are clamped to its ends.
    #[must_use]
    pub fn t_at_length(&self, distance: f32) -> f32 {
        if distance <= 0.0 {
            return 0.0;
        }
        let mut travelled = 0.0;
        let mut prev = (0.0, self.start);
        for (t, p) in self.samples().skip(1) {
            let step = prev.1.distance(p);
            if travelled + step >= distance {
                let frac = if step > 0.0 {
                    (distance - travelled) / step
                } else {
                    0.0
                };
                return prev.0 + (t - prev.0) * frac;
            }
            travelled += step;
            prev = (t, p);
        }
        1.0
    }

    /// Position and tangent angle at an arc-length distance from the start.
    #[must_use]
    pub fn position_at_length(&self, distance: f32) -> (Point, f32) {
        let t = self.t_at_length(distance);
        (self.point(t), self.angle(t))
    }
}
