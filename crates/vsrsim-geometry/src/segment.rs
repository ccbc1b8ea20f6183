use serde::{Deserialize, Serialize};

use crate::point::{Point, PointExt};

/// Straight segment between two points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub p1: Point,
    pub p2: Point,
}

impl Segment {
    pub fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    pub fn center(&self) -> Point {
        (self.p1 + self.p2) / 2.0
    }

    pub fn length(&self) -> f64 {
        self.p1.distance(self.p2)
    }

    /// Direction from `p1` to `p2`
    pub fn direction(&self) -> f64 {
        (self.p2 - self.p1).direction()
    }

    /// Y coordinate of the segment at `x`, if the segment spans `x`
    ///
    /// Vertical segments return their highest point.
    pub fn y_at_x(&self, x: f64) -> Option<f64> {
        let (lo, hi) = if self.p1.x <= self.p2.x {
            (self.p1, self.p2)
        } else {
            (self.p2, self.p1)
        };
        if x < lo.x || x > hi.x {
            return None;
        }
        let dx = hi.x - lo.x;
        if dx.abs() < f64::EPSILON {
            return Some(lo.y.max(hi.y));
        }
        Some(lo.y + (hi.y - lo.y) * (x - lo.x) / dx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_and_length() {
        let s = Segment::new(Point::new(0.0, 0.0), Point::new(3.0, 4.0));
        assert_eq!(s.length(), 5.0);
        assert_eq!(s.center(), Point::new(1.5, 2.0));
    }

    #[test]
    fn test_y_at_x() {
        let s = Segment::new(Point::new(2.0, 2.0), Point::new(0.0, 0.0));
        assert_eq!(s.y_at_x(1.0), Some(1.0));
        assert_eq!(s.y_at_x(3.0), None);

        let vertical = Segment::new(Point::new(1.0, 0.0), Point::new(1.0, 5.0));
        assert_eq!(vertical.y_at_x(1.0), Some(5.0));
    }
}
