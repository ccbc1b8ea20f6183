//! Simple polygons

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::point::{Point, PointExt};
use crate::range::DoubleRange;
use crate::segment::Segment;

/// Closed polygon given by its vertices; the last vertex connects to the first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poly {
    vertices: Vec<Point>,
}

impl Poly {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned rectangle spanning `min` to `max`, counter-clockwise from `min`
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::new(vec![
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ])
    }

    /// Axis-aligned square of side `side` centered at `center`
    pub fn square(center: Point, side: f64) -> Self {
        let half = Point::splat(side / 2.0);
        Self::rectangle(center - half, center + half)
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Mean of the vertices
    pub fn center(&self) -> Point {
        if self.vertices.is_empty() {
            return Point::ZERO;
        }
        self.vertices.iter().copied().sum::<Point>() / self.vertices.len() as f64
    }

    /// Absolute area (shoelace formula)
    pub fn area(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum();
        twice.abs() / 2.0
    }

    /// Edge `i`, from vertex `i` to vertex `i + 1` (wrapping)
    pub fn side(&self, i: usize) -> Option<Segment> {
        let n = self.vertices.len();
        if i >= n || n < 2 {
            return None;
        }
        Some(Segment::new(self.vertices[i], self.vertices[(i + 1) % n]))
    }

    pub fn sides(&self) -> impl Iterator<Item = Segment> + '_ {
        (0..self.vertices.len()).filter_map(move |i| self.side(i))
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.vertices)
    }

    pub fn translated(&self, delta: Point) -> Self {
        Self::new(self.vertices.iter().map(|v| *v + delta).collect())
    }

    pub fn rotated_around(&self, pivot: Point, angle: f64) -> Self {
        Self::new(
            self.vertices
                .iter()
                .map(|v| v.rotated_around(pivot, angle))
                .collect(),
        )
    }

    /// Highest boundary point at `x`, `None` if `x` is outside the polygon's span
    pub fn max_y_at_x(&self, x: f64) -> Option<f64> {
        self.sides()
            .filter_map(|s| s.y_at_x(x))
            .fold(None, |acc: Option<f64>, y| Some(acc.map_or(y, |m| m.max(y))))
    }

    /// Highest boundary point over the closed interval `range` of x values
    pub fn max_y_in_x_range(&self, range: DoubleRange) -> Option<f64> {
        let mut max: Option<f64> = None;
        let mut consider = |y: f64| max = Some(max.map_or(y, |m| m.max(y)));
        for side in self.sides() {
            let lo = side.p1.x.min(side.p2.x);
            let hi = side.p1.x.max(side.p2.x);
            let from = lo.max(range.min);
            let to = hi.min(range.max);
            if from > to {
                continue;
            }
            // linear along the segment: the maximum is at one of the clipped ends
            if let Some(y) = side.y_at_x(from) {
                consider(y);
            }
            if let Some(y) = side.y_at_x(to) {
                consider(y);
            }
        }
        max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_area_and_center() {
        let sq = Poly::square(Point::new(1.0, 2.0), 2.0);
        assert_eq!(sq.area(), 4.0);
        assert_eq!(sq.center(), Point::new(1.0, 2.0));
        assert_eq!(sq.sides().count(), 4);
        let bb = sq.bounding_box().unwrap();
        assert_eq!(bb.min, Point::new(0.0, 1.0));
    }

    #[test]
    fn test_max_y_at_x_on_triangle() {
        let tri = Poly::new(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(2.0, 2.0),
        ]);
        assert_eq!(tri.max_y_at_x(2.0), Some(2.0));
        assert_eq!(tri.max_y_at_x(1.0), Some(1.0));
        assert_eq!(tri.max_y_at_x(5.0), None);
    }

    #[test]
    fn test_max_y_in_x_range() {
        let tri = Poly::new(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(2.0, 2.0),
        ]);
        assert_eq!(tri.max_y_in_x_range(DoubleRange::new(0.0, 1.0)), Some(1.0));
        assert_eq!(tri.max_y_in_x_range(DoubleRange::new(1.0, 3.0)), Some(2.0));
        assert_eq!(tri.max_y_in_x_range(DoubleRange::new(10.0, 11.0)), None);
    }

    #[test]
    fn test_rotation_keeps_area() {
        let sq = Poly::square(Point::ZERO, 1.0);
        let rotated = sq.rotated_around(Point::new(3.0, 0.0), 0.7);
        assert!((rotated.area() - 1.0).abs() < 1e-9);
    }
}
