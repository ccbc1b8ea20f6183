use crate::point::Point;
use crate::poly::Poly;

/// Incremental polyline builder, mostly used to draw terrains
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    points: Vec<Point>,
}

impl Path {
    pub fn new(start: Point) -> Self {
        Self {
            points: vec![start],
        }
    }

    /// Append an absolute point
    pub fn add(mut self, point: Point) -> Self {
        self.points.push(point);
        self
    }

    /// Append a point displaced by `(dx, dy)` from the current last point
    pub fn move_by(self, dx: f64, dy: f64) -> Self {
        let last = self.last();
        self.add(last + Point::new(dx, dy))
    }

    /// Append every point of `other` as a relative move from the current last point
    pub fn move_by_path(mut self, other: &Path) -> Self {
        let origin = self.last();
        self.points.extend(other.points.iter().map(|p| origin + *p));
        self
    }

    pub fn last(&self) -> Point {
        self.points.last().copied().unwrap_or(Point::ZERO)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn to_poly(&self) -> Poly {
        Poly::new(self.points.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_by_is_relative() {
        let path = Path::new(Point::ZERO).move_by(1.0, 0.0).move_by(0.0, 2.0);
        assert_eq!(path.points(), &[Point::ZERO, Point::new(1.0, 0.0), Point::new(1.0, 2.0)]);
    }

    #[test]
    fn test_move_by_path() {
        let step = Path::new(Point::new(1.0, 0.0)).add(Point::new(1.0, 1.0));
        let path = Path::new(Point::new(5.0, 5.0)).move_by_path(&step);
        assert_eq!(path.last(), Point::new(6.0, 6.0));
        assert_eq!(path.to_poly().len(), 3);
    }
}
