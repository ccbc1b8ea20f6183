//! Points are plain `glam` double precision vectors

pub use glam::DVec2 as Point;

/// Direction and rotation helpers missing from `DVec2`
pub trait PointExt {
    /// Angle of the vector from the positive x axis, in radians (-PI, PI]
    fn direction(self) -> f64;

    /// Rotate this point counter-clockwise by `angle` radians around `pivot`
    fn rotated_around(self, pivot: Point, angle: f64) -> Point;
}

impl PointExt for Point {
    fn direction(self) -> f64 {
        self.y.atan2(self.x)
    }

    fn rotated_around(self, pivot: Point, angle: f64) -> Point {
        let (sin, cos) = angle.sin_cos();
        let d = self - pivot;
        pivot + Point::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_direction() {
        assert_eq!(Point::new(1.0, 0.0).direction(), 0.0);
        assert!((Point::new(0.0, 2.0).direction() - PI / 2.0).abs() < 1e-12);
        assert!((Point::new(-1.0, 0.0).direction() - PI).abs() < 1e-12);
    }

    #[test]
    fn test_rotated_around() {
        let p = Point::new(2.0, 1.0).rotated_around(Point::new(1.0, 1.0), PI / 2.0);
        assert!((p.x - 1.0).abs() < 1e-12);
        assert!((p.y - 2.0).abs() < 1e-12);
    }
}
