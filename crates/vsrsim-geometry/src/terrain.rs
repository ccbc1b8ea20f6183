//! Terrains: a single unmovable polygon with raised borders at both ends

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::path::Path;
use crate::point::Point;
use crate::poly::Poly;
use crate::range::DoubleRange;

/// Depth of the terrain body below its lowest ground point
const TERRAIN_DEPTH: f64 = 10.0;

/// Ground polygon plus the x interval lying between its two border walls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    poly: Poly,
    within_borders_x_range: DoubleRange,
}

impl Terrain {
    pub fn new(poly: Poly, within_borders_x_range: DoubleRange) -> Self {
        Self {
            poly,
            within_borders_x_range,
        }
    }

    /// Flat ground at `height`
    pub fn flat(width: f64, height: f64, border_width: f64, border_height: f64) -> Self {
        let ground = vec![
            Point::new(border_width, height),
            Point::new(width - border_width, height),
        ];
        Self::from_profile(width, border_width, border_height, &ground)
    }

    /// Random hills of at most `hill_height` over a base `height`, one every `hill_width`
    pub fn hilly(
        width: f64,
        height: f64,
        border_width: f64,
        border_height: f64,
        hill_height: f64,
        hill_width: f64,
        seed: u64,
    ) -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let end = width - border_width;
        let step = hill_width.max(f64::EPSILON);
        let mut ground = vec![Point::new(border_width, height)];
        let mut x = border_width + step;
        while x < end {
            let y = height + rng.gen_range(0.0..=hill_height.abs());
            ground.push(Point::new(x, y));
            x += step;
        }
        ground.push(Point::new(end, height));
        log::debug!(
            "Terrain: generated {} hill points (seed={})",
            ground.len(),
            seed
        );
        Self::from_profile(width, border_width, border_height, &ground)
    }

    /// Ground sloping down by `angle` radians from left to right
    pub fn downhill(width: f64, height: f64, border_width: f64, border_height: f64, angle: f64) -> Self {
        Self::sloped(width, height, border_width, border_height, -angle.abs())
    }

    /// Ground sloping up by `angle` radians from left to right
    pub fn uphill(width: f64, height: f64, border_width: f64, border_height: f64, angle: f64) -> Self {
        Self::sloped(width, height, border_width, border_height, angle.abs())
    }

    fn sloped(width: f64, height: f64, border_width: f64, border_height: f64, angle: f64) -> Self {
        let run = width - 2.0 * border_width;
        let ground = vec![
            Point::new(border_width, height),
            Point::new(width - border_width, height + run * angle.tan()),
        ];
        Self::from_profile(width, border_width, border_height, &ground)
    }

    /// Build a terrain from the ground profile between the borders
    ///
    /// `ground` must be ordered by x and start/end at the inner border faces.
    fn from_profile(width: f64, border_width: f64, border_height: f64, ground: &[Point]) -> Self {
        let first = ground.first().copied().unwrap_or(Point::new(border_width, 0.0));
        let last = ground.last().copied().unwrap_or(Point::new(width - border_width, 0.0));
        let bottom = ground.iter().map(|p| p.y).fold(f64::INFINITY, f64::min) - TERRAIN_DEPTH;

        let mut path = Path::new(Point::new(0.0, bottom))
            .add(Point::new(0.0, first.y + border_height))
            .add(Point::new(border_width, first.y + border_height));
        for p in ground {
            path = path.add(*p);
        }
        let path = path
            .add(Point::new(width - border_width, last.y + border_height))
            .add(Point::new(width, last.y + border_height))
            .add(Point::new(width, bottom));

        Self::new(
            path.to_poly(),
            DoubleRange::new(border_width, width - border_width),
        )
    }

    pub fn poly(&self) -> &Poly {
        &self.poly
    }

    pub fn within_borders_x_range(&self) -> DoubleRange {
        self.within_borders_x_range
    }

    /// Ground height at `x`
    pub fn height_at(&self, x: f64) -> f64 {
        self.poly.max_y_at_x(x).unwrap_or(f64::NEG_INFINITY)
    }

    /// Highest ground point over the x interval `range`
    pub fn max_height_at(&self, range: DoubleRange) -> f64 {
        self.poly
            .max_y_in_x_range(range)
            .unwrap_or(f64::NEG_INFINITY)
    }
}
