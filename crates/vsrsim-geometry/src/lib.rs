//! 2D geometry kernel for vsrsim
//!
//! This crate provides the value types used by every other crate:
//! - Points and directions (Point, PointExt)
//! - Numeric ranges used to normalize sensed and actuated values (DoubleRange)
//! - Segments, polygons and bounding boxes (Segment, Poly, BoundingBox)
//! - Terrains and the path builder used to draw them (Terrain, Path)

mod bbox;
mod path;
mod point;
mod poly;
mod range;
mod segment;
mod terrain;

pub use bbox::BoundingBox;
pub use path::Path;
pub use point::{Point, PointExt};
pub use poly::Poly;
pub use range::DoubleRange;
pub use segment::Segment;
pub use terrain::Terrain;
