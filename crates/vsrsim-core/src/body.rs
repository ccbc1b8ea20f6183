//! Body kinds living in the world arena
//!
//! Geometry is never stored twice: a voxel's polygon is always derived from its center
//! and current side length, a rigid body's from its rest polygon and pose.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;
use vsrsim_geometry::{BoundingBox, DoubleRange, Point, Poly, Segment};

use crate::ids::{AnchorId, BodyId};

/// Voxel corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Vertex {
    NW,
    NE,
    SE,
    SW,
}

impl Vertex {
    pub const ALL: [Vertex; 4] = [Vertex::NW, Vertex::NE, Vertex::SE, Vertex::SW];

    /// Anchor index of this corner
    pub fn index(&self) -> usize {
        match self {
            Vertex::NW => 0,
            Vertex::NE => 1,
            Vertex::SE => 2,
            Vertex::SW => 3,
        }
    }

    /// Unit offset of the corner from the voxel center
    fn offset(&self) -> Point {
        match self {
            Vertex::NW => Point::new(-1.0, 1.0),
            Vertex::NE => Point::new(1.0, 1.0),
            Vertex::SE => Point::new(1.0, -1.0),
            Vertex::SW => Point::new(-1.0, -1.0),
        }
    }
}

/// Voxel side
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    N,
    E,
    S,
    W,
}

struct SideGeometry {
    vertices: (Vertex, Vertex),
    normal_angle: f64,
}

const SIDE_TABLE: [SideGeometry; 4] = [
    SideGeometry {
        vertices: (Vertex::NE, Vertex::NW),
        normal_angle: std::f64::consts::FRAC_PI_2,
    },
    SideGeometry {
        vertices: (Vertex::NE, Vertex::SE),
        normal_angle: 0.0,
    },
    SideGeometry {
        vertices: (Vertex::SE, Vertex::SW),
        normal_angle: -std::f64::consts::FRAC_PI_2,
    },
    SideGeometry {
        vertices: (Vertex::NW, Vertex::SW),
        normal_angle: std::f64::consts::PI,
    },
];

impl Side {
    pub const ALL: [Side; 4] = [Side::N, Side::E, Side::S, Side::W];

    pub fn index(&self) -> usize {
        match self {
            Side::N => 0,
            Side::E => 1,
            Side::S => 2,
            Side::W => 3,
        }
    }

    /// The two corners bounding this side
    pub fn vertices(&self) -> (Vertex, Vertex) {
        SIDE_TABLE[self.index()].vertices
    }

    /// Outward normal angle in radians
    pub fn normal_angle(&self) -> f64 {
        SIDE_TABLE[self.index()].normal_angle
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::N => Side::S,
            Side::E => Side::W,
            Side::S => Side::N,
            Side::W => Side::E,
        }
    }
}

/// Material constraint violation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidMaterial {
    #[error("softness {0} is outside [0, 1]")]
    Softness(f64),
    #[error("area ratio range [{min}, {max}] does not contain 1")]
    AreaRatioRange { min: f64, max: f64 },
}

/// How much a voxel may deform relative to its rest shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    softness: f64,
    area_ratio_range: DoubleRange,
}

impl Material {
    pub const DEFAULT_SOFTNESS: f64 = 0.75;
    pub const DEFAULT_AREA_RATIO_RANGE: DoubleRange = DoubleRange { min: 0.8, max: 1.2 };

    pub fn new(softness: f64, area_ratio_range: DoubleRange) -> Result<Self, InvalidMaterial> {
        let material = Self {
            softness,
            area_ratio_range,
        };
        material.validate()?;
        Ok(material)
    }

    /// Area ratio range `[1 - |delta|, 1 + |delta|]`
    pub fn with_delta(softness: f64, area_ratio_delta: f64) -> Result<Self, InvalidMaterial> {
        let delta = area_ratio_delta.abs();
        Self::new(softness, DoubleRange::new(1.0 - delta, 1.0 + delta))
    }

    pub fn validate(&self) -> Result<(), InvalidMaterial> {
        if !DoubleRange::UNIT.contains(self.softness) {
            return Err(InvalidMaterial::Softness(self.softness));
        }
        if !self.area_ratio_range.contains(1.0) {
            return Err(InvalidMaterial::AreaRatioRange {
                min: self.area_ratio_range.min,
                max: self.area_ratio_range.max,
            });
        }
        Ok(())
    }

    pub fn softness(&self) -> f64 {
        self.softness
    }

    pub fn area_ratio_range(&self) -> DoubleRange {
        self.area_ratio_range
    }

    /// Area ratio commanded by an actuation value in [-1, 1]
    ///
    /// +1 contracts to the range minimum, -1 expands to the range maximum, 0 is the rest shape.
    pub fn area_ratio_for(&self, actuation: f64) -> f64 {
        let a = DoubleRange::SYMMETRIC_UNIT.clip(actuation);
        if a >= 0.0 {
            1.0 - a * (1.0 - self.area_ratio_range.min)
        } else {
            1.0 - a * (self.area_ratio_range.max - 1.0)
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            softness: Self::DEFAULT_SOFTNESS,
            area_ratio_range: Self::DEFAULT_AREA_RATIO_RANGE,
        }
    }
}

/// Square soft body with one anchor per corner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voxel {
    pub(crate) center: Point,
    pub(crate) side_length: f64,
    pub(crate) rest_side_length: f64,
    pub(crate) mass: f64,
    pub(crate) material: Material,
    /// Latest actuation per side, indexed by `Side::index`
    pub(crate) actuation: [f64; 4],
    pub(crate) fall_speed: f64,
    pub(crate) velocity: Point,
}

impl Voxel {
    pub(crate) fn new(side_length: f64, mass: f64, material: Material) -> Self {
        Self {
            center: Point::ZERO,
            side_length,
            rest_side_length: side_length,
            mass,
            material,
            actuation: [0.0; 4],
            fall_speed: 0.0,
            velocity: Point::ZERO,
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn side_length(&self) -> f64 {
        self.side_length
    }

    pub fn rest_side_length(&self) -> f64 {
        self.rest_side_length
    }

    pub fn actuation(&self) -> [f64; 4] {
        self.actuation
    }

    pub fn vertex(&self, vertex: Vertex) -> Point {
        self.center + vertex.offset() * (self.side_length / 2.0)
    }

    pub fn side(&self, side: Side) -> Segment {
        let (v1, v2) = side.vertices();
        Segment::new(self.vertex(v1), self.vertex(v2))
    }

    pub fn poly(&self) -> Poly {
        Poly::new(Vertex::ALL.iter().map(|v| self.vertex(*v)).collect())
    }

    /// Current area over rest area
    pub fn area_ratio(&self) -> f64 {
        let r = self.side_length / self.rest_side_length;
        r * r
    }

    /// Side length the voxel is relaxing toward, given its latest actuation
    pub(crate) fn target_side_length(&self) -> f64 {
        let mean = self.actuation.iter().sum::<f64>() / self.actuation.len() as f64;
        self.rest_side_length * self.material.area_ratio_for(mean).sqrt()
    }

    pub fn anchor_on(id: BodyId, vertex: Vertex) -> AnchorId {
        AnchorId::new(id, vertex.index() as u8)
    }

    pub fn anchors_on(id: BodyId, side: Side) -> SmallVec<[AnchorId; 2]> {
        let (v1, v2) = side.vertices();
        SmallVec::from_buf([Self::anchor_on(id, v1), Self::anchor_on(id, v2)])
    }
}

/// Rigid polygon, optionally pinned to a pivot it can rotate around
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub(crate) rest_poly: Poly,
    pub(crate) translation: Point,
    pub(crate) angle: f64,
    pub(crate) angular_velocity: f64,
    pub(crate) pivot: Option<Point>,
    pub(crate) mass: f64,
    pub(crate) fall_speed: f64,
    pub(crate) velocity: Point,
}

impl RigidBody {
    pub(crate) fn new(poly: Poly, mass: f64, pivot: Option<Point>) -> Self {
        Self {
            rest_poly: poly,
            translation: Point::ZERO,
            angle: 0.0,
            angular_velocity: 0.0,
            pivot,
            mass,
            fall_speed: 0.0,
            velocity: Point::ZERO,
        }
    }

    pub fn poly(&self) -> Poly {
        let moved = self.rest_poly.translated(self.translation);
        match self.pivot {
            Some(pivot) => moved.rotated_around(pivot, self.angle),
            None => moved,
        }
    }

    pub fn pivot(&self) -> Option<Point> {
        self.pivot
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn is_pinned(&self) -> bool {
        self.pivot.is_some()
    }
}

/// Static polygon, e.g. a terrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmovableBody {
    pub(crate) poly: Poly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    Voxel,
    Rigid,
    Unmovable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Body {
    Voxel(Voxel),
    Rigid(RigidBody),
    Unmovable(UnmovableBody),
}

impl Body {
    pub fn kind(&self) -> BodyKind {
        match self {
            Body::Voxel(_) => BodyKind::Voxel,
            Body::Rigid(_) => BodyKind::Rigid,
            Body::Unmovable(_) => BodyKind::Unmovable,
        }
    }

    pub fn as_voxel(&self) -> Option<&Voxel> {
        match self {
            Body::Voxel(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_rigid(&self) -> Option<&RigidBody> {
        match self {
            Body::Rigid(r) => Some(r),
            _ => None,
        }
    }

    pub fn poly(&self) -> Poly {
        match self {
            Body::Voxel(v) => v.poly(),
            Body::Rigid(r) => r.poly(),
            Body::Unmovable(u) => u.poly.clone(),
        }
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.poly().bounding_box()
    }

    pub fn mass(&self) -> f64 {
        match self {
            Body::Voxel(v) => v.mass,
            Body::Rigid(r) => r.mass,
            Body::Unmovable(_) => f64::INFINITY,
        }
    }

    pub fn velocity(&self) -> Point {
        match self {
            Body::Voxel(v) => v.velocity,
            Body::Rigid(r) => r.velocity,
            Body::Unmovable(_) => Point::ZERO,
        }
    }

    pub fn angle(&self) -> f64 {
        match self {
            Body::Rigid(r) => r.angle,
            _ => 0.0,
        }
    }

    /// Whether translation by gravity and links applies to this body
    pub fn is_movable(&self) -> bool {
        match self {
            Body::Voxel(_) => true,
            Body::Rigid(r) => !r.is_pinned(),
            Body::Unmovable(_) => false,
        }
    }

    pub fn is_anchorable(&self) -> bool {
        !matches!(self, Body::Unmovable(_))
    }

    pub fn anchor_count(&self) -> usize {
        match self {
            Body::Voxel(_) => Vertex::ALL.len(),
            Body::Rigid(r) => r.rest_poly.len(),
            Body::Unmovable(_) => 0,
        }
    }

    pub fn anchor_point(&self, index: u8) -> Option<Point> {
        match self {
            Body::Voxel(v) => Vertex::ALL.get(index as usize).map(|vx| v.vertex(*vx)),
            Body::Rigid(r) => r.poly().vertices().get(index as usize).copied(),
            Body::Unmovable(_) => None,
        }
    }

    /// All anchors of the body with id `id`
    pub fn anchors(&self, id: BodyId) -> impl Iterator<Item = AnchorId> {
        (0..self.anchor_count()).map(move |i| AnchorId::new(id, i as u8))
    }

    pub(crate) fn translate(&mut self, delta: Point) {
        match self {
            Body::Voxel(v) => v.center += delta,
            Body::Rigid(r) => {
                r.translation += delta;
                if let Some(pivot) = r.pivot.as_mut() {
                    *pivot += delta;
                }
            }
            Body::Unmovable(u) => u.poly = u.poly.translated(delta),
        }
    }

    pub(crate) fn is_finite(&self) -> bool {
        match self {
            Body::Voxel(v) => v.center.is_finite() && v.side_length.is_finite(),
            Body::Rigid(r) => r.translation.is_finite() && r.angle.is_finite(),
            Body::Unmovable(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_table() {
        assert_eq!(Side::N.vertices(), (Vertex::NE, Vertex::NW));
        assert_eq!(Side::W.vertices(), (Vertex::NW, Vertex::SW));
        assert_eq!(Side::E.normal_angle(), 0.0);
        assert_eq!(Side::W.normal_angle(), std::f64::consts::PI);
        assert_eq!(Side::S.opposite(), Side::N);
    }

    #[test]
    fn test_voxel_geometry() {
        let mut voxel = Voxel::new(2.0, 1.0, Material::default());
        voxel.center = Point::new(1.0, 1.0);
        assert_eq!(voxel.vertex(Vertex::NW), Point::new(0.0, 2.0));
        assert_eq!(voxel.vertex(Vertex::SE), Point::new(2.0, 0.0));
        assert_eq!(voxel.poly().area(), 4.0);
        // side midpoint lies on the outward normal
        let mid = voxel.side(Side::E).center() - voxel.center();
        assert_eq!(mid, Point::new(1.0, 0.0));
    }

    #[test]
    fn test_anchors_on_side() {
        let id = BodyId::from_raw(3);
        let anchors = Voxel::anchors_on(id, Side::S);
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0], AnchorId::new(id, Vertex::SE.index() as u8));
        assert_eq!(anchors[1], AnchorId::new(id, Vertex::SW.index() as u8));
    }

    #[test]
    fn test_material_validation() {
        assert!(Material::with_delta(0.5, 0.2).is_ok());
        assert!(matches!(
            Material::new(0.5, DoubleRange::new(1.1, 1.3)),
            Err(InvalidMaterial::AreaRatioRange { .. })
        ));
        assert!(matches!(
            Material::with_delta(1.5, 0.2),
            Err(InvalidMaterial::Softness(_))
        ));
    }

    #[test]
    fn test_area_ratio_for_actuation() {
        let material = Material::default();
        assert!((material.area_ratio_for(1.0) - 0.8).abs() < 1e-12);
        assert!((material.area_ratio_for(-1.0) - 1.2).abs() < 1e-12);
        assert_eq!(material.area_ratio_for(0.0), 1.0);
        // out of range commands are clipped
        assert!((material.area_ratio_for(7.0) - 0.8).abs() < 1e-12);
    }
}
