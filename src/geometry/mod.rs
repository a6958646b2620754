mod aabb;
mod hit_record;
mod ray_box_intersection;
mod ray_triangle_intersection;
mod triangle;

pub use aabb::AABB;
pub use hit_record::HitRecord;
pub use ray_triangle_intersection::TriangleHit;
pub use triangle::{BarycentricCoordinates, Triangle};

use nalgebra::{Isometry3, Point2, Point3, Unit, Vector2, Vector3};
use thiserror::Error;

pub type FloatType = f32;

pub type WorldPoint = Point3<FloatType>;
pub type WorldVector = Vector3<FloatType>;
pub type WorldBox = AABB<WorldPoint>;
pub type TexturePoint = Point2<FloatType>;

pub type ScreenPoint = Point2<u32>;
pub type ScreenSize = Vector2<u32>;

/// Rigid placement of a mesh instance in the world (rotation followed by translation).
/// Contains no scale, so distances along rays are the same in world and object space.
pub type Placement = Isometry3<FloatType>;

pub const EPSILON: FloatType = 1e-6;

/// Hits closer than this are ignored, to avoid rays intersecting the surface they start on.
pub const T_MIN: FloatType = 1e-4;

/// Triangles whose ray determinant is smaller than this are treated as degenerate.
pub const DET_EPSILON: FloatType = 1e-5;

/// Padding added around triangle bounding boxes, so that axis aligned triangles
/// don't end up in boxes with zero thickness.
pub const BOX_PADDING: FloatType = 1e-4;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Ray direction has zero length")]
    ZeroLengthDirection,

    #[error("Triangle has zero area")]
    DegenerateTriangle,

    #[error("Camera forward and up vectors are parallel")]
    ParallelVectors,

    #[error("Camera resolution must be nonzero in both directions")]
    EmptyResolution,
}

#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: WorldPoint,
    /// Normalized direction of the ray, zero for degenerate rays.
    pub direction: WorldVector,

    /// Componentwise inverse of the ray direction
    /// Zeros in direction get turned into positive infinity regardless of the sign of the zero
    pub inv_direction: WorldVector,
}

impl Ray {
    /// Creates a new ray, normalizing the direction.
    /// Zero length direction creates a degenerate ray that never hits anything.
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        Self::try_new(origin, direction).unwrap_or(Ray {
            origin,
            direction: WorldVector::zeros(),
            inv_direction: WorldVector::repeat(FloatType::INFINITY),
        })
    }

    pub fn try_new(origin: WorldPoint, direction: WorldVector) -> Result<Ray, GeometryError> {
        let direction = Unit::try_new(direction, EPSILON)
            .ok_or(GeometryError::ZeroLengthDirection)?
            .into_inner();
        let inv_direction = direction.map(|x| if x == 0.0 { FloatType::INFINITY } else { 1.0 / x });

        Ok(Ray {
            origin,
            direction,
            inv_direction,
        })
    }

    pub fn is_degenerate(&self) -> bool {
        self.direction == WorldVector::zeros()
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction * distance
    }

    /// Moves the ray from world space to object space of a placed instance.
    pub fn inverse_transformed(&self, placement: &Placement) -> Ray {
        Ray::new(
            placement.inverse_transform_point(&self.origin),
            placement.inverse_transform_vector(&self.direction),
        )
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use assert2::{assert, let_assert};
    use nalgebra::{Translation3, UnitQuaternion};
    use proptest::prelude::*;

    pub fn simple_float() -> BoxedStrategy<FloatType> {
        (-100.0f32..100.0f32).boxed()
    }

    pub fn world_point() -> impl Strategy<Value = WorldPoint> {
        (simple_float(), simple_float(), simple_float())
            .prop_map(|(x, y, z)| WorldPoint::new(x, y, z))
    }

    pub fn nonzero_world_vector() -> impl Strategy<Value = WorldVector> {
        (simple_float(), simple_float(), simple_float()).prop_filter_map(
            "vector is zero",
            |(x, y, z)| {
                let vector = WorldVector::new(x, y, z);
                if vector.norm() < 1e-3 {
                    None
                } else {
                    Some(vector)
                }
            },
        )
    }

    pub fn world_box() -> impl Strategy<Value = WorldBox> {
        (world_point(), world_point()).prop_map(|(a, b)| WorldBox::from_points([a, b]).unwrap())
    }

    pub fn placement() -> impl Strategy<Value = Placement> {
        (world_point(), nonzero_world_vector(), -3.0f32..3.0f32).prop_map(
            |(origin, axis, angle)| {
                Placement::from_parts(
                    Translation3::from(origin.coords),
                    UnitQuaternion::from_axis_angle(&Unit::new_normalize(axis), angle),
                )
            },
        )
    }

    pub fn ray() -> impl Strategy<Value = Ray> {
        (world_point(), nonzero_world_vector())
            .prop_map(|(origin, direction)| Ray::new(origin, direction))
    }

    #[test]
    fn zero_direction_is_rejected() {
        let result = Ray::try_new(WorldPoint::origin(), WorldVector::zeros());
        let_assert!(Err(GeometryError::ZeroLengthDirection) = result);
    }

    #[test]
    fn zero_direction_makes_degenerate_ray() {
        let ray = Ray::new(WorldPoint::new(1.0, 2.0, 3.0), WorldVector::zeros());
        assert!(ray.is_degenerate());
        assert!(ray.origin == WorldPoint::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn direction_is_normalized() {
        let ray = Ray::new(WorldPoint::origin(), WorldVector::new(0.0, 3.0, 4.0));
        assert!((ray.direction.norm() - 1.0).abs() < 1e-6);
        assert!(ray.inv_direction.x == FloatType::INFINITY);
        assert!((ray.point_at(5.0) - WorldPoint::new(0.0, 3.0, 4.0)).norm() < 1e-5);
    }

    #[test_strategy::proptest]
    fn inverse_transform_round_trip(
        #[strategy(ray())] ray: Ray,
        #[strategy(placement())] placement: Placement,
    ) {
        let local = ray.inverse_transformed(&placement);
        let origin = placement.transform_point(&local.origin);
        let direction = placement.transform_vector(&local.direction);
        prop_assert!((origin - ray.origin).norm() < 1e-3);
        prop_assert!((direction - ray.direction).norm() < 1e-4);
        prop_assert!((local.direction.norm() - ray.direction.norm()).abs() < 1e-4);
    }
}
