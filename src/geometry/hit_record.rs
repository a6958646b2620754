use nalgebra::Unit;

use super::{
    BarycentricCoordinates, FloatType, Placement, Ray, TexturePoint, Triangle, TriangleHit,
    WorldPoint, WorldVector,
};

/// Nearest intersection found so far along a ray.
///
/// Starts as a miss with `t = +inf` and is only ever tightened: every update
/// must be strictly nearer than the current value.
#[derive(Clone, Debug, PartialEq)]
pub struct HitRecord {
    pub t: FloatType,
    pub point: WorldPoint,
    /// Geometric normal, turned to face the side the ray came from.
    pub normal: Unit<WorldVector>,
    pub uv: BarycentricCoordinates,
    pub texture_coords: TexturePoint,
    pub material: u32,
    pub instance: u32,
    /// Triangle index, local to the mesh of the instance.
    pub triangle: u32,
    pub front_face: bool,
}

impl HitRecord {
    pub const NO_ID: u32 = u32::MAX;

    pub fn miss() -> HitRecord {
        HitRecord {
            t: FloatType::INFINITY,
            point: WorldPoint::origin(),
            normal: WorldVector::z_axis(),
            uv: BarycentricCoordinates::default(),
            texture_coords: TexturePoint::origin(),
            material: Self::NO_ID,
            instance: Self::NO_ID,
            triangle: Self::NO_ID,
            front_face: false,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.t.is_finite()
    }

    /// Records a triangle hit if it's strictly nearer than the current one.
    /// Returns whether the record was updated.
    pub fn offer(
        &mut self,
        ray: &Ray,
        triangle: &Triangle<WorldPoint>,
        hit: &TriangleHit,
        material: u32,
        triangle_index: u32,
    ) -> bool {
        if hit.t >= self.t {
            return false;
        }

        let Ok(normal) = triangle.unit_normal() else {
            return false;
        };
        self.t = hit.t;
        self.point = ray.point_at(hit.t);
        self.normal = if hit.front_face {
            normal
        } else {
            Unit::new_unchecked(-normal.into_inner())
        };
        self.uv = hit.uv;
        self.texture_coords = TexturePoint::origin();
        self.material = material;
        self.triangle = triangle_index;
        self.front_face = hit.front_face;

        true
    }

    /// Interpolates per-vertex texture coordinates at the recorded hit.
    pub fn set_texture_coords(&mut self, texture_coords: &Triangle<TexturePoint>) {
        let coords = texture_coords.map(|p| p.coords);
        self.texture_coords = self.uv.interpolate_triangle(&coords).into();
    }

    /// Moves the hit from object space of an instance into world space.
    pub fn place(&mut self, placement: &Placement, instance: u32) {
        self.point = placement.transform_point(&self.point);
        self.normal = placement.rotation * self.normal;
        self.instance = instance;
    }
}

impl Default for HitRecord {
    fn default() -> Self {
        Self::miss()
    }
}
