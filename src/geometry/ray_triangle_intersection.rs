use super::{BarycentricCoordinates, DET_EPSILON, FloatType, Ray, T_MIN, Triangle, WorldPoint};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TriangleHit {
    pub t: FloatType,
    pub uv: BarycentricCoordinates,
    /// The ray hit the side of the triangle the (counter clockwise winding) normal points to.
    pub front_face: bool,
}

impl Triangle<WorldPoint> {
    /// Calculates ray intersection with the (two sided) triangle.
    /// Returns the hit only if it lies strictly between T_MIN and max_t.
    /// Adapted from https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm#Rust_implementation
    pub fn intersect(&self, ray: &Ray, max_t: FloatType) -> Option<TriangleHit> {
        let [e1, e2] = self.edges();

        let ray_cross_e2 = ray.direction.cross(&e2);
        let det = e1.dot(&ray_cross_e2);

        if det.abs() < DET_EPSILON {
            // Ray is parallel to the triangle, or the triangle is degenerate
            return None;
        }

        let inv_det = 1.0 / det;
        let s = ray.origin - self[0];
        let u = inv_det * s.dot(&ray_cross_e2);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let s_cross_e1 = s.cross(&e1);
        let v = inv_det * ray.direction.dot(&s_cross_e1);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = inv_det * e2.dot(&s_cross_e1);
        if t > T_MIN && t < max_t {
            Some(TriangleHit {
                t,
                uv: BarycentricCoordinates { u, v },
                front_face: det > 0.0,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::WorldVector;

    use assert2::{assert, let_assert};
    use test_case::test_case;

    fn unit_triangle() -> Triangle<WorldPoint> {
        Triangle::new(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn straight_hit() {
        let ray = Ray::new(
            WorldPoint::new(0.2, 0.2, -1.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        let_assert!(Some(hit) = unit_triangle().intersect(&ray, FloatType::INFINITY));

        assert!((hit.t - 1.0).abs() < 1e-6);
        assert!(hit.uv.u >= 0.0);
        assert!(hit.uv.v >= 0.0);
        assert!(hit.uv.u + hit.uv.v <= 1.0);
        assert!((hit.uv.u - 0.2).abs() < 1e-6);
        assert!((hit.uv.v - 0.2).abs() < 1e-6);
    }

    #[test]
    fn front_and_back_faces() {
        let from_above = Ray::new(
            WorldPoint::new(0.2, 0.2, 1.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        let from_below = Ray::new(
            WorldPoint::new(0.2, 0.2, -1.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );

        let_assert!(Some(above) = unit_triangle().intersect(&from_above, FloatType::INFINITY));
        let_assert!(Some(below) = unit_triangle().intersect(&from_below, FloatType::INFINITY));
        assert!(above.front_face);
        assert!(!below.front_face);
    }

    #[test_case(0.8, 0.8 ; "beyond_hypotenuse")]
    #[test_case(-0.1, 0.5 ; "negative_u")]
    #[test_case(0.5, -0.1 ; "negative_v")]
    #[test_case(1.1, 0.0 ; "past_vertex")]
    fn outside_misses(x: f32, y: f32) {
        let ray = Ray::new(WorldPoint::new(x, y, -1.0), WorldVector::new(0.0, 0.0, 1.0));
        assert!(unit_triangle().intersect(&ray, FloatType::INFINITY) == None);
    }

    #[test]
    fn hit_behind_origin_is_ignored() {
        let ray = Ray::new(
            WorldPoint::new(0.2, 0.2, 1.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        assert!(unit_triangle().intersect(&ray, FloatType::INFINITY) == None);
    }

    #[test]
    fn hit_at_origin_is_ignored() {
        let ray = Ray::new(
            WorldPoint::new(0.2, 0.2, 0.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        assert!(unit_triangle().intersect(&ray, FloatType::INFINITY) == None);
    }

    #[test]
    fn hit_beyond_max_t_is_ignored() {
        let ray = Ray::new(
            WorldPoint::new(0.2, 0.2, -1.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        assert!(unit_triangle().intersect(&ray, 1.0).is_none());
        assert!(unit_triangle().intersect(&ray, 1.001).is_some());
    }

    #[test]
    fn parallel_ray_misses() {
        let ray = Ray::new(
            WorldPoint::new(-1.0, 0.2, 0.0),
            WorldVector::new(1.0, 0.0, 0.0),
        );
        assert!(unit_triangle().intersect(&ray, FloatType::INFINITY) == None);
    }

    #[test]
    fn degenerate_triangle_never_hits() {
        let triangle = Triangle::new(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(2.0, 0.0, 0.0),
        );
        let ray = Ray::new(
            WorldPoint::new(0.5, 0.0, -1.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        assert!(triangle.intersect(&ray, FloatType::INFINITY) == None);
    }

    #[test]
    fn degenerate_ray_never_hits() {
        let ray = Ray::new(WorldPoint::new(0.2, 0.2, -1.0), WorldVector::zeros());
        assert!(unit_triangle().intersect(&ray, FloatType::INFINITY) == None);
    }
}
