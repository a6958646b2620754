use super::{FloatType, Ray, WorldBox};

impl WorldBox {
    /// Calculates ray intersection with the box.
    /// Returns minimum and maximum distance along the (infinite) ray line, ray intersects if min <= max.
    pub fn intersect(&self, ray: &Ray) -> (FloatType, FloatType) {
        // Componentwise distances along the ray to the box's min and max corners
        // The multiplication is NAN if the ray is starting inside the slab bounding plane
        // and is parallel to it. In this case we blend to +-infinity, so that the range becomes infinite
        let to_box_min = (self.min - ray.origin)
            .component_mul(&ray.inv_direction)
            .map(|x| if x.is_nan() { FloatType::NEG_INFINITY } else { x });
        let to_box_max = (self.max - ray.origin)
            .component_mul(&ray.inv_direction)
            .map(|x| if x.is_nan() { FloatType::INFINITY } else { x });

        // Correctly ordered (min_t <= max_t)
        let componentwise_min_t = to_box_min.zip_map(&to_box_max, FloatType::min);
        let componentwise_max_t = to_box_min.zip_map(&to_box_max, FloatType::max);

        let min_t = componentwise_min_t
            .x
            .max(componentwise_min_t.y.max(componentwise_min_t.z));
        let max_t = componentwise_max_t
            .x
            .min(componentwise_max_t.y.min(componentwise_max_t.z));

        (min_t, max_t)
    }

    /// Slab test, narrowing the `[t_min, t_max]` interval by the box.
    /// Returns true if a non-empty part of the interval is inside the box.
    pub fn hit(&self, ray: &Ray, t_min: FloatType, t_max: FloatType) -> bool {
        let (box_t1, box_t2) = self.intersect(ray);
        let t_min = t_min.max(box_t1);
        let t_max = t_max.min(box_t2);
        t_max > t_min
    }
}
