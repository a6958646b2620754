use bon::bon;
use nalgebra::Unit;

use crate::geometry::{
    EPSILON, FloatType, GeometryError, Ray, ScreenPoint, ScreenSize, WorldPoint, WorldVector,
};

/// Pinhole camera generating one primary ray through the center of each pixel.
#[derive(Copy, Clone, Debug)]
pub struct Camera {
    center: WorldPoint,

    resolution: ScreenSize,

    up: Unit<WorldVector>,
    right: Unit<WorldVector>,
    film_origin_offset: WorldVector,

    /// Distance between pixels in meters
    pixel_pitch: FloatType,
}

#[bon]
impl Camera {
    #[builder]
    pub fn new(
        center: WorldPoint,
        forward: WorldVector,
        up: WorldVector,
        resolution: ScreenSize,
        #[builder(default = 36e-3)] film_width: FloatType,
        #[builder(default = 50e-3)] focal_length: FloatType,
    ) -> Result<Self, GeometryError> {
        let forward = Unit::try_new(forward, EPSILON).ok_or(GeometryError::ZeroLengthDirection)?;
        let up = Unit::try_new(up, EPSILON).ok_or(GeometryError::ZeroLengthDirection)?;
        let right =
            Unit::try_new(forward.cross(&up), EPSILON).ok_or(GeometryError::ParallelVectors)?;
        let up = Unit::new_normalize(right.cross(&forward));

        if resolution.x == 0 || resolution.y == 0 {
            return Err(GeometryError::EmptyResolution);
        }
        assert2::assert!(film_width > 0.0);
        assert2::assert!(focal_length > 0.0);

        let pixel_pitch = film_width / (resolution.x as FloatType);
        let resolution_minus_one = ScreenSize::new(resolution.x - 1, resolution.y - 1);
        let film_origin_uv = resolution_minus_one.cast::<FloatType>() * pixel_pitch / 2.0;
        let film_origin_offset = -forward.as_ref() * focal_length
            + right.as_ref() * film_origin_uv.x
            - up.as_ref() * film_origin_uv.y;

        Ok(Camera {
            center,
            resolution,
            up,
            right,
            film_origin_offset,
            pixel_pitch,
        })
    }
}

impl Camera {
    pub fn resolution(&self) -> ScreenSize {
        self.resolution
    }

    /// Primary ray through the center of the given pixel.
    /// Pixel (0, 0) is the top left corner of the image.
    pub fn pixel_ray(&self, point: &ScreenPoint) -> Ray {
        let film_point_offset = self.film_origin_offset
            + self.up.as_ref() * (point.y as FloatType * self.pixel_pitch)
            - self.right.as_ref() * (point.x as FloatType * self.pixel_pitch);

        Ray::new(self.center, -film_point_offset)
    }

    /// Primary rays of a single image row, left to right.
    pub fn row_rays(&self, y: u32) -> Vec<Ray> {
        (0..self.resolution.x)
            .map(|x| self.pixel_ray(&ScreenPoint::new(x, y)))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::{assert, let_assert};

    fn camera() -> Camera {
        // X goes right, Y goes away, Z goes up
        Camera::builder()
            .center(WorldPoint::new(0.0, 0.0, 0.0))
            .forward(WorldVector::new(0.0, 1.0, 0.0))
            .up(WorldVector::new(0.0, 0.0, 1.0))
            .resolution(ScreenSize::new(801, 601))
            .build()
            .unwrap()
    }

    #[test]
    fn left_right_up_down() {
        let camera = camera();

        let ray_center = camera.pixel_ray(&ScreenPoint::new(400, 300));
        let ray_left = camera.pixel_ray(&ScreenPoint::new(0, 300));
        let ray_right = camera.pixel_ray(&ScreenPoint::new(800, 300));
        let ray_up = camera.pixel_ray(&ScreenPoint::new(400, 0));
        let ray_down = camera.pixel_ray(&ScreenPoint::new(400, 600));

        assert!(ray_center.direction.x.abs() < 1e-6);
        assert!(ray_center.direction.z.abs() < 1e-6);
        assert!(ray_center.direction.y > 0.99);
        assert!(ray_left.direction.x < ray_center.direction.x);
        assert!(ray_right.direction.x > ray_center.direction.x);
        assert!(ray_up.direction.z > ray_center.direction.z);
        assert!(ray_down.direction.z < ray_center.direction.z);
    }

    #[test]
    fn row_has_one_ray_per_pixel() {
        let camera = camera();
        let row = camera.row_rays(17);
        assert!(row.len() == 801);
        assert!(row.iter().all(|ray| ray.origin == WorldPoint::origin()));
        assert!(row.windows(2).all(|pair| pair[0].direction.x < pair[1].direction.x));
    }

    #[test]
    fn parallel_up_is_rejected() {
        let result = Camera::builder()
            .center(WorldPoint::origin())
            .forward(WorldVector::new(0.0, 0.0, 2.0))
            .up(WorldVector::new(0.0, 0.0, 1.0))
            .resolution(ScreenSize::new(4, 4))
            .build();
        let_assert!(Err(GeometryError::ParallelVectors) = result);
    }

    #[test]
    fn empty_resolution_is_rejected() {
        let result = Camera::builder()
            .center(WorldPoint::origin())
            .forward(WorldVector::y())
            .up(WorldVector::z())
            .resolution(ScreenSize::new(0, 4))
            .build();
        let_assert!(Err(GeometryError::EmptyResolution) = result);
    }
}
