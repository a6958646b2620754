use std::ops::{Add, Index, Mul};

use nalgebra::Unit;

use super::{BOX_PADDING, EPSILON, FloatType, GeometryError, WorldBox, WorldPoint, WorldVector};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle<Point>([Point; 3]);

impl<Point> Triangle<Point> {
    pub fn new(a: Point, b: Point, c: Point) -> Triangle<Point> {
        Triangle([a, b, c])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.0.iter()
    }

    pub fn map<Point2, F: FnMut(&Point) -> Point2>(&self, mut f: F) -> Triangle<Point2> {
        Triangle([f(&self[0]), f(&self[1]), f(&self[2])])
    }
}

impl<Point> From<[Point; 3]> for Triangle<Point> {
    fn from(value: [Point; 3]) -> Self {
        Triangle(value)
    }
}

impl<Point> Index<usize> for Triangle<Point> {
    type Output = Point;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl Triangle<WorldPoint> {
    /// Returns edge vectors, coming from self[0]
    pub fn edges(&self) -> [WorldVector; 2] {
        [self[1] - self[0], self[2] - self[0]]
    }

    /// Returns a normal vector of the triangle, not normalized.
    /// Length of the normal is twice the triangle area.
    pub fn normal(&self) -> WorldVector {
        let [e1, e2] = self.edges();
        e1.cross(&e2)
    }

    pub fn unit_normal(&self) -> Result<Unit<WorldVector>, GeometryError> {
        Unit::try_new(self.normal(), EPSILON * EPSILON).ok_or(GeometryError::DegenerateTriangle)
    }

    pub fn centroid(&self) -> WorldPoint {
        WorldPoint::from(self.iter().map(|p| p.coords).sum::<WorldVector>() / 3.0)
    }

    /// Bounding box of the triangle, padded so that it never has zero thickness.
    pub fn bounding_box(&self) -> WorldBox {
        WorldBox::from_points(self.0)
            .unwrap_or_else(|| unreachable!("Triangle always has vertices"))
            .padded(BOX_PADDING)
    }

    pub fn is_degenerate(&self) -> bool {
        self.normal().norm_squared() == 0.0
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BarycentricCoordinates {
    pub u: FloatType,
    pub v: FloatType,
}

impl BarycentricCoordinates {
    pub fn interpolate<T>(&self, a: &T, b: &T, c: &T) -> T
    where
        T: Copy + Add<Output = T> + Mul<FloatType, Output = T>,
    {
        let w = 1.0 - self.u - self.v;
        *a * w + *b * self.u + *c * self.v
    }

    pub fn interpolate_triangle<T>(&self, triangle: &Triangle<T>) -> T
    where
        T: Copy + Add<Output = T> + Mul<FloatType, Output = T>,
    {
        self.interpolate(&triangle[0], &triangle[1], &triangle[2])
    }
}
