//! Generated meshes for demos, benchmarks and tests.

use nalgebra::UnitQuaternion;
use rand::Rng;

use super::{Instance, MeshIdx, RenderDataError, RenderPool};
use crate::geometry::{TexturePoint, WorldPoint, WorldVector};

#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<WorldPoint>,
    pub texture_coords: Vec<TexturePoint>,
    pub triangles: Vec<[u32; 3]>,
}

impl MeshData {
    pub fn add_to(&self, pool: &mut RenderPool, material: u32) -> Result<MeshIdx, RenderDataError> {
        pool.add_mesh(
            &self.vertices,
            Some(&self.texture_coords),
            &self.triangles,
            material,
        )
    }
}

/// Axis aligned cube centered at the origin, two triangles per face.
pub fn cube(half_size: f32) -> MeshData {
    let mut mesh = MeshData::default();

    for axis in 0..3 {
        for sign in [-1.0f32, 1.0] {
            let mut normal = WorldVector::zeros();
            normal[axis] = sign;
            let mut u = WorldVector::zeros();
            u[(axis + 1) % 3] = 1.0;
            let v = normal.cross(&u);

            let first = mesh.vertices.len() as u32;
            for (du, dv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                mesh.vertices.push(WorldPoint::from(
                    (normal + u * du + v * dv) * half_size,
                ));
                mesh.texture_coords
                    .push(TexturePoint::new((du + 1.0) / 2.0, (dv + 1.0) / 2.0));
            }
            mesh.triangles.push([first, first + 1, first + 2]);
            mesh.triangles.push([first, first + 2, first + 3]);
        }
    }

    mesh
}

/// Wavy square sheet in the XZ plane, `resolution` quads along each side.
pub fn height_field(resolution: u32, size: f32, amplitude: f32) -> MeshData {
    let mut mesh = MeshData::default();
    let resolution = resolution.max(1);
    let step = size / resolution as f32;

    for j in 0..=resolution {
        for i in 0..=resolution {
            let x = i as f32 * step - size / 2.0;
            let z = j as f32 * step - size / 2.0;
            let y = amplitude * (x * 1.3).sin() * (z * 0.7).cos();
            mesh.vertices.push(WorldPoint::new(x, y, z));
            mesh.texture_coords.push(TexturePoint::new(
                i as f32 / resolution as f32,
                j as f32 / resolution as f32,
            ));
        }
    }

    let row = resolution + 1;
    for j in 0..resolution {
        for i in 0..resolution {
            let a = j * row + i;
            let b = a + 1;
            let c = a + row;
            let d = c + 1;
            mesh.triangles.push([a, c, b]);
            mesh.triangles.push([b, c, d]);
        }
    }

    mesh
}

/// Soup of randomly placed and oriented triangles inside a cube of the given half size.
pub fn random_triangles(
    rng: &mut impl Rng,
    count: usize,
    extent: f32,
    triangle_size: f32,
) -> MeshData {
    let mut mesh = MeshData::default();

    for _ in 0..count {
        let center = WorldPoint::new(
            rng.random_range(-extent..=extent),
            rng.random_range(-extent..=extent),
            rng.random_range(-extent..=extent),
        );
        let first = mesh.vertices.len() as u32;
        for _ in 0..3 {
            let offset = WorldVector::new(
                rng.random_range(-triangle_size..=triangle_size),
                rng.random_range(-triangle_size..=triangle_size),
                rng.random_range(-triangle_size..=triangle_size),
            );
            mesh.vertices.push(center + offset);
            mesh.texture_coords.push(TexturePoint::origin());
        }
        mesh.triangles.push([first, first + 1, first + 2]);
    }

    mesh
}

/// Ground sheet with randomly placed and rotated cubes and triangle soups above it.
pub fn demo_scene(
    rng: &mut impl Rng,
    instance_count: usize,
) -> Result<RenderPool, RenderDataError> {
    let mut pool = RenderPool::new();

    let ground = height_field(64, 40.0, 0.6).add_to(&mut pool, 0)?;
    let cube = cube(0.75).add_to(&mut pool, 1)?;
    let soup = random_triangles(rng, 500, 1.5, 0.4).add_to(&mut pool, 2)?;

    pool.add_instance(Instance::new(ground, WorldPoint::origin(), UnitQuaternion::identity()))?;
    for i in 0..instance_count {
        let origin = WorldPoint::new(
            rng.random_range(-15.0..15.0),
            rng.random_range(1.5..6.0),
            rng.random_range(-15.0..15.0),
        );
        let rotation = UnitQuaternion::from_euler_angles(
            rng.random_range(-3.0..3.0),
            rng.random_range(-3.0..3.0),
            rng.random_range(-3.0..3.0),
        );
        let mesh = if i % 4 == 0 { soup } else { cube };
        pool.add_instance(Instance::new(mesh, origin, rotation))?;
    }

    Ok(pool)
}
