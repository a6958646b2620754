//! Render data provider: append-only pools of geometry shared by all meshes,
//! plus placed instances of those meshes.

pub mod procedural;

use index_vec::{IndexSlice, IndexVec};
use nalgebra::{Translation3, UnitQuaternion};
use thiserror::Error;

use crate::geometry::{Placement, TexturePoint, Triangle, WorldPoint};

index_vec::define_index_type! {
    pub struct MeshIdx = u32;
    IMPL_RAW_CONVERSIONS = true;
}

index_vec::define_index_type! {
    pub struct InstanceIdx = u32;
    IMPL_RAW_CONVERSIONS = true;
}

/// Location of one mesh inside the shared pools.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshRange {
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub first_triangle: u32,
    pub triangle_count: u32,
}

impl MeshRange {
    pub fn vertices(&self) -> std::ops::Range<usize> {
        let first = self.first_vertex as usize;
        first..first + self.vertex_count as usize
    }

    pub fn triangles(&self) -> std::ops::Range<usize> {
        let first = self.first_triangle as usize;
        first..first + self.triangle_count as usize
    }

    /// Both ranges end inside pools of the given lengths, and stay addressable with `u32`.
    fn fits(&self, vertex_pool: usize, triangle_pool: usize) -> bool {
        let vertices_end = self.first_vertex.checked_add(self.vertex_count);
        let triangles_end = self.first_triangle.checked_add(self.triangle_count);
        matches!(
            (vertices_end, triangles_end),
            (Some(v), Some(t)) if v as usize <= vertex_pool && t as usize <= triangle_pool
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub mesh: MeshIdx,
    pub placement: Placement,
}

impl Instance {
    pub fn new(mesh: MeshIdx, origin: WorldPoint, rotation: UnitQuaternion<f32>) -> Instance {
        Instance {
            mesh,
            placement: Placement::from_parts(Translation3::from(origin.coords), rotation),
        }
    }

    pub fn origin(&self) -> WorldPoint {
        self.placement.translation.vector.into()
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        self.placement.rotation
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderDataError {
    #[error(
        "Triangle {triangle} references vertex {vertex}, but the mesh only has {vertex_count} vertices"
    )]
    VertexOutOfRange {
        triangle: usize,
        vertex: u32,
        vertex_count: u32,
    },

    #[error("Mesh {mesh:?} does not exist")]
    UnknownMesh { mesh: MeshIdx },

    #[error("Instance {instance:?} does not exist")]
    UnknownInstance { instance: InstanceIdx },

    #[error("Expected {expected} items, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Mesh range {range:?} is outside of the pools")]
    RangeOutOfBounds { range: MeshRange },
}

/// Externally owned scene geometry, consumed when building acceleration structures.
pub trait RenderData {
    fn vertices(&self) -> &[WorldPoint];

    /// Texture coordinates, parallel to vertices.
    fn texture_coords(&self) -> &[TexturePoint];

    /// Vertex index triples, local to the owning mesh's first vertex.
    fn triangles(&self) -> &[[u32; 3]];

    /// Material id per triangle, parallel to triangles.
    fn materials(&self) -> &[u32];

    fn meshes(&self) -> &IndexSlice<MeshIdx, [MeshRange]>;

    fn instances(&self) -> &IndexSlice<InstanceIdx, [Instance]>;

    /// Geometry of the mesh changed since the last `clear_dirty`.
    fn is_mesh_dirty(&self, mesh: MeshIdx) -> bool;

    /// Instances were added or moved since the last `clear_dirty`.
    fn are_instances_dirty(&self) -> bool;

    fn clear_dirty(&mut self);

    fn is_dirty(&self) -> bool {
        self.are_instances_dirty() || self.meshes().indices().any(|mesh| self.is_mesh_dirty(mesh))
    }

    /// Resolves a mesh-local triangle to its vertex positions.
    fn mesh_triangle(&self, range: &MeshRange, triangle: u32) -> Triangle<WorldPoint> {
        let vertices = &self.vertices()[range.vertices()];
        let indices = self.triangles()[range.first_triangle as usize + triangle as usize];
        Triangle::from(indices.map(|i| vertices[i as usize]))
    }

    /// Checks that the parallel pools have matching lengths.
    fn validate_pools(&self) -> Result<(), RenderDataError> {
        let pairs = [
            (self.vertices().len(), self.texture_coords().len()),
            (self.triangles().len(), self.materials().len()),
        ];
        match pairs.into_iter().find(|(expected, actual)| expected != actual) {
            Some((expected, actual)) => Err(RenderDataError::LengthMismatch { expected, actual }),
            None => Ok(()),
        }
    }

    /// Looks up the mesh range and checks that it lies inside every pool it indexes.
    fn mesh_range(&self, mesh: MeshIdx) -> Result<MeshRange, RenderDataError> {
        let range = *self
            .meshes()
            .get(mesh)
            .ok_or(RenderDataError::UnknownMesh { mesh })?;

        let vertex_pool = self.vertices().len().min(self.texture_coords().len());
        let triangle_pool = self.triangles().len().min(self.materials().len());
        if !range.fits(vertex_pool, triangle_pool) {
            return Err(RenderDataError::RangeOutOfBounds { range });
        }
        Ok(range)
    }

    /// Checks that the mesh range and all its vertex indices are inside the pools.
    fn validate_mesh(&self, mesh: MeshIdx) -> Result<MeshRange, RenderDataError> {
        let range = self.mesh_range(mesh)?;
        check_indices(&self.triangles()[range.triangles()], range.vertex_count)?;
        Ok(range)
    }
}

fn check_indices(triangles: &[[u32; 3]], vertex_count: u32) -> Result<(), RenderDataError> {
    for (triangle, indices) in triangles.iter().enumerate() {
        if let Some(&vertex) = indices.iter().find(|&&i| i >= vertex_count) {
            return Err(RenderDataError::VertexOutOfRange {
                triangle,
                vertex,
                vertex_count,
            });
        }
    }
    Ok(())
}

/// In-memory render data provider.
#[derive(Clone, Debug, Default)]
pub struct RenderPool {
    vertices: Vec<WorldPoint>,
    texture_coords: Vec<TexturePoint>,
    triangles: Vec<[u32; 3]>,
    materials: Vec<u32>,
    meshes: IndexVec<MeshIdx, MeshRange>,
    instances: IndexVec<InstanceIdx, Instance>,

    dirty_meshes: IndexVec<MeshIdx, bool>,
    instances_dirty: bool,
}

impl RenderPool {
    pub fn new() -> RenderPool {
        RenderPool::default()
    }

    /// Appends a mesh to the pools.
    /// Texture coordinates default to zero when not given.
    pub fn add_mesh(
        &mut self,
        vertices: &[WorldPoint],
        texture_coords: Option<&[TexturePoint]>,
        triangles: &[[u32; 3]],
        material: u32,
    ) -> Result<MeshIdx, RenderDataError> {
        check_indices(triangles, vertices.len() as u32)?;
        if let Some(texture_coords) = texture_coords {
            if texture_coords.len() != vertices.len() {
                return Err(RenderDataError::LengthMismatch {
                    expected: vertices.len(),
                    actual: texture_coords.len(),
                });
            }
        }

        let range = MeshRange {
            first_vertex: self.vertices.len() as u32,
            vertex_count: vertices.len() as u32,
            first_triangle: self.triangles.len() as u32,
            triangle_count: triangles.len() as u32,
        };

        self.vertices.extend_from_slice(vertices);
        match texture_coords {
            Some(texture_coords) => self.texture_coords.extend_from_slice(texture_coords),
            None => self
                .texture_coords
                .extend(std::iter::repeat_n(TexturePoint::origin(), vertices.len())),
        }
        self.triangles.extend_from_slice(triangles);
        self.materials
            .extend(std::iter::repeat_n(material, triangles.len()));

        self.dirty_meshes.push(true);
        Ok(self.meshes.push(range))
    }

    pub fn add_instance(&mut self, instance: Instance) -> Result<InstanceIdx, RenderDataError> {
        if self.meshes.get(instance.mesh).is_none() {
            return Err(RenderDataError::UnknownMesh {
                mesh: instance.mesh,
            });
        }
        self.instances_dirty = true;
        Ok(self.instances.push(instance))
    }

    pub fn set_placement(
        &mut self,
        instance: InstanceIdx,
        placement: Placement,
    ) -> Result<(), RenderDataError> {
        let target = self
            .instances
            .get_mut(instance)
            .ok_or(RenderDataError::UnknownInstance { instance })?;
        target.placement = placement;
        self.instances_dirty = true;
        Ok(())
    }

    /// Replaces vertex positions of a mesh, keeping its topology.
    pub fn update_vertices(
        &mut self,
        mesh: MeshIdx,
        vertices: &[WorldPoint],
    ) -> Result<(), RenderDataError> {
        let range = *self
            .meshes
            .get(mesh)
            .ok_or(RenderDataError::UnknownMesh { mesh })?;
        if vertices.len() != range.vertex_count as usize {
            return Err(RenderDataError::LengthMismatch {
                expected: range.vertex_count as usize,
                actual: vertices.len(),
            });
        }

        self.vertices[range.vertices()].copy_from_slice(vertices);
        self.mark_mesh_dirty(mesh)
    }

    pub fn mark_mesh_dirty(&mut self, mesh: MeshIdx) -> Result<(), RenderDataError> {
        let dirty = self
            .dirty_meshes
            .get_mut(mesh)
            .ok_or(RenderDataError::UnknownMesh { mesh })?;
        *dirty = true;
        Ok(())
    }
}

impl RenderData for RenderPool {
    fn vertices(&self) -> &[WorldPoint] {
        &self.vertices
    }

    fn texture_coords(&self) -> &[TexturePoint] {
        &self.texture_coords
    }

    fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    fn materials(&self) -> &[u32] {
        &self.materials
    }

    fn meshes(&self) -> &IndexSlice<MeshIdx, [MeshRange]> {
        &self.meshes
    }

    fn instances(&self) -> &IndexSlice<InstanceIdx, [Instance]> {
        &self.instances
    }

    fn is_mesh_dirty(&self, mesh: MeshIdx) -> bool {
        self.dirty_meshes.get(mesh).copied().unwrap_or(false)
    }

    fn are_instances_dirty(&self) -> bool {
        self.instances_dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty_meshes.iter_mut().for_each(|dirty| *dirty = false);
        self.instances_dirty = false;
    }
}
