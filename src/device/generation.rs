use std::sync::Arc;

use index_vec::{IndexSlice, IndexVec};

use super::{
    DeviceBuffer, DeviceMemory, ResourceError,
    packed::{GpuInstance, GpuNode, GpuTriangle, GpuVertex, PackedTree, pack_tree},
};
use crate::{
    bvh::{
        Blas, Tlas,
        traversal::{trace_instance, traverse_nearest},
    },
    geometry::{HitRecord, Ray, TexturePoint, Triangle},
    render_data::{MeshIdx, RenderData},
};

/// Complete immutable snapshot of the acceleration structures and geometry in device memory.
/// Traversals only ever see whole generations, a new one replaces the old one wholesale.
#[derive(Debug)]
pub struct Generation {
    id: u64,
    reference_mode: bool,

    tlas_nodes: DeviceBuffer<GpuNode>,
    instances: DeviceBuffer<GpuInstance>,
    blas_nodes: DeviceBuffer<GpuNode>,
    vertices: DeviceBuffer<GpuVertex>,
    triangles: DeviceBuffer<GpuTriangle>,
}

impl Generation {
    /// Packs and uploads everything a traversal needs.
    /// On failure all buffers allocated so far are released again.
    pub fn upload<D: RenderData + ?Sized>(
        id: u64,
        memory: &Arc<DeviceMemory>,
        tlas: &Tlas,
        blases: &IndexSlice<MeshIdx, [Arc<Blas>]>,
        data: &D,
        reference_mode: bool,
    ) -> Result<Generation, ResourceError> {
        let mut blas_nodes = Vec::new();
        let mut node_ranges = IndexVec::<MeshIdx, _>::with_capacity(blases.len());
        for blas in blases {
            let offset = blas_nodes.len() as u32;
            blas_nodes.extend(pack_tree(blas.tree()));
            node_ranges.push((offset, blas.tree().len() as u32));
        }

        let instances = tlas
            .instances()
            .iter()
            .map(|instance| {
                let blas = &blases[instance.mesh];
                let (node_offset, node_count) = node_ranges[instance.mesh];
                let mut packed = GpuInstance {
                    instance_id: instance.index.raw(),
                    node_offset,
                    node_count,
                    first_vertex: blas.range().first_vertex,
                    first_triangle: blas.range().first_triangle,
                    triangle_count: blas.range().triangle_count,
                    ..bytemuck::Zeroable::zeroed()
                };
                packed.set_placement(&instance.placement);
                packed
            })
            .collect();

        // Buffers follow the position and index pools, missing attributes read as zero
        let texture_coords = data.texture_coords();
        let vertices = data
            .vertices()
            .iter()
            .enumerate()
            .map(|(i, position)| {
                let uv = texture_coords.get(i).copied().unwrap_or_else(TexturePoint::origin);
                GpuVertex::new(position, &uv)
            })
            .collect();

        let materials = data.materials();
        let triangles = data
            .triangles()
            .iter()
            .enumerate()
            .map(|(i, indices)| GpuTriangle {
                indices: *indices,
                material: materials.get(i).copied().unwrap_or_default(),
            })
            .collect();

        let generation = Generation {
            id,
            reference_mode,
            tlas_nodes: memory.upload(format!("tlas_nodes_{id}"), pack_tree(tlas.tree()))?,
            instances: memory.upload(format!("instances_{id}"), instances)?,
            blas_nodes: memory.upload(format!("blas_nodes_{id}"), blas_nodes)?,
            vertices: memory.upload(format!("vertices_{id}"), vertices)?,
            triangles: memory.upload(format!("triangles_{id}"), triangles)?,
        };

        log::debug!(
            "Uploaded generation {id}: {} instances, {} bytes",
            generation.instance_count(),
            generation.size()
        );

        Ok(generation)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Total bytes held in device memory.
    pub fn size(&self) -> usize {
        self.tlas_nodes.size()
            + self.instances.size()
            + self.blas_nodes.size()
            + self.vertices.size()
            + self.triangles.size()
    }

    /// Finds the nearest hit along a world space ray.
    /// Returns a miss record (`t = +inf`) if nothing is hit.
    pub fn trace(&self, ray: &Ray) -> HitRecord {
        let mut record = HitRecord::miss();

        traverse_nearest(
            &PackedTree::new(&self.tlas_nodes),
            ray,
            &mut record,
            |id, record| {
                let instance = &self.instances[id as usize];
                trace_instance(
                    &instance.placement(),
                    instance.instance_id,
                    ray,
                    record,
                    |local_ray, record| self.trace_blas(instance, local_ray, record),
                );
            },
        );

        record
    }

    fn trace_blas(&self, instance: &GpuInstance, ray: &Ray, record: &mut HitRecord) {
        if self.reference_mode {
            for triangle in 0..instance.triangle_count {
                self.intersect_triangle(instance, triangle, ray, record);
            }
        } else {
            let nodes = PackedTree::new(&self.blas_nodes[instance.nodes()]);
            traverse_nearest(&nodes, ray, record, |triangle, record| {
                self.intersect_triangle(instance, triangle, ray, record)
            });
        }
    }

    fn intersect_triangle(
        &self,
        instance: &GpuInstance,
        triangle: u32,
        ray: &Ray,
        record: &mut HitRecord,
    ) {
        let packed = &self.triangles[instance.first_triangle as usize + triangle as usize];
        let vertices = packed
            .indices
            .map(|i| &self.vertices[instance.first_vertex as usize + i as usize]);
        let geometry = Triangle::from(vertices.map(GpuVertex::position));

        let Some(hit) = geometry.intersect(ray, record.t) else {
            return;
        };
        if record.offer(ray, &geometry, &hit, packed.material, triangle) {
            record.set_texture_coords(&Triangle::from(vertices.map(GpuVertex::texture_coords)));
        }
    }
}
