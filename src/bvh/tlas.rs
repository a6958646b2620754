use std::sync::Arc;

use index_vec::IndexSlice;
use rand::Rng;

use super::{
    Blas, BuildItem, FlatTree, building,
    traversal::{trace_instance, traverse_nearest},
};
use crate::{
    geometry::{HitRecord, Placement, Ray, WorldBox},
    render_data::{Instance, InstanceIdx, MeshIdx, RenderData, RenderDataError},
};

/// Instance as seen by the top level tree.
#[derive(Clone, Debug, PartialEq)]
pub struct TlasInstance {
    pub index: InstanceIdx,
    pub mesh: MeshIdx,
    pub placement: Placement,
    /// Object space bounds of the mesh, moved by the placement.
    pub world_box: WorldBox,
}

/// Top level tree over instance world boxes.
/// Primitive ids index `instances()`, instances of empty meshes are left out.
#[derive(Clone, Debug, Default)]
pub struct Tlas {
    tree: FlatTree,
    instances: Vec<TlasInstance>,
}

impl Tlas {
    pub fn build(
        instances: &IndexSlice<InstanceIdx, [Instance]>,
        blases: &IndexSlice<MeshIdx, [Arc<Blas>]>,
        rng: &mut impl Rng,
    ) -> Result<Tlas, RenderDataError> {
        let mut tlas_instances = Vec::with_capacity(instances.len());

        for (index, instance) in instances.iter_enumerated() {
            let blas = blases
                .get(instance.mesh)
                .ok_or(RenderDataError::UnknownMesh {
                    mesh: instance.mesh,
                })?;
            let Some(local_box) = blas.bounding_box() else {
                continue;
            };

            tlas_instances.push(TlasInstance {
                index,
                mesh: instance.mesh,
                placement: instance.placement,
                world_box: local_box.transformed(&instance.placement),
            });
        }

        let items = tlas_instances
            .iter()
            .enumerate()
            .map(|(id, instance)| BuildItem {
                id: id as u32,
                bounding_box: instance.world_box.clone(),
                centroid: instance.world_box.center(),
            })
            .collect();

        log::debug!(
            "Building TLAS over {} of {} instances",
            tlas_instances.len(),
            instances.len()
        );

        Ok(Tlas {
            tree: building::build(items, rng),
            instances: tlas_instances,
        })
    }

    pub fn tree(&self) -> &FlatTree {
        &self.tree
    }

    pub fn instances(&self) -> &[TlasInstance] {
        &self.instances
    }

    /// Number of instances a ray can hit.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Finds the nearest hit among all instances, in world space.
    pub fn intersect<D: RenderData + ?Sized>(
        &self,
        ray: &Ray,
        blases: &IndexSlice<MeshIdx, [Arc<Blas>]>,
        data: &D,
        record: &mut HitRecord,
        reference_mode: bool,
    ) {
        traverse_nearest(&self.tree, ray, record, |id, record| {
            let instance = &self.instances[id as usize];
            let blas = &blases[instance.mesh];
            trace_instance(
                &instance.placement,
                instance.index.raw(),
                ray,
                record,
                |local_ray, record| blas.intersect(local_ray, data, record, reference_mode),
            );
        });
    }
}
