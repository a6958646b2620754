use rand::Rng;

use super::{BuildItem, FlatTree, building, traversal::traverse_nearest};
use crate::{
    geometry::{HitRecord, Ray, Triangle, WorldBox},
    render_data::{MeshIdx, MeshRange, RenderData, RenderDataError},
};

/// Bottom level tree over the triangles of a single mesh, in object space.
/// Primitive ids are triangle indices local to the mesh.
#[derive(Clone, Debug)]
pub struct Blas {
    mesh: MeshIdx,
    range: MeshRange,
    tree: FlatTree,
}

impl Blas {
    pub fn build<D: RenderData + ?Sized>(
        mesh: MeshIdx,
        data: &D,
        rng: &mut impl Rng,
    ) -> Result<Blas, RenderDataError> {
        let range = data.validate_mesh(mesh)?;

        let items = (0..range.triangle_count)
            .map(|triangle| {
                let geometry = data.mesh_triangle(&range, triangle);
                BuildItem {
                    id: triangle,
                    bounding_box: geometry.bounding_box(),
                    centroid: geometry.centroid(),
                }
            })
            .collect();

        log::debug!(
            "Building BLAS for mesh {} ({} triangles)",
            mesh.raw(),
            range.triangle_count
        );

        Ok(Blas {
            mesh,
            range,
            tree: building::build(items, rng),
        })
    }

    pub fn mesh(&self) -> MeshIdx {
        self.mesh
    }

    pub fn range(&self) -> &MeshRange {
        &self.range
    }

    pub fn tree(&self) -> &FlatTree {
        &self.tree
    }

    /// Object space bounds of the mesh, None for meshes without triangles.
    pub fn bounding_box(&self) -> Option<&WorldBox> {
        self.tree.bounding_box()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Tightens the record with the nearest triangle hit of an object space ray.
    /// Reference mode tests every triangle instead of walking the tree.
    pub fn intersect<D: RenderData + ?Sized>(
        &self,
        ray: &Ray,
        data: &D,
        record: &mut HitRecord,
        reference_mode: bool,
    ) {
        let intersect_triangle =
            |triangle, record: &mut HitRecord| self.intersect_triangle(triangle, ray, data, record);

        if reference_mode {
            for triangle in 0..self.range.triangle_count {
                intersect_triangle(triangle, record);
            }
        } else {
            traverse_nearest(&self.tree, ray, record, intersect_triangle);
        }
    }

    fn intersect_triangle<D: RenderData + ?Sized>(
        &self,
        triangle: u32,
        ray: &Ray,
        data: &D,
        record: &mut HitRecord,
    ) {
        let geometry = data.mesh_triangle(&self.range, triangle);
        let Some(hit) = geometry.intersect(ray, record.t) else {
            return;
        };

        let global = self.range.first_triangle as usize + triangle as usize;
        if record.offer(ray, &geometry, &hit, data.materials()[global], triangle) {
            if let Some(texture_coords) = data.texture_coords().get(self.range.vertices()) {
                let indices = data.triangles()[global];
                record.set_texture_coords(&Triangle::from(
                    indices.map(|i| texture_coords[i as usize]),
                ));
            }
        }
    }
}
