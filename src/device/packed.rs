//! Plain old data records laid out the way device buffers store them.

use bytemuck::{Pod, Zeroable};
use nalgebra::{Quaternion, Translation3, UnitQuaternion, Vector4};

use crate::{
    bvh::{ChildRef, CompressedChildRef, FlatTree, NodeIdx, traversal::NodeSource},
    geometry::{Placement, TexturePoint, WorldBox, WorldPoint},
};

/// Tree node with sign encoded child references.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuNode {
    pub min: [f32; 3],
    pub left: CompressedChildRef,
    pub max: [f32; 3],
    pub right: CompressedChildRef,
}

impl GpuNode {
    pub fn new(bounding_box: &WorldBox, [left, right]: [ChildRef; 2]) -> GpuNode {
        GpuNode {
            min: bounding_box.min.into(),
            left: left.into(),
            max: bounding_box.max.into(),
            right: right.into(),
        }
    }

    pub fn bounding_box(&self) -> WorldBox {
        WorldBox::new(self.min.into(), self.max.into())
    }
}

pub fn pack_tree(tree: &FlatTree) -> Vec<GpuNode> {
    tree.indices()
        .map(|index| GpuNode::new(tree.node_box(index), tree.children(index)))
        .collect()
}

/// Read only view of a packed tree.
/// Inner references are relative to the start of the slice.
#[derive(Copy, Clone, Debug)]
pub struct PackedTree<'a> {
    nodes: &'a [GpuNode],
}

impl<'a> PackedTree<'a> {
    pub fn new(nodes: &'a [GpuNode]) -> Self {
        PackedTree { nodes }
    }
}

impl NodeSource for PackedTree<'_> {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_box(&self, index: NodeIdx) -> WorldBox {
        self.nodes[index.index()].bounding_box()
    }

    fn children(&self, index: NodeIdx) -> [ChildRef; 2] {
        let node = &self.nodes[index.index()];
        [node.left.decode(), node.right.decode()]
    }
}

/// Placed instance, together with where its mesh lives in the shared buffers.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuInstance {
    /// Quaternion coefficients, `[i, j, k, w]`
    pub rotation: [f32; 4],
    pub translation: [f32; 3],
    pub instance_id: u32,

    pub node_offset: u32,
    pub node_count: u32,
    pub first_vertex: u32,
    pub first_triangle: u32,

    pub triangle_count: u32,
    pub _pad: [u32; 3],
}

impl GpuInstance {
    /// Rotation is stored already normalized, so it's read back as is.
    pub fn placement(&self) -> Placement {
        Placement::from_parts(
            Translation3::from(self.translation),
            UnitQuaternion::new_unchecked(Quaternion::from(Vector4::from(self.rotation))),
        )
    }

    pub fn set_placement(&mut self, placement: &Placement) {
        self.rotation = placement.rotation.coords.into();
        self.translation = placement.translation.vector.into();
    }

    pub fn nodes(&self) -> std::ops::Range<usize> {
        let offset = self.node_offset as usize;
        offset..offset + self.node_count as usize
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuTriangle {
    /// Vertex indices, relative to the first vertex of the mesh
    pub indices: [u32; 3],
    pub material: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub _pad0: u32,
    pub texture_coords: [f32; 2],
    pub _pad1: [u32; 2],
}

impl GpuVertex {
    pub fn new(position: &WorldPoint, texture_coords: &TexturePoint) -> GpuVertex {
        GpuVertex {
            position: (*position).into(),
            texture_coords: (*texture_coords).into(),
            ..GpuVertex::zeroed()
        }
    }

    pub fn position(&self) -> WorldPoint {
        self.position.into()
    }

    pub fn texture_coords(&self) -> TexturePoint {
        self.texture_coords.into()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        bvh::{BuildItem, traversal::visit_leaves},
        geometry::{Ray, test::placement},
    };

    use assert2::assert;
    use rand::{SeedableRng, rngs::SmallRng};
    use test_strategy::proptest;

    #[test]
    fn layouts() {
        assert!(std::mem::size_of::<GpuNode>() == 32);
        assert!(std::mem::size_of::<GpuInstance>() == 64);
        assert!(std::mem::size_of::<GpuTriangle>() == 16);
        assert!(std::mem::size_of::<GpuVertex>() == 32);
    }

    #[test]
    fn node_round_trip() {
        let bounding_box = WorldBox::new(
            WorldPoint::new(-1.0, 0.0, 1.0),
            WorldPoint::new(2.0, 3.0, 4.0),
        );
        let children = [ChildRef::Inner(NodeIdx::from_raw(5)), ChildRef::Leaf(0)];
        let node = GpuNode::new(&bounding_box, children);

        assert!(node.left.raw() == -5);
        assert!(node.right.raw() == 0);
        assert!(node.bounding_box() == bounding_box);

        let nodes = [node];
        let packed = PackedTree::new(&nodes);
        assert!(packed.children(NodeIdx::from_raw(0)) == children);
    }

    #[proptest]
    fn placement_round_trip(#[strategy(placement())] placement: Placement) {
        let mut instance = GpuInstance::zeroed();
        instance.set_placement(&placement);
        let restored = instance.placement();

        let p = WorldPoint::new(1.0, 2.0, 3.0);
        assert!((restored.transform_point(&p) - placement.transform_point(&p)).norm() < 1e-3);
    }

    #[test]
    fn packed_tree_visits_like_host_tree() {
        let items = (0..37)
            .map(|i| {
                let p = WorldPoint::new(i as f32, (i % 5) as f32, 0.0);
                BuildItem {
                    id: i,
                    bounding_box: WorldBox::new(p, p + nalgebra::Vector3::repeat(0.5)),
                    centroid: p,
                }
            })
            .collect();
        let tree = crate::bvh::build(items, &mut SmallRng::seed_from_u64(3));
        let nodes = pack_tree(&tree);

        let ray = Ray::new(
            WorldPoint::new(-5.0, 2.2, 0.2),
            crate::geometry::WorldVector::new(1.0, 0.01, 0.0),
        );
        let mut host = Vec::new();
        let mut device = Vec::new();
        visit_leaves(&tree, &ray, f32::INFINITY, |id| host.push(id));
        visit_leaves(&PackedTree::new(&nodes), &ray, f32::INFINITY, |id| device.push(id));

        assert!(!host.is_empty());
        assert!(host == device);
    }
}
