//! Iterative nearest hit search over flattened trees.
//!
//! Uses a fixed capacity stack and no allocation, so the same loop works over
//! host trees and packed device buffers alike.

use arrayvec::ArrayVec;

use super::{ChildRef, FlatTree, MAX_STACK_DEPTH, NodeIdx};
use crate::geometry::{FloatType, HitRecord, Placement, Ray, T_MIN, WorldBox};

pub type TraversalStack = ArrayVec<NodeIdx, MAX_STACK_DEPTH>;

/// Random access to nodes of a flattened tree.
pub trait NodeSource {
    fn node_count(&self) -> usize;
    fn node_box(&self, index: NodeIdx) -> WorldBox;
    fn children(&self, index: NodeIdx) -> [ChildRef; 2];
}

impl NodeSource for FlatTree {
    fn node_count(&self) -> usize {
        self.len()
    }

    fn node_box(&self, index: NodeIdx) -> WorldBox {
        FlatTree::node_box(self, index).clone()
    }

    fn children(&self, index: NodeIdx) -> [ChildRef; 2] {
        FlatTree::children(self, index)
    }
}

/// Finds the nearest primitive hit along the ray.
///
/// `intersect_leaf` is called for each primitive in a leaf whose box is hit and
/// is expected to only tighten the record. Nodes whose box is entirely beyond the
/// current record are skipped.
pub fn traverse_nearest<T: NodeSource + ?Sized>(
    tree: &T,
    ray: &Ray,
    record: &mut HitRecord,
    intersect_leaf: impl FnMut(u32, &mut HitRecord),
) {
    walk(tree, ray, record, |record| record.t, intersect_leaf);
}

/// Calls `f` for every primitive of every leaf whose box the ray hits before `t_max`.
pub fn visit_leaves<T: NodeSource + ?Sized>(
    tree: &T,
    ray: &Ray,
    t_max: FloatType,
    mut f: impl FnMut(u32),
) {
    walk(tree, ray, &mut (), |_| t_max, |primitive, _| f(primitive));
}

/// Traces a ray against a placed instance.
///
/// The ray is moved into object space of the instance and handed to `trace_local`,
/// any hit it adds is moved back into world space and tagged with the instance id.
pub fn trace_instance(
    placement: &Placement,
    instance: u32,
    ray: &Ray,
    record: &mut HitRecord,
    trace_local: impl FnOnce(&Ray, &mut HitRecord),
) {
    let local_ray = ray.inverse_transformed(placement);
    let previous_t = record.t;

    trace_local(&local_ray, record);

    if record.t < previous_t {
        record.place(placement, instance);
    }
}

fn walk<T: NodeSource + ?Sized, S>(
    tree: &T,
    ray: &Ray,
    state: &mut S,
    t_max: impl Fn(&S) -> FloatType,
    mut leaf: impl FnMut(u32, &mut S),
) {
    if tree.node_count() == 0 || ray.is_degenerate() {
        return;
    }

    let mut stack = TraversalStack::new();
    stack.push(NodeIdx::from_raw(0));

    while let Some(index) = stack.pop() {
        if !tree.node_box(index).hit(ray, T_MIN, t_max(state)) {
            continue;
        }

        let children = tree.children(index);
        // A leaf holding a single primitive references it twice
        let child_count = if children[0] == children[1] { 1 } else { 2 };

        // Reversed, so that the left child gets popped first
        for child in children[..child_count].iter().rev() {
            match *child {
                ChildRef::Leaf(primitive) => leaf(primitive, state),
                ChildRef::Inner(child) => push(&mut stack, child),
            }
        }
    }
}

fn push(stack: &mut TraversalStack, index: NodeIdx) {
    let pushed = stack.try_push(index).is_ok();
    assert2::debug_assert!(pushed, "Traversal stack overflow");
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::{Triangle, TriangleHit, WorldPoint, WorldVector};

    use assert2::assert;
    use nalgebra::{Translation3, UnitQuaternion};

    fn big_box() -> WorldBox {
        WorldBox::new(
            WorldPoint::new(-10.0, -10.0, -10.0),
            WorldPoint::new(10.0, 10.0, 10.0),
        )
    }

    fn ray() -> Ray {
        Ray::new(
            WorldPoint::new(0.0, 0.0, -20.0),
            WorldVector::new(0.0, 0.0, 1.0),
        )
    }

    /// Tree where every level leaves one extra node on the stack.
    fn deep_tree(levels: usize) -> FlatTree {
        let mut tree = FlatTree {
            depth: levels + 1,
            primitive_count: 1,
            ..FlatTree::default()
        };
        let mut current = tree.push_node(big_box());
        for _ in 0..levels {
            let left = tree.push_node(big_box());
            let right = tree.push_node(big_box());
            tree.set_children(current, ChildRef::Inner(left), ChildRef::Inner(right));
            tree.set_children(right, ChildRef::Leaf(0), ChildRef::Leaf(0));
            current = left;
        }
        tree.set_children(current, ChildRef::Leaf(0), ChildRef::Leaf(0));
        tree
    }

    #[test]
    fn empty_tree_never_calls_back() {
        let mut record = HitRecord::miss();
        traverse_nearest(&FlatTree::default(), &ray(), &mut record, |_, _| {
            panic!("No leaves to visit")
        });
        assert!(record.t == f32::INFINITY);
    }

    #[test]
    fn degenerate_ray_never_calls_back() {
        let tree = deep_tree(3);
        let degenerate = Ray::new(WorldPoint::origin(), WorldVector::zeros());
        let mut count = 0;
        visit_leaves(&tree, &degenerate, f32::INFINITY, |_| count += 1);
        assert!(count == 0);
    }

    #[test]
    fn single_primitive_leaf_is_visited_once() {
        let tree = deep_tree(0);
        let mut count = 0;
        visit_leaves(&tree, &ray(), f32::INFINITY, |_| count += 1);
        assert!(count == 1);
    }

    #[test]
    fn boxes_beyond_record_are_pruned() {
        let tree = deep_tree(3);
        let mut count = 0;
        // Box starts at t = 10
        visit_leaves(&tree, &ray(), 5.0, |_| count += 1);
        assert!(count == 0);
        visit_leaves(&tree, &ray(), 15.0, |_| count += 1);
        assert!(count == 4);
    }

    #[test]
    fn stack_fits_moderate_depth() {
        let tree = deep_tree(MAX_STACK_DEPTH - 1);
        let mut count = 0;
        visit_leaves(&tree, &ray(), f32::INFINITY, |_| count += 1);
        assert!(count == MAX_STACK_DEPTH);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn stack_overflow_is_asserted() {
        let tree = deep_tree(2 * MAX_STACK_DEPTH);
        visit_leaves(&tree, &ray(), f32::INFINITY, |_| {});
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn stack_overflow_drops_nodes() {
        let tree = deep_tree(2 * MAX_STACK_DEPTH);
        let mut count = 0;
        visit_leaves(&tree, &ray(), f32::INFINITY, |_| count += 1);
        assert!(count > 0);
        assert!(count < 2 * MAX_STACK_DEPTH + 1);
    }

    #[test]
    fn instance_hit_is_moved_to_world_space() {
        let triangle = Triangle::new(
            WorldPoint::new(-1.0, -1.0, 0.0),
            WorldPoint::new(1.0, -1.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        );
        let placement = Placement::from_parts(
            Translation3::new(0.0, 0.0, 5.0),
            UnitQuaternion::from_axis_angle(&WorldVector::x_axis(), 0.3),
        );

        let mut record = HitRecord::miss();
        trace_instance(&placement, 3, &ray(), &mut record, |local, record| {
            let hit: TriangleHit = triangle.intersect(local, record.t).unwrap();
            record.offer(local, &triangle, &hit, 0, 0);
        });

        assert!(record.is_hit());
        assert!(record.instance == 3);
        assert!((record.t - 25.0).abs() < 1e-4);
        assert!((record.point - WorldPoint::new(0.0, 0.0, 5.0)).norm() < 1e-4);
        // Normal faces the ray
        assert!(record.normal.dot(&ray().direction) < 0.0);
    }

    #[test]
    fn instance_miss_leaves_record_alone() {
        let mut record = HitRecord::miss();
        trace_instance(
            &Placement::identity(),
            3,
            &ray(),
            &mut record,
            |_, _| {},
        );
        assert!(record.instance == HitRecord::NO_ID);
    }
}
