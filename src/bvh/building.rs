use index_vec::IndexVec;
use ordered_float::OrderedFloat;
use rand::Rng;

use super::{ChildRef, FlatTree, MAX_STACK_DEPTH, NodeIdx};
use crate::geometry::{WorldBox, WorldPoint};

/// Primitive handed to the builder.
/// Ids must be unique and smaller than the number of items.
#[derive(Clone, Debug)]
pub struct BuildItem {
    pub id: u32,
    pub bounding_box: WorldBox,
    pub centroid: WorldPoint,
}

index_vec::define_index_type! {
    struct BuildNodeIdx = u32;
}

#[derive(Clone, Debug)]
enum BuildNode {
    Inner {
        bounding_box: WorldBox,
        left: BuildNodeIdx,
        right: BuildNodeIdx,
    },
    Leaf {
        bounding_box: WorldBox,
        /// Single primitive leaves store the same id twice
        primitives: [u32; 2],
    },
}

impl BuildNode {
    fn bounding_box(&self) -> &WorldBox {
        match self {
            BuildNode::Inner { bounding_box, .. } | BuildNode::Leaf { bounding_box, .. } => {
                bounding_box
            }
        }
    }
}

/// Host side tree with nodes in an arena, only lives until it is flattened.
struct BuildTree {
    nodes: IndexVec<BuildNodeIdx, BuildNode>,
    root: Option<BuildNodeIdx>,
    depth: usize,
    primitive_count: usize,
}

impl BuildTree {
    fn new(mut items: Vec<BuildItem>, rng: &mut impl Rng) -> BuildTree {
        let mut tree = BuildTree {
            nodes: IndexVec::with_capacity(2 * items.len()),
            root: None,
            depth: 0,
            primitive_count: items.len(),
        };

        if !items.is_empty() {
            let (root, depth) = tree.build_recursive(&mut items, rng);
            tree.root = Some(root);
            tree.depth = depth;
        }

        tree
    }

    /// Returns index of the new node and depth of its subtree.
    fn build_recursive(
        &mut self,
        items: &mut [BuildItem],
        rng: &mut impl Rng,
    ) -> (BuildNodeIdx, usize) {
        debug_assert!(!items.is_empty());

        match items {
            [item] => {
                let leaf = BuildNode::Leaf {
                    bounding_box: item.bounding_box.clone(),
                    primitives: [item.id, item.id],
                };
                (self.nodes.push(leaf), 1)
            }
            [a, b] => {
                let leaf = BuildNode::Leaf {
                    bounding_box: a.bounding_box.surrounding_box(&b.bounding_box),
                    primitives: [a.id, b.id],
                };
                (self.nodes.push(leaf), 1)
            }
            _ => {
                let axis = rng.random_range(0..3);
                items.sort_unstable_by_key(|item| OrderedFloat(item.centroid[axis]));

                let middle = items.len() / 2;
                let (left_items, right_items) = items.split_at_mut(middle);
                let (left, left_depth) = self.build_recursive(left_items, rng);
                let (right, right_depth) = self.build_recursive(right_items, rng);

                let bounding_box = self.nodes[left]
                    .bounding_box()
                    .surrounding_box(self.nodes[right].bounding_box());
                let inner = BuildNode::Inner {
                    bounding_box,
                    left,
                    right,
                };
                (self.nodes.push(inner), 1 + left_depth.max(right_depth))
            }
        }
    }

    /// Writes the tree out in pre-order, root at index 0.
    /// Both children of a node get their slots before either subtree is written.
    fn flatten(&self) -> FlatTree {
        let mut flat = FlatTree {
            depth: self.depth,
            primitive_count: self.primitive_count,
            ..FlatTree::default()
        };

        if let Some(root) = self.root {
            let slot = flat.push_node(self.nodes[root].bounding_box().clone());
            self.flatten_recursive(root, slot, &mut flat);
        }

        flat
    }

    fn flatten_recursive(&self, node: BuildNodeIdx, slot: NodeIdx, flat: &mut FlatTree) {
        match &self.nodes[node] {
            BuildNode::Leaf { primitives, .. } => {
                flat.set_children(
                    slot,
                    ChildRef::Leaf(primitives[0]),
                    ChildRef::Leaf(primitives[1]),
                );
            }
            BuildNode::Inner { left, right, .. } => {
                let left_slot = flat.push_node(self.nodes[*left].bounding_box().clone());
                let right_slot = flat.push_node(self.nodes[*right].bounding_box().clone());
                flat.set_children(
                    slot,
                    ChildRef::Inner(left_slot),
                    ChildRef::Inner(right_slot),
                );

                self.flatten_recursive(*left, left_slot, flat);
                self.flatten_recursive(*right, right_slot, flat);
            }
        }
    }
}

/// Builds a flattened tree over the items using median splits along random axes.
/// The result only depends on the items and the state of the random generator.
pub fn build(items: Vec<BuildItem>, rng: &mut impl Rng) -> FlatTree {
    let tree = BuildTree::new(items, rng).flatten();

    assert2::assert!(
        tree.stack_capacity() <= MAX_STACK_DEPTH,
        "Tree is too deep for the traversal stack"
    );
    log::debug!(
        "Built tree with {} nodes over {} primitives, depth {}",
        tree.len(),
        tree.primitive_count(),
        tree.depth()
    );

    tree
}
