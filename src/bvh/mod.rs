mod blas;
mod building;
mod printing;
mod tlas;
pub mod traversal;

pub use blas::Blas;
pub use building::{BuildItem, build};
pub use printing::TreeStatistics;
pub use tlas::{Tlas, TlasInstance};

use bytemuck::{Pod, Zeroable};
use index_vec::IndexVec;

use crate::geometry::WorldBox;

/// Capacity of the fixed size traversal stack.
/// Every built tree must need at most this many entries (see `FlatTree::stack_capacity`).
pub const MAX_STACK_DEPTH: usize = 64;

index_vec::define_index_type! {
    pub struct NodeIdx = u32;
    MAX_INDEX = i32::MAX as usize;
    IMPL_RAW_CONVERSIONS = true;
}

/// Reference from a node to one of its children.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChildRef {
    /// Primitive id (triangle for BLAS, instance for TLAS).
    Leaf(u32),
    /// Another node of the same tree.
    Inner(NodeIdx),
}

/// Sign encoded child reference, as stored in device buffers.
/// Non-negative values are primitive ids, negative values are negated node indices.
/// Root (index 0) is never a child, so zero is always a primitive.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct CompressedChildRef(i32);

impl CompressedChildRef {
    pub const MAX_PRIMITIVE: u32 = i32::MAX as u32;

    /// Create a new leaf reference, panics if the id is out of range
    pub fn new_leaf(primitive: u32) -> Self {
        assert2::assert!(primitive <= Self::MAX_PRIMITIVE);
        Self(primitive as i32)
    }

    /// Create a new inner node reference, panics for the root or out of range indices
    pub fn new_inner(index: NodeIdx) -> Self {
        assert2::assert!(index.raw() != 0, "Root can't be referenced as a child");
        Self(-(index.raw() as i32))
    }

    pub fn decode(&self) -> ChildRef {
        if self.0 >= 0 {
            ChildRef::Leaf(self.0 as u32)
        } else {
            ChildRef::Inner(NodeIdx::from_raw(self.0.unsigned_abs()))
        }
    }

    pub fn raw(&self) -> i32 {
        self.0
    }
}

impl From<ChildRef> for CompressedChildRef {
    fn from(value: ChildRef) -> Self {
        match value {
            ChildRef::Leaf(primitive) => Self::new_leaf(primitive),
            ChildRef::Inner(index) => Self::new_inner(index),
        }
    }
}

impl std::fmt::Debug for CompressedChildRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressedChildRef")
            .field("0", &self.0)
            .field("<decoded>", &self.decode())
            .finish()
    }
}

/// Tree flattened into parallel arrays addressable by node index.
/// Root is at index 0, an empty tree has no nodes and never gets hit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlatTree {
    boxes: IndexVec<NodeIdx, WorldBox>,
    left: IndexVec<NodeIdx, ChildRef>,
    right: IndexVec<NodeIdx, ChildRef>,

    depth: usize,
    primitive_count: usize,
}

impl FlatTree {
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Number of node levels, leaves included.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn primitive_count(&self) -> usize {
        self.primitive_count
    }

    /// Traversal stack entries needed to walk this tree.
    pub fn stack_capacity(&self) -> usize {
        (2 * self.depth).max(1)
    }

    pub fn bounding_box(&self) -> Option<&WorldBox> {
        self.boxes.first()
    }

    pub fn node_box(&self, index: NodeIdx) -> &WorldBox {
        &self.boxes[index]
    }

    pub fn children(&self, index: NodeIdx) -> [ChildRef; 2] {
        [self.left[index], self.right[index]]
    }

    pub fn indices(&self) -> impl Iterator<Item = NodeIdx> {
        self.boxes.indices()
    }

    /// Appends a node with placeholder children, returning its index.
    fn push_node(&mut self, bounding_box: WorldBox) -> NodeIdx {
        self.left.push(ChildRef::Leaf(0));
        self.right.push(ChildRef::Leaf(0));
        self.boxes.push(bounding_box)
    }

    fn set_children(&mut self, index: NodeIdx, left: ChildRef, right: ChildRef) {
        self.left[index] = left;
        self.right[index] = right;
    }

    /// Checks that all child references point to valid nodes or primitives.
    pub fn validate(&self) -> bool {
        self.indices().all(|index| {
            self.children(index).iter().all(|child| match *child {
                ChildRef::Leaf(primitive) => (primitive as usize) < self.primitive_count,
                ChildRef::Inner(child) => child.index() != 0 && child.index() < self.len(),
            })
        })
    }
}
