use std::fmt::Display;

use super::{ChildRef, FlatTree, NodeIdx};
use crate::util::Stats;

/// Shape summary of a flattened tree.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeStatistics {
    pub node_count: usize,
    pub primitive_count: usize,
    /// Depth of each leaf, root level counted as 1.
    pub leaf_depth: Stats,
    /// Number of distinct primitives per leaf.
    pub leaf_fill: Stats,
}

impl TreeStatistics {
    pub fn new(tree: &FlatTree) -> TreeStatistics {
        let mut statistics = TreeStatistics {
            node_count: tree.len(),
            primitive_count: tree.primitive_count(),
            leaf_depth: Stats::default(),
            leaf_fill: Stats::default(),
        };

        if !tree.is_empty() {
            statistics.collect_recursive(tree, NodeIdx::from_raw(0), 1);
        }

        statistics
    }

    fn collect_recursive(&mut self, tree: &FlatTree, index: NodeIdx, depth: usize) {
        match tree.children(index) {
            [ChildRef::Inner(left), ChildRef::Inner(right)] => {
                self.collect_recursive(tree, left, depth + 1);
                self.collect_recursive(tree, right, depth + 1);
            }
            [left, right] => {
                self.leaf_depth.add_sample(depth);
                self.leaf_fill.add_sample(if left == right { 1 } else { 2 });
            }
        }
    }

    pub fn log(&self, label: &str) {
        log::info!("{label}: {self}");
    }
}

impl Display for TreeStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} nodes over {} primitives; leaf depth {}; leaf fill {}",
            self.node_count, self.primitive_count, self.leaf_depth, self.leaf_fill
        )
    }
}

impl FlatTree {
    /// Writes the tree structure to stdout, one node per line.
    pub fn print_tree(&self) {
        if !self.is_empty() {
            self.print_recursive(0, NodeIdx::from_raw(0));
        }
    }

    fn print_recursive(&self, indent: usize, index: NodeIdx) {
        let node_box = self.node_box(index);
        println!(
            "{}- {}: {:?}-{:?}",
            "  ".repeat(indent),
            index.raw(),
            node_box.min,
            node_box.max,
        );

        for child in self.children(index) {
            match child {
                ChildRef::Inner(child) => self.print_recursive(indent + 1, child),
                ChildRef::Leaf(primitive) => {
                    println!("{}- P{}", "  ".repeat(indent + 1), primitive)
                }
            }
        }
    }
}
