//! Forest container: an ordered collection of trees with their OOB rows.

use super::Tree;

/// A trained random forest.
///
/// Entry `i` pairs the tree grown from the i-th per-tree seed with the
/// training-row indices that never appeared in that tree's bootstrap
/// (out-of-bag rows, sorted ascending). Tree order is the seed order and is
/// stable across thread counts.
///
/// The forest exclusively owns its trees and OOB arrays. OOB arrays exist
/// for in-memory evaluation only; persistence strips them (see
/// [`crate::io::native`]), so a loaded forest compares equal to the saved
/// one after [`Forest::drop_oob`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Forest {
    trees: Vec<Tree>,
    oob_rows: Vec<Vec<u32>>,
}

impl Forest {
    /// Create an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a forest from bare trees (no OOB information), e.g. after
    /// deserialization. Each tree gets an empty OOB array.
    pub fn from_trees(trees: Vec<Tree>) -> Self {
        let oob_rows = vec![Vec::new(); trees.len()];
        Self { trees, oob_rows }
    }

    /// Append a tree with its OOB row indices.
    pub fn push_tree(&mut self, tree: Tree, oob_rows: Vec<u32>) {
        self.trees.push(tree);
        self.oob_rows.push(oob_rows);
    }

    /// Number of trees.
    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Whether the forest holds no trees.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Get a specific tree.
    #[inline]
    pub fn tree(&self, idx: usize) -> &Tree {
        &self.trees[idx]
    }

    /// OOB row indices for a specific tree (empty after `drop_oob` or load).
    #[inline]
    pub fn oob_rows(&self, idx: usize) -> &[u32] {
        &self.oob_rows[idx]
    }

    /// Iterate over trees in seed order.
    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    /// Iterate over `(tree, oob_rows)` entries in seed order.
    pub fn entries(&self) -> impl Iterator<Item = (&Tree, &[u32])> {
        self.trees
            .iter()
            .zip(self.oob_rows.iter().map(|v| v.as_slice()))
    }

    /// Discard all OOB arrays, releasing their memory.
    ///
    /// Call before persisting a model when OOB evaluation is done; the
    /// persisted form never includes OOB rows either way.
    pub fn drop_oob(&mut self) {
        for rows in &mut self.oob_rows {
            *rows = Vec::new();
        }
    }

    /// Consume the forest, returning its trees in seed order.
    pub fn into_trees(self) -> Vec<Tree> {
        self.trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::MutableTree;

    fn leaf_tree(label: u32) -> Tree {
        let mut t = MutableTree::new();
        let root = t.init_root();
        t.make_leaf(root, label);
        t.freeze()
    }

    #[test]
    fn test_entries_preserve_order() {
        let mut forest = Forest::new();
        forest.push_tree(leaf_tree(0), vec![1, 2]);
        forest.push_tree(leaf_tree(1), vec![0]);

        let labels: Vec<u32> = forest.trees().map(|t| t.leaf_label(0)).collect();
        assert_eq!(labels, vec![0, 1]);
        assert_eq!(forest.oob_rows(0), &[1, 2]);
        assert_eq!(forest.oob_rows(1), &[0]);
    }

    #[test]
    fn test_drop_oob_matches_from_trees() {
        let mut forest = Forest::new();
        forest.push_tree(leaf_tree(3), vec![0, 4]);
        forest.push_tree(leaf_tree(5), vec![2]);

        let rebuilt = Forest::from_trees(forest.trees().cloned().collect());
        forest.drop_oob();
        assert_eq!(forest, rebuilt);
    }
}
