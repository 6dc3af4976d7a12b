//! Single-tree CART induction.
//!
//! Grows one classification tree from a bootstrap sample of the training
//! set. Randomization enters in three places, all fed by the tree's own RNG:
//! the bootstrap draw, the per-node feature shuffle, and uniform tie-breaks
//! (minimum-cost records and majority classes).
//!
//! The build walks an explicit work stack instead of recursing, so tree
//! depth never becomes call-stack depth. Splitter scratch and class-count
//! buffers live on the grower and are reused across nodes within a tree.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::data::{non_constant_features, Dataset, LabelIndex};
use crate::repr::{MutableTree, NodeId, Tree};

use super::criterion::SplitCriterion;
use super::sampling::{bootstrap, Bootstrap};
use super::splitter::{partition, SplitRecord, Splitter};

// ============================================================================
// GrowerParams
// ============================================================================

/// Resolved hyperparameters for growing one tree.
///
/// Counts here are already resolved from [`super::SubsetSize`] inputs and
/// validated; the grower trusts them.
#[derive(Debug, Clone)]
pub struct GrowerParams {
    /// Split criterion (validated implemented).
    pub criterion: SplitCriterion,
    /// Candidate features examined per node.
    pub max_features: usize,
    /// Bootstrap sample size per tree.
    pub max_samples: usize,
    /// Nodes with at most this many rows become leaves.
    pub min_node_size: usize,
}

// ============================================================================
// TreeGrower
// ============================================================================

/// Grows classification trees over a shared read-only training set.
///
/// One grower per worker; scratch buffers are reused across the nodes of a
/// tree and across consecutive trees grown by the same worker.
pub struct TreeGrower<'a> {
    dataset: &'a Dataset,
    labels: &'a LabelIndex,
    params: GrowerParams,
    splitter: Splitter,
    /// All split records of the node under consideration.
    records: Vec<SplitRecord>,
    /// Indices into `records` tied at minimum cost.
    tied_records: Vec<usize>,
    /// Dense class counts for majority votes.
    class_counts: Vec<u32>,
    /// Dense class ids tied at maximum count.
    tied_classes: Vec<u32>,
}

impl<'a> TreeGrower<'a> {
    /// Create a grower for the given training set.
    pub fn new(dataset: &'a Dataset, labels: &'a LabelIndex, params: GrowerParams) -> Self {
        let n_classes = labels.n_classes();
        Self {
            dataset,
            labels,
            splitter: Splitter::new(params.criterion, n_classes),
            params,
            records: Vec::new(),
            tied_records: Vec::new(),
            class_counts: vec![0; n_classes],
            tied_classes: Vec::new(),
        }
    }

    /// Grow one tree: bootstrap, then induce over the in-bag rows.
    ///
    /// Returns the tree and the sorted out-of-bag row indices.
    pub fn grow<R: Rng>(&mut self, rng: &mut R) -> (Tree, Vec<u32>) {
        let Bootstrap { rows, oob_rows } =
            bootstrap(rng, self.params.max_samples, self.dataset.n_rows());

        let mut tree = MutableTree::new();
        let root = tree.init_root();

        // Left child on top: nodes are expanded in the same depth-first,
        // left-to-right order a recursive formulation would use, which pins
        // down the RNG consumption sequence.
        let mut stack: Vec<(NodeId, Vec<u32>)> = vec![(root, rows)];
        while let Some((node, node_rows)) = stack.pop() {
            self.grow_node(&mut tree, node, node_rows, &mut stack, rng);
        }

        (tree.freeze(), oob_rows)
    }

    fn grow_node<R: Rng>(
        &mut self,
        tree: &mut MutableTree,
        node: NodeId,
        rows: Vec<u32>,
        stack: &mut Vec<(NodeId, Vec<u32>)>,
        rng: &mut R,
    ) {
        // Stop: node too small to split further.
        if rows.len() <= self.params.min_node_size {
            let label = self.majority_class(&rows, rng);
            tree.make_leaf(node, label);
            return;
        }

        // Stop: pure node. An all-same-label bootstrap must come out as a
        // single leaf, not a zero-cost split into two identical leaves.
        if let Some(label) = self.pure_label(&rows) {
            tree.make_leaf(node, label);
            return;
        }

        // Candidate features: non-constant over this node's rows, shuffled,
        // first max_features kept.
        let mut candidates = non_constant_features(self.dataset, &rows);
        candidates.shuffle(rng);
        candidates.truncate(self.params.max_features);

        // Stop: nothing left that can discriminate.
        if candidates.is_empty() {
            let label = self.majority_class(&rows, rng);
            tree.make_leaf(node, label);
            return;
        }

        self.records.clear();
        for feature in &candidates {
            self.splitter
                .scan_feature(self.dataset, self.labels, &rows, feature, &mut self.records);
        }

        let chosen = self.pick_min_cost_record(rng);

        // Degenerate split: one empty side cannot partition; the non-empty
        // side is the whole node.
        if chosen.left_len == 0 || chosen.right_len == 0 {
            let label = self.majority_class(&rows, rng);
            tree.make_leaf(node, label);
            return;
        }

        let (left, right) = partition(self.dataset, &rows, chosen.feature, chosen.threshold);
        let (left_id, right_id) = tree.apply_split(node, chosen.feature, chosen.threshold);

        if chosen.cost == 0.0 {
            // Pure parent shortcut: zero cost means both children are pure,
            // so finish them as leaves without another analyzer pass.
            let left_label = self.majority_class(&left, rng);
            let right_label = self.majority_class(&right, rng);
            tree.make_leaf(left_id, left_label);
            tree.make_leaf(right_id, right_label);
        } else {
            stack.push((right_id, right));
            stack.push((left_id, left));
        }
    }

    /// Choose uniformly among the records tied at minimum cost.
    fn pick_min_cost_record<R: Rng>(&mut self, rng: &mut R) -> SplitRecord {
        debug_assert!(!self.records.is_empty());

        let min_cost = self
            .records
            .iter()
            .map(|r| r.cost)
            .fold(f64::INFINITY, f64::min);

        self.tied_records.clear();
        for (i, record) in self.records.iter().enumerate() {
            if record.cost == min_cost {
                self.tied_records.push(i);
            }
        }

        let pick = if self.tied_records.len() == 1 {
            self.tied_records[0]
        } else {
            self.tied_records[rng.gen_range(0..self.tied_records.len())]
        };

        self.records[pick].clone()
    }

    /// If every row carries the same label, return it.
    fn pure_label(&mut self, rows: &[u32]) -> Option<u32> {
        self.class_counts.fill(0);
        for &row in rows {
            let class = self.labels.dense(self.dataset.label(row)) as usize;
            self.class_counts[class] += 1;
        }

        let mut nonzero = self
            .class_counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0);

        match (nonzero.next(), nonzero.next()) {
            (Some((class, _)), None) => Some(self.labels.label(class as u32)),
            _ => None,
        }
    }

    /// Most frequent label among `rows`, ties broken uniformly at random.
    fn majority_class<R: Rng>(&mut self, rows: &[u32], rng: &mut R) -> u32 {
        debug_assert!(!rows.is_empty(), "majority class of an empty row set");

        self.class_counts.fill(0);
        for &row in rows {
            let class = self.labels.dense(self.dataset.label(row)) as usize;
            self.class_counts[class] += 1;
        }

        let max = *self.class_counts.iter().max().unwrap_or(&0);
        self.tied_classes.clear();
        for (class, &count) in self.class_counts.iter().enumerate() {
            if count == max {
                self.tied_classes.push(class as u32);
            }
        }

        let pick = if self.tied_classes.len() == 1 {
            self.tied_classes[0]
        } else {
            self.tied_classes[rng.gen_range(0..self.tied_classes.len())]
        };

        self.labels.label(pick)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Sample;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn grower_params(max_features: usize, max_samples: usize) -> GrowerParams {
        GrowerParams {
            criterion: SplitCriterion::Gini,
            max_features,
            max_samples,
            min_node_size: 1,
        }
    }

    fn grow_with_seed(dataset: &Dataset, params: GrowerParams, seed: u64) -> (Tree, Vec<u32>) {
        let labels = LabelIndex::from_dataset(dataset);
        let mut grower = TreeGrower::new(dataset, &labels, params);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        grower.grow(&mut rng)
    }

    fn and_dataset() -> Dataset {
        Dataset::from_samples(vec![
            Sample::new([(0, 1), (1, 1)], 1),
            Sample::new([(0, 1)], 0),
            Sample::new([(1, 1)], 0),
            Sample::new([], 0),
        ])
    }

    #[test]
    fn test_single_class_grows_single_leaf() {
        let dataset = Dataset::from_samples(
            (0..10).map(|i| Sample::new([(0, i)], 7)).collect(),
        );

        for seed in 0..20 {
            let (tree, _) = grow_with_seed(&dataset, grower_params(3, 10), seed);
            assert_eq!(tree.n_nodes(), 1);
            assert_eq!(tree.leaf_label(0), 7);
        }
    }

    #[test]
    fn test_constant_feature_never_split_on() {
        // Feature 5 reads 42 on every row. Injecting 0 keeps it a candidate
        // ({0, 42}), but every threshold routes all rows to one side, and a
        // degenerate winner becomes a leaf. No internal node may carry it.
        let dataset = Dataset::from_samples(
            (0..12)
                .map(|i| Sample::new([(3, i % 4), (5, 42)], (i % 2) as u32))
                .collect(),
        );

        for seed in 0..20 {
            let (tree, _) = grow_with_seed(&dataset, grower_params(2, 12), seed);
            for node in tree.internal_nodes() {
                assert_ne!(tree.split_feature(node), 5);
            }
        }
    }

    #[test]
    fn test_memorizes_separable_data() {
        // Oversampled bootstrap: with k = 64 over 4 rows, at least one seed
        // below leaves nothing out of bag; in-bag separable data is
        // memorized exactly.
        let dataset = and_dataset();
        let mut saw_full_bag = false;

        for seed in 0..10 {
            let (tree, oob) = grow_with_seed(&dataset, grower_params(2, 64), seed);
            if !oob.is_empty() {
                continue;
            }
            saw_full_bag = true;
            for row in 0..dataset.n_rows() as u32 {
                assert_eq!(tree.predict(dataset.sample(row)), dataset.label(row));
            }
        }

        assert!(saw_full_bag);
    }

    #[test]
    fn test_pure_split_yields_leaf_children() {
        // Two classes cleanly separated by feature 0 at <= 0.
        let dataset = Dataset::from_samples(vec![
            Sample::new([], 0),
            Sample::new([], 0),
            Sample::new([(0, 1)], 1),
            Sample::new([(0, 1)], 1),
        ]);

        for seed in 0..20 {
            let (tree, _) = grow_with_seed(&dataset, grower_params(1, 32), seed);
            // Oversampled bootstrap almost surely contains both classes; if
            // it does, the root split is pure and the tree stops at depth 1.
            if tree.n_nodes() > 1 {
                assert_eq!(tree.n_nodes(), 3);
                assert!(tree.is_leaf(tree.left_child(0)));
                assert!(tree.is_leaf(tree.right_child(0)));
            }
        }
    }

    #[test]
    fn test_grow_is_deterministic_per_seed() {
        let dataset = and_dataset();

        let (a, oob_a) = grow_with_seed(&dataset, grower_params(2, 4), 99);
        let (b, oob_b) = grow_with_seed(&dataset, grower_params(2, 4), 99);
        assert_eq!(a, b);
        assert_eq!(oob_a, oob_b);
    }

    #[test]
    fn test_routing_partitions_in_bag_rows() {
        let dataset = and_dataset();
        let (tree, _) = grow_with_seed(&dataset, grower_params(2, 4), 11);

        // Every training sample reaches exactly one leaf.
        for row in 0..dataset.n_rows() as u32 {
            let label = tree.predict(dataset.sample(row));
            assert!(label <= 1);
        }
    }
}
