//! Out-of-bag evaluation and scoring.
//!
//! OOB evaluation scores a forest without a holdout set: each training row
//! is predicted only by the trees that never saw it in their bootstrap, and
//! the per-row majority over those votes is compared against the truth.
//!
//! ROC AUC is delegated: this module builds the labeled score pairs and
//! hands them to a pluggable [`AucEstimator`] collaborator.

use std::collections::BTreeMap;

use rand::Rng;

use crate::data::Dataset;
use crate::repr::Forest;

// ============================================================================
// OOB prediction
// ============================================================================

/// Consolidated OOB predictions: one `(truth, predicted)` pair per training
/// row that was out-of-bag for at least one tree, in ascending row order.
///
/// Rows never out-of-bag for any tree are omitted; with few trees (or a
/// bootstrap much larger than the training set) that is expected, not an
/// error. Majority ties are broken uniformly at random with `rng`.
pub fn predict_oob<R: Rng>(rng: &mut R, forest: &Forest, dataset: &Dataset) -> Vec<(u32, u32)> {
    let n_rows = dataset.n_rows();
    let mut votes: Vec<BTreeMap<u32, u32>> = vec![BTreeMap::new(); n_rows];

    for (tree, oob_rows) in forest.entries() {
        for &row in oob_rows {
            let label = tree.predict(dataset.sample(row));
            *votes[row as usize].entry(label).or_insert(0) += 1;
        }
    }

    let mut out = Vec::new();
    for (row, row_votes) in votes.iter().enumerate() {
        if row_votes.is_empty() {
            continue;
        }

        let max = row_votes.values().copied().max().unwrap_or(0);
        // BTreeMap iteration gives the tie set in ascending label order.
        let tied: Vec<u32> = row_votes
            .iter()
            .filter(|&(_, &c)| c == max)
            .map(|(&l, _)| l)
            .collect();

        let predicted = if tied.len() == 1 {
            tied[0]
        } else {
            tied[rng.gen_range(0..tied.len())]
        };

        out.push((dataset.label(row as u32), predicted));
    }

    out
}

/// Summary of an OOB evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OobScore {
    /// Fraction of evaluated rows predicted correctly.
    pub accuracy: f64,
    /// Number of rows that had at least one OOB tree.
    pub n_evaluated: usize,
}

/// Run [`predict_oob`] and summarize it.
pub fn oob_score<R: Rng>(rng: &mut R, forest: &Forest, dataset: &Dataset) -> OobScore {
    let pairs = predict_oob(rng, forest, dataset);
    OobScore {
        accuracy: accuracy(&pairs),
        n_evaluated: pairs.len(),
    }
}

// ============================================================================
// Scores
// ============================================================================

/// Fraction of `(truth, predicted)` pairs that agree. Returns 0.0 for an
/// empty slice.
pub fn accuracy(pairs: &[(u32, u32)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    let correct = pairs.iter().filter(|&&(t, p)| t == p).count();
    correct as f64 / pairs.len() as f64
}

/// Matthews correlation coefficient for one target class, computed over
/// `(truth, predicted)` pairs by collapsing all other classes into the
/// negative side.
///
/// Convention: returns 0.0 when the denominator is zero (a degenerate
/// confusion matrix where some marginal is empty).
pub fn mcc(pairs: &[(u32, u32)], target: u32) -> f64 {
    let mut tp = 0.0f64;
    let mut tn = 0.0f64;
    let mut fp = 0.0f64;
    let mut fn_ = 0.0f64;

    for &(truth, predicted) in pairs {
        match (truth == target, predicted == target) {
            (true, true) => tp += 1.0,
            (false, false) => tn += 1.0,
            (false, true) => fp += 1.0,
            (true, false) => fn_ += 1.0,
        }
    }

    let denom = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    (tp * tn - fp * fn_) / denom
}

// ============================================================================
// ROC AUC (delegated)
// ============================================================================

/// External collaborator computing an area under the ROC curve from
/// `(score, is_target)` pairs. The core never computes the area itself.
pub trait AucEstimator {
    /// Area under the ROC curve for the given labeled scores.
    fn auc(&self, scored: &[(f64, bool)]) -> f64;
}

/// ROC AUC for one target class.
///
/// `preds` are `(predicted_label, probability)` pairs as produced by hard
/// label prediction; `truths` are the matching true labels. Each pair is
/// turned into a score for the target class — the predicted probability if
/// the predicted label is the target, `1 − probability` otherwise — and the
/// labeled scores are handed to `estimator`.
///
/// # Panics
/// Panics if `preds` and `truths` differ in length.
pub fn roc_auc<E: AucEstimator>(
    target: u32,
    preds: &[(u32, f64)],
    truths: &[u32],
    estimator: &E,
) -> f64 {
    assert_eq!(preds.len(), truths.len(), "preds/truths length mismatch");

    let scored: Vec<(f64, bool)> = preds
        .iter()
        .zip(truths.iter())
        .map(|(&(label, prob), &truth)| {
            let score = if label == target { prob } else { 1.0 - prob };
            (score, truth == target)
        })
        .collect();

    estimator.auc(&scored)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;
    use crate::data::Sample;
    use crate::repr::MutableTree;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn leaf_tree(label: u32) -> crate::repr::Tree {
        let mut t = MutableTree::new();
        let root = t.init_root();
        t.make_leaf(root, label);
        t.freeze()
    }

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(0)
    }

    #[test]
    fn test_predict_oob_majority_per_row() {
        let dataset = Dataset::from_samples(vec![
            Sample::new([], 0),
            Sample::new([], 1),
            Sample::new([], 1),
        ]);

        let mut forest = Forest::new();
        forest.push_tree(leaf_tree(0), vec![0, 1]);
        forest.push_tree(leaf_tree(1), vec![1, 2]);
        forest.push_tree(leaf_tree(1), vec![1]);

        let pairs = predict_oob(&mut rng(), &forest, &dataset);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0], (0, 0));
        // Row 1: votes {0:1, 1:2} — majority 1.
        assert_eq!(pairs[1], (1, 1));
        assert_eq!(pairs[2], (1, 1));
    }

    #[test]
    fn test_predict_oob_omits_never_oob_rows() {
        let dataset = Dataset::from_samples(vec![Sample::new([], 0), Sample::new([], 1)]);

        let mut forest = Forest::new();
        forest.push_tree(leaf_tree(0), vec![1]);

        let pairs = predict_oob(&mut rng(), &forest, &dataset);
        assert_eq!(pairs, vec![(1, 0)]);
    }

    #[test]
    fn test_predict_oob_tie_breaks_among_voted_labels() {
        let dataset = Dataset::from_samples(vec![Sample::new([], 1)]);

        let mut forest = Forest::new();
        forest.push_tree(leaf_tree(3), vec![0]);
        forest.push_tree(leaf_tree(5), vec![0]);

        for seed in 0..10 {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            let pairs = predict_oob(&mut rng, &forest, &dataset);
            assert_eq!(pairs.len(), 1);
            assert!(pairs[0].1 == 3 || pairs[0].1 == 5);
        }
    }

    #[test]
    fn test_accuracy() {
        assert_approx_eq!(accuracy(&[(1, 1), (0, 0), (1, 0), (0, 0)]), 0.75, 1e-12);
        assert_eq!(accuracy(&[]), 0.0);
    }

    #[test]
    fn test_mcc_perfect_is_one() {
        let pairs = [(1, 1), (0, 0), (1, 1), (0, 0)];
        assert_approx_eq!(mcc(&pairs, 1), 1.0, 1e-12);
    }

    #[test]
    fn test_mcc_inverted_is_minus_one() {
        let pairs = [(1, 0), (0, 1), (1, 0), (0, 1)];
        assert_approx_eq!(mcc(&pairs, 1), -1.0, 1e-12);
    }

    #[test]
    fn test_mcc_zero_denominator_is_zero() {
        // Everything predicted as the target: tn + fn_ marginal is empty.
        let pairs = [(0, 1), (1, 1)];
        assert_eq!(mcc(&pairs, 1), 0.0);
        assert_eq!(mcc(&[], 1), 0.0);
    }

    struct CapturingEstimator;

    impl AucEstimator for CapturingEstimator {
        fn auc(&self, scored: &[(f64, bool)]) -> f64 {
            // Mann–Whitney rank statistic, enough to validate the pairs.
            let pos: Vec<f64> = scored.iter().filter(|s| s.1).map(|s| s.0).collect();
            let neg: Vec<f64> = scored.iter().filter(|s| !s.1).map(|s| s.0).collect();
            if pos.is_empty() || neg.is_empty() {
                return 0.5;
            }
            let mut wins = 0.0;
            for &p in &pos {
                for &n in &neg {
                    if p > n {
                        wins += 1.0;
                    } else if p == n {
                        wins += 0.5;
                    }
                }
            }
            wins / (pos.len() * neg.len()) as f64
        }
    }

    #[test]
    fn test_roc_auc_score_construction() {
        // Predicted target with prob 0.8 → score 0.8; predicted other with
        // prob 0.6 → score 0.4. Positive outranks negative: AUC 1.0.
        let preds = [(1u32, 0.8), (0u32, 0.6)];
        let truths = [1u32, 0u32];
        let auc = roc_auc(1, &preds, &truths, &CapturingEstimator);
        assert_approx_eq!(auc, 1.0, 1e-12);
    }

    #[test]
    fn test_predict_oob_on_trained_forest() {
        use crate::training::{
            RandomForestParams, RandomForestTrainer, SplitCriterion, SubsetSize,
        };

        let dataset = crate::testing::and_dataset();
        let params = RandomForestParams {
            n_trees: 101,
            max_features: SubsetSize::Count(2),
            max_samples: SubsetSize::Count(4),
            min_node_size: 1,
            seed: 9,
            n_threads: 1,
            ..Default::default()
        };
        let forest = RandomForestTrainer::new(SplitCriterion::Gini, params)
            .fit(&dataset)
            .unwrap();

        let pairs = predict_oob(&mut rng(), &forest, &dataset);

        // With 101 trees every row is out-of-bag somewhere; pairs come back
        // in ascending row order with the dataset's truth labels.
        assert_eq!(pairs.len(), 4);
        let truths: Vec<u32> = pairs.iter().map(|&(t, _)| t).collect();
        assert_eq!(truths, vec![1, 0, 0, 0]);
        assert!(pairs.iter().all(|&(_, p)| p == 0 || p == 1));
    }

    #[test]
    fn test_oob_score_summary() {
        let dataset = Dataset::from_samples(vec![
            Sample::new([], 0),
            Sample::new([], 0),
            Sample::new([], 1),
        ]);

        let mut forest = Forest::new();
        forest.push_tree(leaf_tree(0), vec![0, 1]);

        let score = oob_score(&mut rng(), &forest, &dataset);
        assert_eq!(score.n_evaluated, 2);
        assert_approx_eq!(score.accuracy, 1.0, 1e-12);
    }
}
