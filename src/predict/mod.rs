//! Forest-level prediction.
//!
//! Per-tree traversal lives on [`Tree`](crate::repr::Tree); this module
//! aggregates tree votes into probability distributions, hard labels, and
//! margins, plus order-preserving batch variants.
//!
//! # Randomness
//!
//! Hard-label prediction breaks probability ties uniformly at random.
//! Single-sample entry points take a caller-supplied RNG; batch entry points
//! take a seed and derive one RNG per sample from a pre-drawn seed stream,
//! so results are identical under any thread count (the same discipline the
//! trainer uses for trees).

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

use std::collections::BTreeMap;

use crate::data::Sample;
use crate::repr::Forest;
use crate::training::Parallelism;

// ============================================================================
// MarginScope
// ============================================================================

/// Which labels the "runner-up probability" of a margin is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarginScope {
    /// Runner-up among the labels tied at maximum probability only
    /// (default). With two or more tied labels the margin is 0.0; with a
    /// unique winner it equals the winner's probability.
    #[default]
    TiedCandidates,
    /// Runner-up among all labels: the gap between the chosen label's
    /// probability and the best competing probability.
    AllLabels,
}

// ============================================================================
// Single-sample prediction
// ============================================================================

impl Forest {
    /// Probability distribution over labels for one sample.
    ///
    /// `probability(ℓ) = votes(ℓ) / n_trees`, over the labels that received
    /// at least one vote, ordered by ascending label. Returns an empty
    /// distribution for an empty forest.
    pub fn predict_proba(&self, sample: &Sample) -> Vec<(u32, f64)> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut votes: BTreeMap<u32, u32> = BTreeMap::new();
        for tree in self.trees() {
            *votes.entry(tree.predict(sample)).or_insert(0) += 1;
        }

        let total = f64::from(self.n_trees() as u32);
        votes
            .into_iter()
            .map(|(label, count)| (label, f64::from(count) / total))
            .collect()
    }

    /// Hard label for one sample: the most probable label, ties broken
    /// uniformly at random. Returns `(label, probability)`.
    ///
    /// # Panics
    /// Panics if the forest is empty.
    pub fn predict_label<R: Rng>(&self, sample: &Sample, rng: &mut R) -> (u32, f64) {
        let (label, prob, _) = self.predict_label_margin(sample, rng, MarginScope::TiedCandidates);
        (label, prob)
    }

    /// Hard label with margin. Returns `(label, probability, margin)`.
    ///
    /// The margin is the chosen label's probability minus the runner-up
    /// probability; [`MarginScope`] selects which labels the runner-up is
    /// taken over.
    ///
    /// # Panics
    /// Panics if the forest is empty.
    pub fn predict_label_margin<R: Rng>(
        &self,
        sample: &Sample,
        rng: &mut R,
        scope: MarginScope,
    ) -> (u32, f64, f64) {
        let proba = self.predict_proba(sample);
        assert!(!proba.is_empty(), "prediction on an empty forest");

        let max_prob = proba
            .iter()
            .map(|&(_, p)| p)
            .fold(f64::NEG_INFINITY, f64::max);

        // Ascending label order from predict_proba keeps the tie set
        // deterministic before the random pick.
        let tied: Vec<u32> = proba
            .iter()
            .filter(|&&(_, p)| p == max_prob)
            .map(|&(l, _)| l)
            .collect();

        let chosen = if tied.len() == 1 {
            tied[0]
        } else {
            tied[rng.gen_range(0..tied.len())]
        };

        let runner_up = match scope {
            MarginScope::TiedCandidates => {
                if tied.len() > 1 {
                    max_prob
                } else {
                    0.0
                }
            }
            MarginScope::AllLabels => proba
                .iter()
                .filter(|&&(l, _)| l != chosen)
                .map(|&(_, p)| p)
                .fold(0.0, f64::max),
        };

        (chosen, max_prob, max_prob - runner_up)
    }
}

// ============================================================================
// Batch prediction
// ============================================================================

/// Predict hard labels for a batch of samples, preserving input order.
///
/// `seed` drives the per-sample tie-break streams; a fixed seed gives
/// identical output for any `parallelism`.
pub fn predict_many(
    forest: &Forest,
    samples: &[Sample],
    seed: u64,
    parallelism: Parallelism,
) -> Vec<(u32, f64)> {
    map_samples(samples, seed, parallelism, |sample, rng| {
        forest.predict_label(sample, rng)
    })
}

/// Predict labels with margins for a batch of samples, preserving input
/// order.
pub fn predict_many_margin(
    forest: &Forest,
    samples: &[Sample],
    seed: u64,
    scope: MarginScope,
    parallelism: Parallelism,
) -> Vec<(u32, f64, f64)> {
    map_samples(samples, seed, parallelism, |sample, rng| {
        forest.predict_label_margin(sample, rng, scope)
    })
}

/// Shared batch driver: pre-drawn per-sample seeds, then an indexed map.
fn map_samples<T, F>(
    samples: &[Sample],
    seed: u64,
    parallelism: Parallelism,
    op: F,
) -> Vec<T>
where
    T: Send,
    F: Fn(&Sample, &mut Xoshiro256PlusPlus) -> T + Sync,
{
    let mut master = Xoshiro256PlusPlus::seed_from_u64(seed);
    let seeds: Vec<u32> = (0..samples.len()).map(|_| master.gen()).collect();

    let run = |(sample, &s): (&Sample, &u32)| {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(u64::from(s));
        op(sample, &mut rng)
    };

    if parallelism.allows_parallel() {
        samples.par_iter().zip(seeds.par_iter()).map(run).collect()
    } else {
        samples.iter().zip(seeds.iter()).map(run).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
