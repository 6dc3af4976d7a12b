//! Random forest trainer.
//!
//! Orchestrates argument validation, the per-tree seed stream, and the
//! worker-pool dispatch. Tree `i` of the returned forest is always the tree
//! grown from seed `i`, regardless of worker scheduling.
//!
//! # Example
//!
//! ```ignore
//! use copse::training::{RandomForestParams, RandomForestTrainer, SplitCriterion, SubsetSize};
//!
//! let params = RandomForestParams {
//!     n_trees: 200,
//!     max_features: SubsetSize::Ratio(0.3),
//!     seed: 12345,
//!     ..Default::default()
//! };
//!
//! let trainer = RandomForestTrainer::new(SplitCriterion::Gini, params);
//! let forest = trainer.fit(&dataset)?;
//! ```

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::data::{Dataset, LabelIndex};
use crate::error::Error;
use crate::repr::{Forest, Tree};

use super::grower::{GrowerParams, TreeGrower};
use super::logger::{TrainingLogger, Verbosity};
use super::parallelism::Parallelism;
use super::SplitCriterion;

// ============================================================================
// SubsetSize
// ============================================================================

/// A subset size given either as an exact count or as a proportion.
///
/// Proportions resolve against an upper bound (`round(f · upper)`, clamped
/// into `[1, upper]`). Counts are used as-is: a bootstrap larger than the
/// training set is legal because drawing is with replacement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubsetSize {
    /// Exact count, must be ≥ 1.
    Count(usize),
    /// Proportion in (0, 1] of the upper bound.
    Ratio(f64),
}

impl Default for SubsetSize {
    fn default() -> Self {
        Self::Ratio(1.0)
    }
}

impl SubsetSize {
    /// Resolve to a concrete count against `upper`.
    ///
    /// `what` names the parameter in error messages.
    pub fn resolve(self, upper: usize, what: &str) -> Result<usize, Error> {
        match self {
            Self::Count(0) => Err(Error::invalid(format!("{what}: count must be >= 1"))),
            Self::Count(k) => Ok(k),
            Self::Ratio(f) => {
                if !(f > 0.0 && f <= 1.0) {
                    return Err(Error::invalid(format!(
                        "{what}: ratio must be in (0, 1], got {f}"
                    )));
                }
                let resolved = (f * upper as f64).round() as usize;
                Ok(resolved.clamp(1, upper.max(1)))
            }
        }
    }
}

// ============================================================================
// RandomForestParams
// ============================================================================

/// Parameters for forest training.
///
/// Use struct construction with `..Default::default()` for convenient
/// configuration.
#[derive(Debug, Clone)]
pub struct RandomForestParams {
    /// Number of trees.
    pub n_trees: u32,

    /// Candidate features examined per node.
    ///
    /// A ratio resolves against `card_features` (or the dataset's observed
    /// feature cardinality when unset).
    pub max_features: SubsetSize,

    /// Bootstrap sample size per tree. A ratio resolves against the number
    /// of training rows; a count may exceed it.
    pub max_samples: SubsetSize,

    /// Nodes with at most this many rows become leaves. Must satisfy
    /// `1 <= min_node_size < n_rows`.
    pub min_node_size: usize,

    /// Feature-space cardinality used to resolve a fractional
    /// `max_features`. Defaults to the highest stored feature index + 1;
    /// sparse datasets may understate the true feature space, so callers
    /// that know it should set this.
    pub card_features: Option<usize>,

    /// Worker threads: `0` = rayon's global pool, `1` = sequential,
    /// `n > 1` = dedicated pool for the call.
    pub n_threads: usize,

    /// Master seed for the per-tree seed stream.
    pub seed: u64,

    /// Verbosity of training output.
    pub verbosity: Verbosity,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_features: SubsetSize::Ratio(1.0),
            max_samples: SubsetSize::Ratio(1.0),
            min_node_size: 1,
            card_features: None,
            n_threads: 0,
            seed: 42,
            verbosity: Verbosity::default(),
        }
    }
}

// ============================================================================
// RandomForestTrainer
// ============================================================================

/// Random forest trainer.
pub struct RandomForestTrainer {
    criterion: SplitCriterion,
    params: RandomForestParams,
}

impl RandomForestTrainer {
    /// Create a trainer.
    pub fn new(criterion: SplitCriterion, params: RandomForestParams) -> Self {
        Self { criterion, params }
    }

    /// Get reference to parameters.
    pub fn params(&self) -> &RandomForestParams {
        &self.params
    }

    /// Get the split criterion.
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Train a forest.
    ///
    /// Validates all arguments before any work starts, then grows
    /// `n_trees` trees over the shared read-only dataset.
    ///
    /// # Panics
    ///
    /// Panics if `n_threads > 1` and the dedicated thread pool cannot be
    /// created (rare OS-level failure).
    pub fn fit(&self, dataset: &Dataset) -> Result<Forest, Error> {
        let grower_params = self.validate(dataset)?;
        let parallelism = Parallelism::from_threads(self.params.n_threads);

        // Threading contract:
        // - n_threads == 0: rayon's global pool
        // - n_threads == 1: strictly sequential, no pool touched
        // - n_threads > 1: dedicated pool for this call
        match self.params.n_threads {
            0 | 1 => self.fit_impl(dataset, grower_params, parallelism),
            n => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .expect("failed to create thread pool");

                pool.install(|| self.fit_impl(dataset, grower_params, parallelism))
            }
        }
    }

    /// Validate arguments and resolve subset sizes.
    fn validate(&self, dataset: &Dataset) -> Result<GrowerParams, Error> {
        if !self.criterion.is_implemented() {
            return Err(Error::Unimplemented(self.criterion));
        }
        if self.params.n_trees == 0 {
            return Err(Error::invalid("n_trees must be >= 1"));
        }

        let n_rows = dataset.n_rows();
        if n_rows == 0 {
            return Err(Error::invalid("training set is empty"));
        }
        if self.params.min_node_size == 0 || self.params.min_node_size >= n_rows {
            return Err(Error::invalid(format!(
                "min_node_size must be in [1, {}), got {}",
                n_rows, self.params.min_node_size
            )));
        }

        let card_features = self
            .params
            .card_features
            .unwrap_or_else(|| dataset.observed_feature_cardinality());
        let max_features = self.params.max_features.resolve(card_features, "max_features")?;
        let max_samples = self.params.max_samples.resolve(n_rows, "max_samples")?;

        Ok(GrowerParams {
            criterion: self.criterion,
            max_features,
            max_samples,
            min_node_size: self.params.min_node_size,
        })
    }

    fn fit_impl(
        &self,
        dataset: &Dataset,
        grower_params: GrowerParams,
        parallelism: Parallelism,
    ) -> Result<Forest, Error> {
        let labels = LabelIndex::from_dataset(dataset);

        let mut logger = TrainingLogger::new(self.params.verbosity);
        logger.start_training(self.params.n_trees as usize, self.criterion);
        logger.log_resolved(
            grower_params.max_features,
            grower_params.max_samples,
            grower_params.min_node_size,
        );

        // The full seed stream is drawn sequentially before dispatch; the
        // master RNG is never shared with workers.
        let mut master = Xoshiro256PlusPlus::seed_from_u64(self.params.seed);
        let seeds: Vec<u32> = (0..self.params.n_trees).map(|_| master.gen()).collect();

        let grown: Vec<(Tree, Vec<u32>)> = if parallelism.allows_parallel() {
            // Indexed parallel map: result i comes from seed i no matter
            // which worker ran it.
            seeds
                .par_iter()
                .map(|&seed| grow_one(dataset, &labels, &grower_params, seed))
                .collect()
        } else {
            seeds
                .iter()
                .map(|&seed| grow_one(dataset, &labels, &grower_params, seed))
                .collect()
        };

        let mut forest = Forest::new();
        for (tree, oob_rows) in grown {
            forest.push_tree(tree, oob_rows);
        }

        logger.finish_training(forest.n_trees());
        Ok(forest)
    }
}

/// Grow the tree for one seed. Worker-local: fresh RNG, fresh scratch.
fn grow_one(
    dataset: &Dataset,
    labels: &LabelIndex,
    params: &GrowerParams,
    seed: u32,
) -> (Tree, Vec<u32>) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(u64::from(seed));
    let mut grower = TreeGrower::new(dataset, labels, params.clone());
    grower.grow(&mut rng)
}

// ============================================================================
// Tests
// ============================================================================
