//! Forest training.
//!
//! This module provides the full training pipeline:
//!
//! - [`SplitCriterion`], [`gini`], [`split_cost`]: impurity and split cost
//! - [`Splitter`]: per-feature threshold enumeration
//! - [`TreeGrower`]: single-tree CART induction
//! - [`bootstrap`]: row sampling with OOB tracking
//! - [`RandomForestTrainer`], [`RandomForestParams`]: the forest builder
//! - [`Parallelism`], [`TrainingLogger`], [`Verbosity`]: shared plumbing
//!
//! # Determinism
//!
//! Every source of randomness is seeded from `RandomForestParams::seed`:
//! the master RNG emits one 32-bit seed per tree, drawn sequentially before
//! any work is dispatched, and each worker rebuilds its own RNG from its
//! seed. A fixed seed therefore yields an identical forest under any thread
//! count.

mod criterion;
mod grower;
mod logger;
mod parallelism;
mod sampling;
mod splitter;
mod trainer;

pub use criterion::{gini, split_cost, SplitCriterion};
pub use grower::{GrowerParams, TreeGrower};
pub use logger::{TrainingLogger, Verbosity};
pub use parallelism::Parallelism;
pub use sampling::{bootstrap, Bootstrap};
pub use splitter::{partition, SplitRecord, Splitter};
pub use trainer::{RandomForestParams, RandomForestTrainer, SubsetSize};
