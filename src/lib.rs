//! copse: a random forest classifier for sparse integer-valued features.
//!
//! This crate trains ensembles of CART-style classification trees over
//! sparse feature vectors (absent feature ⇒ value 0) with integer class
//! labels, and serves hard labels, probability distributions, and margins.
//! Out-of-bag evaluation scores a forest without a holdout set.
//!
//! Training is reproducible by construction: a master seed yields a
//! per-tree seed stream drawn before any work is dispatched, so a fixed
//! seed produces an identical forest under any worker count.

pub mod data;
pub mod error;
pub mod eval;
pub mod io;
pub mod model;
pub mod predict;
pub mod repr;
pub mod testing;
pub mod training;

pub use error::Error;
