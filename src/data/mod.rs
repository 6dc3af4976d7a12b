//! Training data containers.
//!
//! This module provides:
//! - [`Sample`]: a sparse feature vector with a class label
//! - [`Dataset`]: an indexable, read-only collection of samples
//! - [`LabelIndex`]: dense remapping of class labels for count buffers
//!
//! # Sparse representation
//!
//! Features are a mapping from a non-negative feature index to an integer
//! value. An absent feature index reads as 0. This default is load-bearing:
//! feature enumeration always injects 0 into a feature's value set, and the
//! splitter buckets absent features at value 0.

use std::collections::HashMap;

pub mod features;

pub use features::{non_constant_features, FeatureValues};

// ============================================================================
// Sample
// ============================================================================

/// A single labeled sample with sparse integer features.
///
/// Immutable after construction. Feature lookup is O(1) average and returns
/// 0 for any index not present in the map, including indices never seen
/// during training.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    features: HashMap<u32, i64>,
    label: u32,
}

impl Sample {
    /// Create a sample from `(feature, value)` pairs and a class label.
    ///
    /// Explicit zero values are allowed but redundant; they read the same as
    /// absent entries.
    pub fn new(features: impl IntoIterator<Item = (u32, i64)>, label: u32) -> Self {
        Self {
            features: features.into_iter().collect(),
            label,
        }
    }

    /// Create an unlabeled sample (label 0) for prediction inputs.
    pub fn unlabeled(features: impl IntoIterator<Item = (u32, i64)>) -> Self {
        Self::new(features, 0)
    }

    /// Value of `feature`, with the sparse default: absent ⇒ 0.
    #[inline]
    pub fn value_of(&self, feature: u32) -> i64 {
        self.features.get(&feature).copied().unwrap_or(0)
    }

    /// Class label of this sample.
    #[inline]
    pub fn label(&self) -> u32 {
        self.label
    }

    /// Iterate over explicitly stored `(feature, value)` pairs.
    ///
    /// Iteration order is unspecified; callers needing determinism must
    /// collect and sort.
    pub fn stored_features(&self) -> impl Iterator<Item = (u32, i64)> + '_ {
        self.features.iter().map(|(&f, &v)| (f, v))
    }

    /// Number of explicitly stored features.
    #[inline]
    pub fn n_stored(&self) -> usize {
        self.features.len()
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// An indexable training set. Row indices are stable for the lifetime of
/// the dataset and are the currency of bootstrap and OOB bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    /// Create a dataset from a vector of samples.
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.samples.len()
    }

    /// Whether the dataset holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the sample at `row`.
    ///
    /// # Panics
    /// Panics if `row` is out of bounds.
    #[inline]
    pub fn sample(&self, row: u32) -> &Sample {
        &self.samples[row as usize]
    }

    /// Iterate over all samples in row order.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Label of the sample at `row`.
    #[inline]
    pub fn label(&self, row: u32) -> u32 {
        self.samples[row as usize].label()
    }

    /// Observed feature cardinality: one past the highest stored feature
    /// index, or 0 for an all-empty dataset.
    ///
    /// Used as the default upper bound when `max_features` is given as a
    /// ratio. Sparse datasets may understate the caller's true feature
    /// space; callers can override via `RandomForestParams::card_features`.
    pub fn observed_feature_cardinality(&self) -> usize {
        self.samples
            .iter()
            .flat_map(|s| s.stored_features().map(|(f, _)| f))
            .max()
            .map(|f| f as usize + 1)
            .unwrap_or(0)
    }
}

// ============================================================================
// LabelIndex
// ============================================================================

/// Dense remapping of the distinct class labels in a dataset.
///
/// Class-count buffers in the hot training path are `Vec<u32>` indexed by
/// dense class id rather than hash maps keyed by raw label. Dense ids are
/// assigned in ascending label order, so iteration over tied classes is
/// deterministic.
#[derive(Debug, Clone)]
pub struct LabelIndex {
    labels: Vec<u32>,
    dense: HashMap<u32, u32>,
}

impl LabelIndex {
    /// Build the index from a dataset's labels.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut labels: Vec<u32> = dataset.samples().map(|s| s.label()).collect();
        labels.sort_unstable();
        labels.dedup();

        let dense = labels
            .iter()
            .enumerate()
            .map(|(i, &l)| (l, i as u32))
            .collect();

        Self { labels, dense }
    }

    /// Number of distinct classes.
    #[inline]
    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    /// Dense id of a raw label.
    ///
    /// # Panics
    /// Panics if the label was not present in the source dataset.
    #[inline]
    pub fn dense(&self, label: u32) -> u32 {
        self.dense[&label]
    }

    /// Raw label for a dense id.
    #[inline]
    pub fn label(&self, dense: u32) -> u32 {
        self.labels[dense as usize]
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_of_defaults_to_zero() {
        let sample = Sample::new([(3, 7), (10, -2)], 1);

        assert_eq!(sample.value_of(3), 7);
        assert_eq!(sample.value_of(10), -2);
        assert_eq!(sample.value_of(0), 0);
        assert_eq!(sample.value_of(999_999), 0);
    }

    #[test]
    fn test_explicit_zero_reads_like_absent() {
        let explicit = Sample::new([(5, 0)], 0);
        let absent = Sample::new([], 0);

        assert_eq!(explicit.value_of(5), absent.value_of(5));
    }

    #[test]
    fn test_observed_feature_cardinality() {
        let dataset = Dataset::from_samples(vec![
            Sample::new([(0, 1)], 0),
            Sample::new([(7, 2)], 1),
            Sample::new([], 0),
        ]);

        assert_eq!(dataset.observed_feature_cardinality(), 8);
        assert_eq!(Dataset::default().observed_feature_cardinality(), 0);
    }

    #[test]
    fn test_label_index_is_sorted_and_dense() {
        let dataset = Dataset::from_samples(vec![
            Sample::new([], 9),
            Sample::new([], 2),
            Sample::new([], 9),
            Sample::new([], 4),
        ]);

        let index = LabelIndex::from_dataset(&dataset);
        assert_eq!(index.n_classes(), 3);
        assert_eq!(index.dense(2), 0);
        assert_eq!(index.dense(4), 1);
        assert_eq!(index.dense(9), 2);
        assert_eq!(index.label(2), 9);
    }
}
