//! Candidate split enumeration for one node.
//!
//! For a candidate feature, every distinct observed value (plus the implicit
//! 0) is a threshold. The scan walks the value-sorted buckets once,
//! maintaining streaming left/right class-count histograms, and emits one
//! cost record per threshold. The record for the maximum observed value has
//! an empty right side and competes for minimum cost like any other; the
//! cost function handles empty sides without division artifacts.
//!
//! Records carry `(cost, feature, threshold)` and the child cardinalities;
//! the winning record's row partition is materialized once by
//! [`partition`], after tie-breaking, instead of cloning row sets for every
//! threshold.

use crate::data::{Dataset, FeatureValues, LabelIndex};

use super::criterion::{split_cost, SplitCriterion};

// ============================================================================
// SplitRecord
// ============================================================================

/// One candidate split: route `value <= threshold` left, the rest right.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRecord {
    /// Cardinality-weighted impurity cost (minimized).
    pub cost: f64,
    /// Feature index.
    pub feature: u32,
    /// Threshold value.
    pub threshold: i64,
    /// Number of rows routed left.
    pub left_len: u32,
    /// Number of rows routed right.
    pub right_len: u32,
}

// ============================================================================
// Splitter
// ============================================================================

/// Streaming split scanner with node-local scratch.
///
/// One instance lives per tree build; its buffers are reused across nodes to
/// avoid allocator churn.
#[derive(Debug)]
pub struct Splitter {
    criterion: SplitCriterion,
    n_classes: usize,
    /// Flat `[bucket][class]` counts, one bucket per threshold value.
    bucket_counts: Vec<u32>,
    left_counts: Vec<u32>,
    right_counts: Vec<u32>,
}

impl Splitter {
    /// Create a splitter for a dataset with `n_classes` distinct labels.
    pub fn new(criterion: SplitCriterion, n_classes: usize) -> Self {
        Self {
            criterion,
            n_classes,
            bucket_counts: Vec::new(),
            left_counts: vec![0; n_classes],
            right_counts: vec![0; n_classes],
        }
    }

    /// Scan one candidate feature over `rows`, appending a record per
    /// threshold to `out`.
    ///
    /// `feature.values` must be the value set computed over these same rows
    /// (ascending, 0 included); every row's value is found in it.
    pub fn scan_feature(
        &mut self,
        dataset: &Dataset,
        labels: &LabelIndex,
        rows: &[u32],
        feature: &FeatureValues,
        out: &mut Vec<SplitRecord>,
    ) {
        let values = &feature.values;
        let n_classes = self.n_classes;

        self.bucket_counts.clear();
        self.bucket_counts.resize(values.len() * n_classes, 0);
        self.left_counts.fill(0);
        self.right_counts.fill(0);

        // Bucket rows by value; everything starts on the right.
        for &row in rows {
            let value = dataset.sample(row).value_of(feature.feature);
            let bucket = values
                .binary_search(&value)
                .unwrap_or_else(|_| unreachable!("row value missing from the node's value set"));
            let class = labels.dense(dataset.label(row)) as usize;

            self.bucket_counts[bucket * n_classes + class] += 1;
            self.right_counts[class] += 1;
        }

        let mut left_total = 0u32;
        let mut right_total = rows.len() as u32;

        // Prefix scan: each threshold moves its bucket from right to left.
        for (bucket, &threshold) in values.iter().enumerate() {
            let counts = &self.bucket_counts[bucket * n_classes..(bucket + 1) * n_classes];
            for (class, &c) in counts.iter().enumerate() {
                self.left_counts[class] += c;
                self.right_counts[class] -= c;
                left_total += c;
                right_total -= c;
            }

            let cost = split_cost(
                self.criterion,
                &self.left_counts,
                left_total,
                &self.right_counts,
                right_total,
            );

            out.push(SplitRecord {
                cost,
                feature: feature.feature,
                threshold,
                left_len: left_total,
                right_len: right_total,
            });
        }
    }
}

/// Materialize the row partition of a chosen split.
///
/// Row order within each side follows the parent's order; nothing downstream
/// depends on intra-node row order.
pub fn partition(
    dataset: &Dataset,
    rows: &[u32],
    feature: u32,
    threshold: i64,
) -> (Vec<u32>, Vec<u32>) {
    let mut left = Vec::with_capacity(rows.len());
    let mut right = Vec::new();

    for &row in rows {
        if dataset.sample(row).value_of(feature) <= threshold {
            left.push(row);
        } else {
            right.push(row);
        }
    }

    (left, right)
}

// ============================================================================
// Tests
// ============================================================================
