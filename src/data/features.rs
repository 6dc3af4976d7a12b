//! Feature enumeration over a row set.
//!
//! A feature can discriminate at a node only if at least two distinct values
//! are observed among the node's rows. Because of the sparse representation,
//! 0 is implicitly observed for a feature whenever any row omits it, so 0 is
//! injected into every value set unconditionally before the singleton filter
//! runs.

use std::collections::{BTreeMap, BTreeSet};

use super::Dataset;

/// A candidate feature and its distinct observed values (ascending, with 0
/// always present).
///
/// The value list doubles as the threshold list for the splitter: each value
/// is a `<= t` split boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureValues {
    /// Feature index.
    pub feature: u32,
    /// Distinct values, sorted ascending. Always contains 0.
    pub values: Vec<i64>,
}

/// Enumerate the non-constant features over `rows`.
///
/// For each feature stored by any of the rows, collect its distinct values,
/// inject 0, and drop features whose value set is a singleton. The result is
/// ordered by ascending feature index, which keeps downstream shuffles
/// reproducible under a fixed RNG.
///
/// Duplicate rows (bootstrap multisets) are fine; duplicates cannot add
/// distinct values.
pub fn non_constant_features(dataset: &Dataset, rows: &[u32]) -> Vec<FeatureValues> {
    let mut observed: BTreeMap<u32, BTreeSet<i64>> = BTreeMap::new();

    for &row in rows {
        for (feature, value) in dataset.sample(row).stored_features() {
            observed.entry(feature).or_default().insert(value);
        }
    }

    observed
        .into_iter()
        .filter_map(|(feature, mut values)| {
            values.insert(0);
            if values.len() < 2 {
                return None;
            }
            Some(FeatureValues {
                feature,
                values: values.into_iter().collect(),
            })
        })
        .collect()
}
