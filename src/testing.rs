//! Testing utilities.
//!
//! Assertion helpers and small fixture datasets shared by unit tests.
//!
//! ```ignore
//! use copse::testing::and_dataset;
//! use copse::assert_approx_eq;
//! ```

use crate::data::{Dataset, Sample};

/// Default tolerance for floating point comparisons.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Assert that two float values are approximately equal.
///
/// Uses absolute difference comparison with the given tolerance.
///
/// # Panics
///
/// Panics if the absolute difference exceeds the tolerance.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left_val = $left;
        let right_val = $right;
        let tol = $tolerance;
        let diff = (left_val - right_val).abs();
        if diff > tol {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                left_val, right_val, diff, tol
            );
        }
    }};
}

/// AND-like separable fixture: label 1 iff both feature 0 and feature 1 are
/// set. Four rows, two classes.
pub fn and_dataset() -> Dataset {
    Dataset::from_samples(vec![
        Sample::new([(0, 1), (1, 1)], 1),
        Sample::new([(0, 1)], 0),
        Sample::new([(1, 1)], 0),
        Sample::new([], 0),
    ])
}

/// Fixture with `n` rows all carrying the same label.
pub fn single_class_dataset(n: usize, label: u32) -> Dataset {
    Dataset::from_samples(
        (0..n)
            .map(|i| Sample::new([(0, i as i64)], label))
            .collect(),
    )
}
