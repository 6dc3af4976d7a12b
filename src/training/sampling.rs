//! Bootstrap row sampling with out-of-bag tracking.

use rand::Rng;

/// Result of drawing a bootstrap sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    /// In-bag row indices: a size-k multiset drawn uniformly with
    /// replacement. Duplicates are expected and preserved in draw order.
    pub rows: Vec<u32>,
    /// Out-of-bag row indices: every row in `[0, n)` never drawn, sorted
    /// ascending.
    pub oob_rows: Vec<u32>,
}

/// Draw `k` rows uniformly with replacement from `[0, n)`.
///
/// `k` may exceed `n`; a bootstrap with replacement is well-defined for any
/// positive size. `k = 0` or `n = 0` is an internal invariant violation
/// (fit-time validation rejects both).
pub fn bootstrap<R: Rng>(rng: &mut R, k: usize, n: usize) -> Bootstrap {
    debug_assert!(n > 0, "bootstrap over an empty training set");
    debug_assert!(k > 0, "empty bootstrap sample");

    let mut drawn = vec![false; n];
    let mut rows = Vec::with_capacity(k);

    for _ in 0..k {
        let row = rng.gen_range(0..n);
        drawn[row] = true;
        rows.push(row as u32);
    }

    let oob_rows = drawn
        .iter()
        .enumerate()
        .filter(|(_, &d)| !d)
        .map(|(i, _)| i as u32)
        .collect();

    Bootstrap { rows, oob_rows }
}
