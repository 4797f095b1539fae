//! Jenks natural breaks (Fisher-Jenks optimal 1-D classification)
//!
//! Dynamic programme over two `(n+1) x (k+1)` matrices: the minimum
//! within-class variance of the first `l` values in `j` classes, and the
//! 1-based index where the last of those classes starts. Breaks are read by
//! walking the backlinks from the full sample down to class 2.
//!
//! Reference:
//! Jenks, G.F. (1967). The data model concept in statistical mapping.
//! International Yearbook of Cartography, 7.

use ndarray::Array2;
use vectis_core::{Error, Result};

/// Interior breaks of the optimal `k`-class partition of `sorted`.
///
/// `sorted` must be ascending. Returns the `k - 1` interior breaks, each the
/// upper value of a class. `k == 0`, `k > n` or an empty sample give no
/// breaks. Runs in `O(n^2 k)`.
pub fn jenks_breaks(sorted: &[f64], k: usize) -> Vec<f64> {
    let n = sorted.len();
    if n == 0 || k == 0 || k > n {
        return Vec::new();
    }

    let mut lower = Array2::<usize>::zeros((n + 1, k + 1));
    let mut variance = Array2::<f64>::zeros((n + 1, k + 1));

    for j in 1..=k {
        lower[[1, j]] = 1;
        for l in 2..=n {
            variance[[l, j]] = f64::INFINITY;
        }
    }

    for l in 2..=n {
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut w = 0.0;
        let mut var = 0.0;

        for m in 1..=l {
            let lower_limit = l - m + 1;
            let val = sorted[lower_limit - 1];

            w += 1.0;
            sum += val;
            sum_sq += val * val;
            var = sum_sq - (sum * sum) / w;

            let prev = lower_limit - 1;
            if prev != 0 {
                for j in 2..=k {
                    let candidate = var + variance[[prev, j - 1]];
                    if variance[[l, j]] >= candidate {
                        lower[[l, j]] = lower_limit;
                        variance[[l, j]] = candidate;
                    }
                }
            }
        }

        lower[[l, 1]] = 1;
        variance[[l, 1]] = var;
    }

    let mut breaks = Vec::with_capacity(k - 1);
    let mut end = n;
    for j in (2..=k).rev() {
        let start = lower[[end, j]];
        if start < 2 {
            break;
        }
        breaks.push(sorted[start - 2]);
        end = start - 1;
    }
    breaks.reverse();
    breaks
}

/// Natural breaks for an unsorted sample: Jenks interior breaks plus the
/// maximum, deduplicated.
///
/// Non-finite values are ignored; an empty sample gives no breaks. When Jenks
/// yields nothing (fewer values than classes) the result is `[max]`.
pub fn natural_breaks(values: &[f64], k: usize) -> Result<Vec<f64>> {
    if k < 2 {
        return Err(Error::invalid("classes", k, "need at least 2 classes"));
    }

    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Ok(Vec::new());
    }
    sorted.sort_by(f64::total_cmp);
    let max = sorted[sorted.len() - 1];

    let mut breaks = jenks_breaks(&sorted, k);
    breaks.push(max);
    breaks.sort_by(f64::total_cmp);
    breaks.dedup();
    Ok(breaks)
}
