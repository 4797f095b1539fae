//! Quantile class breaks

use vectis_core::{Error, Result};

/// Quantile breaks: `k` classes with roughly equal counts.
///
/// Non-finite values are ignored and an empty sample gives no breaks. The
/// final break is always the maximum. Breaks are deduplicated, so heavily
/// tied samples can yield fewer than `k` classes.
pub fn quantile_breaks(values: &[f64], k: usize) -> Result<Vec<f64>> {
    if k < 2 {
        return Err(Error::invalid("classes", k, "need at least 2 classes"));
    }

    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Ok(Vec::new());
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let step = (n / k).max(1);
    let mut breaks: Vec<f64> = (1..k).map(|i| sorted[(i * step).min(n - 1)]).collect();
    breaks.push(sorted[n - 1]);

    breaks.sort_by(f64::total_cmp);
    breaks.dedup();
    Ok(breaks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_to_ten_in_three() {
        let v: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(quantile_breaks(&v, 3).unwrap(), vec![4.0, 7.0, 10.0]);
    }

    #[test]
    fn test_unsorted_input_with_nan() {
        let v = vec![9.0, f64::NAN, 1.0, 5.0, 3.0, f64::INFINITY, 7.0];
        let b = quantile_breaks(&v, 5).unwrap();
        // n = 5, step 1 -> sorted[1..4] then max
        assert_eq!(b, vec![3.0, 5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_more_classes_than_values() {
        let b = quantile_breaks(&[2.0, 8.0], 5).unwrap();
        assert_eq!(b, vec![8.0]);
        assert!(b.len() <= 5);
    }

    #[test]
    fn test_ties_collapse() {
        let b = quantile_breaks(&[1.0; 20], 4).unwrap();
        assert_eq!(b, vec![1.0]);
    }

    #[test]
    fn test_empty_and_invalid() {
        assert!(quantile_breaks(&[], 3).unwrap().is_empty());
        assert!(quantile_breaks(&[f64::NAN], 3).unwrap().is_empty());
        assert!(matches!(quantile_breaks(&[1.0, 2.0], 1), Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_breaks_bounded_and_last_is_max() {
        let v: Vec<f64> = (0..137).map(|i| ((i * 37) % 101) as f64 * 0.5).collect();
        for k in 2..12 {
            let b = quantile_breaks(&v, k).unwrap();
            assert!(b.len() <= k);
            assert_eq!(*b.last().unwrap(), 50.0);
            assert!(b.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
