//! Descriptive statistics over a numeric sample

use serde::Serialize;
use vectis_core::{Error, Result};

/// Summary of a numeric sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

/// Describe the finite values of a sample.
///
/// Non-finite values are ignored. Fails when nothing finite remains.
pub fn describe(values: &[f64]) -> Result<DescriptiveStats> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Err(Error::Validation("no finite values to describe".into()));
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };

    Ok(DescriptiveStats {
        count: n,
        min: sorted[0],
        max: sorted[n - 1],
        mean,
        median,
        std_dev: var.sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_describe_basic() {
        let s = describe(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(s.count, 8);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
        assert_relative_eq!(s.mean, 5.0);
        assert_relative_eq!(s.median, 4.5);
        assert_relative_eq!(s.std_dev, 2.0);
    }

    #[test]
    fn test_odd_count_median_and_nan() {
        let s = describe(&[3.0, f64::NAN, 1.0, 2.0]).unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.median, 2.0);
    }

    #[test]
    fn test_single_value() {
        let s = describe(&[7.5]).unwrap();
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.median, 7.5);
    }

    #[test]
    fn test_empty_is_error() {
        assert!(matches!(describe(&[]), Err(Error::Validation(_))));
        assert!(describe(&[f64::NAN, f64::INFINITY]).is_err());
    }
}
