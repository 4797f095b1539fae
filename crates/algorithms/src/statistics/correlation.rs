//! Pearson correlation and simple linear regression

use serde::Serialize;
use vectis_core::{Error, Result};

/// Correlation of paired samples, with the least-squares line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlation {
    pub pearson_r: f64,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Number of pairs used
    pub n: usize,
}

/// Correlate `xs` with `ys`, pair by pair.
///
/// Only pairs where both values are finite are used. Fails with fewer than
/// two pairs or when `x` has no variance. Constant `y` gives `r = 0` and a
/// flat regression line.
pub fn correlate(xs: &[f64], ys: &[f64]) -> Result<Correlation> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys.iter())
        .map(|(&x, &y)| (x, y))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();

    let n = pairs.len();
    if n < 2 {
        return Err(Error::Validation(format!("need at least 2 paired values, got {}", n)));
    }

    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for &(x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    if sxx == 0.0 {
        return Err(Error::Validation("x values have zero variance".into()));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let pearson_r = if syy == 0.0 {
        0.0
    } else {
        (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
    };

    Ok(Correlation {
        pearson_r,
        slope,
        intercept,
        r_squared: pearson_r * pearson_r,
        n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perfect_line() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [3.0, 5.0, 7.0, 9.0];
        let c = correlate(&xs, &ys).unwrap();
        assert_relative_eq!(c.pearson_r, 1.0);
        assert_relative_eq!(c.slope, 2.0);
        assert_relative_eq!(c.intercept, 1.0);
        assert_relative_eq!(c.r_squared, 1.0);
        assert_eq!(c.n, 4);
    }

    #[test]
    fn test_negative_and_noisy() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [10.0, 7.5, 6.0, 4.5, 1.0];
        let c = correlate(&xs, &ys).unwrap();
        assert!(c.pearson_r < -0.95);
        assert!(c.slope < 0.0);
    }

    #[test]
    fn test_non_finite_pairs_dropped() {
        let xs = [1.0, f64::NAN, 2.0, 3.0];
        let ys = [2.0, 100.0, 4.0, f64::NAN];
        let c = correlate(&xs, &ys).unwrap();
        assert_eq!(c.n, 2);
        assert_relative_eq!(c.slope, 2.0);
    }

    #[test]
    fn test_constant_y() {
        let c = correlate(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(c.pearson_r, 0.0);
        assert_eq!(c.slope, 0.0);
        assert_relative_eq!(c.intercept, 5.0);
    }

    #[test]
    fn test_errors() {
        assert!(correlate(&[1.0], &[1.0]).is_err());
        assert!(matches!(correlate(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]), Err(Error::Validation(_))));
    }
}
