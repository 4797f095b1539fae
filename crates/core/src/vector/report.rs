//! Partial-failure bookkeeping for batch analyses

use serde::Serialize;

use super::FeatureId;
use crate::error::{Error, Result};

/// A feature that was left out of a batch analysis, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFeature {
    pub id: FeatureId,
    pub reason: String,
}

/// Result of a batch analysis that tolerates per-feature failures.
///
/// `skipped` being non-empty means the output is partial: "N of M features
/// skipped" is `skipped.len()` of `processed`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport<T> {
    pub output: T,
    /// Number of input features considered
    pub processed: usize,
    pub skipped: Vec<SkippedFeature>,
}

impl<T> AnalysisReport<T> {
    pub fn new(output: T, processed: usize, skipped: Vec<SkippedFeature>) -> Self {
        Self { output, processed, skipped }
    }

    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AnalysisReport<U> {
        AnalysisReport {
            output: f(self.output),
            processed: self.processed,
            skipped: self.skipped,
        }
    }

    /// Fail with [`Error::NoOutput`] when nothing was produced because every
    /// candidate feature was skipped.
    ///
    /// An empty output with no skips (empty input, nothing intersecting) is
    /// still a valid result.
    pub fn require_output(self, produced: usize) -> Result<Self> {
        if produced == 0 && !self.skipped.is_empty() {
            return Err(Error::NoOutput { skipped: self.skipped.len() });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_not_a_failure() {
        let r: AnalysisReport<Vec<u8>> = AnalysisReport::new(vec![], 0, vec![]);
        assert!(r.require_output(0).is_ok());
        let r: AnalysisReport<Vec<u8>> = AnalysisReport::new(vec![], 4, vec![]);
        assert!(r.require_output(0).is_ok());
    }

    #[test]
    fn all_skipped_is_a_failure() {
        let skipped = vec![SkippedFeature { id: "a".into(), reason: "bad ring".into() }];
        let r: AnalysisReport<Vec<u8>> = AnalysisReport::new(vec![], 1, skipped);
        assert!(matches!(r.require_output(0), Err(Error::NoOutput { skipped: 1 })));
    }
}
