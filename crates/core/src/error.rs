//! Error types for Vectis

use thiserror::Error;

/// Main error type for Vectis operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Degenerate geometry: {0}")]
    Degenerate(String),

    #[error("Operation produced no features ({skipped} input features skipped)")]
    NoOutput { skipped: usize },

    #[error("Missing metadata: {0}")]
    MissingMetadata(String),

    #[error("Point sampling failed: {0}")]
    Sampling(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for an [`Error::InvalidParameter`] built from any displayable value.
    pub fn invalid(name: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for Vectis operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_message() {
        let e = Error::invalid("k", 1, "need at least 2 classes");
        assert_eq!(e.to_string(), "Invalid parameter: k = 1 (need at least 2 classes)");
    }

    #[test]
    fn no_output_message_counts_skips() {
        let e = Error::NoOutput { skipped: 3 };
        assert!(e.to_string().contains("3 input features skipped"));
    }
}
