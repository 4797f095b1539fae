//! Graduated symbology: numeric class breaks paired with a colour ramp

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use vectis_colormap::Ramp;
use vectis_core::{Algorithm, Error, FeatureCollection, Result};

use super::jenks::natural_breaks;
use super::quantile::quantile_breaks;

/// How numeric values are split into classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    #[default]
    Quantile,
    NaturalBreaks,
}

impl ClassificationMethod {
    /// Breaks for `values` in `k` classes
    pub fn breaks(&self, values: &[f64], k: usize) -> Result<Vec<f64>> {
        match self {
            ClassificationMethod::Quantile => quantile_breaks(values, k),
            ClassificationMethod::NaturalBreaks => natural_breaks(values, k),
        }
    }
}

impl fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassificationMethod::Quantile => write!(f, "quantile"),
            ClassificationMethod::NaturalBreaks => write!(f, "natural_breaks"),
        }
    }
}

impl FromStr for ClassificationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "quantile" | "quantiles" => Ok(ClassificationMethod::Quantile),
            "jenks" | "natural_breaks" | "natural-breaks" | "natural" => {
                Ok(ClassificationMethod::NaturalBreaks)
            }
            other => Err(Error::invalid("method", other, "use quantile or jenks")),
        }
    }
}

/// Number of classes for the break classifiers
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassCount(pub usize);

impl Default for ClassCount {
    fn default() -> Self {
        Self(5)
    }
}

/// Quantile breaks as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct QuantileClassifier;

impl Algorithm for QuantileClassifier {
    type Input = Vec<f64>;
    type Output = Vec<f64>;
    type Params = ClassCount;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Quantile"
    }

    fn description(&self) -> &'static str {
        "Class breaks holding roughly equal numbers of values"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        quantile_breaks(&input, params.0)
    }
}

/// Jenks natural breaks as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct NaturalBreaksClassifier;

impl Algorithm for NaturalBreaksClassifier {
    type Input = Vec<f64>;
    type Output = Vec<f64>;
    type Params = ClassCount;
    type Error = Error;

    fn name(&self) -> &'static str {
        "NaturalBreaks"
    }

    fn description(&self) -> &'static str {
        "Class breaks minimising within-class variance (Fisher-Jenks)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        natural_breaks(&input, params.0)
    }
}

/// Breaks and their colours for one numeric field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraduatedClassification {
    pub field: String,
    pub method: ClassificationMethod,
    /// Ascending upper bounds of each class
    pub breaks: Vec<f64>,
    /// One colour per break
    pub colors: Vec<String>,
}

impl GraduatedClassification {
    /// Class index of `value`: the first break `>= value`. Values above the
    /// last break fall into the last class.
    pub fn class_of(&self, value: f64) -> Option<usize> {
        if self.breaks.is_empty() || !value.is_finite() {
            return None;
        }
        Some(
            self.breaks
                .iter()
                .position(|&b| value <= b)
                .unwrap_or(self.breaks.len() - 1),
        )
    }

    /// Colour for `value`, if it is classifiable
    pub fn color_of(&self, value: f64) -> Option<&str> {
        self.class_of(value).map(|i| self.colors[i].as_str())
    }

    /// Copy of `collection` with `class` and `color` attributes set on every
    /// feature whose field value is numeric.
    pub fn symbolize(&self, collection: &FeatureCollection) -> FeatureCollection {
        let mut out = collection.clone();
        for f in out.features.iter_mut() {
            if let Some(class) = f.numeric(&self.field).and_then(|v| self.class_of(v)) {
                f.set_property("class", class);
                f.set_property("color", self.colors[class].clone());
            }
        }
        out
    }
}

/// Classify a numeric field into `k` classes and colour them along `ramp`.
///
/// Values are read with numeric coercion; features where the field is
/// missing or non-numeric are left out. An empty layer gives an empty
/// classification; a non-empty layer where no feature has a numeric value
/// for `field` is a validation error.
pub fn classify_graduated(
    collection: &FeatureCollection,
    field: &str,
    method: ClassificationMethod,
    k: usize,
    ramp: &Ramp,
) -> Result<GraduatedClassification> {
    let values: Vec<f64> = collection
        .iter()
        .filter_map(|f| f.numeric(field))
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() && !collection.is_empty() {
        return Err(Error::Validation(format!("field '{}' has no numeric values", field)));
    }

    let breaks = method.breaks(&values, k)?;
    let colors = if breaks.is_empty() {
        Vec::new()
    } else {
        ramp.colors(breaks.len())
    };

    debug!(
        "{} classification of '{}': {} values, {} of {} classes",
        method,
        field,
        values.len(),
        breaks.len(),
        k
    );

    Ok(GraduatedClassification {
        field: field.to_string(),
        method,
        breaks,
        colors,
    })
}
