//! Classification of attribute values into symbology classes
//!
//! - **Quantile**: breaks holding roughly equal numbers of values
//! - **Natural breaks**: Fisher-Jenks optimal partition
//! - **Graduated**: numeric breaks paired with a colour ramp
//! - **Categorized**: distinct values in natural order, recolourable after reordering

mod categorized;
mod graduated;
mod jenks;
mod quantile;

pub use categorized::{categorize, CategorizedClassification, Category};
pub use graduated::{
    classify_graduated, ClassCount, ClassificationMethod, GraduatedClassification,
    NaturalBreaksClassifier, QuantileClassifier,
};
pub use jenks::{jenks_breaks, natural_breaks};
pub use quantile::quantile_breaks;
