//! Unique-value (categorized) symbology

use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;
use vectis_colormap::Ramp;
use vectis_core::{AttributeValue, Error, FeatureCollection, Result};

/// One distinct attribute value and its colour
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub value: AttributeValue,
    pub label: String,
    pub color: String,
}

/// Ordered categories for one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizedClassification {
    pub field: String,
    pub categories: Vec<Category>,
}

impl CategorizedClassification {
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Colour of `value`, if it is one of the categories
    pub fn color_of(&self, value: &AttributeValue) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| &c.value == value)
            .map(|c| c.color.as_str())
    }

    /// Copy of `collection` with a `color` attribute on every categorized feature
    pub fn symbolize(&self, collection: &FeatureCollection) -> FeatureCollection {
        let mut out = collection.clone();
        for f in out.features.iter_mut() {
            let color = f.get_property(&self.field).and_then(|v| self.color_of(v)).map(String::from);
            if let Some(color) = color {
                f.set_property("color", color);
            }
        }
        out
    }

    fn recolor(&mut self, ramp: &Ramp) {
        let colors = ramp.colors(self.categories.len());
        for (cat, color) in self.categories.iter_mut().zip(colors) {
            cat.color = color;
        }
    }

    /// Move the category at `from` to position `to` and recolour the whole
    /// list along `ramp` in its new order.
    pub fn reorder(&mut self, from: usize, to: usize, ramp: &Ramp) -> Result<()> {
        let n = self.categories.len();
        if from >= n {
            return Err(Error::invalid("from", from, format!("only {} categories", n)));
        }
        if to >= n {
            return Err(Error::invalid("to", to, format!("only {} categories", n)));
        }
        let cat = self.categories.remove(from);
        self.categories.insert(to, cat);
        self.recolor(ramp);
        Ok(())
    }

    /// Apply a complete new order, given as the category values, and recolour.
    ///
    /// `values` must list every category exactly once.
    pub fn reorder_by(&mut self, values: &[AttributeValue], ramp: &Ramp) -> Result<()> {
        if values.len() != self.categories.len() {
            return Err(Error::Validation(format!(
                "new order has {} values, classification has {} categories",
                values.len(),
                self.categories.len()
            )));
        }
        let mut used = vec![false; self.categories.len()];
        let mut order = Vec::with_capacity(values.len());
        for v in values {
            let found = self
                .categories
                .iter()
                .enumerate()
                .position(|(i, c)| !used[i] && &c.value == v);
            match found {
                Some(i) => {
                    used[i] = true;
                    order.push(i);
                }
                None => {
                    return Err(Error::Validation(format!(
                        "'{}' is not a category of '{}' (or is repeated)",
                        v, self.field
                    )))
                }
            }
        }
        let mut old: Vec<Option<Category>> = std::mem::take(&mut self.categories).into_iter().map(Some).collect();
        self.categories = order.into_iter().filter_map(|i| old[i].take()).collect();
        self.recolor(ramp);
        Ok(())
    }
}

/// Drop repeats from a list already sorted by `natural_cmp`.
///
/// Only values in the same run of order-equal neighbours are compared, so
/// `Int(2)` and `Float(2.0)` both survive while exact repeats do not.
fn dedup_sorted(sorted: Vec<AttributeValue>) -> Vec<AttributeValue> {
    let mut out: Vec<AttributeValue> = Vec::with_capacity(sorted.len());
    let mut run_start = 0;
    for v in sorted {
        if out.last().map_or(true, |last| last.natural_cmp(&v) != Ordering::Equal) {
            run_start = out.len();
        }
        if !out[run_start..].contains(&v) {
            out.push(v);
        }
    }
    out
}

/// Distinct non-null values of `field`, in natural order, coloured along
/// `ramp`.
///
/// An empty layer gives no categories; a non-empty layer without any value
/// for `field` is a validation error.
pub fn categorize(collection: &FeatureCollection, field: &str, ramp: &Ramp) -> Result<CategorizedClassification> {
    let mut values: Vec<AttributeValue> = collection
        .iter()
        .filter_map(|f| f.get_property(field))
        .filter(|v| !v.is_null())
        .cloned()
        .collect();
    if values.is_empty() && !collection.is_empty() {
        return Err(Error::Validation(format!("field '{}' has no values", field)));
    }
    values.sort_by(|a, b| a.natural_cmp(b));
    let values = dedup_sorted(values);

    let colors = ramp.colors(values.len());
    let categories = values
        .into_iter()
        .zip(colors)
        .map(|(value, color)| Category {
            label: value.to_string(),
            value,
            color,
        })
        .collect::<Vec<_>>();

    debug!("categorized '{}': {} categories", field, categories.len());
    Ok(CategorizedClassification {
        field: field.to_string(),
        categories,
    })
}
