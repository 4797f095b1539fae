//! Vector data structures
//!
//! - [`Feature`]: identifier + geometry + attributes
//! - [`FeatureCollection`]: ordered list of features, optionally named as a layer
//! - [`Selection`]: a layer-scoped subset of feature ids
//! - [`AnalysisReport`]: output plus per-feature skip records

mod attribute;
mod report;
mod selection;

pub use attribute::{natural_cmp, AttributeValue};
pub use report::{AnalysisReport, SkippedFeature};
pub use selection::Selection;

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Attribute table of a single feature
pub type Properties = BTreeMap<String, AttributeValue>;

/// Opaque feature identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocate an identifier that does not collide with any other.
    pub fn fresh() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FeatureId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature ID
    pub id: FeatureId,
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: Properties,
}

impl Feature {
    /// Create a new feature with geometry and a fresh id
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            id: FeatureId::fresh(),
            geometry: Some(geometry),
            properties: Properties::new(),
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            id: FeatureId::fresh(),
            geometry: None,
            properties: Properties::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<FeatureId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Numeric value of an attribute, if it coerces to one
    pub fn numeric(&self, key: &str) -> Option<f64> {
        self.get_property(key).and_then(AttributeValue::as_f64)
    }

    /// A new feature carrying this feature's attributes on another geometry,
    /// under a fresh id.
    pub fn derive(&self, geometry: Geometry<f64>) -> Feature {
        Feature {
            id: FeatureId::fresh(),
            geometry: Some(geometry),
            properties: self.properties.clone(),
        }
    }
}

/// Collection of features
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    /// Layer name, used to match selections
    pub name: Option<String>,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { name: None, features: Vec::new() }
    }

    pub fn named(name: impl Into<String>, features: Vec<Feature>) -> Self {
        Self { name: Some(name.into()), features }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn get(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| &f.id == id)
    }

    /// Sorted union of attribute keys over all features
    pub fn attribute_keys(&self) -> BTreeSet<String> {
        self.features
            .iter()
            .flat_map(|f| f.properties.keys().cloned())
            .collect()
    }

    /// Attribute keys holding at least one numeric value
    pub fn numeric_fields(&self) -> BTreeSet<String> {
        self.features
            .iter()
            .flat_map(|f| {
                f.properties
                    .iter()
                    .filter(|(_, v)| v.as_f64().is_some())
                    .map(|(k, _)| k.clone())
            })
            .collect()
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self { name: None, features: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Point;

    #[test]
    fn fresh_ids_are_unique() {
        let a = FeatureId::fresh();
        let b = FeatureId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn derive_copies_attributes_with_new_id() {
        let f = Feature::new(Point::new(1.0, 2.0).into())
            .with_id("a")
            .with_property("name", "well")
            .with_property("depth", 12.5);
        let g = f.derive(Point::new(3.0, 4.0).into());
        assert_ne!(g.id, f.id);
        assert_eq!(g.properties, f.properties);
        assert_eq!(g.numeric("depth"), Some(12.5));
    }

    #[test]
    fn attribute_keys_union() {
        let fc: FeatureCollection = vec![
            Feature::empty().with_property("a", 1_i64),
            Feature::empty().with_property("b", "x"),
        ]
        .into_iter()
        .collect();
        let keys: Vec<_> = fc.attribute_keys().into_iter().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(fc.numeric_fields().len(), 1);
    }
}
