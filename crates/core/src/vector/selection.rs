//! Layer-scoped selections
//!
//! Every vector analysis follows the same rule: if the caller holds a
//! selection that belongs to the layer being analysed, only the selected
//! features are used; otherwise the whole layer is.

use std::collections::BTreeSet;

use super::{Feature, FeatureCollection, FeatureId};

/// A set of selected feature ids tagged with the layer they were picked from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub layer: String,
    pub ids: BTreeSet<FeatureId>,
}

impl Selection {
    pub fn new(layer: impl Into<String>, ids: impl IntoIterator<Item = FeatureId>) -> Self {
        Self {
            layer: layer.into(),
            ids: ids.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether this selection applies to `collection`.
    ///
    /// The layer names must match and at least one selected id must exist in
    /// the collection.
    pub fn belongs_to(&self, collection: &FeatureCollection) -> bool {
        !self.ids.is_empty()
            && collection.name.as_deref() == Some(self.layer.as_str())
            && collection.iter().any(|f| self.ids.contains(&f.id))
    }

    /// Features to analyse from `collection` given an optional selection.
    pub fn scope<'a>(selection: Option<&Selection>, collection: &'a FeatureCollection) -> Vec<&'a Feature> {
        match selection {
            Some(sel) if sel.belongs_to(collection) => collection
                .iter()
                .filter(|f| sel.ids.contains(&f.id))
                .collect(),
            _ => collection.iter().collect(),
        }
    }
}
