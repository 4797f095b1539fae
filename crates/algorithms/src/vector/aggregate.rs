//! Aggregation: dissolve polygons and merge layers
//!
//! Dissolve unions polygon features, optionally grouped by an attribute.
//! Each output feature takes the attributes of the first input feature of
//! its group. Merging concatenates layers under the union of their
//! attribute schemas.

use serde::{Deserialize, Serialize};
use tracing::debug;
use vectis_core::{
    AnalysisReport, Algorithm, AttributeValue, Error, Feature, FeatureCollection, FeatureId,
    Result, Selection,
};

use super::geometry::{checked_geometry, is_areal, polygons_of, simplify_multi, skip, union_all};

/// Parameters for dissolve
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DissolveParams {
    /// Attribute to group by; `None` dissolves everything into one feature
    pub group_by: Option<String>,
}

/// Dissolve operation
#[derive(Debug, Clone, Default)]
pub struct Dissolve;

impl Algorithm for Dissolve {
    type Input = FeatureCollection;
    type Output = AnalysisReport<FeatureCollection>;
    type Params = DissolveParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Dissolve"
    }

    fn description(&self) -> &'static str {
        "Union polygons, optionally per value of a grouping attribute"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        dissolve(&input, &params, None)
    }
}

/// Union polygon features into one multipolygon per group.
///
/// Groups are ordered by [`AttributeValue::natural_cmp`] of their key.
/// Features without a polygon geometry are skipped and reported.
pub fn dissolve(
    collection: &FeatureCollection,
    params: &DissolveParams,
    selection: Option<&Selection>,
) -> Result<AnalysisReport<FeatureCollection>> {
    let scoped = Selection::scope(selection, collection);
    let mut skipped = Vec::new();

    // (key, members) in first-seen order
    let mut groups: Vec<(AttributeValue, Vec<&Feature>)> = Vec::new();
    for &feature in &scoped {
        match checked_geometry(feature) {
            Ok(g) if is_areal(g) => {}
            Ok(_) => {
                skip(&mut skipped, "dissolve", &feature.id, "not a polygon".into());
                continue;
            }
            Err(reason) => {
                skip(&mut skipped, "dissolve", &feature.id, reason);
                continue;
            }
        }
        let key = match &params.group_by {
            Some(field) => feature.get_property(field).cloned().unwrap_or_default(),
            None => AttributeValue::Null,
        };
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(feature),
            None => groups.push((key, vec![feature])),
        }
    }
    groups.sort_by(|a, b| a.0.natural_cmp(&b.0));

    let mut output = FeatureCollection::new();
    output.name = collection.name.clone();
    for (key, members) in groups {
        let polygons = members
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .flat_map(polygons_of)
            .collect();
        let merged = union_all(polygons);
        if merged.0.is_empty() {
            continue;
        }
        let first = members[0];
        let mut feature = first.derive(simplify_multi(merged));
        if let Some(field) = &params.group_by {
            feature.set_property(field.clone(), key);
        }
        output.push(feature);
    }

    debug!(
        "dissolve{}: {} features into {} ({} skipped)",
        params
            .group_by
            .as_deref()
            .map(|f| format!(" by {}", f))
            .unwrap_or_default(),
        scoped.len(),
        output.len(),
        skipped.len()
    );

    let produced = output.len();
    AnalysisReport::new(output, scoped.len(), skipped).require_output(produced)
}

/// Concatenate layers under the union of their attribute schemas.
///
/// Every feature is padded with `Null` for attributes its own layer lacks
/// and receives a fresh id. At least two layers are required.
pub fn merge_layers(layers: &[FeatureCollection]) -> Result<FeatureCollection> {
    if layers.len() < 2 {
        return Err(Error::Validation(format!(
            "merging needs at least 2 layers, got {}",
            layers.len()
        )));
    }

    let keys: std::collections::BTreeSet<String> =
        layers.iter().flat_map(|l| l.attribute_keys()).collect();

    let mut merged = FeatureCollection::new();
    merged.name = Some(
        layers
            .iter()
            .map(|l| l.name.as_deref().unwrap_or("layer"))
            .collect::<Vec<_>>()
            .join("+"),
    );
    for layer in layers {
        for feature in layer.iter() {
            let mut f = feature.clone();
            f.id = FeatureId::fresh();
            for key in &keys {
                f.properties.entry(key.clone()).or_insert(AttributeValue::Null);
            }
            merged.push(f);
        }
    }

    debug!(
        "merge: {} layers, {} features, {} attributes",
        layers.len(),
        merged.len(),
        keys.len()
    );
    Ok(merged)
}
