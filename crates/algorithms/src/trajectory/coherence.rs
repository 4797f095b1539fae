//! Coherence of a vector field
//!
//! Bearings are summarised with circular statistics: the mean direction is
//! `atan2(mean sin, mean cos)` and the spread is the circular standard
//! deviation `sqrt(-2 ln R)`, with `R` the mean resultant length. Magnitudes
//! use the ordinary mean and population standard deviation.
//!
//! A vector's deviation is the larger of its angular distance to the mean
//! bearing and its magnitude z-score, both in standard deviations.

use std::collections::BTreeMap;
use std::fmt;

use geo::Geometry;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vectis_core::{AnalysisReport, AttributeValue, Error, Feature, FeatureCollection, FeatureId, GeodeticPoint, Result, Selection};

use super::{angular_difference, ClusterAssignment};
use crate::vector::geometry::{checked_geometry, skip};

const ZERO_DEVIATION: f64 = 1e-9;

/// Grouping used for the reference statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CoherenceScope {
    /// One group for the whole layer
    #[default]
    Global,
    /// One group per cluster; noise vectors are labelled `Isolated`
    PerCluster(ClusterAssignment),
}

/// Parameters for coherence scoring
#[derive(Debug, Clone, PartialEq)]
pub struct CoherenceParams {
    /// Numeric attribute holding the vector magnitude
    pub magnitude_field: String,
    pub scope: CoherenceScope,
}

impl Default for CoherenceParams {
    fn default() -> Self {
        Self {
            magnitude_field: "distance".into(),
            scope: CoherenceScope::Global,
        }
    }
}

/// Coherence class of one vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coherence {
    /// Within one standard deviation
    Coherent,
    /// Within two standard deviations
    Moderate,
    /// Beyond two standard deviations
    Outlier,
    /// Not part of any cluster
    Isolated,
}

impl fmt::Display for Coherence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Coherence::Coherent => "coherent",
            Coherence::Moderate => "moderate",
            Coherence::Outlier => "outlier",
            Coherence::Isolated => "isolated",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VectorLabel {
    pub cluster: Option<usize>,
    pub coherence: Coherence,
    /// Larger of the bearing and magnitude deviations, in standard deviations
    pub deviation: f64,
}

/// Reference statistics of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    /// `None` for the global group
    pub cluster: Option<usize>,
    pub count: usize,
    /// Circular mean bearing, degrees in `[0, 360)`
    pub mean_bearing: f64,
    /// Circular standard deviation, degrees
    pub bearing_std: f64,
    pub mean_magnitude: f64,
    pub magnitude_std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoherenceReport {
    pub labels: BTreeMap<FeatureId, VectorLabel>,
    pub groups: Vec<GroupStats>,
}

impl CoherenceReport {
    /// Copy of `collection` with `coherence` and `cluster` attributes on
    /// every labelled feature.
    pub fn label(&self, collection: &FeatureCollection) -> FeatureCollection {
        let mut out = FeatureCollection::new();
        out.name = collection.name.clone();
        for feature in collection.iter() {
            if let Some(l) = self.labels.get(&feature.id) {
                let mut f = feature.clone();
                f.set_property("coherence", l.coherence.to_string());
                f.set_property("cluster", l.cluster.map(AttributeValue::from).unwrap_or_default());
                out.push(f);
            }
        }
        out
    }
}

struct Sample<'a> {
    id: &'a FeatureId,
    bearing: f64,
    magnitude: f64,
}

/// Bearing from the `bearing` attribute, else from the line's first and last vertex.
fn bearing_of(feature: &Feature) -> std::result::Result<f64, String> {
    if let Some(b) = feature.numeric("bearing") {
        return Ok(b.rem_euclid(360.0));
    }
    let line = match checked_geometry(feature)? {
        Geometry::LineString(ls) => ls,
        _ => return Err("no bearing attribute and not a line".into()),
    };
    let (Some(a), Some(b)) = (line.0.first(), line.0.last()) else {
        return Err("empty line".into());
    };
    if a == b {
        return Err("zero-length vector has no bearing".into());
    }
    Ok(GeodeticPoint::new(a.x, a.y).initial_bearing(&GeodeticPoint::new(b.x, b.y)))
}

fn group_stats(cluster: Option<usize>, samples: &[&Sample]) -> GroupStats {
    let n = samples.len() as f64;
    let (sin, cos) = samples.iter().fold((0.0, 0.0), |(s, c), x| {
        let r = x.bearing.to_radians();
        (s + r.sin(), c + r.cos())
    });
    let (sin, cos) = (sin / n, cos / n);
    let r = sin.hypot(cos).min(1.0);
    let bearing_std = if r > 0.0 {
        (-2.0 * r.ln()).sqrt().to_degrees()
    } else {
        f64::INFINITY
    };

    let mean_magnitude = samples.iter().map(|x| x.magnitude).sum::<f64>() / n;
    let var = samples.iter().map(|x| (x.magnitude - mean_magnitude).powi(2)).sum::<f64>() / n;

    GroupStats {
        cluster,
        count: samples.len(),
        mean_bearing: sin.atan2(cos).to_degrees().rem_euclid(360.0),
        bearing_std,
        mean_magnitude,
        magnitude_std: var.sqrt(),
    }
}

/// Deviation in units of `std`; zero spread only tolerates zero deviation.
fn in_sigmas(deviation: f64, std: f64) -> f64 {
    if std > ZERO_DEVIATION {
        deviation / std
    } else if deviation <= ZERO_DEVIATION {
        0.0
    } else {
        f64::INFINITY
    }
}

fn classify(sigmas: f64) -> Coherence {
    if sigmas <= 1.0 {
        Coherence::Coherent
    } else if sigmas <= 2.0 {
        Coherence::Moderate
    } else {
        Coherence::Outlier
    }
}

/// Score every vector against the statistics of its group.
///
/// Vectors without a usable bearing or magnitude are skipped and reported.
pub fn coherence(
    vectors: &FeatureCollection,
    params: &CoherenceParams,
    selection: Option<&Selection>,
) -> Result<AnalysisReport<CoherenceReport>> {
    let scoped = Selection::scope(selection, vectors);
    let mut skipped = Vec::new();
    let mut samples = Vec::with_capacity(scoped.len());
    for &feature in &scoped {
        let magnitude = feature
            .numeric(&params.magnitude_field)
            .filter(|m| m.is_finite())
            .ok_or_else(|| format!("no numeric '{}' attribute", params.magnitude_field));
        match (bearing_of(feature), magnitude) {
            (Ok(bearing), Ok(magnitude)) => samples.push(Sample { id: &feature.id, bearing, magnitude }),
            (Err(reason), _) | (_, Err(reason)) => skip(&mut skipped, "coherence", &feature.id, reason),
        }
    }

    if samples.is_empty() && !skipped.is_empty() {
        return Err(Error::NoOutput { skipped: skipped.len() });
    }

    let mut groups: BTreeMap<Option<usize>, Vec<&Sample>> = BTreeMap::new();
    let mut labels = BTreeMap::new();
    for s in &samples {
        match &params.scope {
            CoherenceScope::Global => groups.entry(None).or_default().push(s),
            CoherenceScope::PerCluster(assignment) => match assignment.get(s.id).copied().flatten() {
                Some(c) => groups.entry(Some(c)).or_default().push(s),
                None => {
                    labels.insert(
                        s.id.clone(),
                        VectorLabel { cluster: None, coherence: Coherence::Isolated, deviation: 0.0 },
                    );
                }
            },
        }
    }

    let mut stats = Vec::with_capacity(groups.len());
    for (cluster, members) in &groups {
        let g = group_stats(*cluster, members);
        for s in members {
            let bearing_dev = in_sigmas(angular_difference(s.bearing, g.mean_bearing), g.bearing_std);
            let magnitude_dev = in_sigmas((s.magnitude - g.mean_magnitude).abs(), g.magnitude_std);
            let deviation = bearing_dev.max(magnitude_dev);
            labels.insert(
                s.id.clone(),
                VectorLabel { cluster: *cluster, coherence: classify(deviation), deviation },
            );
        }
        stats.push(g);
    }

    debug!(
        "coherence: {} vectors in {} groups, {} outliers ({} skipped)",
        labels.len(),
        stats.len(),
        labels.values().filter(|l| l.coherence == Coherence::Outlier).count(),
        skipped.len()
    );

    Ok(AnalysisReport::new(
        CoherenceReport { labels, groups: stats },
        scoped.len(),
        skipped,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::LineString;

    fn vector(id: &str, bearing: f64, distance: f64) -> Feature {
        Feature::new(LineString::from(vec![(0.0, 0.0), (0.01, 0.01)]).into())
            .with_id(id)
            .with_property("bearing", bearing)
            .with_property("distance", distance)
    }

    fn field() -> FeatureCollection {
        let mut features: Vec<Feature> = (0..10)
            .map(|i| vector(&format!("v{}", i), 88.0 + (i % 5) as f64, 10.0 + (i % 3) as f64 * 0.1))
            .collect();
        features.push(vector("rogue", 270.0, 10.1));
        FeatureCollection::named("vectors", features)
    }

    #[test]
    fn test_circular_mean_across_north() {
        let a = Sample { id: &FeatureId::from("a"), bearing: 350.0, magnitude: 1.0 };
        let b = Sample { id: &FeatureId::from("b"), bearing: 10.0, magnitude: 1.0 };
        let g = group_stats(None, &[&a, &b]);
        assert!(angular_difference(g.mean_bearing, 0.0) < 1e-9);
        // R = cos(10 deg)
        let expected = (-2.0 * 10f64.to_radians().cos().ln()).sqrt().to_degrees();
        assert_relative_eq!(g.bearing_std, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_global_scope_flags_rogue() {
        let report = coherence(&field(), &CoherenceParams::default(), None).unwrap();
        let labels = &report.output.labels;
        assert_eq!(labels.len(), 11);
        assert_eq!(labels[&FeatureId::from("rogue")].coherence, Coherence::Outlier);
        assert_eq!(labels[&FeatureId::from("v1")].coherence, Coherence::Coherent);
        assert_eq!(report.output.groups.len(), 1);
        assert_eq!(report.output.groups[0].count, 11);
    }

    #[test]
    fn test_identical_vectors_are_coherent() {
        let fc = FeatureCollection::named("v", (0..4).map(|i| vector(&i.to_string(), 45.0, 2.0)).collect());
        let report = coherence(&fc, &CoherenceParams::default(), None).unwrap();
        assert!(report.output.labels.values().all(|l| l.coherence == Coherence::Coherent));
        assert!(report.output.groups[0].bearing_std < 1e-6);
    }

    #[test]
    fn test_per_cluster_scope() {
        let fc = field();
        let mut assignment = ClusterAssignment::new();
        for f in fc.iter() {
            let c = if f.id.as_str() == "rogue" { None } else { Some(0) };
            assignment.insert(f.id.clone(), c);
        }
        let params = CoherenceParams { scope: CoherenceScope::PerCluster(assignment), ..Default::default() };
        let report = coherence(&fc, &params, None).unwrap();
        let rogue = report.output.labels[&FeatureId::from("rogue")];
        assert_eq!(rogue.coherence, Coherence::Isolated);
        assert_eq!(rogue.cluster, None);
        assert_eq!(report.output.groups.len(), 1);
        assert_eq!(report.output.groups[0].cluster, Some(0));
        assert!(report
            .output
            .labels
            .values()
            .filter(|l| l.cluster == Some(0))
            .all(|l| l.coherence != Coherence::Outlier));
    }

    #[test]
    fn test_bearing_from_geometry_and_skips() {
        let east = Feature::new(LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]).into())
            .with_id("e")
            .with_property("distance", 1.0);
        assert_relative_eq!(bearing_of(&east).unwrap(), 90.0, epsilon = 1e-9);

        let no_mag = Feature::new(LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]).into()).with_id("n");
        let fc = FeatureCollection::named("v", vec![east, no_mag]);
        let report = coherence(&fc, &CoherenceParams::default(), None).unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.output.labels.len(), 1);

        let labelled = report.output.label(&fc);
        assert_eq!(labelled.len(), 1);
        assert_eq!(labelled.features[0].get_property("coherence").and_then(|v| v.as_str()), Some("coherent"));
    }
}
