//! DBSCAN clustering of displacement vectors
//!
//! Vector centroids are projected onto a local equirectangular plane around
//! the dataset centroid. The neighbourhood radius adapts to the data:
//! `eps = mean_nn + multiplier * std_nn`, where `mean_nn` and `std_nn` are
//! the mean and standard deviation of nearest-neighbour distances.
//!
//! DBSCAN outline:
//!
//! ```text
//! for each unvisited point P
//!    mark P visited
//!    N = regionQuery(P, eps)            (includes P)
//!    if |N| < min_points: P is noise (for now)
//!    else: start cluster C, add P, then for each P' in N
//!       if P' unvisited: mark visited, N' = regionQuery(P', eps),
//!          if |N'| >= min_points: N = N + N'
//!       if P' in no cluster: add P' to C
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vectis_core::{
    AnalysisReport, AttributeValue, Error, FeatureCollection, FeatureId, GeodeticPoint,
    ProjectedPoint, Result, Selection,
};

use super::geodetic_centroid;
use crate::spatial_index::{nearest_neighbor_distances, KdTree};
use crate::vector::geometry::skip;

const MULTIPLIER_RANGE: std::ops::RangeInclusive<f64> = 0.1..=5.0;

/// Cluster id per vector; `None` marks noise
pub type ClusterAssignment = BTreeMap<FeatureId, Option<usize>>;

/// Parameters for vector clustering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Standard deviations of nearest-neighbour distance added to the mean, in `[0.1, 5.0]`
    pub multiplier: f64,
    /// Neighbours (including the point itself) needed for a core point
    pub min_points: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            min_points: 2,
        }
    }
}

/// Clustering result
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub assignment: ClusterAssignment,
    pub cluster_count: usize,
    /// Neighbourhood radius used, in metres
    pub eps_m: f64,
    pub mean_nn_m: f64,
    pub std_nn_m: f64,
}

impl Clustering {
    pub fn noise_count(&self) -> usize {
        self.assignment.values().filter(|c| c.is_none()).count()
    }

    /// Copy of `collection` with a `cluster` attribute on every clustered
    /// feature (`Null` for noise). Features outside the assignment are
    /// left out.
    pub fn label(&self, collection: &FeatureCollection) -> FeatureCollection {
        let mut out = FeatureCollection::new();
        out.name = collection.name.clone();
        for feature in collection.iter() {
            if let Some(cluster) = self.assignment.get(&feature.id) {
                let mut f = feature.clone();
                let value = cluster.map(AttributeValue::from).unwrap_or(AttributeValue::Null);
                f.set_property("cluster", value);
                out.push(f);
            }
        }
        out
    }
}

/// DBSCAN over planar points. Returns a cluster id per point.
fn db_scan(points: &[ProjectedPoint], eps: f64, min_points: usize) -> Vec<Option<usize>> {
    let tree = KdTree::build(points);
    let mut visited = vec![false; points.len()];
    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    // cluster each point was last queued for
    let mut queued: Vec<Option<usize>> = vec![None; points.len()];
    let mut next = 0;

    for i in 0..points.len() {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let neighbors: Vec<usize> = tree.within_radius(&points[i], eps).iter().map(|n| n.index).collect();
        if neighbors.len() < min_points {
            continue;
        }

        let c = next;
        next += 1;
        labels[i] = Some(c);

        for &j in &neighbors {
            queued[j] = Some(c);
        }
        let mut frontier = neighbors;
        let mut k = 0;
        while k < frontier.len() {
            let j = frontier[k];
            if !visited[j] {
                visited[j] = true;
                let more = tree.within_radius(&points[j], eps);
                if more.len() >= min_points {
                    for n in more {
                        if queued[n.index] != Some(c) {
                            queued[n.index] = Some(c);
                            frontier.push(n.index);
                        }
                    }
                }
            }
            if labels[j].is_none() {
                labels[j] = Some(c);
            }
            k += 1;
        }
    }
    labels
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Cluster vectors by the position of their centroids.
///
/// Features without a valid lon/lat centroid are skipped and reported.
/// At least two usable vectors are needed to derive the radius.
pub fn cluster_vectors(
    vectors: &FeatureCollection,
    params: &ClusterParams,
    selection: Option<&Selection>,
) -> Result<AnalysisReport<Clustering>> {
    if !MULTIPLIER_RANGE.contains(&params.multiplier) {
        return Err(Error::invalid("multiplier", params.multiplier, "must be between 0.1 and 5.0"));
    }
    if params.min_points < 1 {
        return Err(Error::invalid("min_points", params.min_points, "must be at least 1"));
    }

    let scoped = Selection::scope(selection, vectors);
    let mut skipped = Vec::new();
    let mut ids = Vec::with_capacity(scoped.len());
    let mut centroids = Vec::with_capacity(scoped.len());
    for &feature in &scoped {
        match geodetic_centroid(feature) {
            Ok(c) => {
                ids.push(feature.id.clone());
                centroids.push(c);
            }
            Err(reason) => skip(&mut skipped, "cluster", &feature.id, reason),
        }
    }

    if centroids.is_empty() && !skipped.is_empty() {
        return Err(Error::NoOutput { skipped: skipped.len() });
    }
    if centroids.len() < 2 {
        return Err(Error::Validation(format!(
            "clustering needs at least 2 vectors, got {}",
            centroids.len()
        )));
    }

    let n = centroids.len() as f64;
    let origin = GeodeticPoint::new(
        centroids.iter().map(|c| c.lon).sum::<f64>() / n,
        centroids.iter().map(|c| c.lat).sum::<f64>() / n,
    );
    let local: Vec<ProjectedPoint> = centroids.iter().map(|c| c.to_local(&origin)).collect();

    let (mean_nn, std_nn) = mean_std(&nearest_neighbor_distances(&local));
    let eps = mean_nn + params.multiplier * std_nn;
    let labels = db_scan(&local, eps, params.min_points);
    let cluster_count = labels.iter().flatten().max().map_or(0, |c| c + 1);

    let clustering = Clustering {
        assignment: ids.into_iter().zip(labels).collect(),
        cluster_count,
        eps_m: eps,
        mean_nn_m: mean_nn,
        std_nn_m: std_nn,
    };
    debug!(
        "cluster: {} vectors, eps {:.1} m (nn mean {:.1}, std {:.1}): {} clusters, {} noise",
        local.len(),
        eps,
        mean_nn,
        std_nn,
        cluster_count,
        clustering.noise_count()
    );

    Ok(AnalysisReport::new(clustering, scoped.len(), skipped))
}
