//! Convex and concave hulls over all vertices of a layer
//!
//! The concave hull is the union of the Delaunay triangles whose edges are
//! all no longer than the concavity threshold. Large thresholds converge to
//! the convex hull; small ones break the shape apart or remove it entirely.

use geo::{Area, ConvexHull as GeoConvexHull, Coord, LineString, MultiPoint, Point, Polygon};
use serde::{Deserialize, Serialize};
use spade::{DelaunayTriangulation, Point2, Triangulation};
use tracing::debug;
use vectis_core::{
    AnalysisReport, Algorithm, Error, Feature, FeatureCollection, LinearUnit, ProjectedPoint,
    Result, Selection, SkippedFeature,
};

use super::geometry::{checked_geometry, coords_of, dedup_coords, simplify_multi, skip, union_all};
use crate::spatial_index::nearest_neighbor_distances;

/// Parameters for the concave hull
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcaveHullParams {
    /// Maximum triangle edge length kept in the hull
    pub concavity: f64,
    /// Unit of `concavity`
    pub unit: LinearUnit,
}

impl Default for ConcaveHullParams {
    fn default() -> Self {
        Self {
            concavity: 100.0,
            unit: LinearUnit::Meters,
        }
    }
}

/// Data-driven starting point for the concavity threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConcavitySuggestion {
    /// Mean nearest-neighbour distance
    pub mean: f64,
    /// Population standard deviation of nearest-neighbour distances
    pub std_dev: f64,
    /// `mean + std_dev`
    pub suggested: f64,
    /// Increment for interactive adjustment, `std_dev / 10`
    pub step: f64,
    pub unit: LinearUnit,
}

impl ConcavitySuggestion {
    /// The suggestion moved by `n` steps, never below one step.
    pub fn stepped(&self, n: i32) -> f64 {
        (self.suggested + n as f64 * self.step).max(self.step)
    }
}

/// Convex hull operation
#[derive(Debug, Clone, Default)]
pub struct ConvexHull;

impl Algorithm for ConvexHull {
    type Input = FeatureCollection;
    type Output = AnalysisReport<Feature>;
    type Params = Option<Selection>;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ConvexHull"
    }

    fn description(&self) -> &'static str {
        "Smallest convex polygon enclosing every vertex of the layer"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        convex_hull(&input, params.as_ref())
    }
}

/// Concave hull operation
#[derive(Debug, Clone, Default)]
pub struct ConcaveHull;

impl Algorithm for ConcaveHull {
    type Input = FeatureCollection;
    type Output = AnalysisReport<Feature>;
    type Params = ConcaveHullParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ConcaveHull"
    }

    fn description(&self) -> &'static str {
        "Union of Delaunay triangles with no edge longer than the concavity"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        concave_hull(&input, &params, None)
    }
}

struct Vertices {
    coords: Vec<Coord<f64>>,
    processed: usize,
    skipped: Vec<SkippedFeature>,
}

/// Distinct vertices of all valid scoped features.
fn gather_vertices(collection: &FeatureCollection, selection: Option<&Selection>, operation: &str) -> Vertices {
    let scoped = Selection::scope(selection, collection);
    let mut skipped = Vec::new();
    let mut coords = Vec::new();
    for feature in &scoped {
        match checked_geometry(feature) {
            Ok(geom) => coords.extend(coords_of(geom)),
            Err(reason) => skip(&mut skipped, operation, &feature.id, reason),
        }
    }
    Vertices {
        coords: dedup_coords(coords),
        processed: scoped.len(),
        skipped,
    }
}

/// Convex hull of every vertex in the layer, as one polygon feature with a
/// `point_count` attribute.
pub fn convex_hull(collection: &FeatureCollection, selection: Option<&Selection>) -> Result<AnalysisReport<Feature>> {
    let v = gather_vertices(collection, selection, "convex hull");
    if v.coords.len() < 3 {
        return Err(Error::Degenerate(format!(
            "convex hull needs at least 3 distinct points, got {}",
            v.coords.len()
        )));
    }

    let count = v.coords.len();
    let mp = MultiPoint::new(v.coords.into_iter().map(Point::from).collect());
    let hull = mp.convex_hull();
    if hull.unsigned_area() <= 0.0 {
        return Err(Error::Degenerate("all points are collinear".into()));
    }

    debug!("convex hull: {} points, area {:.3}", count, hull.unsigned_area());
    let feature = Feature::new(hull.into()).with_property("point_count", count);
    Ok(AnalysisReport::new(feature, v.processed, v.skipped))
}

/// Concave hull: union of Delaunay triangles whose longest edge does not
/// exceed the concavity.
pub fn concave_hull(
    collection: &FeatureCollection,
    params: &ConcaveHullParams,
    selection: Option<&Selection>,
) -> Result<AnalysisReport<Feature>> {
    if !params.concavity.is_finite() || params.concavity <= 0.0 {
        return Err(Error::invalid("concavity", params.concavity, "must be a positive number"));
    }
    let max_edge = params.unit.to_meters(params.concavity);

    let v = gather_vertices(collection, selection, "concave hull");
    if v.coords.len() < 3 {
        return Err(Error::Degenerate(format!(
            "concave hull needs at least 3 distinct points, got {}",
            v.coords.len()
        )));
    }

    let mut tri: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
    for c in &v.coords {
        tri.insert(Point2::new(c.x, c.y))
            .map_err(|e| Error::Degenerate(format!("cannot triangulate ({:?})", e)))?;
    }

    let max_sq = max_edge * max_edge;
    let mut total = 0usize;
    let mut kept = Vec::new();
    for face in tri.inner_faces() {
        total += 1;
        let [a, b, c] = face.vertices().map(|vh| {
            let p = vh.position();
            Coord { x: p.x, y: p.y }
        });
        let edge_sq = |p: Coord<f64>, q: Coord<f64>| (p.x - q.x).powi(2) + (p.y - q.y).powi(2);
        if edge_sq(a, b) <= max_sq && edge_sq(b, c) <= max_sq && edge_sq(c, a) <= max_sq {
            kept.push(Polygon::new(LineString::new(vec![a, b, c, a]), vec![]));
        }
    }

    debug!(
        "concave hull: {} of {} triangles kept at {} {}",
        kept.len(),
        total,
        params.concavity,
        params.unit
    );

    if kept.is_empty() {
        let reason = if total == 0 {
            "all points are collinear".to_string()
        } else {
            format!(
                "no triangle has all edges within {} {}; increase the concavity",
                params.concavity, params.unit
            )
        };
        return Err(Error::Degenerate(reason));
    }

    let hull = union_all(kept);
    let feature = Feature::new(simplify_multi(hull))
        .with_property("point_count", v.coords.len())
        .with_property("concavity", params.concavity);
    Ok(AnalysisReport::new(feature, v.processed, v.skipped))
}

/// Suggest a concavity from the nearest-neighbour spacing of the vertices.
pub fn suggest_concavity(
    collection: &FeatureCollection,
    unit: LinearUnit,
    selection: Option<&Selection>,
) -> Result<ConcavitySuggestion> {
    let v = gather_vertices(collection, selection, "concavity");
    if v.coords.len() < 2 {
        return Err(Error::Validation(format!(
            "need at least 2 distinct points to estimate spacing, got {}",
            v.coords.len()
        )));
    }

    let points: Vec<ProjectedPoint> = v.coords.iter().map(|&c| ProjectedPoint::from(c)).collect();
    let nn = nearest_neighbor_distances(&points);
    let n = nn.len() as f64;
    let mean = nn.iter().sum::<f64>() / n;
    let var = nn.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
    let std_dev = var.sqrt();

    let mean = unit.from_meters(mean);
    let std_dev = unit.from_meters(std_dev);
    Ok(ConcavitySuggestion {
        mean,
        std_dev,
        suggested: mean + std_dev,
        step: std_dev / 10.0,
        unit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{CoordsIter, Geometry, Intersects};

    fn point_layer(coords: &[(f64, f64)]) -> FeatureCollection {
        coords
            .iter()
            .map(|&(x, y)| Feature::new(Point::new(x, y).into()))
            .collect()
    }

    fn grid(n: usize, spacing: f64) -> Vec<(f64, f64)> {
        (0..n)
            .flat_map(|i| (0..n).map(move |j| (i as f64 * spacing, j as f64 * spacing)))
            .collect()
    }

    /// A "C" shape: 10x10 grid with the middle of the right side removed.
    fn c_shape() -> Vec<(f64, f64)> {
        grid(11, 1.0)
            .into_iter()
            .filter(|&(x, y)| !(x >= 4.0 && (3.0..=7.0).contains(&y)))
            .collect()
    }

    fn hull_area(f: &Feature) -> f64 {
        crate::vector::measure::area(f.geometry.as_ref().unwrap())
    }

    #[test]
    fn test_convex_hull_square_with_interior() {
        let fc = point_layer(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (5.0, 5.0), (0.0, 0.0)]);
        let report = convex_hull(&fc, None).unwrap();
        assert_relative_eq!(hull_area(&report.output), 100.0, epsilon = 1e-9);
        // duplicates collapse
        assert_eq!(report.output.numeric("point_count"), Some(5.0));
    }

    #[test]
    fn test_convex_hull_degenerate() {
        assert!(matches!(convex_hull(&point_layer(&[(0.0, 0.0), (1.0, 1.0)]), None), Err(Error::Degenerate(_))));
        let collinear = point_layer(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        assert!(matches!(convex_hull(&collinear, None), Err(Error::Degenerate(_))));
    }

    #[test]
    fn test_concave_hull_follows_notch() {
        let fc = point_layer(&c_shape());
        let params = ConcaveHullParams { concavity: 1.5, unit: LinearUnit::Meters };
        let concave = concave_hull(&fc, &params, None).unwrap();
        let convex = convex_hull(&fc, None).unwrap();

        let a_concave = hull_area(&concave.output);
        let a_convex = hull_area(&convex.output);
        assert_relative_eq!(a_convex, 100.0, epsilon = 1e-9);
        // two 10x2 arms joined by a 3x6 spine
        assert_relative_eq!(a_concave, 58.0, epsilon = 1e-6);
        assert!(a_concave < a_convex);
    }

    #[test]
    fn test_concave_hull_within_convex_hull() {
        let fc = point_layer(&c_shape());
        let convex = convex_hull(&fc, None).unwrap().output;
        let concave = concave_hull(&fc, &ConcaveHullParams { concavity: 2.0, ..Default::default() }, None)
            .unwrap()
            .output;

        let Some(Geometry::Polygon(outer)) = convex.geometry else { panic!("convex hull is a polygon") };
        let inner = concave.geometry.unwrap();
        for c in inner.coords_iter() {
            assert!(outer.intersects(&Point::from(c)));
        }
    }

    #[test]
    fn test_large_concavity_equals_convex() {
        let fc = point_layer(&grid(5, 2.0));
        let concave = concave_hull(&fc, &ConcaveHullParams { concavity: 1000.0, ..Default::default() }, None).unwrap();
        assert_relative_eq!(hull_area(&concave.output), 64.0, epsilon = 1e-6);
    }

    #[test]
    fn test_tiny_concavity_is_degenerate() {
        let fc = point_layer(&grid(4, 10.0));
        let err = concave_hull(&fc, &ConcaveHullParams { concavity: 1.0, ..Default::default() }, None).unwrap_err();
        match err {
            Error::Degenerate(msg) => assert!(msg.contains("increase the concavity")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_concavity_in_kilometres() {
        let fc = point_layer(&grid(4, 500.0));
        let p = ConcaveHullParams { concavity: 1.0, unit: LinearUnit::Kilometers };
        let report = concave_hull(&fc, &p, None).unwrap();
        assert_relative_eq!(hull_area(&report.output), 1500.0 * 1500.0, max_relative = 1e-9);
    }

    #[test]
    fn test_invalid_concavity() {
        let fc = point_layer(&grid(3, 1.0));
        let p = ConcaveHullParams { concavity: 0.0, ..Default::default() };
        assert!(matches!(concave_hull(&fc, &p, None), Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_suggest_concavity_regular_grid() {
        let fc = point_layer(&grid(6, 250.0));
        let s = suggest_concavity(&fc, LinearUnit::Kilometers, None).unwrap();
        assert_relative_eq!(s.mean, 0.25, epsilon = 1e-12);
        assert_relative_eq!(s.std_dev, 0.0, epsilon = 1e-12);
        assert_relative_eq!(s.suggested, 0.25, epsilon = 1e-12);
        assert_eq!(s.unit, LinearUnit::Kilometers);
    }

    #[test]
    fn test_suggest_concavity_spread_and_steps() {
        let fc = point_layer(&[(0.0, 0.0), (1.0, 0.0), (10.0, 0.0), (13.0, 0.0)]);
        let s = suggest_concavity(&fc, LinearUnit::Meters, None).unwrap();
        // nearest distances 1, 1, 3, 3
        assert_relative_eq!(s.mean, 2.0);
        assert_relative_eq!(s.std_dev, 1.0);
        assert_relative_eq!(s.suggested, 3.0);
        assert_relative_eq!(s.step, 0.1);
        assert_relative_eq!(s.stepped(5), 3.5);
        assert_relative_eq!(s.stepped(-100), 0.1);
    }

    #[test]
    fn test_suggest_concavity_needs_points() {
        let fc = point_layer(&[(1.0, 1.0), (1.0, 1.0)]);
        assert!(matches!(suggest_concavity(&fc, LinearUnit::Meters, None), Err(Error::Validation(_))));
    }
}
