//! Bezier spline smoothing of lines and polygon rings
//!
//! Each segment `p1 -> p2` becomes a cubic Bezier curve whose control points
//! follow the neighbouring vertices (Catmull-Rom style tangents):
//!
//! ```text
//! c1 = p1 + (p2 - p0) * sharpness / 3
//! c2 = p2 - (p3 - p1) * sharpness / 3
//! ```
//!
//! Open lines repeat their end points as outer neighbours, so the ends stay
//! fixed. Rings wrap around and the output ring is re-closed. A sharpness of
//! zero reproduces the input polyline.

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vectis_core::{AnalysisReport, Algorithm, Error, FeatureCollection, Result, Selection};

use super::geometry::{checked_geometry, skip};

/// Parameters for Bezier smoothing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BezierParams {
    /// Output points per input segment (>= 1)
    pub resolution: usize,
    /// Curviness in `[0, 1]`; values outside are clamped
    pub sharpness: f64,
}

impl Default for BezierParams {
    fn default() -> Self {
        Self {
            resolution: 10,
            sharpness: 0.85,
        }
    }
}

/// Bezier smoothing operation
#[derive(Debug, Clone, Default)]
pub struct BezierSmooth;

impl Algorithm for BezierSmooth {
    type Input = FeatureCollection;
    type Output = AnalysisReport<FeatureCollection>;
    type Params = BezierParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "BezierSmooth"
    }

    fn description(&self) -> &'static str {
        "Replace line and ring segments with cubic Bezier curves through the vertices"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        bezier_smooth(&input, &params, None)
    }
}

#[inline]
fn cubic(p1: Coord<f64>, c1: Coord<f64>, c2: Coord<f64>, p2: Coord<f64>, t: f64) -> Coord<f64> {
    let u = 1.0 - t;
    let a = u * u * u;
    let b = 3.0 * u * u * t;
    let c = 3.0 * u * t * t;
    let d = t * t * t;
    Coord {
        x: a * p1.x + b * c1.x + c * c2.x + d * p2.x,
        y: a * p1.y + b * c1.y + c * c2.y + d * p2.y,
    }
}

/// Sample the curve for `p1 -> p2` at `resolution` points, excluding `p2`.
fn sample_segment(
    p0: Coord<f64>,
    p1: Coord<f64>,
    p2: Coord<f64>,
    p3: Coord<f64>,
    k: f64,
    resolution: usize,
    out: &mut Vec<Coord<f64>>,
) {
    let c1 = p1 + (p2 - p0) * k;
    let c2 = p2 - (p3 - p1) * k;
    for j in 0..resolution {
        let t = j as f64 / resolution as f64;
        out.push(cubic(p1, c1, c2, p2, t));
    }
}

/// Smooth an open polyline. End points are preserved.
pub fn smooth_line(line: &LineString<f64>, params: &BezierParams) -> LineString<f64> {
    let pts = &line.0;
    let n = pts.len();
    if n < 3 {
        return line.clone();
    }
    let k = params.sharpness.clamp(0.0, 1.0) / 3.0;
    let res = params.resolution.max(1);

    let mut out = Vec::with_capacity((n - 1) * res + 1);
    for i in 0..n - 1 {
        let p0 = pts[i.saturating_sub(1)];
        let p3 = pts[(i + 2).min(n - 1)];
        sample_segment(p0, pts[i], pts[i + 1], p3, k, res, &mut out);
    }
    out.push(pts[n - 1]);
    LineString::new(out)
}

/// Smooth a closed ring with wrap-around neighbours. The result is closed.
pub fn smooth_ring(ring: &LineString<f64>, params: &BezierParams) -> LineString<f64> {
    let mut pts: Vec<Coord<f64>> = ring.0.clone();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    let n = pts.len();
    if n < 3 {
        return ring.clone();
    }
    let k = params.sharpness.clamp(0.0, 1.0) / 3.0;
    let res = params.resolution.max(1);

    let mut out = Vec::with_capacity(n * res + 1);
    for i in 0..n {
        let p0 = pts[(i + n - 1) % n];
        let p1 = pts[i];
        let p2 = pts[(i + 1) % n];
        let p3 = pts[(i + 2) % n];
        sample_segment(p0, p1, p2, p3, k, res, &mut out);
    }
    let first = out[0];
    out.push(first);
    LineString::new(out)
}

fn smooth_polygon(poly: &Polygon<f64>, params: &BezierParams) -> Polygon<f64> {
    Polygon::new(
        smooth_ring(poly.exterior(), params),
        poly.interiors().iter().map(|r| smooth_ring(r, params)).collect(),
    )
}

/// Smooth one geometry. Points pass through unchanged.
pub fn smooth_geometry(geom: &Geometry<f64>, params: &BezierParams) -> std::result::Result<Geometry<f64>, String> {
    Ok(match geom {
        Geometry::Point(_) | Geometry::MultiPoint(_) | Geometry::Line(_) => geom.clone(),
        Geometry::LineString(ls) => Geometry::LineString(smooth_line(ls, params)),
        Geometry::MultiLineString(mls) => Geometry::MultiLineString(MultiLineString::new(
            mls.0.iter().map(|ls| smooth_line(ls, params)).collect(),
        )),
        Geometry::Polygon(p) => Geometry::Polygon(smooth_polygon(p, params)),
        Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon::new(
            mp.0.iter().map(|p| smooth_polygon(p, params)).collect(),
        )),
        Geometry::Rect(r) => Geometry::Polygon(smooth_polygon(&r.to_polygon(), params)),
        Geometry::Triangle(t) => Geometry::Polygon(smooth_polygon(&t.to_polygon(), params)),
        Geometry::GeometryCollection(_) => return Err("geometry collections are not supported".into()),
    })
}

/// Smooth every line and polygon of a layer.
pub fn bezier_smooth(
    collection: &FeatureCollection,
    params: &BezierParams,
    selection: Option<&Selection>,
) -> Result<AnalysisReport<FeatureCollection>> {
    if params.resolution < 1 {
        return Err(Error::invalid("resolution", params.resolution, "must be at least 1"));
    }
    if !params.sharpness.is_finite() {
        return Err(Error::invalid("sharpness", params.sharpness, "must be a finite number"));
    }

    let scoped = Selection::scope(selection, collection);
    let mut skipped = Vec::new();
    let mut output = FeatureCollection::new();
    output.name = collection.name.clone();

    for feature in &scoped {
        let result = checked_geometry(feature).and_then(|g| smooth_geometry(g, params));
        match result {
            Ok(g) => output.push(feature.derive(g)),
            Err(reason) => skip(&mut skipped, "smooth", &feature.id, reason),
        }
    }

    debug!(
        "smooth: resolution {}, sharpness {}: {} features, {} skipped",
        params.resolution,
        params.sharpness,
        output.len(),
        skipped.len()
    );

    let produced = output.len();
    AnalysisReport::new(output, scoped.len(), skipped).require_output(produced)
}
