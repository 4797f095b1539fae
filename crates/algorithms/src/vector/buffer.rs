//! Buffer operations
//!
//! Create buffer zones around geometries. Points become circles
//! approximated as polygons; lines become the union of one capsule
//! (stadium) per segment; polygons grow by the union with their
//! boundary capsules, or shrink by subtracting them.

use geo::{BooleanOps, Coord, CoordsIter, Geometry, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use tracing::debug;
use vectis_core::{
    AnalysisReport, Algorithm, Error, FeatureCollection, LinearUnit, Result, Selection,
};

use super::geometry::{checked_geometry, guarded, polygons_of, simplify_multi, skip, union_all};

/// Parameters for buffer operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferParams {
    /// Buffer distance (positive = expand, negative = shrink)
    pub distance: f64,
    /// Unit of `distance`
    pub unit: LinearUnit,
    /// Number of segments used to approximate a full circle (default: 16)
    pub segments: usize,
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            distance: 1.0,
            unit: LinearUnit::Meters,
            segments: 16,
        }
    }
}

/// Buffer operation
#[derive(Debug, Clone, Default)]
pub struct Buffer;

impl Algorithm for Buffer {
    type Input = FeatureCollection;
    type Output = AnalysisReport<FeatureCollection>;
    type Params = BufferParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Buffer"
    }

    fn description(&self) -> &'static str {
        "Expand or shrink every feature by a fixed distance"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        buffer_features(&input, &params, None)
    }
}

/// Circle polygon around `center` with `segments` vertices.
pub fn circle(center: Coord<f64>, radius: f64, segments: usize) -> Polygon<f64> {
    let n = segments.max(4);
    let r = radius.abs();

    let mut coords = Vec::with_capacity(n + 1);
    for i in 0..n {
        let angle = 2.0 * PI * i as f64 / n as f64;
        coords.push(Coord {
            x: center.x + r * angle.cos(),
            y: center.y + r * angle.sin(),
        });
    }
    // Close the ring
    let first = coords[0];
    coords.push(first);

    Polygon::new(LineString::new(coords), vec![])
}

/// Stadium around the segment `a`-`b`: two half circles joined by the
/// offset lines at distance `radius` on either side.
pub fn capsule(a: Coord<f64>, b: Coord<f64>, radius: f64, segments: usize) -> Polygon<f64> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if dx == 0.0 && dy == 0.0 {
        return circle(a, radius, segments);
    }

    let r = radius.abs();
    let theta = dy.atan2(dx);
    let half = (segments.max(4) / 2).max(2);

    let mut coords = Vec::with_capacity(2 * half + 3);
    // Sweep counter-clockwise around b, then around a
    for (center, start) in [(b, theta - FRAC_PI_2), (a, theta + FRAC_PI_2)] {
        for i in 0..=half {
            let angle = start + PI * i as f64 / half as f64;
            coords.push(Coord {
                x: center.x + r * angle.cos(),
                y: center.y + r * angle.sin(),
            });
        }
    }
    let first = coords[0];
    coords.push(first);

    Polygon::new(LineString::new(coords), vec![])
}

fn segment_capsules(rings: &[&LineString<f64>], radius: f64, segments: usize) -> Vec<Polygon<f64>> {
    rings
        .iter()
        .flat_map(|ring| ring.lines().map(|l| capsule(l.start, l.end, radius, segments)))
        .collect()
}

/// Buffer a single geometry by `distance` (same unit as the coordinates).
///
/// Returns `Ok(None)` when a negative distance consumes the geometry.
pub fn buffer_geometry(
    geom: &Geometry<f64>,
    distance: f64,
    segments: usize,
) -> std::result::Result<Option<Geometry<f64>>, String> {
    if distance == 0.0 {
        return Ok(Some(geom.clone()));
    }

    match geom {
        Geometry::Point(_) | Geometry::MultiPoint(_) => {
            if distance < 0.0 {
                return Ok(Some(geom.clone()));
            }
            let circles = geom.coords_iter().map(|c| circle(c, distance, segments)).collect();
            Ok(Some(simplify_multi(union_all(circles))))
        }
        Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
            if distance < 0.0 {
                return Ok(Some(geom.clone()));
            }
            let lines: Vec<LineString<f64>> = match geom {
                Geometry::Line(l) => vec![LineString::from(vec![l.start, l.end])],
                Geometry::LineString(ls) => vec![ls.clone()],
                Geometry::MultiLineString(mls) => mls.0.clone(),
                _ => Vec::new(),
            };
            let refs: Vec<&LineString<f64>> = lines.iter().collect();
            let capsules = segment_capsules(&refs, distance, segments);
            Ok(Some(simplify_multi(union_all(capsules))))
        }
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => {
            let polygons = polygons_of(geom);
            let rings: Vec<&LineString<f64>> = polygons
                .iter()
                .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors().iter()))
                .collect();
            let capsules = segment_capsules(&rings, distance, segments);

            let result = if distance > 0.0 {
                let mut all = polygons.clone();
                all.extend(capsules);
                union_all(all)
            } else {
                MultiPolygon::new(polygons.clone()).difference(&union_all(capsules))
            };
            Ok((!result.0.is_empty()).then(|| simplify_multi(result)))
        }
        Geometry::GeometryCollection(_) => Err("geometry collections are not supported".into()),
    }
}

/// Buffer every feature of a layer.
///
/// A distance of zero returns the geometry unchanged; a negative distance
/// leaves points and lines unchanged and skips polygons it consumes
/// entirely.
pub fn buffer_features(
    collection: &FeatureCollection,
    params: &BufferParams,
    selection: Option<&Selection>,
) -> Result<AnalysisReport<FeatureCollection>> {
    if !params.distance.is_finite() {
        return Err(Error::invalid("distance", params.distance, "must be a finite number"));
    }
    let distance = params.unit.to_meters(params.distance);
    let scoped = Selection::scope(selection, collection);

    let mut skipped = Vec::new();
    let mut output = FeatureCollection::new();
    output.name = collection.name.clone();

    for feature in &scoped {
        let geom = match checked_geometry(feature) {
            Ok(g) => g,
            Err(reason) => {
                skip(&mut skipped, "buffer", &feature.id, reason);
                continue;
            }
        };
        match guarded(|| buffer_geometry(geom, distance, params.segments)).and_then(|r| r) {
            Ok(Some(g)) => output.push(feature.derive(g)),
            Ok(None) => skip(
                &mut skipped,
                "buffer",
                &feature.id,
                format!("negative buffer of {} {} consumes the polygon", params.distance, params.unit),
            ),
            Err(reason) => skip(&mut skipped, "buffer", &feature.id, reason),
        }
    }

    debug!(
        "buffer {} {}: {} features in, {} out, {} skipped",
        params.distance,
        params.unit,
        scoped.len(),
        output.len(),
        skipped.len()
    );

    let produced = output.len();
    AnalysisReport::new(output, scoped.len(), skipped).require_output(produced)
}
