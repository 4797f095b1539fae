//! Geometry plumbing shared by the vector analyses: validity checks,
//! polygon extraction and cascaded union.

use geo::{BooleanOps, Coord, CoordsIter, Geometry, LineString, MultiPolygon, Polygon};
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;
use vectis_core::{Feature, FeatureId, SkippedFeature};

/// Check that a feature's geometry can go through boolean operations.
///
/// Returns the geometry, or the reason it must be skipped.
pub(crate) fn checked_geometry(feature: &Feature) -> Result<&Geometry<f64>, String> {
    let geom = feature
        .geometry
        .as_ref()
        .ok_or_else(|| "missing geometry".to_string())?;
    if geom.coords_count() == 0 {
        return Err("empty geometry".into());
    }
    if geom.coords_iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err("non-finite coordinate".into());
    }
    check_parts(geom)?;
    Ok(geom)
}

fn check_ring(ring: &LineString<f64>) -> Result<(), String> {
    if ring.0.len() < 4 {
        return Err(format!("polygon ring with {} coordinates (need at least 4)", ring.0.len()));
    }
    Ok(())
}

fn check_line(line: &LineString<f64>) -> Result<(), String> {
    if line.0.len() < 2 {
        return Err(format!("line with {} coordinates (need at least 2)", line.0.len()));
    }
    Ok(())
}

fn check_polygon(poly: &Polygon<f64>) -> Result<(), String> {
    check_ring(poly.exterior())?;
    poly.interiors().iter().try_for_each(check_ring)
}

fn check_parts(geom: &Geometry<f64>) -> Result<(), String> {
    match geom {
        Geometry::LineString(ls) => check_line(ls),
        Geometry::MultiLineString(mls) => mls.0.iter().try_for_each(check_line),
        Geometry::Polygon(p) => check_polygon(p),
        Geometry::MultiPolygon(mp) => mp.0.iter().try_for_each(check_polygon),
        Geometry::GeometryCollection(gc) => gc.0.iter().try_for_each(check_parts),
        _ => Ok(()),
    }
}

/// Record a skipped feature and log it.
pub(crate) fn skip(skipped: &mut Vec<SkippedFeature>, operation: &str, id: &FeatureId, reason: String) {
    warn!("{}: skipping feature {}: {}", operation, id, reason);
    skipped.push(SkippedFeature { id: id.clone(), reason });
}

/// Run a geometry computation, turning a panic inside it into an error.
///
/// geo's boolean ops can panic on self-touching or nearly collinear rings;
/// callers record the failure against the feature and carry on.
pub(crate) fn guarded<T>(op: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(op)).map_err(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown cause".into());
        format!("boolean operation failed: {}", detail)
    })
}

/// Polygonal parts of a geometry. Non-areal geometry yields nothing.
pub(crate) fn polygons_of(geom: &Geometry<f64>) -> Vec<Polygon<f64>> {
    match geom {
        Geometry::Polygon(p) => vec![p.clone()],
        Geometry::MultiPolygon(mp) => mp.0.clone(),
        Geometry::Rect(r) => vec![r.to_polygon()],
        Geometry::Triangle(t) => vec![t.to_polygon()],
        Geometry::GeometryCollection(gc) => gc.0.iter().flat_map(polygons_of).collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn is_areal(geom: &Geometry<f64>) -> bool {
    matches!(
        geom,
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Rect(_) | Geometry::Triangle(_)
    )
}

/// All vertices of a geometry
pub(crate) fn coords_of(geom: &Geometry<f64>) -> Vec<Coord<f64>> {
    geom.coords_iter().collect()
}

/// Sort and drop exact duplicates.
pub(crate) fn dedup_coords(mut coords: Vec<Coord<f64>>) -> Vec<Coord<f64>> {
    coords.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    coords.dedup();
    coords
}

/// Union of many polygons, merged pairwise in rounds.
///
/// Pairwise rounds keep the operands of each boolean op similar in size,
/// which is much faster than folding into one growing accumulator.
pub(crate) fn union_all(polygons: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    let mut layer: Vec<MultiPolygon<f64>> = polygons
        .into_iter()
        .map(|p| MultiPolygon::new(vec![p]))
        .collect();

    while layer.len() > 1 {
        let mut next = Vec::with_capacity(layer.len() / 2 + 1);
        let mut it = layer.into_iter();
        while let Some(a) = it.next() {
            match it.next() {
                Some(b) => next.push(a.union(&b)),
                None => next.push(a),
            }
        }
        layer = next;
    }

    layer.pop().unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}

/// Collapse a single-part multipolygon to a polygon.
pub(crate) fn simplify_multi(mut mp: MultiPolygon<f64>) -> Geometry<f64> {
    if mp.0.len() == 1 {
        if let Some(p) = mp.0.pop() {
            return Geometry::Polygon(p);
        }
    }
    Geometry::MultiPolygon(mp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, polygon, Area, Point};

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]
    }

    #[test]
    fn test_checked_geometry_rejects_degenerates() {
        assert!(checked_geometry(&Feature::empty()).is_err());

        let short = Feature::new(Geometry::LineString(line_string![(x: 0.0, y: 0.0)]));
        assert!(checked_geometry(&short).unwrap_err().contains("line"));

        let nan = Feature::new(Point::new(f64::NAN, 1.0).into());
        assert!(checked_geometry(&nan).unwrap_err().contains("non-finite"));

        let ring = Polygon::new(LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]), vec![]);
        let bad = Feature::new(ring.into());
        assert!(checked_geometry(&bad).unwrap_err().contains("ring"));

        let ok = Feature::new(square(0.0, 0.0, 1.0).into());
        assert!(checked_geometry(&ok).is_ok());
    }

    #[test]
    fn test_union_all_overlapping_and_disjoint() {
        let polys = vec![
            square(0.0, 0.0, 2.0),
            square(1.0, 0.0, 2.0),
            square(10.0, 10.0, 1.0),
        ];
        let u = union_all(polys);
        assert_eq!(u.0.len(), 2);
        assert!((u.unsigned_area() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_guarded_reports_panics() {
        assert_eq!(guarded(|| 2 + 2), Ok(4));
        let err = guarded(|| -> usize { panic!("ring self-intersects") }).unwrap_err();
        assert!(err.contains("ring self-intersects"));
        let owned = guarded(|| -> usize { panic!("{} segments", 3) }).unwrap_err();
        assert!(owned.contains("3 segments"));
    }

    #[test]
    fn test_union_all_empty() {
        assert!(union_all(Vec::new()).0.is_empty());
    }

    #[test]
    fn test_dedup_coords() {
        let c = dedup_coords(vec![
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
        ]);
        assert_eq!(c.len(), 2);
        assert_eq!(c[0], Coord { x: 0.0, y: 0.0 });
    }

    #[test]
    fn test_simplify_multi() {
        let single = simplify_multi(MultiPolygon::new(vec![square(0.0, 0.0, 1.0)]));
        assert!(matches!(single, Geometry::Polygon(_)));
        let multi = simplify_multi(MultiPolygon::new(vec![square(0.0, 0.0, 1.0), square(5.0, 5.0, 1.0)]));
        assert!(matches!(multi, Geometry::MultiPolygon(_)));
    }
}
