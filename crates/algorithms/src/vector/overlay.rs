//! Overlay: clip (intersection) and erase (difference) against a polygon mask
//!
//! The mask layer is dissolved into a single multipolygon first. Each input
//! feature is then intersected with (or differenced from) that mask:
//! polygons through polygon boolean ops, lines by clipping against the
//! mask, points by containment. Attributes are copied onto the new
//! geometry under a fresh id.

use geo::{
    BooleanOps, Geometry, Intersects, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point,
};
use tracing::debug;
use vectis_core::{
    AnalysisReport, Algorithm, Error, Feature, FeatureCollection, Result, Selection,
    SkippedFeature,
};

use super::geometry::{
    checked_geometry, guarded, is_areal, polygons_of, simplify_multi, skip, union_all,
};

/// Which side of the mask to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayOp {
    /// Keep what lies inside the mask
    Intersection,
    /// Keep what lies outside the mask
    Difference,
}

impl OverlayOp {
    fn label(self) -> &'static str {
        match self {
            OverlayOp::Intersection => "clip",
            OverlayOp::Difference => "erase",
        }
    }
}

/// Clip operation
#[derive(Debug, Clone, Default)]
pub struct Clip;

impl Algorithm for Clip {
    type Input = (FeatureCollection, FeatureCollection);
    type Output = AnalysisReport<FeatureCollection>;
    type Params = Option<Selection>;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Clip"
    }

    fn description(&self) -> &'static str {
        "Keep the parts of each feature that fall inside a dissolved polygon mask"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        clip(&input.0, &input.1, params.as_ref())
    }
}

/// Erase operation
#[derive(Debug, Clone, Default)]
pub struct Erase;

impl Algorithm for Erase {
    type Input = (FeatureCollection, FeatureCollection);
    type Output = AnalysisReport<FeatureCollection>;
    type Params = Option<Selection>;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Erase"
    }

    fn description(&self) -> &'static str {
        "Remove the parts of each feature that fall inside a dissolved polygon mask"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        erase(&input.0, &input.1, params.as_ref())
    }
}

/// Intersect every input feature with the dissolved mask.
pub fn clip(
    input: &FeatureCollection,
    mask: &FeatureCollection,
    selection: Option<&Selection>,
) -> Result<AnalysisReport<FeatureCollection>> {
    overlay(input, mask, selection, OverlayOp::Intersection)
}

/// Subtract the dissolved mask from every input feature.
pub fn erase(
    input: &FeatureCollection,
    mask: &FeatureCollection,
    selection: Option<&Selection>,
) -> Result<AnalysisReport<FeatureCollection>> {
    overlay(input, mask, selection, OverlayOp::Difference)
}

/// Dissolve the polygons of a mask layer into one multipolygon.
///
/// Degenerate or non-areal mask features are ignored with a warning.
pub fn dissolve_mask(mask: &FeatureCollection, selection: Option<&Selection>) -> Result<MultiPolygon<f64>> {
    let mut ignored = Vec::new();
    let mut polygons = Vec::new();
    for feature in Selection::scope(selection, mask) {
        match checked_geometry(feature) {
            Ok(geom) if is_areal(geom) => polygons.extend(polygons_of(geom)),
            Ok(_) => skip(&mut ignored, "mask", &feature.id, "mask feature is not a polygon".into()),
            Err(reason) => skip(&mut ignored, "mask", &feature.id, reason),
        }
    }
    if polygons.is_empty() {
        return Err(Error::Validation("mask layer contains no valid polygons".into()));
    }
    guarded(|| union_all(polygons)).map_err(|reason| Error::Degenerate(format!("mask: {}", reason)))
}

/// Run one overlay operation over a whole layer.
pub fn overlay(
    input: &FeatureCollection,
    mask: &FeatureCollection,
    selection: Option<&Selection>,
    op: OverlayOp,
) -> Result<AnalysisReport<FeatureCollection>> {
    let mask = dissolve_mask(mask, selection)?;
    let scoped = Selection::scope(selection, input);

    let (mut output, skipped) = overlay_each(&scoped, op.label(), |geom| overlay_geometry(geom, &mask, op));
    output.name = input.name.clone();

    debug!(
        "{}: {} features in, {} out, {} skipped",
        op.label(),
        scoped.len(),
        output.len(),
        skipped.len()
    );

    let produced = output.len();
    AnalysisReport::new(output, scoped.len(), skipped).require_output(produced)
}

/// Apply `per_feature` to every scoped feature.
///
/// Degenerate inputs, errors and panics inside the boolean op all skip the
/// feature; `Ok(None)` drops it silently.
fn overlay_each<F>(
    scoped: &[&Feature],
    label: &str,
    per_feature: F,
) -> (FeatureCollection, Vec<SkippedFeature>)
where
    F: Fn(&Geometry<f64>) -> std::result::Result<Option<Geometry<f64>>, String>,
{
    let mut skipped = Vec::new();
    let mut output = FeatureCollection::new();
    for feature in scoped {
        let result = checked_geometry(feature).and_then(|geom| guarded(|| per_feature(geom)).and_then(|r| r));
        match result {
            Ok(Some(g)) => output.push(feature.derive(g)),
            Ok(None) => {}
            Err(reason) => skip(&mut skipped, label, &feature.id, reason),
        }
    }
    (output, skipped)
}

/// Overlay one geometry with the mask. `Ok(None)` means nothing remains.
fn overlay_geometry(
    geom: &Geometry<f64>,
    mask: &MultiPolygon<f64>,
    op: OverlayOp,
) -> std::result::Result<Option<Geometry<f64>>, String> {
    match geom {
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => {
            let subject = MultiPolygon::new(polygons_of(geom));
            let result = match op {
                OverlayOp::Intersection => subject.intersection(mask),
                OverlayOp::Difference => subject.difference(mask),
            };
            Ok((!result.0.is_empty()).then(|| simplify_multi(result)))
        }
        Geometry::LineString(ls) => Ok(overlay_lines(MultiLineString::new(vec![ls.clone()]), mask, op)),
        Geometry::MultiLineString(mls) => Ok(overlay_lines(mls.clone(), mask, op)),
        Geometry::Line(l) => {
            let ls = LineString::from(vec![l.start, l.end]);
            Ok(overlay_lines(MultiLineString::new(vec![ls]), mask, op))
        }
        Geometry::Point(p) => Ok(keep_point(p, mask, op).then_some(Geometry::Point(*p))),
        Geometry::MultiPoint(mp) => {
            let kept: Vec<Point<f64>> = mp.0.iter().copied().filter(|p| keep_point(p, mask, op)).collect();
            Ok(match kept.len() {
                0 => None,
                1 => Some(Geometry::Point(kept[0])),
                _ => Some(Geometry::MultiPoint(MultiPoint::new(kept))),
            })
        }
        Geometry::GeometryCollection(_) => Err("geometry collections are not supported".into()),
    }
}

fn keep_point(p: &Point<f64>, mask: &MultiPolygon<f64>, op: OverlayOp) -> bool {
    let inside = mask.intersects(p);
    match op {
        OverlayOp::Intersection => inside,
        OverlayOp::Difference => !inside,
    }
}

fn overlay_lines(lines: MultiLineString<f64>, mask: &MultiPolygon<f64>, op: OverlayOp) -> Option<Geometry<f64>> {
    let invert = op == OverlayOp::Difference;
    let mut clipped = mask.clip(&lines, invert);
    clipped.0.retain(|ls| ls.0.len() >= 2);
    match clipped.0.len() {
        0 => None,
        1 => clipped.0.pop().map(Geometry::LineString),
        _ => Some(Geometry::MultiLineString(clipped)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::measure::{area, length};
    use geo::{polygon, Polygon};
    use vectis_core::FeatureId;

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]
    }

    fn layer(name: &str, geoms: Vec<Geometry<f64>>) -> FeatureCollection {
        FeatureCollection::named(
            name,
            geoms
                .into_iter()
                .enumerate()
                .map(|(i, g)| Feature::new(g).with_id(format!("{}", i + 1)).with_property("n", i as i64))
                .collect(),
        )
    }

    #[test]
    fn test_clip_polygon_copies_attributes() {
        let input = layer("parcels", vec![square(0.0, 0.0, 10.0).into()]);
        let mask = layer("zone", vec![square(5.0, 5.0, 10.0).into()]);

        let report = clip(&input, &mask, None).unwrap();
        assert!(!report.is_partial());
        assert_eq!(report.output.len(), 1);
        let f = &report.output.features[0];
        assert!((area(f.geometry.as_ref().unwrap()) - 25.0).abs() < 1e-9);
        assert_eq!(f.numeric("n"), Some(0.0));
        assert_ne!(f.id, FeatureId::from("1"));
    }

    #[test]
    fn test_erase_polygon() {
        let input = layer("parcels", vec![square(0.0, 0.0, 10.0).into()]);
        let mask = layer("zone", vec![square(5.0, 5.0, 10.0).into()]);

        let report = erase(&input, &mask, None).unwrap();
        assert_eq!(report.output.len(), 1);
        assert!((area(report.output.features[0].geometry.as_ref().unwrap()) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_intersection_is_empty_not_error() {
        let input = layer("parcels", vec![square(0.0, 0.0, 1.0).into()]);
        let mask = layer("zone", vec![square(50.0, 50.0, 1.0).into()]);
        let report = clip(&input, &mask, None).unwrap();
        assert!(report.output.is_empty());
    }

    #[test]
    fn test_clip_line_and_points() {
        let line: Geometry<f64> = LineString::from(vec![(-5.0, 5.0), (15.0, 5.0)]).into();
        let inside: Geometry<f64> = Point::new(2.0, 2.0).into();
        let outside: Geometry<f64> = Point::new(20.0, 2.0).into();
        let input = layer("mixed", vec![line, inside, outside]);
        let mask = layer("zone", vec![square(0.0, 0.0, 10.0).into()]);

        let clipped = clip(&input, &mask, None).unwrap().output;
        assert_eq!(clipped.len(), 2);
        let clipped_len = length(clipped.features[0].geometry.as_ref().unwrap());
        assert!((clipped_len - 10.0).abs() < 1e-9);

        let erased = erase(&input, &mask, None).unwrap().output;
        // two line pieces outside, one point outside
        assert_eq!(erased.len(), 2);
        let erased_len = length(erased.features[0].geometry.as_ref().unwrap());
        assert!((erased_len - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_feature_is_skipped() {
        let bad = Polygon::new(LineString::from(vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]), vec![]);
        let input = layer("parcels", vec![square(0.0, 0.0, 10.0).into(), bad.into()]);
        let mask = layer("zone", vec![square(0.0, 0.0, 5.0).into()]);

        let report = clip(&input, &mask, None).unwrap();
        assert!(report.is_partial());
        assert_eq!(report.processed, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].id, FeatureId::from("2"));
        assert_eq!(report.output.len(), 1);
    }

    #[test]
    fn test_failed_boolean_op_skips_feature() {
        let input = layer("parcels", vec![square(0.0, 0.0, 10.0).into(), square(20.0, 0.0, 1.0).into()]);
        let mask = dissolve_mask(&layer("zone", vec![square(0.0, 0.0, 5.0).into()]), None).unwrap();
        let scoped: Vec<&Feature> = input.iter().collect();

        let (output, skipped) = overlay_each(&scoped, "clip", |geom| {
            if polygons_of(geom).iter().any(|p| p.exterior().0[0].x >= 20.0) {
                panic!("self-touching ring");
            }
            overlay_geometry(geom, &mask, OverlayOp::Intersection)
        });
        assert_eq!(output.len(), 1);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].id, FeatureId::from("2"));
        assert!(skipped[0].reason.contains("self-touching ring"));
    }

    #[test]
    fn test_all_skipped_is_no_output() {
        let mut input = layer("parcels", vec![]);
        input.push(Feature::empty().with_id("x"));
        let mask = layer("zone", vec![square(0.0, 0.0, 5.0).into()]);
        assert!(matches!(clip(&input, &mask, None), Err(Error::NoOutput { skipped: 1 })));
    }

    #[test]
    fn test_empty_mask_is_invalid() {
        let input = layer("parcels", vec![square(0.0, 0.0, 1.0).into()]);
        let mask = layer("zone", vec![Point::new(0.0, 0.0).into()]);
        assert!(matches!(clip(&input, &mask, None), Err(Error::Validation(_))));
    }

    #[test]
    fn test_selection_scopes_input() {
        let input = layer("parcels", vec![square(0.0, 0.0, 2.0).into(), square(1.0, 1.0, 2.0).into()]);
        let mask = layer("zone", vec![square(0.0, 0.0, 10.0).into()]);
        let sel = Selection::new("parcels", [FeatureId::from("2")]);

        let report = clip(&input, &mask, Some(&sel)).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.output.len(), 1);
        assert_eq!(report.output.features[0].numeric("n"), Some(1.0));

        // a selection on another layer is ignored
        let other = Selection::new("roads", [FeatureId::from("2")]);
        assert_eq!(clip(&input, &mask, Some(&other)).unwrap().output.len(), 2);
    }

    #[test]
    fn test_algorithm_trait() {
        let input = layer("parcels", vec![square(0.0, 0.0, 10.0).into()]);
        let mask = layer("zone", vec![square(5.0, 5.0, 10.0).into()]);
        let report = Clip.execute_default((input, mask)).unwrap();
        assert_eq!(Clip.name(), "Clip");
        assert_eq!(report.output.len(), 1);
    }
}
