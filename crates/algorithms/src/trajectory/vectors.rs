//! Displacement vectors between two point snapshots
//!
//! Each source point is paired with its nearest target by great-circle
//! distance. Pairs within the search radius become two-point lines carrying
//! distance (km), initial bearing (degrees) and speed (km/h).

use chrono::{DateTime, Utc};
use geo::{Geometry, LineString, Point};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vectis_core::{
    AnalysisReport, Algorithm, Error, Feature, FeatureCollection, GeodeticPoint, Result, Selection,
};

use super::time::elapsed_hours;
use crate::maybe_rayon::*;
use crate::vector::geometry::{checked_geometry, skip};

/// Parameters for displacement vectors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorParams {
    /// Maximum great-circle distance to the matched target, in kilometres
    pub search_radius_km: f64,
    /// Observation time of the source layer
    pub start_time: Option<DateTime<Utc>>,
    /// Observation time of the target layer
    pub end_time: Option<DateTime<Utc>>,
}

impl Default for VectorParams {
    fn default() -> Self {
        Self {
            search_radius_km: 10.0,
            start_time: None,
            end_time: None,
        }
    }
}

/// Displacement vector operation
#[derive(Debug, Clone, Default)]
pub struct DisplacementVectors;

impl Algorithm for DisplacementVectors {
    type Input = (FeatureCollection, FeatureCollection);
    type Output = AnalysisReport<FeatureCollection>;
    type Params = VectorParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "DisplacementVectors"
    }

    fn description(&self) -> &'static str {
        "Link each source point to its nearest target point and measure the move"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (source, target) = input;
        displacement_vectors(&source, &target, &params, None)
    }
}

fn point_of(feature: &Feature) -> std::result::Result<GeodeticPoint, String> {
    match checked_geometry(feature)? {
        Geometry::Point(p) => {
            let g = GeodeticPoint::from(*p);
            if g.is_valid() {
                Ok(g)
            } else {
                Err(format!("({}, {}) is not a valid lon/lat position", g.lon, g.lat))
            }
        }
        _ => Err("not a point".into()),
    }
}

fn nearest(p: &GeodeticPoint, targets: &[(&Feature, GeodeticPoint)]) -> Option<(usize, f64)> {
    targets
        .iter()
        .enumerate()
        .map(|(i, (_, t))| (i, p.haversine_km(t)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Build displacement vectors from `source` points to `target` points.
///
/// # Errors
/// - [`Error::MissingMetadata`] when either timestamp is unset
/// - [`Error::InvalidParameter`] for a non-positive radius or elapsed time
///
/// Source features that are not valid lon/lat points are skipped and
/// reported. Invalid target features are ignored. Sources with no target
/// inside the radius produce no vector.
pub fn displacement_vectors(
    source: &FeatureCollection,
    target: &FeatureCollection,
    params: &VectorParams,
    selection: Option<&Selection>,
) -> Result<AnalysisReport<FeatureCollection>> {
    if !params.search_radius_km.is_finite() || params.search_radius_km <= 0.0 {
        return Err(Error::invalid("search_radius_km", params.search_radius_km, "must be positive"));
    }
    let hours = elapsed_hours(params.start_time, params.end_time)?;

    let targets: Vec<(&Feature, GeodeticPoint)> = target
        .iter()
        .filter_map(|f| point_of(f).ok().map(|p| (f, p)))
        .collect();
    if targets.len() < target.len() {
        debug!("vectors: ignoring {} invalid target features", target.len() - targets.len());
    }

    let scoped = Selection::scope(selection, source);
    let mut skipped = Vec::new();
    let mut sources = Vec::with_capacity(scoped.len());
    for &feature in &scoped {
        match point_of(feature) {
            Ok(p) => sources.push((feature, p)),
            Err(reason) => skip(&mut skipped, "vectors", &feature.id, reason),
        }
    }

    let matches: Vec<Option<(usize, f64)>> = sources
        .par_iter()
        .map(|(_, p)| nearest(p, &targets).filter(|&(_, d)| d <= params.search_radius_km))
        .collect();

    let mut output = FeatureCollection::new();
    for ((src_feature, from), matched) in sources.iter().zip(matches) {
        let Some((j, distance)) = matched else {
            continue;
        };
        let (dst_feature, to) = targets[j];
        let line = LineString::from(vec![Point::from(*from), Point::from(to)]);
        output.push(
            Feature::new(line.into())
                .with_property("distance", distance)
                .with_property("bearing", from.initial_bearing(&to))
                .with_property("speed", distance / hours)
                .with_property("source_id", src_feature.id.as_str())
                .with_property("target_id", dst_feature.id.as_str()),
        );
    }

    debug!(
        "vectors: {} sources, {} targets, {} vectors within {} km over {:.3} h ({} skipped)",
        sources.len(),
        targets.len(),
        output.len(),
        params.search_radius_km,
        hours,
        skipped.len()
    );

    let produced = output.len();
    AnalysisReport::new(output, scoped.len(), skipped).require_output(produced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::parse_timestamp;
    use approx::assert_relative_eq;

    fn layer(name: &str, pts: &[(&str, f64, f64)]) -> FeatureCollection {
        FeatureCollection::named(
            name,
            pts.iter()
                .map(|&(id, lon, lat)| Feature::new(Point::new(lon, lat).into()).with_id(id))
                .collect(),
        )
    }

    fn hourly() -> VectorParams {
        VectorParams {
            search_radius_km: 50.0,
            start_time: Some(parse_timestamp("2024-06-01 10:00").unwrap()),
            end_time: Some(parse_timestamp("2024-06-01 11:00").unwrap()),
        }
    }

    #[test]
    fn test_northward_move() {
        // 10 km north of the equator is 10 / 111.195 degrees
        let dlat = 10.0 / (6371.0088 * std::f64::consts::PI / 180.0);
        let src = layer("t0", &[("a", 0.0, 0.0)]);
        let dst = layer("t1", &[("x", 0.0, dlat), ("y", 1.0, 1.0)]);

        let report = displacement_vectors(&src, &dst, &hourly(), None).unwrap();
        assert_eq!(report.output.len(), 1);
        let v = &report.output.features[0];
        assert_relative_eq!(v.numeric("distance").unwrap(), 10.0, epsilon = 1e-6);
        assert_relative_eq!(v.numeric("speed").unwrap(), 10.0, epsilon = 1e-6);
        assert_relative_eq!(v.numeric("bearing").unwrap(), 0.0, epsilon = 1e-6);
        assert_eq!(v.get_property("source_id").and_then(|p| p.as_str()), Some("a"));
        assert_eq!(v.get_property("target_id").and_then(|p| p.as_str()), Some("x"));
    }

    #[test]
    fn test_diagonal_and_high_latitude_bearings() {
        let params = VectorParams { search_radius_km: 150.0, ..hourly() };

        // Buenos Aires towards Colonia: great-circle 132.294, flat lon/lat angle 126.66
        let src = layer("t0", &[("ba", -58.38, -34.60)]);
        let dst = layer("t1", &[("co", -57.95, -34.92)]);
        let v = &displacement_vectors(&src, &dst, &params, None).unwrap().output.features[0];
        assert_relative_eq!(v.numeric("bearing").unwrap(), 132.293_780_7, epsilon = 0.01);
        assert_relative_eq!(v.numeric("distance").unwrap(), 53.001_16, epsilon = 1e-3);
        assert_relative_eq!(v.numeric("speed").unwrap(), 53.001_16, epsilon = 1e-3);

        // at 70N the flat angle (75.96) is far off the initial bearing
        let src = layer("t0", &[("n", 10.0, 70.0)]);
        let dst = layer("t1", &[("m", 12.0, 70.5)]);
        let v = &displacement_vectors(&src, &dst, &params, None).unwrap().output.features[0];
        assert_relative_eq!(v.numeric("bearing").unwrap(), 52.566_627_4, epsilon = 0.01);
        assert_relative_eq!(v.numeric("distance").unwrap(), 93.472_64, epsilon = 1e-3);
    }

    #[test]
    fn test_out_of_radius_produces_nothing() {
        let src = layer("t0", &[("a", 0.0, 0.0)]);
        let dst = layer("t1", &[("x", 3.0, 0.0)]);
        let report = displacement_vectors(&src, &dst, &hourly(), None).unwrap();
        assert!(report.output.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_invalid_sources_reported() {
        let src = layer("t0", &[("a", 0.0, 0.0), ("bad", 200.0, 0.0)]);
        let dst = layer("t1", &[("x", 0.1, 0.0)]);
        let report = displacement_vectors(&src, &dst, &hourly(), None).unwrap();
        assert_eq!(report.output.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].id.as_str(), "bad");
        // due east
        assert_relative_eq!(report.output.features[0].numeric("bearing").unwrap(), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_time_errors() {
        let src = layer("t0", &[("a", 0.0, 0.0)]);
        let mut p = hourly();
        p.end_time = None;
        assert!(matches!(displacement_vectors(&src, &src, &p, None), Err(Error::MissingMetadata(_))));

        let mut p = hourly();
        std::mem::swap(&mut p.start_time, &mut p.end_time);
        assert!(matches!(displacement_vectors(&src, &src, &p, None), Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_selection_limits_sources() {
        let src = layer("t0", &[("a", 0.0, 0.0), ("b", 0.0, 0.1)]);
        let dst = layer("t1", &[("x", 0.0, 0.05)]);
        let sel = Selection::new("t0", ["b".into()]);
        let report = displacement_vectors(&src, &dst, &hourly(), Some(&sel)).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.output.features[0].get_property("source_id").and_then(|p| p.as_str()), Some("b"));
    }
}
