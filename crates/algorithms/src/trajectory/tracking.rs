//! Feature tracking between two snapshots
//!
//! Every pair of features closer than `max_distance_km` is a candidate.
//! With a tracked attribute, candidates whose relative attribute change
//! exceeds the tolerance are dropped and the rest are scored by
//! `distance / max_distance + relative_change`. Pairs are then accepted
//! greedily by ascending score so that every feature takes part in at
//! most one track.

use chrono::{DateTime, Utc};
use geo::{LineString, Point};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vectis_core::{
    AnalysisReport, AttributeValue, Error, Feature, FeatureCollection, GeodeticPoint, Result,
    Selection,
};

use super::geodetic_centroid;
use super::time::elapsed_hours;
use crate::maybe_rayon::*;
use crate::vector::geometry::skip;

/// Parameters for feature tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingParams {
    /// Maximum centroid displacement, in kilometres
    pub max_distance_km: f64,
    /// Numeric attribute that should stay similar along a track
    pub attribute: Option<String>,
    /// Largest accepted relative change of `attribute` (0.5 = 50 %)
    pub attribute_tolerance: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Default for TrackingParams {
    fn default() -> Self {
        Self {
            max_distance_km: 10.0,
            attribute: None,
            attribute_tolerance: 0.5,
            start_time: None,
            end_time: None,
        }
    }
}

struct Located<'a> {
    feature: &'a Feature,
    at: GeodeticPoint,
    value: Option<f64>,
}

struct Candidate {
    from: usize,
    to: usize,
    distance: f64,
    score: f64,
}

fn relative_change(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        0.0
    } else {
        (b - a).abs() / scale
    }
}

fn candidates_for(i: usize, from: &Located, targets: &[Located], params: &TrackingParams) -> Vec<Candidate> {
    targets
        .iter()
        .enumerate()
        .filter_map(|(j, to)| {
            let distance = from.at.haversine_km(&to.at);
            if distance > params.max_distance_km {
                return None;
            }
            let mut score = distance / params.max_distance_km;
            if params.attribute.is_some() {
                let change = relative_change(from.value?, to.value?);
                if change > params.attribute_tolerance {
                    return None;
                }
                score += change;
            }
            Some(Candidate { from: i, to: j, distance, score })
        })
        .collect()
}

/// Track features of `t1` into `t2`.
///
/// Output lines run from the t1 centroid to the matched t2 centroid and
/// carry `distance` (km), `bearing` (degrees), `speed` (km/h),
/// `attribute_change` (`Null` without a tracked attribute), `source_id`
/// and `target_id`. Unmatched features produce no track.
///
/// # Errors
/// - [`Error::MissingMetadata`] when either timestamp is unset
/// - [`Error::InvalidParameter`] for a non-positive distance, a negative
///   tolerance, or a non-positive elapsed time
pub fn track_features(
    t1: &FeatureCollection,
    t2: &FeatureCollection,
    params: &TrackingParams,
    selection: Option<&Selection>,
) -> Result<AnalysisReport<FeatureCollection>> {
    if !params.max_distance_km.is_finite() || params.max_distance_km <= 0.0 {
        return Err(Error::invalid("max_distance_km", params.max_distance_km, "must be positive"));
    }
    if !params.attribute_tolerance.is_finite() || params.attribute_tolerance < 0.0 {
        return Err(Error::invalid(
            "attribute_tolerance",
            params.attribute_tolerance,
            "must be zero or positive",
        ));
    }
    let hours = elapsed_hours(params.start_time, params.end_time)?;
    let value_of = |f: &Feature| params.attribute.as_deref().and_then(|a| f.numeric(a));

    let scoped = Selection::scope(selection, t1);
    let mut skipped = Vec::new();
    let mut sources = Vec::with_capacity(scoped.len());
    for &feature in &scoped {
        let located = geodetic_centroid(feature).and_then(|at| {
            let value = value_of(feature);
            match (&params.attribute, value) {
                (Some(a), None) => Err(format!("no numeric '{}' attribute", a)),
                _ => Ok(Located { feature, at, value }),
            }
        });
        match located {
            Ok(l) => sources.push(l),
            Err(reason) => skip(&mut skipped, "track", &feature.id, reason),
        }
    }
    let targets: Vec<Located> = t2
        .iter()
        .filter_map(|f| {
            geodetic_centroid(f)
                .ok()
                .map(|at| Located { feature: f, at, value: value_of(f) })
        })
        .collect();

    let mut candidates: Vec<Candidate> = (0..sources.len())
        .into_par_iter()
        .map(|i| candidates_for(i, &sources[i], &targets, params))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();
    candidates.sort_by(|a, b| a.score.total_cmp(&b.score).then(a.from.cmp(&b.from)).then(a.to.cmp(&b.to)));

    let mut source_taken = vec![false; sources.len()];
    let mut target_taken = vec![false; targets.len()];
    let mut matched: Vec<&Candidate> = Vec::new();
    for c in &candidates {
        if source_taken[c.from] || target_taken[c.to] {
            continue;
        }
        source_taken[c.from] = true;
        target_taken[c.to] = true;
        matched.push(c);
    }
    matched.sort_by_key(|c| c.from);

    let mut output = FeatureCollection::new();
    for c in matched {
        let (from, to) = (&sources[c.from], &targets[c.to]);
        let change = match (from.value, to.value) {
            (Some(a), Some(b)) => AttributeValue::from(b - a),
            _ => AttributeValue::Null,
        };
        let line = LineString::from(vec![Point::from(from.at), Point::from(to.at)]);
        output.push(
            Feature::new(line.into())
                .with_property("distance", c.distance)
                .with_property("bearing", from.at.initial_bearing(&to.at))
                .with_property("speed", c.distance / hours)
                .with_property("attribute_change", change)
                .with_property("source_id", from.feature.id.as_str())
                .with_property("target_id", to.feature.id.as_str()),
        );
    }

    debug!(
        "track: {} of {} features matched against {} targets, {} candidate pairs ({} skipped)",
        output.len(),
        sources.len(),
        targets.len(),
        candidates.len(),
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

    fn cell(id: &str, lon: f64, lat: f64, area: f64) -> Feature {
        Feature::new(Point::new(lon, lat).into()).with_id(id).with_property("area", area)
    }

    fn params(attribute: Option<&str>) -> TrackingParams {
        TrackingParams {
            max_distance_km: 30.0,
            attribute: attribute.map(String::from),
            attribute_tolerance: 0.5,
            start_time: Some(parse_timestamp("2024-07-01T12:00:00Z").unwrap()),
            end_time: Some(parse_timestamp("2024-07-01T12:30:00Z").unwrap()),
        }
    }

    fn target_of(fc: &FeatureCollection, source: &str) -> Option<String> {
        fc.iter()
            .find(|f| f.get_property("source_id").and_then(|v| v.as_str()) == Some(source))
            .and_then(|f| f.get_property("target_id"))
            .map(|v| v.to_string())
    }

    #[test]
    fn test_one_to_one_greedy() {
        let t1 = FeatureCollection::named("t1", vec![cell("a", 0.0, 0.0, 10.0), cell("b", 0.1, 0.0, 10.0)]);
        // x is closest to both, b is closer to x than a is
        let t2 = FeatureCollection::named("t2", vec![cell("x", 0.09, 0.0, 10.0), cell("y", -0.12, 0.0, 10.0)]);
        let report = track_features(&t1, &t2, &params(None), None).unwrap();
        assert_eq!(report.output.len(), 2);
        assert_eq!(target_of(&report.output, "b").as_deref(), Some("x"));
        assert_eq!(target_of(&report.output, "a").as_deref(), Some("y"));
        assert!(report.output.iter().all(|f| f.get_property("attribute_change").unwrap().is_null()));
    }

    #[test]
    fn test_attribute_steers_matching() {
        let t1 = FeatureCollection::named("t1", vec![cell("a", 0.0, 0.0, 100.0)]);
        let t2 = FeatureCollection::named(
            "t2",
            vec![cell("near_small", 0.01, 0.0, 10.0), cell("far_similar", 0.1, 0.0, 110.0)],
        );
        let report = track_features(&t1, &t2, &params(Some("area")), None).unwrap();
        assert_eq!(target_of(&report.output, "a").as_deref(), Some("far_similar"));
        let track = &report.output.features[0];
        assert_relative_eq!(track.numeric("attribute_change").unwrap(), 10.0);
        // 0.1 degrees of longitude on the equator in half an hour
        assert_relative_eq!(track.numeric("speed").unwrap(), 2.0 * track.numeric("distance").unwrap());
        assert_relative_eq!(track.numeric("bearing").unwrap(), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_nothing_within_reach() {
        let t1 = FeatureCollection::named("t1", vec![cell("a", 0.0, 0.0, 1.0)]);
        let t2 = FeatureCollection::named("t2", vec![cell("x", 5.0, 0.0, 1.0)]);
        let report = track_features(&t1, &t2, &params(None), None).unwrap();
        assert!(report.output.is_empty());
    }

    #[test]
    fn test_missing_attribute_is_skipped() {
        let t1 = FeatureCollection::named(
            "t1",
            vec![cell("a", 0.0, 0.0, 1.0), Feature::new(Point::new(0.0, 0.1).into()).with_id("bare")],
        );
        let t2 = FeatureCollection::named("t2", vec![cell("x", 0.0, 0.01, 1.0)]);
        let report = track_features(&t1, &t2, &params(Some("area")), None).unwrap();
        assert_eq!(report.output.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].id.as_str(), "bare");
    }

    #[test]
    fn test_parameter_errors() {
        let t = FeatureCollection::named("t", vec![cell("a", 0.0, 0.0, 1.0)]);
        let mut p = params(None);
        p.start_time = None;
        assert!(matches!(track_features(&t, &t, &p, None), Err(Error::MissingMetadata(_))));
        let mut p = params(None);
        p.max_distance_km = 0.0;
        assert!(matches!(track_features(&t, &t, &p, None), Err(Error::InvalidParameter { .. })));
        let mut p = params(None);
        p.attribute_tolerance = -0.1;
        assert!(matches!(track_features(&t, &t, &p, None), Err(Error::InvalidParameter { .. })));
    }
}
