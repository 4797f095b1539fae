//! Perpendicular cross-sections along a line
//!
//! Stations are placed at chainage `0, i, 2i, ...` up to the line length.
//! A trailing stretch shorter than the interval gets no extra station at the
//! line end. Each section is centred on its station, perpendicular to the
//! segment the station falls on.

use geo::{Coord, Euclidean, Geometry, Length, Line, LineInterpolatePoint, LineString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vectis_core::{Error, Feature, FeatureCollection, LinearUnit, Result};

const CHAINAGE_TOLERANCE: f64 = 1e-9;

/// Upper bound on the stations generated along one line.
pub const MAX_STATIONS: usize = 100_000;

/// Parameters for cross-section generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossSectionParams {
    /// Distance between stations
    pub station_interval: f64,
    /// Total length of each section, centred on the line
    pub section_length: f64,
    /// Unit of both distances and of the `chainage` attribute
    pub unit: LinearUnit,
}

impl Default for CrossSectionParams {
    fn default() -> Self {
        Self {
            station_interval: 100.0,
            section_length: 50.0,
            unit: LinearUnit::Meters,
        }
    }
}

/// Forward-only position along the non-degenerate segments of a line.
///
/// Zero-length segments are dropped up front. At a vertex the following
/// segment gives the direction; at the very end, the last one.
struct Walker {
    segments: Vec<(Line<f64>, f64)>,
    current: usize,
    walked: f64,
}

impl Walker {
    fn new(line: &LineString<f64>) -> Self {
        let segments = line
            .lines()
            .map(|l| (l, l.length::<Euclidean>()))
            .filter(|(_, len)| *len > 0.0)
            .collect();
        Self { segments, current: 0, walked: 0.0 }
    }

    /// Point and unit direction at `chainage`, which must not decrease
    /// between calls.
    fn advance(&mut self, chainage: f64) -> Option<(Coord<f64>, Coord<f64>)> {
        while self.current + 1 < self.segments.len() && chainage >= self.walked + self.segments[self.current].1 {
            self.walked += self.segments[self.current].1;
            self.current += 1;
        }
        let (seg, len) = *self.segments.get(self.current)?;
        let t = ((chainage - self.walked) / len).clamp(0.0, 1.0);
        let at = seg.line_interpolate_point(t)?;
        let d = seg.delta();
        Some((at.0, Coord { x: d.x / len, y: d.y / len }))
    }
}

/// Generate cross-sections along a line feature.
///
/// Output features carry `station` (0-based index) and `chainage` (distance
/// from the line start in `params.unit`). A MultiLineString contributes its
/// first part only. An interval that would place more than [`MAX_STATIONS`]
/// stations is rejected.
pub fn cross_sections(line_feature: &Feature, params: &CrossSectionParams) -> Result<FeatureCollection> {
    if !(params.station_interval.is_finite() && params.station_interval > 0.0) {
        return Err(Error::invalid("station_interval", params.station_interval, "must be positive"));
    }
    if !(params.section_length.is_finite() && params.section_length > 0.0) {
        return Err(Error::invalid("section_length", params.section_length, "must be positive"));
    }

    let line = match &line_feature.geometry {
        Some(Geometry::LineString(ls)) => ls.clone(),
        Some(Geometry::MultiLineString(mls)) => mls
            .0
            .first()
            .cloned()
            .ok_or_else(|| Error::Validation("multi-line feature has no parts".into()))?,
        Some(Geometry::Line(l)) => LineString::from(vec![l.start, l.end]),
        _ => {
            return Err(Error::Validation(format!(
                "cross-sections need a line feature, {} is not one",
                line_feature.id
            )))
        }
    };

    let interval = params.unit.to_meters(params.station_interval);
    let half = params.unit.to_meters(params.section_length) / 2.0;
    let length = line.length::<Euclidean>();
    if !length.is_finite() || length <= 0.0 {
        return Err(Error::Degenerate(format!("line {} has zero length", line_feature.id)));
    }

    let last_station = (length + CHAINAGE_TOLERANCE) / interval;
    if !(last_station < MAX_STATIONS as f64) {
        return Err(Error::invalid(
            "station_interval",
            params.station_interval,
            format!("would place more than {} stations along {:.3} m", MAX_STATIONS, length),
        ));
    }

    let mut walker = Walker::new(&line);
    let mut output = FeatureCollection::new();
    for station in 0..=last_station as usize + 1 {
        let chainage = station as f64 * interval;
        if chainage > length + CHAINAGE_TOLERANCE {
            break;
        }
        let Some((at, dir)) = walker.advance(chainage.min(length)) else {
            break;
        };
        let normal = Coord { x: -dir.y, y: dir.x };
        let section = LineString::new(vec![at - normal * half, at + normal * half]);
        output.push(
            Feature::new(section.into())
                .with_property("station", station)
                .with_property("chainage", params.unit.from_meters(chainage))
                .with_property("line_id", line_feature.id.as_str()),
        );
    }

    debug!(
        "cross-sections: {} stations every {} {} along {:.3} m",
        output.len(),
        params.station_interval,
        params.unit,
        length
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo::MultiLineString;

    fn straight(len: f64) -> Feature {
        Feature::new(LineString::from(vec![(0.0, 0.0), (len, 0.0)]).into()).with_id("river")
    }

    fn params(interval: f64, section: f64) -> CrossSectionParams {
        CrossSectionParams {
            station_interval: interval,
            section_length: section,
            unit: LinearUnit::Meters,
        }
    }

    fn endpoints(f: &Feature) -> (Coord<f64>, Coord<f64>) {
        match f.geometry.as_ref().unwrap() {
            Geometry::LineString(ls) => (ls.0[0], ls.0[1]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_exact_multiple_includes_end_station() {
        let out = cross_sections(&straight(100.0), &params(25.0, 10.0)).unwrap();
        assert_eq!(out.len(), 5);
        let chainages: Vec<f64> = out.iter().map(|f| f.numeric("chainage").unwrap()).collect();
        assert_eq!(chainages, vec![0.0, 25.0, 50.0, 75.0, 100.0]);
    }

    #[test]
    fn test_trailing_partial_interval_has_no_station() {
        let out = cross_sections(&straight(110.0), &params(25.0, 10.0)).unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(out.features[4].numeric("chainage"), Some(100.0));
    }

    #[test]
    fn test_sections_are_perpendicular_and_centred() {
        let out = cross_sections(&straight(100.0), &params(50.0, 20.0)).unwrap();
        let (a, b) = endpoints(&out.features[1]);
        assert_abs_diff_eq!(a.x, 50.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b.x, 50.0, epsilon = 1e-12);
        assert_abs_diff_eq!(a.y, -10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b.y, 10.0, epsilon = 1e-12);
        assert_eq!(out.features[1].numeric("station"), Some(1.0));
    }

    #[test]
    fn test_bend_uses_local_direction() {
        let l = Feature::new(LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]).into());
        let out = cross_sections(&l, &params(15.0, 2.0)).unwrap();
        assert_eq!(out.len(), 2);
        // station at chainage 15 lies on the vertical leg: section is horizontal
        let (a, b) = endpoints(&out.features[1]);
        assert_abs_diff_eq!(a.y, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b.y, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!((a.x - b.x).abs(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_units_and_multiline_first_part() {
        let mls = MultiLineString::new(vec![
            LineString::from(vec![(0.0, 0.0), (3000.0, 0.0)]),
            LineString::from(vec![(0.0, 100.0), (9000.0, 100.0)]),
        ]);
        let f = Feature::new(mls.into());
        let p = CrossSectionParams { station_interval: 1.0, section_length: 0.2, unit: LinearUnit::Kilometers };
        let out = cross_sections(&f, &p).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out.features[3].numeric("chainage"), Some(3.0));
        let (a, b) = endpoints(&out.features[0]);
        assert_abs_diff_eq!((b.y - a.y).abs(), 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_station_count_is_capped() {
        let err = cross_sections(&straight(1000.0), &params(1e-4, 1.0));
        assert!(matches!(err, Err(Error::InvalidParameter { name: "station_interval", .. })));

        // just under the cap is fine
        let out = cross_sections(&straight(1000.0), &params(1000.0 / (MAX_STATIONS as f64 - 1.0), 1.0)).unwrap();
        assert_eq!(out.len(), MAX_STATIONS);
    }

    #[test]
    fn test_repeated_vertices_are_stepped_over() {
        let l = Feature::new(
            LineString::from(vec![(0.0, 0.0), (5.0, 0.0), (5.0, 0.0), (5.0, 0.0), (5.0, 5.0)]).into(),
        );
        let out = cross_sections(&l, &params(2.5, 2.0)).unwrap();
        assert_eq!(out.len(), 5);
        // chainage 5 sits on the corner and takes the vertical leg's direction
        let (a, b) = endpoints(&out.features[2]);
        assert_abs_diff_eq!(a.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b.y, 0.0, epsilon = 1e-12);
        let (a, _) = endpoints(&out.features[4]);
        assert_abs_diff_eq!(a.y, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            cross_sections(&straight(10.0), &params(0.0, 1.0)),
            Err(Error::InvalidParameter { name: "station_interval", .. })
        ));
        assert!(matches!(
            cross_sections(&straight(10.0), &params(1.0, -1.0)),
            Err(Error::InvalidParameter { name: "section_length", .. })
        ));
        let point = Feature::new(geo::Point::new(0.0, 0.0).into());
        assert!(matches!(cross_sections(&point, &params(1.0, 1.0)), Err(Error::Validation(_))));
        assert!(matches!(cross_sections(&straight(0.0), &params(1.0, 1.0)), Err(Error::Degenerate(_))));
    }
}
