//! Population projection by geometric growth
//!
//! Each census interval gives a compound annual rate
//! `r = (p_next / p_prev)^(1 / years) - 1`. The projection rate is the
//! geometric mean of the two interval rates, applied to the latest count:
//!
//! ```text
//! rate      = sqrt((1 + r1) * (1 + r2)) - 1
//! projected = p3 * (1 + rate)^(target - y3)
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;
use vectis_core::{AnalysisReport, Error, FeatureCollection, Result, Selection};

use crate::vector::geometry::skip;

/// Three census observations as `(year, population)`, oldest first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CensusSeries {
    pub points: [(i32, f64); 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopulationProjection {
    /// Geometric mean of the interval rates
    pub annual_rate: f64,
    /// Compound annual rate of each census interval
    pub period_rates: [f64; 2],
    pub projected: f64,
}

impl CensusSeries {
    pub fn new(points: [(i32, f64); 3]) -> Self {
        Self { points }
    }

    fn validate(&self) -> Result<()> {
        for w in self.points.windows(2) {
            if w[1].0 <= w[0].0 {
                return Err(Error::Validation(format!(
                    "census years must be strictly increasing, got {} then {}",
                    w[0].0, w[1].0
                )));
            }
        }
        if let Some(&(year, pop)) = self.points.iter().find(|(_, p)| !p.is_finite() || *p <= 0.0) {
            return Err(Error::invalid("population", pop, format!("census {} must be positive", year)));
        }
        Ok(())
    }

    fn latest(&self) -> (i32, f64) {
        self.points[2]
    }
}

fn interval_rate((y0, p0): (i32, f64), (y1, p1): (i32, f64)) -> f64 {
    (p1 / p0).powf(1.0 / f64::from(y1 - y0)) - 1.0
}

/// Project a census series to `target_year`.
///
/// # Errors
/// - [`Error::Validation`] when the years are not strictly increasing
/// - [`Error::InvalidParameter`] for a non-positive population or a target
///   year before the latest census
pub fn project_population(series: &CensusSeries, target_year: i32) -> Result<PopulationProjection> {
    series.validate()?;
    let (latest_year, latest_pop) = series.latest();
    if target_year < latest_year {
        return Err(Error::invalid(
            "target_year",
            target_year,
            format!("must not be before the latest census ({})", latest_year),
        ));
    }

    let [a, b, c] = series.points;
    let r1 = interval_rate(a, b);
    let r2 = interval_rate(b, c);
    let annual_rate = ((1.0 + r1) * (1.0 + r2)).sqrt() - 1.0;
    let projected = latest_pop * (1.0 + annual_rate).powi(target_year - latest_year);

    Ok(PopulationProjection {
        annual_rate,
        period_rates: [r1, r2],
        projected,
    })
}

/// Project every feature of a layer from three census attributes.
///
/// `fields[i]` holds the population counted in `years[i]`. Each projected
/// feature gains `projected_pop` and `growth_rate`; features with missing
/// or invalid counts are skipped and reported.
pub fn project_features(
    collection: &FeatureCollection,
    fields: [&str; 3],
    years: [i32; 3],
    target_year: i32,
    selection: Option<&Selection>,
) -> Result<AnalysisReport<FeatureCollection>> {
    if years[0] >= years[1] || years[1] >= years[2] {
        return Err(Error::Validation(format!(
            "census years must be strictly increasing, got {:?}",
            years
        )));
    }
    if target_year < years[2] {
        return Err(Error::invalid(
            "target_year",
            target_year,
            format!("must not be before the latest census ({})", years[2]),
        ));
    }

    let scoped = Selection::scope(selection, collection);
    let mut skipped = Vec::new();
    let mut output = FeatureCollection::new();
    output.name = collection.name.clone();

    for &feature in &scoped {
        let counts: Option<Vec<f64>> = fields.iter().map(|f| feature.numeric(f)).collect();
        let Some(counts) = counts else {
            skip(&mut skipped, "project", &feature.id, format!("missing one of {:?}", fields));
            continue;
        };
        let series = CensusSeries::new([(years[0], counts[0]), (years[1], counts[1]), (years[2], counts[2])]);
        match project_population(&series, target_year) {
            Ok(p) => {
                let mut f = feature.clone();
                f.set_property("projected_pop", p.projected);
                f.set_property("growth_rate", p.annual_rate);
                output.push(f);
            }
            Err(e) => skip(&mut skipped, "project", &feature.id, e.to_string()),
        }
    }

    debug!(
        "project: {} features to {} from {:?} ({} skipped)",
        output.len(),
        target_year,
        years,
        skipped.len()
    );

    let produced = output.len();
    AnalysisReport::new(output, scoped.len(), skipped).require_output(produced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vectis_core::Feature;

    fn town() -> CensusSeries {
        CensusSeries::new([(2001, 100.0), (2010, 150.0), (2022, 300.0)])
    }

    #[test]
    fn test_three_census_projection() {
        let p = project_population(&town(), 2030).unwrap();
        assert_relative_eq!(p.period_rates[0], 1.5f64.powf(1.0 / 9.0) - 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.period_rates[1], 2.0f64.powf(1.0 / 12.0) - 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.annual_rate, 0.052751246, epsilon = 1e-8);
        assert_relative_eq!(p.projected, 452.61336, epsilon = 1e-4);
    }

    #[test]
    fn test_target_at_latest_census() {
        let p = project_population(&town(), 2022).unwrap();
        assert_eq!(p.projected, 300.0);
    }

    #[test]
    fn test_declining_population() {
        let s = CensusSeries::new([(2000, 200.0), (2010, 150.0), (2020, 100.0)]);
        let p = project_population(&s, 2030).unwrap();
        assert!(p.annual_rate < 0.0);
        assert!(p.projected < 100.0);
    }

    #[test]
    fn test_invalid_series() {
        let s = CensusSeries::new([(2001, 100.0), (2001, 150.0), (2022, 300.0)]);
        assert!(matches!(project_population(&s, 2030), Err(Error::Validation(_))));
        let s = CensusSeries::new([(2001, 0.0), (2010, 150.0), (2022, 300.0)]);
        assert!(matches!(project_population(&s, 2030), Err(Error::InvalidParameter { name: "population", .. })));
        assert!(matches!(
            project_population(&town(), 2020),
            Err(Error::InvalidParameter { name: "target_year", .. })
        ));
    }

    #[test]
    fn test_project_features() {
        let fc = FeatureCollection::named(
            "districts",
            vec![
                Feature::empty()
                    .with_id("north")
                    .with_property("p01", 100.0)
                    .with_property("p10", 150.0)
                    .with_property("p22", 300.0),
                Feature::empty().with_id("south").with_property("p01", 100.0),
                Feature::empty()
                    .with_id("ghost")
                    .with_property("p01", 0.0)
                    .with_property("p10", 1.0)
                    .with_property("p22", 2.0),
            ],
        );
        let report = project_features(&fc, ["p01", "p10", "p22"], [2001, 2010, 2022], 2030, None).unwrap();
        assert_eq!(report.output.len(), 1);
        assert_eq!(report.skipped.len(), 2);
        let north = &report.output.features[0];
        assert_relative_eq!(north.numeric("projected_pop").unwrap(), 452.61336, epsilon = 1e-4);
        assert!(north.numeric("growth_rate").unwrap() > 0.05);
        assert_eq!(north.id.as_str(), "north");
    }
}
