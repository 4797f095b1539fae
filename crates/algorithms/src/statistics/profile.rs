//! Line sampling and topographic profiles
//!
//! A profile samples a geodetic line at evenly spaced stations and asks a
//! [`PointSampler`] for the value under each one. The sampler is the only
//! async boundary in the algorithms crate: it is awaited once per profile,
//! and any failure aborts the whole profile.

use futures::future::BoxFuture;
use geo::{Coord, LineString};
use serde::Serialize;
use tracing::{debug, warn};
use vectis_core::{Error, GeodeticPoint, ProjectedPoint, Result};

use super::{correlate, describe, Correlation, DescriptiveStats};

/// A planar station along a line
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Station {
    /// Distance from the line start, in coordinate units
    pub distance: f64,
    pub point: ProjectedPoint,
}

/// A geodetic station along a profile line
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfileStation {
    /// Great-circle distance from the line start, in kilometres
    pub distance_km: f64,
    pub point: GeodeticPoint,
}

/// Source of point values, typically a remote raster service.
///
/// Implementations return one value per requested point, in order; `None`
/// marks a point with no data.
pub trait PointSampler {
    fn sample_values<'a>(
        &'a self,
        points: &'a [GeodeticPoint],
        dataset: &'a str,
        band: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Option<f64>>>>;
}

/// Sampled profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub stations: Vec<ProfileStation>,
    /// One value per station
    pub values: Vec<Option<f64>>,
    /// Statistics of the non-null values, `None` when every value is null
    pub stats: Option<DescriptiveStats>,
}

/// Place `n` stations evenly along `coords`, measuring segments with `seg_len`.
///
/// Returns `(distance, coordinate)` pairs, first and last at the line ends.
fn stations_along<F>(coords: &[Coord<f64>], n: usize, seg_len: F) -> Result<Vec<(f64, Coord<f64>)>>
where
    F: Fn(Coord<f64>, Coord<f64>) -> f64,
{
    if n < 2 {
        return Err(Error::invalid("stations", n, "need at least 2 stations"));
    }
    if coords.len() < 2 {
        return Err(Error::Validation(format!(
            "line needs at least 2 vertices, got {}",
            coords.len()
        )));
    }

    let lengths: Vec<f64> = coords.windows(2).map(|w| seg_len(w[0], w[1])).collect();
    let total: f64 = lengths.iter().sum();
    if !total.is_finite() {
        return Err(Error::Validation("line length is not finite".into()));
    }

    let mut out = Vec::with_capacity(n);
    let mut seg = 0;
    let mut walked = 0.0;
    for i in 0..n {
        let target = total * i as f64 / (n - 1) as f64;
        while seg < lengths.len() - 1 && walked + lengths[seg] < target {
            walked += lengths[seg];
            seg += 1;
        }
        let (a, b) = (coords[seg], coords[seg + 1]);
        let t = if lengths[seg] > 0.0 {
            ((target - walked) / lengths[seg]).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let at = if i == n - 1 { coords[coords.len() - 1] } else { a + (b - a) * t };
        out.push((target, at));
    }
    Ok(out)
}

/// Sample `n >= 2` stations equally spaced by planar distance, both ends included.
pub fn sample_line(line: &LineString<f64>, n: usize) -> Result<Vec<Station>> {
    let stations = stations_along(&line.0, n, |a, b| (b.x - a.x).hypot(b.y - a.y))?;
    Ok(stations
        .into_iter()
        .map(|(distance, c)| Station { distance, point: c.into() })
        .collect())
}

/// Sample `n >= 2` stations along a lon/lat line, equally spaced by
/// great-circle distance. Positions within a segment are interpolated
/// linearly in lon/lat.
pub fn sample_geodetic_line(line: &LineString<f64>, n: usize) -> Result<Vec<ProfileStation>> {
    if let Some(bad) = line.0.iter().find(|c| !GeodeticPoint::new(c.x, c.y).is_valid()) {
        return Err(Error::Validation(format!(
            "({}, {}) is not a valid lon/lat position",
            bad.x, bad.y
        )));
    }
    let stations = stations_along(&line.0, n, |a, b| {
        GeodeticPoint::new(a.x, a.y).haversine_km(&GeodeticPoint::new(b.x, b.y))
    })?;
    Ok(stations
        .into_iter()
        .map(|(distance_km, c)| ProfileStation {
            distance_km,
            point: GeodeticPoint::new(c.x, c.y),
        })
        .collect())
}

/// Sample a topographic profile along a lon/lat line.
///
/// # Arguments
/// * `sampler` - Value source, awaited once for all stations
/// * `line` - Profile line in lon/lat degrees
/// * `n` - Number of stations (>= 2)
/// * `dataset`, `band` - Passed through to the sampler
///
/// # Errors
/// A sampler failure, or a value count that differs from the station count,
/// yields [`Error::Sampling`]. Non-finite samples count as no data.
pub async fn topographic_profile<S>(
    sampler: &S,
    line: &LineString<f64>,
    n: usize,
    dataset: &str,
    band: &str,
) -> Result<Profile>
where
    S: PointSampler + ?Sized,
{
    let stations = sample_geodetic_line(line, n)?;
    let points: Vec<GeodeticPoint> = stations.iter().map(|s| s.point).collect();

    let mut values = match sampler.sample_values(&points, dataset, band).await {
        Ok(v) => v,
        Err(Error::Sampling(msg)) => return Err(Error::Sampling(msg)),
        Err(e) => return Err(Error::Sampling(e.to_string())),
    };
    if values.len() != stations.len() {
        return Err(Error::Sampling(format!(
            "sampler returned {} values for {} stations",
            values.len(),
            stations.len()
        )));
    }

    let mut non_finite = 0;
    for v in values.iter_mut() {
        if v.is_some_and(|x| !x.is_finite()) {
            *v = None;
            non_finite += 1;
        }
    }
    if non_finite > 0 {
        warn!("profile {}/{}: {} non-finite samples treated as no data", dataset, band, non_finite);
    }

    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let stats = if present.is_empty() {
        warn!("profile {}/{}: no station has data, statistics omitted", dataset, band);
        None
    } else {
        Some(describe(&present)?)
    };

    debug!(
        "profile {}/{}: {} stations over {:.3} km, {} with data",
        dataset,
        band,
        stations.len(),
        stations.last().map(|s| s.distance_km).unwrap_or(0.0),
        present.len()
    );

    Ok(Profile { stations, values, stats })
}

/// Correlate two profiles station by station, skipping stations where
/// either value is null.
pub fn profile_correlation(a: &Profile, b: &Profile) -> Result<Correlation> {
    if a.values.len() != b.values.len() {
        return Err(Error::Validation(format!(
            "profiles have {} and {} stations",
            a.values.len(),
            b.values.len()
        )));
    }
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .values
        .iter()
        .zip(&b.values)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();
    correlate(&xs, &ys)
}
