//! Coordinate spaces and linear units
//!
//! Vector analyses run either on planar projected coordinates (metres) or on
//! geodetic WGS84 longitude/latitude. The two point types below keep that
//! precondition in the signatures instead of in a naming convention.

use geo::{Bearing, Distance, Haversine, Point};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Mean earth radius in kilometres (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A point in a planar, metre-based projected coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point
    #[inline]
    pub fn dist_sq(&self, other: &ProjectedPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn dist(&self, other: &ProjectedPoint) -> f64 {
        self.dist_sq(other).sqrt()
    }
}

impl From<geo_types::Coord<f64>> for ProjectedPoint {
    fn from(c: geo_types::Coord<f64>) -> Self {
        Self::new(c.x, c.y)
    }
}

impl From<ProjectedPoint> for geo_types::Coord<f64> {
    fn from(p: ProjectedPoint) -> Self {
        geo_types::Coord { x: p.x, y: p.y }
    }
}

/// A WGS84 point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeodeticPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeodeticPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Whether the coordinates are finite and inside the valid lon/lat range.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Great-circle (haversine) distance in kilometres.
    pub fn haversine_km(&self, other: &GeodeticPoint) -> f64 {
        Haversine::distance(Point::from(*self), Point::from(*other)) / 1000.0
    }

    /// Initial bearing towards `other`, degrees clockwise from north in `[0, 360)`.
    pub fn initial_bearing(&self, other: &GeodeticPoint) -> f64 {
        Haversine::bearing(Point::from(*self), Point::from(*other)).rem_euclid(360.0)
    }

    /// Project onto a local equirectangular plane (metres) centred on `origin`.
    ///
    /// Adequate for neighbourhood statistics over a few hundred kilometres.
    pub fn to_local(&self, origin: &GeodeticPoint) -> ProjectedPoint {
        let k = EARTH_RADIUS_KM * 1000.0;
        let x = (self.lon - origin.lon).to_radians() * origin.lat.to_radians().cos() * k;
        let y = (self.lat - origin.lat).to_radians() * k;
        ProjectedPoint::new(x, y)
    }
}

impl From<geo_types::Point<f64>> for GeodeticPoint {
    fn from(p: geo_types::Point<f64>) -> Self {
        Self::new(p.x(), p.y())
    }
}

impl From<GeodeticPoint> for geo_types::Point<f64> {
    fn from(p: GeodeticPoint) -> Self {
        geo_types::Point::new(p.lon, p.lat)
    }
}

/// Linear unit for user-facing distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinearUnit {
    #[default]
    Meters,
    Kilometers,
    Miles,
}

impl LinearUnit {
    /// Metres per unit
    pub fn factor(&self) -> f64 {
        match self {
            LinearUnit::Meters => 1.0,
            LinearUnit::Kilometers => 1000.0,
            LinearUnit::Miles => 1609.344,
        }
    }

    pub fn to_meters(&self, value: f64) -> f64 {
        value * self.factor()
    }

    pub fn from_meters(&self, meters: f64) -> f64 {
        meters / self.factor()
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            LinearUnit::Meters => "m",
            LinearUnit::Kilometers => "km",
            LinearUnit::Miles => "mi",
        }
    }
}

impl fmt::Display for LinearUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for LinearUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "meter" | "meters" | "metre" | "metres" => Ok(LinearUnit::Meters),
            "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => {
                Ok(LinearUnit::Kilometers)
            }
            "mi" | "mile" | "miles" => Ok(LinearUnit::Miles),
            other => Err(Error::invalid("unit", other, "use meters, kilometers or miles")),
        }
    }
}
