//! Trajectory and vector-field analysis
//!
//! Works on geodetic (lon/lat) features observed at two times:
//! - **vectors**: displacement from each source point to its nearest target
//! - **dbscan**: density clustering of displacement vectors
//! - **coherence**: directional and magnitude consistency of vectors
//! - **tracking**: one-to-one matching of features between two snapshots

mod coherence;
mod dbscan;
mod time;
mod tracking;
mod vectors;

pub use coherence::{
    coherence, Coherence, CoherenceParams, CoherenceReport, CoherenceScope, GroupStats, VectorLabel,
};
pub use dbscan::{cluster_vectors, ClusterAssignment, ClusterParams, Clustering};
pub use time::parse_timestamp;
pub use tracking::{track_features, TrackingParams};
pub use vectors::{displacement_vectors, DisplacementVectors, VectorParams};

use geo::Centroid;
use vectis_core::{Feature, GeodeticPoint};

use crate::vector::geometry::checked_geometry;

/// Centroid of a feature as a validated lon/lat position.
pub(crate) fn geodetic_centroid(feature: &Feature) -> Result<GeodeticPoint, String> {
    let geom = checked_geometry(feature)?;
    let point: GeodeticPoint = geom
        .centroid()
        .ok_or_else(|| "geometry has no centroid".to_string())?
        .into();
    if !point.is_valid() {
        return Err(format!("({}, {}) is not a valid lon/lat position", point.lon, point.lat));
    }
    Ok(point)
}

/// Smallest angle between two bearings, in degrees `[0, 180]`.
pub(crate) fn angular_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Point};

    #[test]
    fn test_angular_difference_wraps() {
        assert_eq!(angular_difference(350.0, 10.0), 20.0);
        assert_eq!(angular_difference(10.0, 350.0), 20.0);
        assert_eq!(angular_difference(0.0, 180.0), 180.0);
        assert_eq!(angular_difference(90.0, 90.0), 0.0);
    }

    #[test]
    fn test_geodetic_centroid() {
        let cell = Feature::new(
            polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0), (x: 0.0, y: 0.0)].into(),
        );
        let c = geodetic_centroid(&cell).unwrap();
        assert!((c.lon - 1.0).abs() < 1e-12 && (c.lat - 1.0).abs() < 1e-12);

        let off_globe = Feature::new(Point::new(500.0, 0.0).into());
        assert!(geodetic_centroid(&off_globe).is_err());
        assert!(geodetic_centroid(&Feature::empty()).is_err());
    }
}
