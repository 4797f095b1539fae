//! Planar measurements: area, length, perimeter

use geo::{Area as GeoArea, Euclidean, Geometry, Length, LineString, Polygon};
use vectis_core::{FeatureCollection, LinearUnit};

/// Unsigned planar area. Non-areal geometry has zero area.
pub fn area(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Polygon(p) => p.unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        Geometry::Rect(r) => r.unsigned_area(),
        Geometry::Triangle(t) => t.unsigned_area(),
        Geometry::GeometryCollection(gc) => gc.0.iter().map(area).sum(),
        _ => 0.0,
    }
}

/// Planar length of linear geometry.
pub fn length(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::LineString(ls) => ls.length::<Euclidean>(),
        Geometry::MultiLineString(mls) => mls.0.iter().map(|ls| ls.length::<Euclidean>()).sum(),
        Geometry::Line(l) => l.length::<Euclidean>(),
        Geometry::GeometryCollection(gc) => gc.0.iter().map(length).sum(),
        _ => 0.0,
    }
}

fn ring_lengths(p: &Polygon<f64>) -> f64 {
    let int: f64 = p.interiors().iter().map(|r: &LineString<f64>| r.length::<Euclidean>()).sum();
    p.exterior().length::<Euclidean>() + int
}

/// Total length of exterior and interior rings.
pub fn perimeter(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Polygon(p) => ring_lengths(p),
        Geometry::MultiPolygon(mp) => mp.0.iter().map(ring_lengths).sum(),
        Geometry::GeometryCollection(gc) => gc.0.iter().map(perimeter).sum(),
        _ => 0.0,
    }
}

/// Summed area of every feature in a collection.
pub fn total_area(collection: &FeatureCollection) -> f64 {
    collection.iter().filter_map(|f| f.geometry.as_ref()).map(area).sum()
}

/// Copy of `collection` with `area`, `length` and `perimeter` attributes
/// expressed in `unit` (area in square units).
pub fn measure_features(collection: &FeatureCollection, unit: LinearUnit) -> FeatureCollection {
    let f = unit.factor();
    let features = collection
        .iter()
        .map(|feature| {
            let mut out = feature.clone();
            if let Some(geom) = &feature.geometry {
                out.set_property("area", area(geom) / (f * f));
                out.set_property("length", length(geom) / f);
                out.set_property("perimeter", perimeter(geom) / f);
            }
            out
        })
        .collect();
    FeatureCollection {
        name: collection.name.clone(),
        features,
    }
}
