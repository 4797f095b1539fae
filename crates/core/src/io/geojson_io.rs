//! GeoJSON FeatureCollection reader/writer

use geojson::{feature::Id, GeoJson, JsonObject, JsonValue};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::vector::{AttributeValue, Feature, FeatureCollection, FeatureId, Properties};

/// Parse GeoJSON text into a feature collection.
///
/// A bare Feature or Geometry document becomes a one-feature collection.
pub fn from_geojson_str(text: &str) -> Result<FeatureCollection> {
    let doc: GeoJson = text.parse()?;
    let features = match doc {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![geojson::Feature {
            bbox: None,
            geometry: Some(g),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    };

    let features = features
        .into_iter()
        .map(convert_feature)
        .collect::<Result<Vec<_>>>()?;

    Ok(FeatureCollection { name: None, features })
}

/// Read a GeoJSON file. The layer is named after the file stem.
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let mut fc = from_geojson_str(&text)?;
    fc.name = path.file_stem().map(|s| s.to_string_lossy().into_owned());
    Ok(fc)
}

/// Serialise a feature collection as a GeoJSON FeatureCollection.
pub fn to_geojson_string(collection: &FeatureCollection) -> String {
    let features = collection
        .iter()
        .map(|f| geojson::Feature {
            bbox: None,
            geometry: f
                .geometry
                .as_ref()
                .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
            id: Some(Id::String(f.id.to_string())),
            properties: Some(to_json_properties(&f.properties)),
            foreign_members: None,
        })
        .collect();

    GeoJson::FeatureCollection(geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
    .to_string()
}

/// Write a feature collection to a GeoJSON file.
pub fn write_geojson<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    fs::write(path, to_geojson_string(collection))?;
    Ok(())
}

fn convert_feature(f: geojson::Feature) -> Result<Feature> {
    let id = match f.id {
        Some(Id::String(s)) => FeatureId::new(s),
        Some(Id::Number(n)) => FeatureId::new(n.to_string()),
        None => FeatureId::fresh(),
    };
    let geometry = match f.geometry {
        Some(g) => Some(geo_types::Geometry::<f64>::try_from(g.value)?),
        None => None,
    };
    let properties = f
        .properties
        .map(|props| {
            props
                .into_iter()
                .map(|(k, v)| (k, from_json_value(v)))
                .collect::<Properties>()
        })
        .unwrap_or_default();

    Ok(Feature { id, geometry, properties })
}

fn from_json_value(v: JsonValue) -> AttributeValue {
    match v {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => n.as_f64().map(AttributeValue::Float).unwrap_or(AttributeValue::Null),
        },
        JsonValue::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}

fn to_json_properties(props: &Properties) -> JsonObject {
    props
        .iter()
        .map(|(k, v)| {
            let json = match v {
                AttributeValue::Null => JsonValue::Null,
                AttributeValue::Bool(b) => JsonValue::Bool(*b),
                AttributeValue::Int(i) => JsonValue::from(*i),
                AttributeValue::Float(f) => {
                    serde_json::Number::from_f64(*f).map(JsonValue::Number).unwrap_or(JsonValue::Null)
                }
                AttributeValue::String(s) => JsonValue::String(s.clone()),
            };
            (k.clone(), json)
        })
        .collect()
}
