//! GeoJSON export of point datasets.

use std::fs;
use std::path::Path;

use eudat_transform::cell_number;
use polars::prelude::*;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::json::frame_records;

/// Builds a `FeatureCollection` with one point per row.
///
/// Geometries use `[lon, lat]` order. Every other column becomes a
/// property. Rows without both coordinates get a null geometry.
pub fn to_geojson(df: &DataFrame, lat: &str, lon: &str) -> Result<Value> {
    for name in [lat, lon] {
        if df.get_column_index(name).is_none() {
            return Err(IngestError::MissingCoordinates {
                column: name.to_string(),
            });
        }
    }
    let lats = df.column(lat)?;
    let lons = df.column(lon)?;
    let records = frame_records(df)?;

    let mut features = Vec::with_capacity(records.len());
    for (row, mut properties) in records.into_iter().enumerate() {
        properties.remove(lat);
        properties.remove(lon);
        let point = match (cell_number(lats.get(row)?), cell_number(lons.get(row)?)) {
            (Some(y), Some(x)) => json!({"type": "Point", "coordinates": [x, y]}),
            _ => Value::Null,
        };
        features.push(json!({
            "type": "Feature",
            "geometry": point,
            "properties": Value::Object(properties),
        }));
    }
    let mut collection = Map::new();
    collection.insert("type".into(), Value::from("FeatureCollection"));
    collection.insert("features".into(), Value::Array(features));
    Ok(Value::Object(collection))
}

pub fn write_geojson(df: &DataFrame, path: &Path, lat: &str, lon: &str) -> Result<()> {
    let collection = to_geojson(df, lat, lon)?;
    let text = serde_json::to_string(&collection).map_err(|e| IngestError::JsonParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    fs::write(path, text).map_err(|e| IngestError::write(path, e))?;
    debug!(path = %path.display(), rows = df.height(), "wrote GeoJSON");
    Ok(())
}
