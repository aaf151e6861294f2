//! JSON record arrays: `[{"col": value, ...}, ...]`.

use std::fs;
use std::path::Path;

use eudat_transform::cell_text;
use polars::prelude::*;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::{IngestError, Result};

/// Reads a JSON array of records into a DataFrame of string columns.
///
/// Columns appear in the order their keys are first seen. Records missing
/// a key get a null; nested values are kept as JSON text.
pub fn read_json_records(path: &Path) -> Result<DataFrame> {
    let text = fs::read_to_string(path).map_err(|e| IngestError::open(path, e))?;
    let parse_error = |message: String| IngestError::JsonParse {
        path: path.to_path_buf(),
        message,
    };
    let value: Value = serde_json::from_str(&text).map_err(|e| parse_error(e.to_string()))?;
    let Value::Array(records) = value else {
        return Err(parse_error("expected an array of records".into()));
    };

    let mut names: Vec<String> = Vec::new();
    for record in &records {
        let Value::Object(fields) = record else {
            return Err(parse_error("every record must be an object".into()));
        };
        for key in fields.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let columns: Vec<Column> = names
        .iter()
        .map(|name| {
            let values: Vec<Option<String>> = records
                .iter()
                .map(|record| record.get(name).and_then(value_to_text))
                .collect();
            Series::new(name.as_str().into(), values).into()
        })
        .collect();
    let df = DataFrame::new(columns)?;
    debug!(path = %path.display(), rows = df.height(), columns = df.width(), "read JSON records");
    Ok(df)
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested => Some(nested.to_string()),
    }
}

/// Converts a cell to JSON, keeping numbers and booleans typed.
pub(crate) fn any_to_json(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float32(v) => Number::from_f64(f64::from(v)).map_or(Value::Null, Value::Number),
        AnyValue::Float64(v) => Number::from_f64(v).map_or(Value::Null, Value::Number),
        other => cell_text(other).map_or(Value::Null, Value::String),
    }
}

/// One JSON object per row.
pub(crate) fn frame_records(df: &DataFrame) -> Result<Vec<Map<String, Value>>> {
    let columns = df.get_columns();
    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let mut record = Map::new();
        for column in columns {
            let value = column.get(row)?;
            record.insert(column.name().to_string(), any_to_json(value));
        }
        records.push(record);
    }
    Ok(records)
}

/// Writes `df` as a pretty-printed JSON array of records.
pub fn write_json_records(df: &DataFrame, path: &Path) -> Result<()> {
    let records = frame_records(df)?;
    let text = serde_json::to_string_pretty(&records).map_err(|e| IngestError::JsonParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    fs::write(path, text).map_err(|e| IngestError::write(path, e))?;
    debug!(path = %path.display(), rows = records.len(), "wrote JSON records");
    Ok(())
}
