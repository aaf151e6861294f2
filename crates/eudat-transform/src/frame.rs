//! Column-level DataFrame operations.

use eudat_model::{Result, SemanticType};
use polars::prelude::*;

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names_owned()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Sets `name` to `value` on every row, replacing an existing column.
pub fn apply_constant(df: &mut DataFrame, name: &str, value: &str) -> Result<()> {
    let height = df.height();
    let col = Column::new(name.into(), vec![value; height]);
    df.with_column(col)?;
    Ok(())
}

/// Storage type used for an all-null column of the given semantic type.
pub fn storage_type(semantic: SemanticType) -> DataType {
    match semantic {
        SemanticType::Integer => DataType::Int64,
        SemanticType::Float => DataType::Float64,
        SemanticType::Boolean => DataType::Boolean,
        SemanticType::String | SemanticType::Datetime | SemanticType::Object => DataType::String,
    }
}

/// Adds an all-null column, replacing an existing one.
pub fn null_column(df: &mut DataFrame, name: &str, dtype: &DataType) -> Result<()> {
    let series = Series::full_null(name.into(), df.height(), dtype);
    df.with_column(series)?;
    Ok(())
}

/// Moves `leading` columns (those present) to the front, keeping the
/// relative order of all other columns.
pub fn reorder_columns(df: &mut DataFrame, leading: &[&str]) -> Result<()> {
    let current = column_names(df);
    let mut order: Vec<String> = Vec::with_capacity(current.len());
    for name in leading {
        if current.iter().any(|c| c == name) && !order.iter().any(|o| o == name) {
            order.push((*name).to_string());
        }
    }
    for name in current {
        if !order.contains(&name) {
            order.push(name);
        }
    }
    *df = df.select(order)?;
    Ok(())
}

/// Joins the non-blank parts with `separator`; `None` when nothing remains.
pub fn join_place(parts: &[Option<&str>], separator: &str) -> Option<String> {
    let kept: Vec<&str> = parts
        .iter()
        .flatten()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join(separator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("b".into(), vec!["1", "2"]).into(),
            Series::new("a".into(), vec!["x", "y"]).into(),
            Series::new("c".into(), vec!["p", "q"]).into(),
        ])
        .unwrap()
    }

    #[test]
    fn reorder_moves_leading_columns_first() {
        let mut df = frame();
        reorder_columns(&mut df, &["c", "missing", "a"]).unwrap();
        assert_eq!(column_names(&df), vec!["c", "a", "b"]);
    }

    #[test]
    fn constant_and_null_columns() {
        let mut df = frame();
        apply_constant(&mut df, "country", "FR").unwrap();
        null_column(&mut df, "beds", &DataType::Int64).unwrap();
        assert_eq!(df.column("country").unwrap().str().unwrap().get(1), Some("FR"));
        assert_eq!(df.column("beds").unwrap().null_count(), 2);
        assert_eq!(df.column("beds").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn join_place_skips_blank_parts() {
        assert_eq!(
            join_place(&[Some("1 Rue Haute"), None, Some(" "), Some("Paris")], ", ").as_deref(),
            Some("1 Rue Haute, Paris")
        );
        assert_eq!(join_place(&[None, Some("")], ", "), None);
    }
}
