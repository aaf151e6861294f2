//! Casting of resolved columns to their field's semantic type.
//!
//! Casts are all-or-nothing per column: when a single value cannot be read
//! as the target type the column is left untouched and a
//! [`IssueKind::CastFailed`] issue is returned. Datetime columns are the
//! exception; unparseable dates are kept verbatim next to the converted
//! ones.

use eudat_model::{Issue, IssueKind, Result, SemanticType};
use polars::prelude::*;
use tracing::{debug, warn};

use crate::datetime::{format_datetime, is_formatted, parse_datetime};
use crate::values::{column_values, parse_bool, parse_f64, parse_integer};

/// Input and output formats for datetime fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatetimeFormats<'a> {
    pub input: Option<&'a str>,
    /// An empty output format leaves datetime values as plain strings.
    pub output: &'a str,
}

/// Casts `column` to the storage type of `semantic`.
///
/// Returns an issue for values that could not be converted. A column
/// already stored in the target type is not touched.
pub fn cast_column(
    df: &mut DataFrame,
    field: &str,
    column: &str,
    semantic: SemanticType,
    formats: &DatetimeFormats<'_>,
) -> Result<Option<Issue>> {
    let dtype = df.column(column)?.dtype().clone();
    let series = match semantic {
        SemanticType::Object => return Ok(None),
        SemanticType::Datetime => return cast_datetime(df, field, column, &dtype, formats),
        SemanticType::String if dtype == DataType::String => return Ok(None),
        SemanticType::Integer if dtype == DataType::Int64 => return Ok(None),
        SemanticType::Float if dtype == DataType::Float64 => return Ok(None),
        SemanticType::Boolean if dtype == DataType::Boolean => return Ok(None),
        SemanticType::String => Series::new(column.into(), column_values(df, column)?),
        SemanticType::Integer => {
            let (parsed, failed) = parse_all(&column_values(df, column)?, parse_integer);
            if failed > 0 {
                return Ok(Some(cast_failure(field, column, semantic, failed)));
            }
            Series::new(column.into(), parsed)
        }
        SemanticType::Float => {
            let (parsed, failed) = parse_all(&column_values(df, column)?, parse_f64);
            if failed > 0 {
                return Ok(Some(cast_failure(field, column, semantic, failed)));
            }
            Series::new(column.into(), parsed)
        }
        SemanticType::Boolean => {
            let (parsed, failed) = parse_all(&column_values(df, column)?, parse_bool);
            if failed > 0 {
                return Ok(Some(cast_failure(field, column, semantic, failed)));
            }
            Series::new(column.into(), parsed)
        }
    };
    debug!(field, column, from = %dtype, to = %semantic, "cast column");
    df.with_column(series)?;
    Ok(None)
}

fn parse_all<T>(values: &[Option<String>], parse: impl Fn(&str) -> Option<T>) -> (Vec<Option<T>>, usize) {
    let mut failed = 0;
    let parsed = values
        .iter()
        .map(|value| match value.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let out = parse(raw);
                if out.is_none() {
                    failed += 1;
                }
                out
            }
        })
        .collect();
    (parsed, failed)
}

fn cast_failure(field: &str, column: &str, semantic: SemanticType, failed: usize) -> Issue {
    warn!(field, column, target = %semantic, failed, "cast failed, column left unchanged");
    Issue::for_field(
        field,
        IssueKind::CastFailed,
        format!("{failed} value(s) in column '{column}' cannot be read as {semantic}, column left unchanged"),
    )
    .with_count(failed)
}

fn cast_datetime(
    df: &mut DataFrame,
    field: &str,
    column: &str,
    dtype: &DataType,
    formats: &DatetimeFormats<'_>,
) -> Result<Option<Issue>> {
    let values = column_values(df, column)?;
    if formats.output.is_empty() {
        if *dtype != DataType::String {
            df.with_column(Series::new(column.into(), values))?;
        }
        return Ok(None);
    }

    let mut failed = 0;
    let mut changed = false;
    let converted: Vec<Option<String>> = values
        .into_iter()
        .map(|value| {
            let raw = value?;
            if raw.trim().is_empty() || is_formatted(&raw, formats.output) {
                return Some(raw);
            }
            match parse_datetime(&raw, formats.input)
                .and_then(|dt| format_datetime(&dt, formats.output))
            {
                Some(rendered) => {
                    changed = true;
                    Some(rendered)
                }
                None => {
                    failed += 1;
                    Some(raw)
                }
            }
        })
        .collect();

    if changed || *dtype != DataType::String {
        df.with_column(Series::new(column.into(), converted))?;
    }
    if failed == 0 {
        return Ok(None);
    }
    warn!(field, column, failed, "unrecognised dates kept verbatim");
    Ok(Some(
        Issue::for_field(
            field,
            IssueKind::CastFailed,
            format!("{failed} value(s) in column '{column}' are not recognised dates, kept verbatim"),
        )
        .with_count(failed),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(values: &[Option<&str>]) -> DataFrame {
        DataFrame::new(vec![Series::new("v".into(), values.to_vec()).into()]).unwrap()
    }

    #[test]
    fn integer_cast_converts_whole_column() {
        let mut df = frame(&[Some("1"), None, Some(" 3 "), Some("")]);
        let issue = cast_column(&mut df, "n", "v", SemanticType::Integer, &DatetimeFormats::default()).unwrap();
        assert!(issue.is_none());
        let col = df.column("v").unwrap();
        assert_eq!(col.dtype(), &DataType::Int64);
        assert_eq!(col.i64().unwrap().get(2), Some(3));
        assert_eq!(col.null_count(), 2);
    }

    #[test]
    fn failed_cast_leaves_column_untouched() {
        let mut df = frame(&[Some("1"), Some("two")]);
        let issue = cast_column(&mut df, "n", "v", SemanticType::Float, &DatetimeFormats::default())
            .unwrap()
            .unwrap();
        assert_eq!(issue.kind, IssueKind::CastFailed);
        assert_eq!(issue.count, Some(1));
        assert_eq!(df.column("v").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn datetime_cast_reformats_and_reports_leftovers() {
        let mut df = frame(&[Some("2021-06-01"), Some("someday"), None]);
        let formats = DatetimeFormats {
            input: None,
            output: "%d/%m/%Y",
        };
        let issue = cast_column(&mut df, "opened", "v", SemanticType::Datetime, &formats)
            .unwrap()
            .unwrap();
        assert_eq!(issue.count, Some(1));
        let col = df.column("v").unwrap().str().unwrap().clone();
        assert_eq!(col.get(0), Some("01/06/2021"));
        assert_eq!(col.get(1), Some("someday"));
        assert_eq!(col.get(2), None);
    }

    #[test]
    fn matching_type_is_a_no_op() {
        let mut df = DataFrame::new(vec![Series::new("v".into(), vec![1.5_f64]).into()]).unwrap();
        let before = df.clone();
        cast_column(&mut df, "x", "v", SemanticType::Float, &DatetimeFormats::default()).unwrap();
        assert!(df.equals_missing(&before));
    }
}
