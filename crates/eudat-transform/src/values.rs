//! Cell conversions and strict value parsers used by casts and sinks.

use eudat_model::Result;
use polars::prelude::*;

/// Text of a dataset cell; `None` for nulls.
///
/// Floats drop a trailing fractional zero so that `"120"` read back from a
/// float column still matches its source text.
pub fn cell_text(value: AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => Some(s.to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        AnyValue::Float32(v) => Some(format_numeric(f64::from(v))),
        AnyValue::Float64(v) => Some(format_numeric(v)),
        other => Some(other.to_string()),
    }
}

/// Numeric value of a cell, parsing text cells. Booleans are not numbers.
pub fn cell_number(value: AnyValue<'_>) -> Option<f64> {
    match value {
        AnyValue::String(s) => parse_f64(s),
        AnyValue::StringOwned(s) => parse_f64(&s),
        AnyValue::Boolean(_) => None,
        other => other.extract::<f64>(),
    }
}

pub fn format_numeric(v: f64) -> String {
    let s = v.to_string();
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

pub fn parse_f64(value: &str) -> Option<f64> {
    match value.trim() {
        "" => None,
        trimmed => trimmed.parse().ok(),
    }
}

/// Parses an integer, also accepting integral decimals such as `"3.0"`.
pub fn parse_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    trimmed.parse::<i64>().ok().or_else(|| {
        let v = parse_f64(trimmed)?;
        (v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15).then_some(v as i64)
    })
}

/// Parses common boolean spellings, case-insensitively.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Reads a column as optional strings; nulls stay `None`.
pub fn column_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?;
    (0..column.len())
        .map(|idx| Ok(cell_text(column.get(idx)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_text_keeps_integral_digits() {
        assert_eq!(format_numeric(100.0), "100");
        assert_eq!(format_numeric(2.50), "2.5");
        assert_eq!(format_numeric(-0.125), "-0.125");
    }

    #[test]
    fn integer_parsing_accepts_integral_decimals() {
        assert_eq!(parse_integer(" 42 "), Some(42));
        assert_eq!(parse_integer("3.0"), Some(3));
        assert_eq!(parse_integer("3.5"), None);
        assert_eq!(parse_integer(""), None);
    }

    #[test]
    fn bool_parsing() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn numbers_come_from_numeric_and_text_cells() {
        assert_eq!(cell_number(AnyValue::Int64(7)), Some(7.0));
        assert_eq!(cell_number(AnyValue::String(" 48.85 ")), Some(48.85));
        assert_eq!(cell_number(AnyValue::String("n/a")), None);
        assert_eq!(cell_number(AnyValue::Boolean(true)), None);
        assert_eq!(cell_number(AnyValue::Null), None);
    }

    #[test]
    fn column_values_keeps_nulls() {
        let df = DataFrame::new(vec![
            Series::new("n".into(), vec![Some(1.5_f64), None, Some(2.0)]).into(),
        ])
        .unwrap();
        assert_eq!(
            column_values(&df, "n").unwrap(),
            vec![Some("1.5".to_string()), None, Some("2".to_string())]
        );
    }

    proptest::proptest! {
        #[test]
        fn integers_survive_float_text(v in -1_000_000_i64..1_000_000) {
            proptest::prop_assert_eq!(parse_integer(&v.to_string()), Some(v));
            proptest::prop_assert_eq!(parse_integer(&format_numeric(v as f64)), Some(v));
        }
    }
}
