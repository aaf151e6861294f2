//! CSV file reading.
//!
//! Every column is read as text so that typing is left to the formatter,
//! which knows the semantic type of each canonical field.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::{IngestError, Result};

use super::header::{CsvHeader, detect_delimiter, parse_csv_line};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field separator; sniffed from the header row when `None`.
    pub delimiter: Option<u8>,
}

impl CsvOptions {
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter: Some(delimiter),
        }
    }
}

/// Reads and parses the header row.
pub fn read_csv_header(path: &Path, options: &CsvOptions) -> Result<CsvHeader> {
    let file = File::open(path).map_err(|e| IngestError::open(path, e))?;
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(|e| IngestError::open(path, e))?;
    // UTF-8 BOM
    let line = line.strip_prefix('\u{feff}').unwrap_or(&line);
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(IngestError::EmptyFile {
            path: path.to_path_buf(),
        });
    }
    let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(line));
    Ok(CsvHeader {
        columns: parse_csv_line(line, delimiter),
        delimiter,
    })
}

/// Reads a CSV file into a DataFrame of string columns.
pub fn read_csv(path: &Path, options: &CsvOptions) -> Result<DataFrame> {
    let header = read_csv_header(path, options)?;
    let csv_error = |e: PolarsError| IngestError::CsvParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|parse| parse.with_separator(header.delimiter))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(csv_error)?
        .finish()
        .map_err(csv_error)?;

    if df.width() == header.len() {
        df.set_column_names(header.columns.iter().map(String::as_str))?;
    } else {
        warn!(
            path = %path.display(),
            header = header.len(),
            columns = df.width(),
            "header row and parsed columns disagree, keeping parsed names"
        );
    }
    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        delimiter = %char::from(header.delimiter),
        "read CSV"
    );
    Ok(df)
}
