//! File-backed dataset sources and sinks.

use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::csv::{CsvOptions, read_csv, write_csv};
use crate::error::{IngestError, Result};
use crate::format::TabularFormat;
use crate::geojson::write_geojson;
use crate::json::{read_json_records, write_json_records};

/// Something a dataset can be loaded from.
pub trait TabularSource {
    fn load(&self) -> Result<DataFrame>;

    /// Column names of the dataset.
    fn columns(&self) -> Result<Vec<String>> {
        Ok(self
            .load()?
            .get_column_names_owned()
            .into_iter()
            .map(|name| name.to_string())
            .collect())
    }
}

/// Something a harmonised dataset can be written to.
pub trait TabularSink {
    fn write(&self, df: &mut DataFrame) -> Result<()>;
}

/// A dataset stored in a local file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    format: TabularFormat,
    csv: CsvOptions,
}

impl FileSource {
    /// Opens `path`, guessing the format from its extension.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = TabularFormat::from_path(&path)?;
        Self::with_format(path, format)
    }

    pub fn with_format(path: impl Into<PathBuf>, format: TabularFormat) -> Result<Self> {
        if !format.is_readable() {
            return Err(IngestError::UnsupportedFormat {
                format: format.to_string(),
            });
        }
        Ok(Self {
            path: path.into(),
            format,
            csv: CsvOptions::default(),
        })
    }

    #[must_use]
    pub fn with_csv_options(mut self, csv: CsvOptions) -> Self {
        self.csv = csv;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> TabularFormat {
        self.format
    }
}

impl TabularSource for FileSource {
    fn load(&self) -> Result<DataFrame> {
        let df = match self.format {
            TabularFormat::Csv => read_csv(&self.path, &self.csv)?,
            TabularFormat::Json => read_json_records(&self.path)?,
            TabularFormat::GeoJson => {
                return Err(IngestError::UnsupportedFormat {
                    format: self.format.to_string(),
                });
            }
        };
        info!(
            path = %self.path.display(),
            format = %self.format,
            rows = df.height(),
            columns = df.width(),
            "dataset loaded"
        );
        Ok(df)
    }
}

/// Writes datasets to a local file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    format: TabularFormat,
    delimiter: u8,
    /// Coordinate columns for GeoJSON export.
    coordinates: (String, String),
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, format: TabularFormat) -> Self {
        Self {
            path: path.into(),
            format,
            delimiter: b',',
            coordinates: ("lat".into(), "lon".into()),
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn with_coordinates(mut self, lat: impl Into<String>, lon: impl Into<String>) -> Self {
        self.coordinates = (lat.into(), lon.into());
        self
    }
}

impl TabularSink for FileSink {
    fn write(&self, df: &mut DataFrame) -> Result<()> {
        match self.format {
            TabularFormat::Csv => write_csv(df, &self.path, self.delimiter)?,
            TabularFormat::Json => write_json_records(df, &self.path)?,
            TabularFormat::GeoJson => {
                write_geojson(df, &self.path, &self.coordinates.0, &self.coordinates.1)?;
            }
        }
        info!(path = %self.path.display(), format = %self.format, rows = df.height(), "dataset written");
        Ok(())
    }
}
