//! Tabular file formats handled by the adapters.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{IngestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabularFormat {
    Csv,
    /// A JSON array of records.
    Json,
    /// A GeoJSON `FeatureCollection` of points; export only.
    GeoJson,
}

impl TabularFormat {
    /// Guesses the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TabularFormat::Csv => "csv",
            TabularFormat::Json => "json",
            TabularFormat::GeoJson => "geojson",
        }
    }

    pub fn is_readable(&self) -> bool {
        !matches!(self, TabularFormat::GeoJson)
    }
}

impl fmt::Display for TabularFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TabularFormat {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" | "txt" | "tsv" => Ok(TabularFormat::Csv),
            "json" => Ok(TabularFormat::Json),
            "geojson" => Ok(TabularFormat::GeoJson),
            other => Err(IngestError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            TabularFormat::from_path(Path::new("out/hospitals.GeoJSON")).unwrap(),
            TabularFormat::GeoJson
        );
        assert_eq!(
            TabularFormat::from_path(Path::new("data.tsv")).unwrap(),
            TabularFormat::Csv
        );
        assert!(matches!(
            TabularFormat::from_path(Path::new("data.xlsx")),
            Err(IngestError::UnsupportedFormat { .. })
        ));
        assert!(!TabularFormat::GeoJson.is_readable());
    }
}
