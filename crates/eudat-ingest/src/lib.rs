//! Dataset ingestion and export.
//!
//! - **CSV**: delimiter sniffing, every column read as text
//! - **JSON**: arrays of records, read and written
//! - **GeoJSON**: point export from the canonical coordinate columns
//! - **Metadata**: configuration and dataset metadata documents

mod csv;
mod error;
mod format;
mod geojson;
mod json;
mod metadata;
mod source;

// === Error Types ===
pub use error::{IngestError, Result};

// === Formats ===
pub use csv::{CsvHeader, CsvOptions, detect_delimiter, read_csv, read_csv_header, write_csv};
pub use format::TabularFormat;
pub use geojson::{to_geojson, write_geojson};
pub use json::{read_json_records, write_json_records};

// === Sources and Sinks ===
pub use source::{FileSink, FileSource, TabularSink, TabularSource};

// === Metadata ===
pub use metadata::{load_config, load_metadata, save_metadata};
