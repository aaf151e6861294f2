//! Error types for dataset ingestion and export.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing dataset and metadata files.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Format Errors ===
    /// Extension or format name not handled by any adapter.
    #[error("unsupported tabular format '{format}'")]
    UnsupportedFormat { format: String },

    #[error("file is empty: {path}")]
    EmptyFile { path: PathBuf },

    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    #[error("failed to parse JSON {path}: {message}")]
    JsonParse { path: PathBuf, message: String },

    // === Export Errors ===
    /// GeoJSON export needs both coordinate columns.
    #[error("coordinate column '{column}' not found")]
    MissingCoordinates { column: String },

    // === Metadata Errors ===
    #[error("invalid metadata document {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    // === DataFrame Errors ===
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for IngestError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

impl IngestError {
    pub(crate) fn open(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::FileRead {
                path: path.to_path_buf(),
                source: err,
            }
        }
    }

    pub(crate) fn write(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
