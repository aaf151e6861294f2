use polars::prelude::PolarsError;
use thiserror::Error;

/// Hard failures raised while harmonising a dataset.
///
/// Data-level problems (a column that cannot be found, a value that cannot
/// be cast, a place the geocoder does not know) are never reported through
/// this type; they travel as [`crate::Issue`] values instead.
#[derive(Debug, Error)]
pub enum HarmonizeError {
    #[error("language '{0}' not recognised")]
    LanguageUnrecognized(String),

    #[error("country '{0}' not recognised")]
    CountryUnrecognized(String),

    #[error("semantic type '{0}' not recognised")]
    InvalidSemanticType(String),

    #[error("invalid field key '{0}'")]
    InvalidFieldKey(String),

    #[error("no index available: the target schema is empty")]
    NoIndexAvailable,

    #[error("no location source: {0}")]
    NoLocationSource(String),

    #[error("unknown coordinate order '{0}': expected 'lL' or 'Ll'")]
    InvalidCoordinateOrder(String),

    #[error("projection from '{from}' to '{to}' failed: {reason}")]
    ProjectionFailed {
        from: String,
        to: String,
        reason: String,
    },

    #[error("no dataset loaded")]
    NoDataset,

    #[error("invalid metadata: {0}")]
    Metadata(String),

    #[error("dataframe operation failed: {0}")]
    Frame(#[from] PolarsError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure reported by an external service adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Transient failure; the call may be retried.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The service understood the request and refused it.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, HarmonizeError>;
