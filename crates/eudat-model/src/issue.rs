use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    ColumnNotFound,
    CastFailed,
    ServiceUnavailable,
    GeocodeNotFound,
    TranslationIncomplete,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::ColumnNotFound => "column not found",
            IssueKind::CastFailed => "cast failed",
            IssueKind::ServiceUnavailable => "service unavailable",
            IssueKind::GeocodeNotFound => "geocode not found",
            IssueKind::TranslationIncomplete => "translation incomplete",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A soft, data-level problem recorded while harmonising.
///
/// Issues never abort processing; they are collected and returned with the
/// result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Field key the issue relates to, if any.
    pub field: Option<String>,
    pub kind: IssueKind,
    pub message: String,
    /// Number of affected rows, for row-level issues.
    pub count: Option<usize>,
}

impl Issue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            field: None,
            kind,
            message: message.into(),
            count: None,
        }
    }

    pub fn for_field(field: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::new(kind, message)
        }
    }

    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "[{}] {}: {}", self.kind, field, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}
