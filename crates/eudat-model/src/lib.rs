//! Core types for harmonising heterogeneous tabular datasets onto a common
//! schema.
//!
//! - [`language`] and [`country`]: registries of recognised codes
//! - [`schema`]: the target schema and its canonical fields
//! - [`resolution`]: field-to-column resolution state
//! - [`metadata`]: configuration and dataset metadata documents
//! - [`issue`]: soft, data-level problems
//! - [`retry`]: retry policy for external service calls

pub mod country;
pub mod error;
pub mod issue;
pub mod language;
pub mod metadata;
pub mod resolution;
pub mod retry;
pub mod schema;

pub use country::{Country, CountryRef, countries};
pub use error::{HarmonizeError, Result, ServiceError};
pub use issue::{Issue, IssueKind};
pub use language::{DEFAULT_LANGUAGE, LanguageCode, LanguageRef, languages};
pub use metadata::{
    ConfigOptions, DatasetMetadata, FieldDeclaration, IndexDocument, IndexValue, LabelSet,
    SchemaConfig,
};
pub use resolution::{ColumnRef, ResolutionMap};
pub use retry::RetryPolicy;
pub use schema::{DEFAULT_PLACE_COMPONENTS, FieldKey, FieldSpec, SemanticType, TargetSchema, keys};
