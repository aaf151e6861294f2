//! Column labelling and field-to-column matching.
//!
//! A [`ColumnCatalog`] keeps the labels of every physical column in the
//! languages encountered so far, translating on demand. The
//! [`ColumnMatcher`] uses those labels together with prior hints to resolve
//! each canonical field onto a dataset column.

pub mod catalog;
pub mod matcher;
pub mod suggest;
pub mod translator;

pub use catalog::{ColumnCatalog, ColumnLabelSet};
pub use matcher::{
    ColumnMatcher, FieldOutcome, FieldResolution, MatchOptions, MatchResult, MatchSource,
};
pub use suggest::{normalize_text, suggest_columns};
pub use translator::{GlossaryTranslator, Translator};
