//! Harmonisation of one dataset onto the target schema of its category.
//!
//! The [`Harmonizer`] ties the pieces together: it labels the dataset's
//! columns, resolves canonical fields onto them, locates records and shapes
//! the result, remembering what it learned for the next run.

pub mod harmonizer;
pub mod options;
pub mod report;

pub use harmonizer::{Harmonizer, harmonizer};
pub use options::{FormatRequest, HarmonizeOptions, PersistenceMode};
pub use report::{HarmonizeReport, UnresolvedField};
