//! Dataset shaping: value conversion helpers, type casts and the
//! [`Formatter`] that turns a resolved dataset into the target schema's
//! column layout.

pub mod cast;
pub mod datetime;
pub mod formatter;
pub mod frame;
pub mod values;

pub use cast::{DatetimeFormats, cast_column};
pub use formatter::{FormatOptions, FormatReport, Formatter, KeepColumns};
pub use frame::{
    apply_constant, column_names, has_column, join_place, null_column, reorder_columns,
};
pub use values::{cell_number, cell_text, column_values, format_numeric};
