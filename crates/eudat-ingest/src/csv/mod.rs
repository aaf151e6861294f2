//! CSV reading and writing.

mod header;
mod reader;
mod writer;

pub use header::{CsvHeader, detect_delimiter};
pub use reader::{CsvOptions, read_csv, read_csv_header};
pub use writer::write_csv;
