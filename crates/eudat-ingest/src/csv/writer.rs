use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use crate::error::{IngestError, Result};

/// Writes `df` as CSV with a header row.
pub fn write_csv(df: &mut DataFrame, path: &Path, delimiter: u8) -> Result<()> {
    let mut file = File::create(path).map_err(|e| IngestError::write(path, e))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(delimiter)
        .finish(df)?;
    debug!(path = %path.display(), rows = df.height(), "wrote CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::csv::{CsvOptions, read_csv};

    #[test]
    fn written_csv_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut df = DataFrame::new(vec![
            Series::new("name".into(), vec!["Alpha", "Beta; Gamma"]).into(),
            Series::new("beds".into(), vec![Some(12_i64), None]).into(),
        ])
        .unwrap();
        write_csv(&mut df, &path, b';').unwrap();

        let back = read_csv(&path, &CsvOptions::default()).unwrap();
        assert_eq!(back.height(), 2);
        assert_eq!(
            back.column("name").unwrap().str().unwrap().get(1),
            Some("Beta; Gamma")
        );
        assert_eq!(back.column("beds").unwrap().str().unwrap().get(0), Some("12"));
    }
}
