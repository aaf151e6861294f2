//! Loading and saving of configuration and metadata documents.

use std::fs;
use std::path::Path;

use eudat_model::{DatasetMetadata, SchemaConfig};
use tracing::{debug, info};

use crate::error::{IngestError, Result};

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| IngestError::open(path, e))
}

fn invalid(path: &Path, err: impl std::fmt::Display) -> IngestError {
    IngestError::Metadata {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Loads a harmonizer configuration document.
pub fn load_config(path: &Path) -> Result<SchemaConfig> {
    let config = SchemaConfig::from_json_str(&read_text(path)?).map_err(|e| invalid(path, e))?;
    debug!(path = %path.display(), fields = config.index.len(), "loaded configuration");
    Ok(config)
}

/// Loads a dataset metadata document.
pub fn load_metadata(path: &Path) -> Result<DatasetMetadata> {
    let metadata = DatasetMetadata::from_json_str(&read_text(path)?).map_err(|e| invalid(path, e))?;
    debug!(
        path = %path.display(),
        columns = metadata.columns.len(),
        hints = metadata.index.len(),
        "loaded metadata"
    );
    Ok(metadata)
}

/// Writes a metadata document as pretty JSON.
pub fn save_metadata(metadata: &DatasetMetadata, path: &Path) -> Result<()> {
    let text = metadata.to_json_pretty().map_err(|e| invalid(path, e))?;
    fs::write(path, text).map_err(|e| IngestError::write(path, e))?;
    info!(path = %path.display(), "metadata saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const METADATA: &str = r#"{
        "country": {"code": "FR", "name": "France"},
        "lang": {"code": "fr", "name": "french"},
        "columns": [{"fr": "nom"}, {"fr": "ville", "en": "city"}],
        "index": {"name": "nom", "city": "ville", "beds": null},
        "proj": "WGS84"
    }"#;

    #[test]
    fn metadata_survives_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta.json");
        fs::write(&path, METADATA).unwrap();

        let metadata = load_metadata(&path).unwrap();
        assert_eq!(metadata.columns.len(), 2);
        let out = dir.path().join("saved.json");
        save_metadata(&metadata, &out).unwrap();
        let again = load_metadata(&out).unwrap();
        assert_eq!(again.index.len(), 3);
        assert_eq!(again.proj.as_deref(), Some("WGS84"));
        assert_eq!(
            again.hints().unwrap().keys().map(|k| k.as_str()).collect::<Vec<_>>(),
            vec!["name", "city", "beds"]
        );
    }

    #[test]
    fn malformed_config_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, IngestError::Metadata { .. }));
        assert!(err.to_string().contains("config.json"));
    }
}
