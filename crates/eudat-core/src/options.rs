//! Harmonizer options and per-call requests.

use std::path::PathBuf;

use eudat_geo::CoordinateOrder;
use eudat_model::{
    DEFAULT_PLACE_COMPONENTS, DatasetMetadata, FieldKey, ResolutionMap, Result, RetryPolicy,
    SchemaConfig,
};
use eudat_transform::KeepColumns;

/// Where [`crate::Harmonizer::snapshot`] writes the metadata document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PersistenceMode {
    /// Snapshots are only returned.
    #[default]
    Disabled,
    /// Snapshots are also written to this file as pretty JSON.
    File(PathBuf),
}

/// Settings shared by every harmonisation step.
#[derive(Debug, Clone)]
pub struct HarmonizeOptions {
    /// Field keys concatenated, in order, into the place string.
    pub place_components: Vec<FieldKey>,
    pub order: CoordinateOrder,
    pub input_projection: Option<String>,
    pub output_projection: Option<String>,
    pub input_datetime_format: Option<String>,
    /// Empty leaves datetime values as they are.
    pub output_datetime_format: String,
    pub retry: RetryPolicy,
}

impl Default for HarmonizeOptions {
    fn default() -> Self {
        Self {
            place_components: default_place_components(),
            order: CoordinateOrder::default(),
            input_projection: None,
            output_projection: None,
            input_datetime_format: None,
            output_datetime_format: String::new(),
            retry: RetryPolicy::default(),
        }
    }
}

impl HarmonizeOptions {
    /// Collects options from the configuration and metadata documents.
    ///
    /// Metadata settings describe the source and win over configuration
    /// defaults where both apply (place components).
    pub fn from_documents(config: &SchemaConfig, metadata: &DatasetMetadata) -> Result<Self> {
        let place_components = match metadata.place.as_ref().or(config.options.place.as_ref()) {
            Some(keys) => keys
                .iter()
                .map(|key| FieldKey::new(key.as_str()))
                .collect::<Result<Vec<_>>>()?,
            None => default_place_components(),
        };
        let order = config
            .options
            .order
            .as_deref()
            .map(str::parse::<CoordinateOrder>)
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            place_components,
            order,
            input_projection: metadata.proj.clone(),
            output_projection: config.options.proj.clone(),
            input_datetime_format: metadata.dtfmt.clone(),
            output_datetime_format: config.options.dtfmt.clone().unwrap_or_default(),
            retry: RetryPolicy::default(),
        })
    }
}

fn default_place_components() -> Vec<FieldKey> {
    DEFAULT_PLACE_COMPONENTS
        .iter()
        .filter_map(|key| FieldKey::new(*key).ok())
        .collect()
}

/// One call to [`crate::Harmonizer::format`].
#[derive(Debug, Clone, Default)]
pub struct FormatRequest {
    /// Field-to-column entries that win over stored hints.
    pub overrides: ResolutionMap,
    /// Keep unresolved fields and create them as empty columns.
    pub force: bool,
    pub keep: KeepColumns,
    /// Resolve coordinates before formatting.
    pub locate: bool,
}
