//! The harmonizer: one configured value object per dataset.
//!
//! A [`Harmonizer`] bundles the target schema of a category with what is
//! known about one source dataset (language, country, column hints) and
//! the external services used to fill the gaps. Typical use:
//!
//! ```ignore
//! let mut h = harmonizer(config, metadata, PersistenceMode::Disabled)?
//!     .with_translator(Box::new(glossary));
//! h.load(df)?;
//! let report = h.format(&FormatRequest { locate: true, ..Default::default() })?;
//! ```

use std::fs;

use eudat_geo::{
    GeocodingService, LocateOptions, LocateStrategy, LocationOutcome, LocationResolver,
    ProjectionService,
};
use eudat_map::{ColumnCatalog, ColumnMatcher, MatchOptions, MatchResult, Translator};
use eudat_model::{
    ColumnRef, Country, CountryRef, DatasetMetadata, FieldKey, HarmonizeError, IndexDocument,
    IndexValue, Issue, LanguageCode, LanguageRef, ResolutionMap, Result, SchemaConfig,
    TargetSchema, keys,
};
use eudat_transform::{FormatOptions, Formatter, apply_constant, column_names, has_column};
use polars::prelude::DataFrame;
use tracing::{debug, info, info_span};

use crate::options::{FormatRequest, HarmonizeOptions, PersistenceMode};
use crate::report::HarmonizeReport;

/// Builds a harmonizer from a configuration and a metadata document.
///
/// `persistence` decides whether [`Harmonizer::snapshot`] also writes the
/// updated metadata document.
pub fn harmonizer(
    config: SchemaConfig,
    metadata: DatasetMetadata,
    persistence: PersistenceMode,
) -> Result<Harmonizer> {
    Ok(Harmonizer::from_documents(config, metadata)?.with_persistence(persistence))
}

struct Dataset {
    frame: DataFrame,
    catalog: ColumnCatalog,
}

pub struct Harmonizer {
    config: SchemaConfig,
    metadata: DatasetMetadata,
    schema: TargetSchema,
    /// Field key to source column, carried between runs.
    hints: ResolutionMap,
    input_language: Option<LanguageCode>,
    output_language: LanguageCode,
    country: Option<Country>,
    options: HarmonizeOptions,
    persistence: PersistenceMode,
    translator: Option<Box<dyn Translator>>,
    geocoder: Option<Box<dyn GeocodingService>>,
    projector: Option<Box<dyn ProjectionService>>,
    dataset: Option<Dataset>,
}

impl Harmonizer {
    /// Resolves languages, country and schema from the two documents.
    ///
    /// # Errors
    ///
    /// Fails on unknown languages or countries, malformed index entries and
    /// an invalid coordinate order.
    pub fn from_documents(config: SchemaConfig, metadata: DatasetMetadata) -> Result<Self> {
        let schema = config.target_schema()?.merged(&metadata.ad_hoc_fields()?);
        let hints = metadata.hints()?;
        let input_language = metadata.language()?;
        let output_language = config.output_language()?.unwrap_or_else(LanguageCode::english);
        let country = metadata.country()?;
        let options = HarmonizeOptions::from_documents(&config, &metadata)?;
        info!(
            category = config.category.as_deref().unwrap_or("unnamed"),
            fields = schema.len(),
            hints = hints.len(),
            country = country.as_ref().map_or("unknown", Country::code),
            "harmonizer configured"
        );
        Ok(Self {
            config,
            metadata,
            schema,
            hints,
            input_language,
            output_language,
            country,
            options,
            persistence: PersistenceMode::default(),
            translator: None,
            geocoder: None,
            projector: None,
            dataset: None,
        })
    }

    #[must_use]
    pub fn with_translator(mut self, translator: Box<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    #[must_use]
    pub fn with_geocoder(mut self, geocoder: Box<dyn GeocodingService>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    #[must_use]
    pub fn with_projector(mut self, projector: Box<dyn ProjectionService>) -> Self {
        self.projector = Some(projector);
        self
    }

    #[must_use]
    pub fn with_persistence(mut self, persistence: PersistenceMode) -> Self {
        self.persistence = persistence;
        self
    }

    #[must_use]
    pub fn with_output_language(mut self, lang: LanguageCode) -> Self {
        self.output_language = lang;
        self
    }

    pub fn options_mut(&mut self) -> &mut HarmonizeOptions {
        &mut self.options
    }

    // === Accessors ===

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    pub fn options(&self) -> &HarmonizeOptions {
        &self.options
    }

    pub fn schema(&self) -> &TargetSchema {
        &self.schema
    }

    /// Field-to-source-column hints, updated by every run.
    pub fn hints(&self) -> &ResolutionMap {
        &self.hints
    }

    pub fn input_language(&self) -> Option<LanguageCode> {
        self.input_language
    }

    pub fn output_language(&self) -> LanguageCode {
        self.output_language
    }

    pub fn country(&self) -> Option<Country> {
        self.country
    }

    pub fn catalog(&self) -> Option<&ColumnCatalog> {
        self.dataset.as_ref().map(|d| &d.catalog)
    }

    pub fn data(&self) -> Option<&DataFrame> {
        self.dataset.as_ref().map(|d| &d.frame)
    }

    /// Hands the dataset back, leaving the harmonizer without one.
    pub fn take_data(&mut self) -> Option<DataFrame> {
        self.dataset.take().map(|d| d.frame)
    }

    // === Operations ===

    /// Loads a dataset and labels its columns.
    ///
    /// Without a declared input language the language of the headers is
    /// detected through the translator.
    ///
    /// # Errors
    ///
    /// [`HarmonizeError::LanguageUnrecognized`] when the language is neither
    /// declared nor detectable.
    pub fn load(&mut self, frame: DataFrame) -> Result<()> {
        let columns = column_names(&frame);
        let lang = match self.input_language {
            Some(lang) => lang,
            None => {
                let detected = ColumnCatalog::detect_language(
                    &columns,
                    self.translator.as_deref(),
                    &self.options.retry,
                )?;
                self.input_language = Some(detected);
                detected
            }
        };
        let catalog = if self.metadata.columns.is_empty() {
            let mut catalog = ColumnCatalog::new(lang);
            catalog.register(&columns, lang);
            catalog
        } else {
            ColumnCatalog::from_label_sets(lang, &self.metadata.columns, &columns)
        };
        info!(
            rows = frame.height(),
            columns = columns.len(),
            language = %lang,
            "dataset loaded"
        );
        self.dataset = Some(Dataset { frame, catalog });
        Ok(())
    }

    /// Labels of every column in `lang`, translating missing ones.
    pub fn labels(&mut self, lang: LanguageCode) -> Result<(Vec<Option<String>>, Option<Issue>)> {
        let dataset = self.dataset.as_mut().ok_or(HarmonizeError::NoDataset)?;
        Ok(dataset
            .catalog
            .labels_for(lang, self.translator.as_deref(), &self.options.retry))
    }

    /// Translates specific column labels between two languages.
    pub fn translate_labels(
        &mut self,
        labels: &[&str],
        from: LanguageCode,
        to: LanguageCode,
    ) -> Result<(Vec<Option<String>>, Option<Issue>)> {
        let dataset = self.dataset.as_mut().ok_or(HarmonizeError::NoDataset)?;
        Ok(dataset.catalog.labels_for_columns(
            labels,
            from,
            to,
            self.translator.as_deref(),
            &self.options.retry,
        ))
    }

    /// Resolves `requested` fields (all schema fields when `None`) without
    /// touching the dataset.
    pub fn resolve(&mut self, requested: Option<&[FieldKey]>, force: bool) -> Result<MatchResult> {
        let dataset = self.dataset.as_mut().ok_or(HarmonizeError::NoDataset)?;
        let columns = column_names(&dataset.frame);
        ColumnMatcher::new(&mut dataset.catalog, &self.schema)
            .with_translator(self.translator.as_deref())
            .with_retry(self.options.retry)
            .resolve(
                requested,
                &self.hints,
                &columns,
                &MatchOptions {
                    force_keep: force,
                    output_language: self.output_language,
                    prepare_labels: true,
                },
            )
    }

    /// Adds canonical coordinate columns to the dataset.
    ///
    /// # Errors
    ///
    /// [`HarmonizeError::NoLocationSource`] and
    /// [`HarmonizeError::ProjectionFailed`] are hard failures.
    pub fn locate(&mut self) -> Result<LocationOutcome> {
        self.locate_with(true)
    }

    fn locate_with(&mut self, prepare_labels: bool) -> Result<LocationOutcome> {
        let dataset = self.dataset.as_mut().ok_or(HarmonizeError::NoDataset)?;
        let options = LocateOptions {
            order: self.options.order,
            place_components: self.options.place_components.clone(),
            input_projection: self.options.input_projection.clone(),
            output_projection: self.options.output_projection.clone(),
            output_language: self.output_language,
            coordinates: None,
            prepare_labels,
        };
        let outcome = LocationResolver::new(&self.schema)
            .with_geocoder(self.geocoder.as_deref())
            .with_projector(self.projector.as_deref())
            .with_translator(self.translator.as_deref())
            .with_retry(self.options.retry)
            .resolve(&mut dataset.frame, &mut dataset.catalog, &self.hints, &options)?;

        match &outcome.strategy {
            LocateStrategy::SplitColumn { column } => {
                self.hints.set(FieldKey::new(keys::LAT)?, Some(ColumnRef::single(column.as_str())));
                self.hints.set(FieldKey::new(keys::LON)?, Some(ColumnRef::single(column.as_str())));
            }
            LocateStrategy::SeparateColumns { lat, lon } => {
                self.hints.set(FieldKey::new(keys::LAT)?, Some(ColumnRef::single(lat.as_str())));
                self.hints.set(FieldKey::new(keys::LON)?, Some(ColumnRef::single(lon.as_str())));
            }
            LocateStrategy::Geocoded { .. } => {}
        }
        if let Some(projection) = &outcome.projection {
            self.metadata.proj = Some(projection.clone());
        }
        Ok(outcome)
    }

    /// Shapes the loaded dataset into the target schema.
    ///
    /// Runs location first when requested, fills constant country fields,
    /// resolves every schema and hinted field, then formats.
    pub fn format(&mut self, request: &FormatRequest) -> Result<HarmonizeReport> {
        if self.dataset.is_none() {
            return Err(HarmonizeError::NoDataset);
        }
        let span = info_span!("harmonize", force = request.force, locate = request.locate);
        let _guard = span.enter();

        // Labels are prepared once; later matcher passes in this run reuse them.
        let mut issues = Vec::new();
        if let Some(dataset) = self.dataset.as_mut()
            && let Some(issue) = dataset.catalog.ensure_language(
                self.output_language,
                self.translator.as_deref(),
                &self.options.retry,
                false,
            )
        {
            issues.push(issue);
        }

        let location = if request.locate {
            Some(self.locate_with(false)?)
        } else {
            None
        };

        let mut run_hints = self.hints.clone();
        run_hints.merge(&request.overrides);
        if let Some(location) = &location {
            run_hints.merge(&location.resolution);
        }
        let mut requested: Vec<FieldKey> = self.schema.keys().cloned().collect();
        for key in run_hints.keys() {
            if !requested.contains(key) {
                requested.push(key.clone());
            }
        }

        let dataset = self.dataset.as_mut().ok_or(HarmonizeError::NoDataset)?;
        let columns = column_names(&dataset.frame);
        let mut matched = ColumnMatcher::new(&mut dataset.catalog, &self.schema)
            .with_translator(self.translator.as_deref())
            .with_retry(self.options.retry)
            .resolve(
                Some(&requested),
                &run_hints,
                &columns,
                &MatchOptions {
                    force_keep: request.force,
                    output_language: self.output_language,
                    prepare_labels: false,
                },
            )?;

        if let Some(country) = self.country {
            for (key, value) in [(keys::COUNTRY, country.name()), (keys::CC, country.code())] {
                if !self.schema.contains(key) || matched.column(key).is_some() {
                    continue;
                }
                let target = self.schema.output_name(key).to_string();
                if !has_column(&dataset.frame, &target) {
                    apply_constant(&mut dataset.frame, &target, value)?;
                }
                debug!(field = key, value, "filled constant field");
                matched
                    .resolution
                    .set(FieldKey::new(key)?, Some(ColumnRef::single(target)));
                matched.issues.retain(|issue| issue.field.as_deref() != Some(key));
                matched.fields.retain(|entry| entry.field != key);
            }
        }

        let format_options = FormatOptions {
            keep: request.keep.clone(),
            force_create_missing: request.force,
            input_datetime_format: self.options.input_datetime_format.clone(),
            output_datetime_format: self.options.output_datetime_format.clone(),
        };
        let formatted = Formatter::new(&self.schema).apply(
            &mut dataset.frame,
            &matched.resolution,
            &format_options,
        )?;

        let located: Vec<&FieldKey> = location
            .as_ref()
            .map(|l| l.resolution.keys().collect())
            .unwrap_or_default();
        for (key, value) in matched.resolution.iter() {
            let constant = matches!(key.as_str(), keys::COUNTRY | keys::CC)
                && value.is_some_and(|v| !columns.iter().any(|c| v.contains(c)));
            if located.contains(&key) || constant {
                continue;
            }
            self.hints.set(key.clone(), value.cloned());
        }

        if let Some(location) = &location {
            issues.extend(location.issues.iter().cloned());
        }
        issues.extend(matched.issues);
        issues.extend(formatted.issues);

        let report = HarmonizeReport {
            unresolved: HarmonizeReport::unresolved_from(&matched.fields),
            fields: matched.fields,
            resolution: formatted.resolution,
            location,
            created: formatted.created,
            dropped: formatted.dropped,
            columns: column_names(&dataset.frame),
            issues,
        };
        info!(
            resolved = report.resolved_count(),
            unresolved = report.unresolved.len(),
            issues = report.issues.len(),
            columns = report.columns.len(),
            "harmonisation complete"
        );
        Ok(report)
    }

    /// Returns the metadata document updated with what was learned.
    ///
    /// Column labels include cached translations, the index carries the
    /// current hints next to ad-hoc declarations. With
    /// [`PersistenceMode::File`] the document is also written.
    pub fn snapshot(&self) -> Result<DatasetMetadata> {
        let mut snapshot = self.metadata.clone();
        if let Some(dataset) = &self.dataset {
            snapshot.columns = dataset.catalog.label_sets();
        }
        if let Some(lang) = self.input_language {
            snapshot.lang = Some(LanguageRef::from(lang));
        }
        if let Some(country) = self.country {
            snapshot.country = Some(CountryRef::from(country));
        }

        let mut index = IndexDocument::default();
        for (key, value) in self.metadata.index.iter() {
            match value {
                Some(IndexValue::Declaration(_)) => index.push(key, value.cloned()),
                _ if self.hints.contains_key(key) => {
                    index.push(key, self.hints.get(key).cloned().map(IndexValue::Column));
                }
                _ => index.push(key, value.cloned()),
            }
        }
        for (key, value) in self.hints.iter() {
            let declared = self.metadata.index.iter().any(|(k, _)| k == key.as_str());
            if !declared {
                index.push(key.as_str(), value.cloned().map(IndexValue::Column));
            }
        }
        snapshot.index = index;

        if let PersistenceMode::File(path) = &self.persistence {
            fs::write(path, snapshot.to_json_pretty()?)?;
            info!(path = %path.display(), "metadata snapshot written");
        }
        Ok(snapshot)
    }
}
