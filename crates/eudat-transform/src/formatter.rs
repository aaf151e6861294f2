//! Shapes a resolved dataset into the target schema's layout.
//!
//! Formatting renames resolved columns to their canonical output names,
//! casts them, drops columns outside the keep set, optionally creates
//! missing columns empty, and finally moves canonical columns to the front
//! in schema order.

use std::collections::{BTreeSet, HashMap};

use eudat_model::{ColumnRef, HarmonizeError, Issue, ResolutionMap, Result, TargetSchema};
use polars::prelude::*;
use tracing::{debug, info, info_span, warn};

use crate::cast::{DatetimeFormats, cast_column};
use crate::frame::{column_names, has_column, null_column, reorder_columns, storage_type};

/// Which columns survive formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeepColumns {
    /// Every output name declared by the target schema.
    #[default]
    All,
    /// Output names of the fields present in the resolution map.
    Resolved,
    /// An explicit list of output names. An empty list keeps every column.
    Explicit(Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    pub keep: KeepColumns,
    /// Create kept columns that are missing from the dataset, filled with
    /// nulls.
    pub force_create_missing: bool,
    /// Datetime format of the source values, tried before common layouts.
    pub input_datetime_format: Option<String>,
    /// Default output format for datetime fields; empty keeps strings as-is.
    pub output_datetime_format: String,
}

/// What formatting did to the dataset.
#[derive(Debug, Clone, Default)]
pub struct FormatReport {
    /// Resolution map rewritten to the output column names.
    pub resolution: ResolutionMap,
    pub renamed: Vec<(String, String)>,
    pub copied: Vec<(String, String)>,
    pub created: Vec<String>,
    pub dropped: Vec<String>,
    pub issues: Vec<Issue>,
}

pub struct Formatter<'a> {
    schema: &'a TargetSchema,
}

impl<'a> Formatter<'a> {
    pub fn new(schema: &'a TargetSchema) -> Self {
        Self { schema }
    }

    /// Applies `resolution` to `df` in place.
    ///
    /// Every source column is read as it was before formatting started, so
    /// a rename onto a name that is itself the source of a later field
    /// never loses data. A source claimed by several fields is copied for
    /// all but the first.
    ///
    /// # Errors
    ///
    /// Returns [`HarmonizeError::NoIndexAvailable`] for an empty schema and
    /// propagates DataFrame failures. Failed casts are reported as issues.
    pub fn apply(
        &self,
        df: &mut DataFrame,
        resolution: &ResolutionMap,
        options: &FormatOptions,
    ) -> Result<FormatReport> {
        if self.schema.is_empty() {
            return Err(HarmonizeError::NoIndexAvailable);
        }
        let span = info_span!("format", columns = df.width(), rows = df.height());
        let _guard = span.enter();

        let mut originals: HashMap<String, Column> = HashMap::new();
        for name in column_names(df) {
            let column = df.column(&name)?.clone();
            originals.insert(name, column);
        }

        let mut report = FormatReport::default();
        let mut moved: BTreeSet<String> = BTreeSet::new();
        let mut written: BTreeSet<String> = BTreeSet::new();

        for (field, value) in resolution.iter() {
            let source = match value {
                Some(ColumnRef::Single(source)) => source,
                other => {
                    report.resolution.set(field.clone(), other.cloned());
                    continue;
                }
            };
            let Some(original) = originals.get(source) else {
                debug!(field = %field, column = %source, "resolved column not in dataset, skipping");
                continue;
            };
            let target = self.schema.output_name(field.as_str()).to_string();

            if *source != target {
                df.with_column(original.clone().with_name(target.as_str().into()))?;
                if moved.insert(source.clone()) {
                    report.renamed.push((source.clone(), target.clone()));
                } else {
                    report.copied.push((source.clone(), target.clone()));
                }
            }
            written.insert(target.clone());

            if let Some(spec) = self.schema.get(field.as_str()) {
                let formats = DatetimeFormats {
                    input: options.input_datetime_format.as_deref(),
                    output: spec
                        .datetime_format
                        .as_deref()
                        .unwrap_or(&options.output_datetime_format),
                };
                if let Some(issue) = cast_column(df, field.as_str(), &target, spec.semantic, &formats)? {
                    report.issues.push(issue);
                }
            }
            report
                .resolution
                .set(field.clone(), Some(ColumnRef::Single(target)));
        }

        for source in moved.difference(&written) {
            if has_column(df, source) {
                df.drop_in_place(source)?;
            }
        }

        let keep = self.keep_set(&report.resolution, &options.keep);
        if keep.is_empty() {
            warn!("empty keep list, keeping every column");
        } else {
            for name in column_names(df) {
                if !keep.contains(&name) {
                    df.drop_in_place(&name)?;
                    report.dropped.push(name);
                }
            }
            if options.force_create_missing {
                for name in &keep {
                    if has_column(df, name) {
                        continue;
                    }
                    let semantic = self
                        .schema
                        .field_for_output(name)
                        .map(|f| f.semantic)
                        .unwrap_or_default();
                    null_column(df, name, &storage_type(semantic))?;
                    report.created.push(name.clone());
                }
            }
        }

        reorder_columns(df, &self.schema.output_names())?;
        info!(
            renamed = report.renamed.len(),
            copied = report.copied.len(),
            created = report.created.len(),
            dropped = report.dropped.len(),
            issues = report.issues.len(),
            "formatted dataset"
        );
        Ok(report)
    }

    fn keep_set(&self, resolution: &ResolutionMap, keep: &KeepColumns) -> Vec<String> {
        let names: Vec<String> = match keep {
            KeepColumns::All => self
                .schema
                .output_names()
                .into_iter()
                .map(ToString::to_string)
                .collect(),
            KeepColumns::Resolved => resolution
                .keys()
                .map(|key| self.schema.output_name(key.as_str()).to_string())
                .collect(),
            KeepColumns::Explicit(list) => list.clone(),
        };
        let mut seen = BTreeSet::new();
        names
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }
}
