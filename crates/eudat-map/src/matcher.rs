//! Resolution of canonical fields onto physical dataset columns.
//!
//! Resolution runs in three passes:
//!
//! 1. every prior hint is expanded through the catalog into the full set of
//!    labels its column carries, giving an inverse label-to-field index;
//! 2. each requested field is matched, first verbatim through its hint, then
//!    by alias search across all labels;
//! 3. fields sharing a resolved column through the inverse index (synonyms)
//!    inherit that column.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use eudat_model::{
    ColumnRef, FieldKey, HarmonizeError, Issue, IssueKind, LanguageCode, ResolutionMap, Result,
    RetryPolicy, TargetSchema,
};
use tracing::{debug, info};

use crate::catalog::ColumnCatalog;
use crate::suggest::suggest_columns;
use crate::translator::Translator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Keep fields without a matching column as empty placeholders, and add
    /// unrequested synonyms of resolved fields.
    pub force_keep: bool,
    /// Language whose labels rank first during alias search.
    pub output_language: LanguageCode,
    /// Translate missing output-language labels before matching. Callers
    /// that already prepared the catalog for this run turn it off.
    pub prepare_labels: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            force_keep: false,
            output_language: LanguageCode::english(),
            prepare_labels: true,
        }
    }
}

/// How a field found its column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSource {
    /// The prior hint named a column present in the dataset.
    Hint,
    /// Matched through the field's own name or an output-language label.
    PrimaryAlias { label: String },
    /// Matched through a label in another language.
    SecondaryAlias { label: String },
    /// Inherited from a synonym resolved to the same column.
    Propagated { from: FieldKey },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    Resolved {
        column: ColumnRef,
        source: MatchSource,
    },
    /// Kept without a source column; will be created empty.
    Placeholder { suggestions: Vec<String> },
    /// No column found and not kept.
    Dropped { suggestions: Vec<String> },
}

impl FieldOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::Placeholder { suggestions } | Self::Dropped { suggestions } => suggestions,
            Self::Resolved { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldResolution {
    pub field: FieldKey,
    pub outcome: FieldOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    /// Resolved fields plus placeholders; dropped fields are absent.
    pub resolution: ResolutionMap,
    pub fields: Vec<FieldResolution>,
    pub issues: Vec<Issue>,
}

impl MatchResult {
    pub fn column(&self, key: &str) -> Option<&str> {
        self.resolution.get(key).and_then(ColumnRef::as_single)
    }

    pub fn outcome(&self, key: &str) -> Option<&FieldOutcome> {
        self.fields
            .iter()
            .find(|f| f.field == key)
            .map(|f| &f.outcome)
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &FieldResolution> {
        self.fields.iter().filter(|f| !f.outcome.is_resolved())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum AliasRank {
    Primary,
    Secondary,
}

/// Inverse index built from prior hints: every label a hinted column carries
/// points back at the hinted field.
#[derive(Debug, Default)]
struct AliasIndex {
    by_field: BTreeMap<FieldKey, BTreeSet<String>>,
    by_label: BTreeMap<String, Vec<FieldKey>>,
}

impl AliasIndex {
    fn build(hints: &ResolutionMap, catalog: &ColumnCatalog) -> Self {
        let mut index = Self::default();
        for (field, hint) in hints.iter() {
            let Some(hint) = hint else { continue };
            for column in hint.columns() {
                let mut labels = BTreeSet::from([column.to_string()]);
                for set in catalog.sets_containing(column) {
                    labels.extend(set.labels().map(ToString::to_string));
                }
                for label in labels {
                    index.add(field, label);
                }
            }
        }
        index
    }

    fn add(&mut self, field: &FieldKey, label: String) {
        self.by_field
            .entry(field.clone())
            .or_default()
            .insert(label.clone());
        let fields = self.by_label.entry(label).or_default();
        if !fields.contains(field) {
            fields.push(field.clone());
        }
    }

    fn labels_of(&self, field: &FieldKey) -> impl Iterator<Item = &str> {
        self.by_field
            .get(field)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    fn fields_for(&self, label: &str) -> &[FieldKey] {
        self.by_label.get(label).map_or(&[], Vec::as_slice)
    }

    fn are_synonyms(&self, column: &str, a: &FieldKey, b: &FieldKey) -> bool {
        let fields = self.fields_for(column);
        fields.contains(a) && fields.contains(b)
    }
}

/// Resolves canonical fields onto dataset columns.
pub struct ColumnMatcher<'a> {
    catalog: &'a mut ColumnCatalog,
    schema: &'a TargetSchema,
    translator: Option<&'a dyn Translator>,
    retry: RetryPolicy,
}

impl<'a> ColumnMatcher<'a> {
    pub fn new(catalog: &'a mut ColumnCatalog, schema: &'a TargetSchema) -> Self {
        Self {
            catalog,
            schema,
            translator: None,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_translator(mut self, translator: Option<&'a dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Resolves `requested` fields (all schema fields when `None`) onto
    /// `columns`.
    ///
    /// # Errors
    ///
    /// Returns [`HarmonizeError::NoIndexAvailable`] when the target schema
    /// is empty. Missing columns and translation failures are reported as
    /// issues in the result.
    pub fn resolve(
        &mut self,
        requested: Option<&[FieldKey]>,
        hints: &ResolutionMap,
        columns: &[String],
        options: &MatchOptions,
    ) -> Result<MatchResult> {
        if self.schema.is_empty() {
            return Err(HarmonizeError::NoIndexAvailable);
        }
        let mut issues = Vec::new();
        if options.prepare_labels
            && let Some(issue) = self.catalog.ensure_language(
                options.output_language,
                self.translator,
                &self.retry,
                false,
            )
        {
            issues.push(issue);
        }

        let requested: Vec<FieldKey> = match requested {
            Some(keys) => keys.to_vec(),
            None => self.schema.keys().cloned().collect(),
        };
        let index = AliasIndex::build(hints, &*self.catalog);
        let present: HashSet<&str> = columns.iter().map(String::as_str).collect();

        let mut claims: HashMap<String, FieldKey> = HashMap::new();
        let mut fields: Vec<FieldResolution> = Vec::with_capacity(requested.len());

        for field in &requested {
            let hint = hints.get(field.as_str());
            let found = match hint {
                Some(ColumnRef::Single(column))
                    if present.contains(column.as_str())
                        && claim_allowed(&claims, &index, column, field) =>
                {
                    Some((ColumnRef::single(column.as_str()), MatchSource::Hint))
                }
                Some(ColumnRef::Multiple(parts))
                    if parts.iter().any(|c| present.contains(c.as_str())) =>
                {
                    let kept = parts
                        .iter()
                        .filter(|c| present.contains(c.as_str()))
                        .cloned()
                        .collect();
                    Some((ColumnRef::Multiple(kept), MatchSource::Hint))
                }
                _ => self.search_alias(field, hint, &index, columns, &claims, options),
            };

            let outcome = match found {
                Some((column, source)) => {
                    // Composite columns are shared with their component fields.
                    if let ColumnRef::Single(name) = &column {
                        claims.entry(name.clone()).or_insert_with(|| field.clone());
                    }
                    debug!(field = %field, column = ?column, source = ?source, "resolved field");
                    FieldOutcome::Resolved { column, source }
                }
                None => {
                    let mut names = vec![field.as_str(), self.schema.output_name(field.as_str())];
                    if let Some(hint) = hint {
                        names.extend(hint.columns());
                    }
                    let free: Vec<&str> = columns
                        .iter()
                        .map(String::as_str)
                        .filter(|c| !claims.contains_key(*c))
                        .collect();
                    let suggestions = suggest_columns(&names, &free);
                    if options.force_keep {
                        FieldOutcome::Placeholder { suggestions }
                    } else {
                        FieldOutcome::Dropped { suggestions }
                    }
                }
            };
            fields.push(FieldResolution {
                field: field.clone(),
                outcome,
            });
        }

        propagate_synonyms(&mut fields, &index, options.force_keep);

        let mut resolution = ResolutionMap::new();
        for entry in &fields {
            match &entry.outcome {
                FieldOutcome::Resolved { column, .. } => {
                    resolution.set(entry.field.clone(), Some(column.clone()));
                }
                FieldOutcome::Placeholder { .. } => {
                    resolution.set(entry.field.clone(), None);
                    issues.push(Issue::for_field(
                        entry.field.as_str(),
                        IssueKind::ColumnNotFound,
                        "no matching column, kept as an empty column",
                    ));
                }
                FieldOutcome::Dropped { .. } => {
                    issues.push(Issue::for_field(
                        entry.field.as_str(),
                        IssueKind::ColumnNotFound,
                        "no matching column, field dropped",
                    ));
                }
            }
        }

        info!(
            requested = requested.len(),
            resolved = fields.iter().filter(|f| f.outcome.is_resolved()).count(),
            unresolved = fields.iter().filter(|f| !f.outcome.is_resolved()).count(),
            "field resolution complete"
        );
        Ok(MatchResult {
            resolution,
            fields,
            issues,
        })
    }

    fn search_alias(
        &self,
        field: &FieldKey,
        hint: Option<&ColumnRef>,
        index: &AliasIndex,
        columns: &[String],
        claims: &HashMap<String, FieldKey>,
        options: &MatchOptions,
    ) -> Option<(ColumnRef, MatchSource)> {
        let key = field.as_str();
        let name = self.schema.output_name(key);
        let mut direct: BTreeSet<&str> = BTreeSet::from([key, name]);
        if let Some(hint) = hint {
            direct.extend(hint.columns());
        }
        let mut seeds = direct.clone();
        seeds.extend(index.labels_of(field));

        let mut candidates: Vec<(AliasRank, usize, &str, String)> = columns
            .iter()
            .enumerate()
            .filter(|(_, column)| claim_allowed(claims, index, column, field))
            .filter_map(|(pos, column)| {
                self.rank(column, &direct, &seeds, options.output_language)
                    .map(|(rank, label)| (rank, pos, column.as_str(), label))
            })
            .collect();
        candidates.sort_by_key(|(rank, pos, _, _)| (*rank, *pos));
        if candidates.len() > 1 {
            debug!(
                field = key,
                candidates = ?candidates.iter().map(|c| c.2).collect::<Vec<_>>(),
                "several columns match, taking the best ranked"
            );
        }
        let (rank, _, column, label) = candidates.into_iter().next()?;
        let source = match rank {
            AliasRank::Primary => MatchSource::PrimaryAlias { label },
            AliasRank::Secondary => MatchSource::SecondaryAlias { label },
        };
        Some((ColumnRef::single(column), source))
    }

    /// Ranks `column` as a candidate for a field.
    ///
    /// `direct` holds the field's key, output name and hinted columns;
    /// `seeds` adds every label reached through the inverse hint index. A
    /// column named after a direct alias, or whose output-language label is
    /// one, ranks first. Any other link to a seed ranks second.
    fn rank(
        &self,
        column: &str,
        direct: &BTreeSet<&str>,
        seeds: &BTreeSet<&str>,
        output_language: LanguageCode,
    ) -> Option<(AliasRank, String)> {
        if direct.contains(column) {
            return Some((AliasRank::Primary, column.to_string()));
        }
        let mut best = None;
        for set in self.catalog.sets_containing(column) {
            if let Some(label) = set.get(output_language).filter(|l| direct.contains(l)) {
                return Some((AliasRank::Primary, label.to_string()));
            }
            if best.is_none()
                && let Some(label) = set.labels().find(|l| seeds.contains(l))
            {
                best = Some((AliasRank::Secondary, label.to_string()));
            }
        }
        if best.is_none() && seeds.contains(column) {
            best = Some((AliasRank::Secondary, column.to_string()));
        }
        best
    }
}

fn claim_allowed(
    claims: &HashMap<String, FieldKey>,
    index: &AliasIndex,
    column: &str,
    field: &FieldKey,
) -> bool {
    match claims.get(column) {
        None => true,
        Some(owner) => owner == field || index.are_synonyms(column, owner, field),
    }
}

/// Lets synonyms of resolved fields inherit their column.
///
/// Requested synonyms that found nothing on their own are upgraded.
/// Unrequested synonyms are added only when `force_keep` is set.
fn propagate_synonyms(fields: &mut Vec<FieldResolution>, index: &AliasIndex, force_keep: bool) {
    let resolved: Vec<(FieldKey, String)> = fields
        .iter()
        .filter_map(|f| match &f.outcome {
            FieldOutcome::Resolved {
                column: ColumnRef::Single(column),
                ..
            } => Some((f.field.clone(), column.clone())),
            _ => None,
        })
        .collect();

    for (field, column) in resolved {
        for other in index.fields_for(&column) {
            if *other == field || !index.are_synonyms(&column, &field, other) {
                continue;
            }
            let inherited = FieldOutcome::Resolved {
                column: ColumnRef::single(column.as_str()),
                source: MatchSource::Propagated {
                    from: field.clone(),
                },
            };
            match fields.iter_mut().find(|f| f.field == *other) {
                Some(existing) if !existing.outcome.is_resolved() => {
                    debug!(field = %other, column = %column, from = %field, "propagated synonym");
                    existing.outcome = inherited;
                }
                Some(_) => {}
                None if force_keep => {
                    debug!(field = %other, column = %column, from = %field, "added synonym");
                    fields.push(FieldResolution {
                        field: other.clone(),
                        outcome: inherited,
                    });
                }
                None => {}
            }
        }
    }
}
