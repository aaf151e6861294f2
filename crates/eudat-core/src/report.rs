//! Outcome of a harmonisation run.

use eudat_geo::LocationOutcome;
use eudat_map::{FieldOutcome, FieldResolution};
use eudat_model::{FieldKey, Issue, ResolutionMap};

/// A field that found no column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedField {
    pub field: FieldKey,
    /// Whether the field was kept as an empty column.
    pub kept: bool,
    /// Similar dataset columns, best first.
    pub suggestions: Vec<String>,
}

/// What [`crate::Harmonizer::format`] did.
#[derive(Debug, Clone, Default)]
pub struct HarmonizeReport {
    pub fields: Vec<FieldResolution>,
    pub unresolved: Vec<UnresolvedField>,
    /// Field keys mapped onto output columns.
    pub resolution: ResolutionMap,
    pub location: Option<LocationOutcome>,
    pub created: Vec<String>,
    pub dropped: Vec<String>,
    /// Columns of the harmonised dataset, in order.
    pub columns: Vec<String>,
    pub issues: Vec<Issue>,
}

impl HarmonizeReport {
    pub(crate) fn unresolved_from(fields: &[FieldResolution]) -> Vec<UnresolvedField> {
        fields
            .iter()
            .filter_map(|entry| match &entry.outcome {
                FieldOutcome::Resolved { .. } => None,
                FieldOutcome::Placeholder { suggestions } => Some(UnresolvedField {
                    field: entry.field.clone(),
                    kept: true,
                    suggestions: suggestions.clone(),
                }),
                FieldOutcome::Dropped { suggestions } => Some(UnresolvedField {
                    field: entry.field.clone(),
                    kept: false,
                    suggestions: suggestions.clone(),
                }),
            })
            .collect()
    }

    pub fn resolved_count(&self) -> usize {
        self.fields.iter().filter(|f| f.outcome.is_resolved()).count()
    }

    /// True when every requested field resolved and nothing was reported.
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.issues.is_empty()
    }
}
