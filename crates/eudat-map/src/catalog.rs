//! Multilingual labels of a dataset's physical columns.

use eudat_model::{
    HarmonizeError, Issue, IssueKind, LabelSet, LanguageCode, Result, RetryPolicy,
};
use tracing::{debug, info_span, warn};

use crate::translator::Translator;

/// Labels of one physical column across languages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLabelSet {
    labels: LabelSet,
}

impl ColumnLabelSet {
    pub fn new(lang: LanguageCode, label: impl Into<String>) -> Self {
        let mut labels = LabelSet::new();
        labels.insert(lang, label.into());
        Self { labels }
    }

    pub fn from_labels(labels: LabelSet) -> Self {
        Self { labels }
    }

    pub fn get(&self, lang: LanguageCode) -> Option<&str> {
        self.labels.get(&lang).map(String::as_str)
    }

    pub fn set(&mut self, lang: LanguageCode, label: impl Into<String>) {
        self.labels.insert(lang, label.into());
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.values().any(|l| l == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.values().map(String::as_str)
    }

    pub fn as_labels(&self) -> &LabelSet {
        &self.labels
    }
}

/// Catalog of column label sets, one per physical column.
///
/// Every label set carries a label in the catalog's input language. Labels in
/// other languages are filled in lazily, one batched translation per missing
/// language, and kept for the lifetime of the catalog.
#[derive(Debug, Clone)]
pub struct ColumnCatalog {
    input_language: LanguageCode,
    columns: Vec<ColumnLabelSet>,
}

impl ColumnCatalog {
    pub fn new(input_language: LanguageCode) -> Self {
        Self {
            input_language,
            columns: Vec::new(),
        }
    }

    /// Records the physical column labels of a dataset under `lang`,
    /// replacing any earlier registration.
    pub fn register<S: AsRef<str>>(&mut self, physical: &[S], lang: LanguageCode) {
        self.input_language = lang;
        self.columns = physical
            .iter()
            .map(|label| ColumnLabelSet::new(lang, label.as_ref()))
            .collect();
        debug!(language = %lang, columns = self.columns.len(), "registered column labels");
    }

    /// Builds a catalog from label sets declared in metadata.
    ///
    /// Sets without an input-language label are discarded. Physical columns
    /// not covered by any declared set get a set of their own.
    pub fn from_label_sets<S: AsRef<str>>(
        input_language: LanguageCode,
        declared: &[LabelSet],
        physical: &[S],
    ) -> Self {
        let mut columns = Vec::with_capacity(declared.len().max(physical.len()));
        for labels in declared {
            if labels.contains_key(&input_language) {
                columns.push(ColumnLabelSet::from_labels(labels.clone()));
            } else {
                warn!(
                    language = %input_language,
                    labels = ?labels,
                    "column label set has no label in the input language, ignoring"
                );
            }
        }
        for label in physical {
            let label = label.as_ref();
            let covered = columns
                .iter()
                .any(|set| set.get(input_language) == Some(label));
            if !covered {
                columns.push(ColumnLabelSet::new(input_language, label));
            }
        }
        Self {
            input_language,
            columns,
        }
    }

    pub fn input_language(&self) -> LanguageCode {
        self.input_language
    }

    pub fn columns(&self) -> &[ColumnLabelSet] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn label_sets(&self) -> Vec<LabelSet> {
        self.columns.iter().map(|c| c.as_labels().clone()).collect()
    }

    /// Label sets that contain `label` in any language.
    pub fn sets_containing<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a ColumnLabelSet> {
        self.columns.iter().filter(move |set| set.contains(label))
    }

    /// Ensures every column has a label in `lang`.
    ///
    /// Columns already labelled in `lang` are not translated again unless
    /// `force` is set. Translation failures are soft: the affected labels
    /// stay missing and an issue is returned.
    pub fn ensure_language(
        &mut self,
        lang: LanguageCode,
        translator: Option<&dyn Translator>,
        retry: &RetryPolicy,
        force: bool,
    ) -> Option<Issue> {
        if lang == self.input_language {
            return None;
        }
        let missing: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, set)| force || set.get(lang).is_none())
            .map(|(idx, _)| idx)
            .collect();
        self.translate_sets(&missing, self.input_language, lang, translator, retry)
    }

    /// Labels of all columns in `lang`, translating the missing ones first.
    pub fn labels_for(
        &mut self,
        lang: LanguageCode,
        translator: Option<&dyn Translator>,
        retry: &RetryPolicy,
    ) -> (Vec<Option<String>>, Option<Issue>) {
        let issue = self.ensure_language(lang, translator, retry, false);
        let labels = self
            .columns
            .iter()
            .map(|set| set.get(lang).map(ToString::to_string))
            .collect();
        (labels, issue)
    }

    /// Translates the given labels from `from` to `to`.
    ///
    /// Labels in the input language that the catalog does not know yet are
    /// registered first; other unknown labels yield `None`. Only labels
    /// without a cached translation are sent to the translator, in one batch.
    pub fn labels_for_columns(
        &mut self,
        columns: &[&str],
        from: LanguageCode,
        to: LanguageCode,
        translator: Option<&dyn Translator>,
        retry: &RetryPolicy,
    ) -> (Vec<Option<String>>, Option<Issue>) {
        let mut indices = Vec::with_capacity(columns.len());
        for label in columns {
            let idx = match self.columns.iter().position(|set| set.get(from) == Some(*label)) {
                Some(idx) => Some(idx),
                None if from == self.input_language => {
                    self.columns.push(ColumnLabelSet::new(from, *label));
                    Some(self.columns.len() - 1)
                }
                None => None,
            };
            indices.push(idx);
        }
        let mut missing: Vec<usize> = indices
            .iter()
            .flatten()
            .copied()
            .filter(|&idx| from != to && self.columns[idx].get(to).is_none())
            .collect();
        missing.sort_unstable();
        missing.dedup();
        let issue = self.translate_sets(&missing, from, to, translator, retry);
        let labels = indices
            .iter()
            .map(|idx| idx.and_then(|idx| self.columns[idx].get(to).map(ToString::to_string)))
            .collect();
        (labels, issue)
    }

    /// Detects the language of `labels` through the translator.
    ///
    /// # Errors
    ///
    /// Fails with [`HarmonizeError::LanguageUnrecognized`] when no translator
    /// is available, the service fails, or the detected code is not in the
    /// language registry.
    pub fn detect_language(
        labels: &[String],
        translator: Option<&dyn Translator>,
        retry: &RetryPolicy,
    ) -> Result<LanguageCode> {
        let translator = translator.ok_or_else(|| {
            HarmonizeError::LanguageUnrecognized(
                "no language declared and no translator available to detect it".into(),
            )
        })?;
        let code = retry
            .run("detect_language", || translator.detect_language(labels))
            .map_err(|err| {
                HarmonizeError::LanguageUnrecognized(format!("language detection failed: {err}"))
            })?;
        let lang = LanguageCode::parse(&code)?;
        debug!(language = %lang, "detected input language");
        Ok(lang)
    }

    fn translate_sets(
        &mut self,
        indices: &[usize],
        from: LanguageCode,
        to: LanguageCode,
        translator: Option<&dyn Translator>,
        retry: &RetryPolicy,
    ) -> Option<Issue> {
        if indices.is_empty() {
            return None;
        }
        let Some(translator) = translator else {
            warn!(from = %from, to = %to, "no translator configured, labels left untranslated");
            return Some(
                Issue::new(
                    IssueKind::ServiceUnavailable,
                    format!("no translator configured, labels not available in '{to}'"),
                )
                .with_count(indices.len()),
            );
        };
        let texts: Vec<String> = indices
            .iter()
            .map(|&idx| self.columns[idx].get(from).unwrap_or_default().to_string())
            .collect();

        let span = info_span!("translate_labels", from = %from, to = %to, count = texts.len());
        let _guard = span.enter();
        match retry.run("translate", || translator.translate(&texts, from, to)) {
            Ok(translated) => {
                let received = translated.len();
                for (&idx, label) in indices.iter().zip(translated) {
                    self.columns[idx].set(to, label);
                }
                if received == texts.len() {
                    debug!(count = received, "translated column labels");
                    None
                } else {
                    warn!(expected = texts.len(), received, "translation returned too few labels");
                    Some(
                        Issue::new(
                            IssueKind::TranslationIncomplete,
                            format!("{received} of {} labels translated into '{to}'", texts.len()),
                        )
                        .with_count(texts.len().saturating_sub(received)),
                    )
                }
            }
            Err(err) => {
                warn!(error = %err, "translation failed, labels left untranslated");
                Some(
                    Issue::new(
                        IssueKind::ServiceUnavailable,
                        format!("translation into '{to}' failed: {err}"),
                    )
                    .with_count(texts.len()),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use eudat_model::ServiceError;

    use super::*;

    struct UpperTranslator {
        calls: Cell<usize>,
    }

    impl Translator for UpperTranslator {
        fn detect_language(&self, _texts: &[String]) -> std::result::Result<String, ServiceError> {
            Ok("de".into())
        }

        fn translate(
            &self,
            texts: &[String],
            _from: LanguageCode,
            _to: LanguageCode,
        ) -> std::result::Result<Vec<String>, ServiceError> {
            self.calls.set(self.calls.get() + 1);
            Ok(texts.iter().map(|t| t.to_uppercase()).collect())
        }
    }

    struct DownTranslator;

    impl Translator for DownTranslator {
        fn detect_language(&self, _texts: &[String]) -> std::result::Result<String, ServiceError> {
            Err(ServiceError::Unavailable("offline".into()))
        }

        fn translate(
            &self,
            _texts: &[String],
            _from: LanguageCode,
            _to: LanguageCode,
        ) -> std::result::Result<Vec<String>, ServiceError> {
            Err(ServiceError::Unavailable("offline".into()))
        }
    }

    fn lang(code: &str) -> LanguageCode {
        LanguageCode::parse(code).unwrap()
    }

    #[test]
    fn translates_once_per_language() {
        let translator = UpperTranslator { calls: Cell::new(0) };
        let mut catalog = ColumnCatalog::new(lang("fr"));
        catalog.register(&["nom", "ville"], lang("fr"));

        let (labels, issue) = catalog.labels_for(lang("en"), Some(&translator), &RetryPolicy::default());
        assert!(issue.is_none());
        assert_eq!(labels, vec![Some("NOM".to_string()), Some("VILLE".to_string())]);

        catalog.labels_for(lang("en"), Some(&translator), &RetryPolicy::default());
        assert_eq!(translator.calls.get(), 1);

        catalog.ensure_language(lang("en"), Some(&translator), &RetryPolicy::default(), true);
        assert_eq!(translator.calls.get(), 2);
    }

    #[test]
    fn input_language_needs_no_translation() {
        let mut catalog = ColumnCatalog::new(lang("en"));
        catalog.register(&["name"], lang("en"));
        let (labels, issue) = catalog.labels_for(lang("en"), None, &RetryPolicy::default());
        assert!(issue.is_none());
        assert_eq!(labels, vec![Some("name".to_string())]);
    }

    #[test]
    fn translation_failure_is_soft() {
        let mut catalog = ColumnCatalog::new(lang("fr"));
        catalog.register(&["nom"], lang("fr"));
        let (labels, issue) =
            catalog.labels_for(lang("en"), Some(&DownTranslator), &RetryPolicy::default());
        assert_eq!(labels, vec![None]);
        assert_eq!(issue.unwrap().kind, IssueKind::ServiceUnavailable);
    }

    #[test]
    fn metadata_sets_are_completed_with_physical_columns() {
        let mut declared = LabelSet::new();
        declared.insert(lang("fr"), "Adresse".into());
        declared.insert(lang("en"), "street".into());
        let mut orphan = LabelSet::new();
        orphan.insert(lang("de"), "Strasse".into());

        let catalog = ColumnCatalog::from_label_sets(
            lang("fr"),
            &[declared, orphan],
            &["Adresse", "Ville"],
        );
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.columns()[0].get(lang("en")), Some("street"));
        assert_eq!(catalog.columns()[1].get(lang("fr")), Some("Ville"));
    }

    #[test]
    fn labels_for_columns_batches_only_missing() {
        let translator = UpperTranslator { calls: Cell::new(0) };
        let mut catalog = ColumnCatalog::new(lang("fr"));
        catalog.register(&["nom", "ville"], lang("fr"));
        let (labels, _) = catalog.labels_for_columns(
            &["ville", "rue"],
            lang("fr"),
            lang("en"),
            Some(&translator),
            &RetryPolicy::default(),
        );
        assert_eq!(labels, vec![Some("VILLE".to_string()), Some("RUE".to_string())]);
        assert_eq!(translator.calls.get(), 1);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn detection_requires_registered_language() {
        let translator = UpperTranslator { calls: Cell::new(0) };
        let detected =
            ColumnCatalog::detect_language(&["Ort".into()], Some(&translator), &RetryPolicy::default())
                .unwrap();
        assert_eq!(detected.as_str(), "de");
        assert!(matches!(
            ColumnCatalog::detect_language(&["Ort".into()], None, &RetryPolicy::default()),
            Err(HarmonizeError::LanguageUnrecognized(_))
        ));
        assert!(
            ColumnCatalog::detect_language(&["Ort".into()], Some(&DownTranslator), &RetryPolicy::default())
                .is_err()
        );
    }
}
