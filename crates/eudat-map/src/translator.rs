//! Translation service abstraction and an offline glossary implementation.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use eudat_model::{HarmonizeError, LanguageCode, ServiceError};

/// External translation service.
///
/// Implementations are expected to be batch-oriented: one call translates
/// every label of a dataset.
pub trait Translator {
    /// Guesses the language of `texts`, returning an ISO 639-1 code.
    fn detect_language(&self, texts: &[String]) -> Result<String, ServiceError>;

    /// Translates `texts` from one language to another, preserving order.
    fn translate(
        &self,
        texts: &[String],
        from: LanguageCode,
        to: LanguageCode,
    ) -> Result<Vec<String>, ServiceError>;
}

/// Translator backed by fixed per-language-pair glossaries.
///
/// The JSON form is an object keyed by `"<from>:<to>"`, each value mapping
/// a label to its translation:
///
/// ```json
/// { "fr:en": { "Adresse": "street", "Ville": "city" } }
/// ```
///
/// Labels missing from a glossary are returned unchanged.
#[derive(Debug, Clone, Default)]
pub struct GlossaryTranslator {
    glossaries: BTreeMap<(LanguageCode, LanguageCode), BTreeMap<String, String>>,
}

impl GlossaryTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entry(
        mut self,
        from: LanguageCode,
        to: LanguageCode,
        label: impl Into<String>,
        translation: impl Into<String>,
    ) -> Self {
        self.glossaries
            .entry((from, to))
            .or_default()
            .insert(label.into(), translation.into());
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self, HarmonizeError> {
        let raw: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_str(text)?;
        let mut glossaries = BTreeMap::new();
        for (pair, entries) in raw {
            let (from, to) = pair.split_once(':').ok_or_else(|| {
                HarmonizeError::Metadata(format!(
                    "glossary key '{pair}' must have the form '<from>:<to>'"
                ))
            })?;
            let key = (LanguageCode::parse(from)?, LanguageCode::parse(to)?);
            glossaries.insert(key, entries);
        }
        Ok(Self { glossaries })
    }

    pub fn from_path(path: &Path) -> Result<Self, HarmonizeError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    fn lookup<'a>(entries: &'a BTreeMap<String, String>, label: &str) -> Option<&'a str> {
        entries.get(label).map(String::as_str).or_else(|| {
            entries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(label))
                .map(|(_, v)| v.as_str())
        })
    }
}

impl Translator for GlossaryTranslator {
    fn detect_language(&self, texts: &[String]) -> Result<String, ServiceError> {
        let mut hits: BTreeMap<LanguageCode, usize> = BTreeMap::new();
        for ((from, _), entries) in &self.glossaries {
            let count = texts
                .iter()
                .filter(|text| Self::lookup(entries, text).is_some())
                .count();
            *hits.entry(*from).or_default() += count;
        }
        hits.into_iter()
            .filter(|(_, count)| *count > 0)
            .max_by_key(|(_, count)| *count)
            .map(|(lang, _)| lang.as_str().to_string())
            .ok_or_else(|| ServiceError::Rejected("no glossary matches the given labels".into()))
    }

    fn translate(
        &self,
        texts: &[String],
        from: LanguageCode,
        to: LanguageCode,
    ) -> Result<Vec<String>, ServiceError> {
        let entries = self.glossaries.get(&(from, to)).ok_or_else(|| {
            ServiceError::Rejected(format!("no glossary from '{from}' to '{to}'"))
        })?;
        Ok(texts
            .iter()
            .map(|text| {
                Self::lookup(entries, text)
                    .map_or_else(|| text.clone(), ToString::to_string)
            })
            .collect())
    }
}
