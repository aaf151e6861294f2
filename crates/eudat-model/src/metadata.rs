//! JSON documents describing a harmoniser configuration and a source
//! dataset.
//!
//! Both documents carry an ordered `index` object. Key order in that object
//! is significant (it drives output column order), so it is read into an
//! ordered list rather than a map.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::country::{Country, CountryRef};
use crate::error::{HarmonizeError, Result};
use crate::language::{LanguageCode, LanguageRef};
use crate::resolution::{ColumnRef, ResolutionMap};
use crate::schema::{FieldKey, FieldSpec, SemanticType, TargetSchema};

/// Labels of one physical column, keyed by language.
pub type LabelSet = BTreeMap<LanguageCode, String>;

/// A `{name, type}` field declaration inside an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    pub name: String,
    #[serde(rename = "type", default)]
    pub semantic: SemanticType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtfmt: Option<String>,
}

/// Value of one index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexValue {
    Declaration(FieldDeclaration),
    Column(ColumnRef),
}

/// Insertion-ordered `index` object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDocument {
    entries: Vec<(String, Option<IndexValue>)>,
}

impl IndexDocument {
    pub fn push(&mut self, key: impl Into<String>, value: Option<IndexValue>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&IndexValue>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Field declarations in index order.
    pub fn declarations(&self) -> Result<Vec<FieldSpec>> {
        let mut fields = Vec::new();
        for (key, value) in &self.entries {
            if let Some(IndexValue::Declaration(decl)) = value {
                fields.push(declaration_to_field(key, decl)?);
            }
        }
        Ok(fields)
    }

    /// Column hints in index order. Null entries are kept as empty hints.
    pub fn hints(&self) -> Result<ResolutionMap> {
        let mut hints = ResolutionMap::new();
        for (key, value) in &self.entries {
            match value {
                Some(IndexValue::Column(column)) => {
                    hints.set(FieldKey::new(key.as_str())?, Some(column.clone()));
                }
                None => hints.set(FieldKey::new(key.as_str())?, None),
                Some(IndexValue::Declaration(_)) => {}
            }
        }
        Ok(hints)
    }
}

fn declaration_to_field(key: &str, decl: &FieldDeclaration) -> Result<FieldSpec> {
    let mut field = FieldSpec::new(FieldKey::new(key)?, decl.name.clone(), decl.semantic);
    field.datetime_format.clone_from(&decl.dtfmt);
    Ok(field)
}

impl Serialize for IndexDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct IndexVisitor(PhantomData<IndexDocument>);

impl<'de> Visitor<'de> for IndexVisitor {
    type Value = IndexDocument;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping field keys to columns or declarations")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut doc = IndexDocument::default();
        while let Some((key, value)) = access.next_entry::<String, Option<IndexValue>>()? {
            doc.push(key, value);
        }
        Ok(doc)
    }
}

impl<'de> Deserialize<'de> for IndexDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(IndexVisitor(PhantomData))
    }
}

/// Options block of a harmoniser configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOptions {
    /// Output language of column labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<LanguageRef>,
    /// Output projection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proj: Option<String>,
    /// Place components, in assembly order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<Vec<String>>,
    /// Output datetime format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtfmt: Option<String>,
    /// Coordinate order, `lL` or `Ll`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

/// Harmoniser configuration document: the target schema of a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub index: IndexDocument,
    #[serde(default)]
    pub options: ConfigOptions,
}

impl SchemaConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the target schema from the index declarations.
    ///
    /// # Errors
    ///
    /// Every configuration index entry must be a `{name, type}` declaration.
    pub fn target_schema(&self) -> Result<TargetSchema> {
        if let Some((key, _)) = self
            .index
            .iter()
            .find(|(_, v)| !matches!(v, Some(IndexValue::Declaration(_))))
        {
            return Err(HarmonizeError::Metadata(format!(
                "configuration index entry '{key}' must be a {{name, type}} declaration"
            )));
        }
        Ok(TargetSchema::new(self.index.declarations()?))
    }

    pub fn output_language(&self) -> Result<Option<LanguageCode>> {
        self.options.lang.as_ref().map(LanguageRef::resolve).transpose()
    }
}

/// Metadata document describing one source dataset.
///
/// Unknown top-level keys are preserved so that a round trip through
/// [`DatasetMetadata::to_json_pretty`] keeps them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<CountryRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<LanguageRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<LabelSet>,
    #[serde(default)]
    pub index: IndexDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proj: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Input datetime format of the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtfmt: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DatasetMetadata {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn language(&self) -> Result<Option<LanguageCode>> {
        self.lang.as_ref().map(LanguageRef::resolve).transpose()
    }

    pub fn country(&self) -> Result<Option<Country>> {
        self.country.as_ref().map(CountryRef::resolve).transpose()
    }

    /// Column hints declared by the source.
    pub fn hints(&self) -> Result<ResolutionMap> {
        self.index.hints()
    }

    /// Ad-hoc fields declared by the source with a `{name, type}` entry.
    pub fn ad_hoc_fields(&self) -> Result<Vec<FieldSpec>> {
        self.index.declarations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "category": "education",
        "index": {
            "id": {"name": "id", "type": "int"},
            "name": {"name": "name", "type": "str"},
            "lat": {"name": "lat", "type": "float"},
            "lon": {"name": "lon", "type": "float"},
            "opened": {"name": "opened", "type": "datetime", "dtfmt": "%Y-%m-%d"}
        },
        "options": {"lang": "en", "proj": "WGS84", "order": "lL"}
    }"#;

    #[test]
    fn config_preserves_index_order() {
        let config = SchemaConfig::from_json_str(CONFIG).unwrap();
        let schema = config.target_schema().unwrap();
        assert_eq!(schema.output_names(), vec!["id", "name", "lat", "lon", "opened"]);
        assert_eq!(
            schema.get("opened").unwrap().datetime_format.as_deref(),
            Some("%Y-%m-%d")
        );
        assert_eq!(config.output_language().unwrap().unwrap().as_str(), "en");
    }

    #[test]
    fn config_rejects_column_hints() {
        let config = SchemaConfig::from_json_str(r#"{"index": {"id": "ID"}}"#).unwrap();
        assert!(matches!(
            config.target_schema(),
            Err(HarmonizeError::Metadata(_))
        ));
    }

    #[test]
    fn metadata_splits_hints_and_declarations() {
        let meta = DatasetMetadata::from_json_str(
            r#"{
                "country": {"code": "FR", "name": "France"},
                "lang": {"code": "fr", "name": "french"},
                "columns": [{"fr": "Nom"}, {"fr": "Adresse"}],
                "index": {
                    "name": "Nom",
                    "place": ["Adresse", "Ville"],
                    "lat": null,
                    "beds": {"name": "beds", "type": "int"}
                },
                "provider": "ministry",
                "licence": "open"
            }"#,
        )
        .unwrap();

        let hints = meta.hints().unwrap();
        assert_eq!(hints.get("name"), Some(&ColumnRef::single("Nom")));
        assert_eq!(
            hints.get("place"),
            Some(&ColumnRef::Multiple(vec!["Adresse".into(), "Ville".into()]))
        );
        assert!(hints.contains_key("lat"));
        assert!(!hints.contains_key("beds"));

        let ad_hoc = meta.ad_hoc_fields().unwrap();
        assert_eq!(ad_hoc.len(), 1);
        assert_eq!(ad_hoc[0].semantic, SemanticType::Integer);

        assert_eq!(meta.country().unwrap().unwrap().code(), "FR");
        assert_eq!(meta.extra.get("licence"), Some(&serde_json::json!("open")));
    }

    #[test]
    fn metadata_round_trip_keeps_index_order() {
        let text = r#"{"index":{"z":"Z","a":"A","m":null}}"#;
        let meta = DatasetMetadata::from_json_str(text).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&meta.to_json_pretty().unwrap()).unwrap();
        let keys: Vec<&str> = meta.index.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(json["index"]["a"], serde_json::json!("A"));
        insta::assert_snapshot!(serde_json::to_string(&meta.index).unwrap(), @r#"{"z":"Z","a":"A","m":null}"#);
    }
}
