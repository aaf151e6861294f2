//! Target schema: the ordered set of canonical fields a harmonised dataset
//! should expose.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{HarmonizeError, Result};

/// Field keys with a dedicated meaning during location resolution and
/// formatting.
pub mod keys {
    pub const LAT: &str = "lat";
    pub const LON: &str = "lon";
    pub const PLACE: &str = "place";
    pub const GEO_QUAL: &str = "geo_qual";
    pub const COUNTRY: &str = "country";
    pub const CC: &str = "cc";
}

/// Default address components assembled into the place column.
pub const DEFAULT_PLACE_COMPONENTS: [&str; 5] = ["street", "number", "postcode", "city", "country"];

/// Stable identifier of a field in the target schema.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldKey(String);

impl FieldKey {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(HarmonizeError::InvalidFieldKey(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FieldKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for FieldKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for FieldKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Semantic type of a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SemanticType {
    String,
    Integer,
    Float,
    Boolean,
    Datetime,
    /// Passthrough; values are never cast.
    #[default]
    Object,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::String => "str",
            SemanticType::Integer => "int",
            SemanticType::Float => "float",
            SemanticType::Boolean => "bool",
            SemanticType::Datetime => "datetime",
            SemanticType::Object => "object",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticType {
    type Err = HarmonizeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "str" | "string" | "text" => Ok(SemanticType::String),
            "int" | "integer" => Ok(SemanticType::Integer),
            "float" | "double" | "number" => Ok(SemanticType::Float),
            "bool" | "boolean" => Ok(SemanticType::Boolean),
            "datetime" | "date" | "timestamp" => Ok(SemanticType::Datetime),
            "object" => Ok(SemanticType::Object),
            _ => Err(HarmonizeError::InvalidSemanticType(s.to_string())),
        }
    }
}

impl Serialize for SemanticType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SemanticType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One canonical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: FieldKey,
    /// Output column name.
    pub name: String,
    pub semantic: SemanticType,
    /// Output format for datetime fields, overriding the configured default.
    pub datetime_format: Option<String>,
}

impl FieldSpec {
    pub fn new(key: FieldKey, name: impl Into<String>, semantic: SemanticType) -> Self {
        Self {
            key,
            name: name.into(),
            semantic,
            datetime_format: None,
        }
    }

    #[must_use]
    pub fn with_datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = Some(format.into());
        self
    }
}

/// Ordered collection of canonical fields.
///
/// Declaration order is the output column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSchema {
    fields: Vec<FieldSpec>,
}

impl TargetSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        let mut schema = Self::default();
        for field in fields {
            schema.upsert(field);
        }
        schema
    }

    /// Inserts a field, replacing an existing field with the same key in
    /// place.
    pub fn upsert(&mut self, field: FieldSpec) {
        match self.fields.iter_mut().find(|f| f.key == field.key) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Output column name of a field, or the key itself for fields the
    /// schema does not declare.
    pub fn output_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).map_or(key, |f| f.name.as_str())
    }

    pub fn field_for_output(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.fields.iter().map(|f| &f.key)
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns a copy with `overrides` applied on top; overriding fields win.
    #[must_use]
    pub fn merged(&self, overrides: &[FieldSpec]) -> Self {
        let mut merged = self.clone();
        for field in overrides {
            merged.upsert(field.clone());
        }
        merged
    }
}
