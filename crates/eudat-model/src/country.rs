//! Registry of recognised countries, keyed by their Eurostat alpha-2 code.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{HarmonizeError, Result};

const COUNTRIES: &[(&str, &str)] = &[
    ("BE", "Belgium"),
    ("EL", "Greece"),
    ("LT", "Lithuania"),
    ("PT", "Portugal"),
    ("BG", "Bulgaria"),
    ("ES", "Spain"),
    ("LU", "Luxembourg"),
    ("RO", "Romania"),
    ("CZ", "Czechia"),
    ("FR", "France"),
    ("HU", "Hungary"),
    ("SI", "Slovenia"),
    ("DK", "Denmark"),
    ("HR", "Croatia"),
    ("MT", "Malta"),
    ("SK", "Slovakia"),
    ("DE", "Germany"),
    ("IT", "Italy"),
    ("NL", "Netherlands"),
    ("FI", "Finland"),
    ("EE", "Estonia"),
    ("CY", "Cyprus"),
    ("AT", "Austria"),
    ("SE", "Sweden"),
    ("IE", "Ireland"),
    ("LV", "Latvia"),
    ("PL", "Poland"),
    ("UK", "United Kingdom"),
    ("IS", "Iceland"),
    ("NO", "Norway"),
    ("CH", "Switzerland"),
    ("LI", "Liechtenstein"),
    ("ME", "Montenegro"),
    ("MK", "North Macedonia"),
    ("AL", "Albania"),
    ("RS", "Serbia"),
    ("TR", "Turkey"),
    ("XK", "Kosovo"),
    ("BA", "Bosnia and Herzegovina"),
    ("MD", "Moldova"),
    ("AM", "Armenia"),
    ("BY", "Belarus"),
    ("GE", "Georgia"),
    ("AZ", "Azerbaijan"),
    ("UA", "Ukraine"),
];

/// A validated country with its registry code and English name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Country {
    code: &'static str,
    name: &'static str,
}

impl Country {
    /// Looks a country up by code or by name, case-insensitively.
    ///
    /// `GR` and `GB` are accepted as aliases of the registry codes `EL` and
    /// `UK`.
    pub fn parse(value: &str) -> Result<Self> {
        let needle = match value.trim() {
            v if v.eq_ignore_ascii_case("GR") => "EL",
            v if v.eq_ignore_ascii_case("GB") => "UK",
            v => v,
        };
        COUNTRIES
            .iter()
            .find(|(code, name)| {
                code.eq_ignore_ascii_case(needle) || name.eq_ignore_ascii_case(needle)
            })
            .map(|&(code, name)| Self { code, name })
            .ok_or_else(|| HarmonizeError::CountryUnrecognized(value.to_string()))
    }

    pub fn from_parts(code: Option<&str>, name: Option<&str>) -> Result<Self> {
        match (code, name) {
            (Some(code), _) => Self::parse(code),
            (None, Some(name)) => Self::parse(name),
            (None, None) => Err(HarmonizeError::CountryUnrecognized(String::new())),
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

impl Serialize for Country {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

impl<'de> Deserialize<'de> for Country {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

pub fn countries() -> impl Iterator<Item = Country> {
    COUNTRIES.iter().map(|&(code, name)| Country { code, name })
}

/// Country reference as written in metadata documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountryRef {
    Text(String),
    Parts {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl CountryRef {
    pub fn resolve(&self) -> Result<Country> {
        match self {
            Self::Text(value) => Country::parse(value),
            Self::Parts { code, name } => Country::from_parts(code.as_deref(), name.as_deref()),
        }
    }
}

impl From<Country> for CountryRef {
    fn from(value: Country) -> Self {
        Self::Parts {
            code: Some(value.code().to_string()),
            name: Some(value.name().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_code_name_and_aliases() {
        assert_eq!(Country::parse("fr").unwrap().name(), "France");
        assert_eq!(Country::parse("north macedonia").unwrap().code(), "MK");
        assert_eq!(Country::parse("GR").unwrap().code(), "EL");
        assert_eq!(Country::parse("gb").unwrap().code(), "UK");
    }

    #[test]
    fn unknown_country_is_a_hard_error() {
        assert!(matches!(
            Country::parse("Atlantis"),
            Err(HarmonizeError::CountryUnrecognized(_))
        ));
    }

    #[test]
    fn country_ref_resolves_object_form() {
        let parsed: CountryRef =
            serde_json::from_str(r#"{"code": "IT", "name": "Italy"}"#).unwrap();
        assert_eq!(parsed.resolve().unwrap().name(), "Italy");
    }
}
