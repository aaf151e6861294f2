//! Registry of recognised natural languages.
//!
//! Languages are identified by their ISO 639-1 code. A [`LanguageCode`] can
//! only be obtained through the registry, so holding one proves the code is
//! known.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{HarmonizeError, Result};

/// Code of the language used when nothing else is configured.
pub const DEFAULT_LANGUAGE: &str = "en";

const LANGUAGES: &[(&str, &str)] = &[
    ("sq", "albanian"),
    ("ar", "arabic"),
    ("hy", "armenian"),
    ("az", "azerbaijani"),
    ("eu", "basque"),
    ("be", "belarusian"),
    ("bs", "bosnian"),
    ("bg", "bulgarian"),
    ("ca", "catalan"),
    ("co", "corsican"),
    ("hr", "croatian"),
    ("cs", "czech"),
    ("da", "danish"),
    ("nl", "dutch"),
    ("en", "english"),
    ("eo", "esperanto"),
    ("et", "estonian"),
    ("fi", "finnish"),
    ("fr", "french"),
    ("fy", "frisian"),
    ("gl", "galician"),
    ("ka", "georgian"),
    ("de", "german"),
    ("el", "greek"),
    ("hu", "hungarian"),
    ("is", "icelandic"),
    ("ga", "irish"),
    ("it", "italian"),
    ("la", "latin"),
    ("lv", "latvian"),
    ("lt", "lithuanian"),
    ("lb", "luxembourgish"),
    ("mk", "macedonian"),
    ("mt", "maltese"),
    ("no", "norwegian"),
    ("pl", "polish"),
    ("pt", "portuguese"),
    ("ro", "romanian"),
    ("ru", "russian"),
    ("gd", "scots gaelic"),
    ("sr", "serbian"),
    ("sk", "slovak"),
    ("sl", "slovenian"),
    ("es", "spanish"),
    ("sv", "swedish"),
    ("tr", "turkish"),
    ("uk", "ukrainian"),
    ("cy", "welsh"),
];

/// A validated ISO 639-1 language code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LanguageCode {
    code: &'static str,
    name: &'static str,
}

impl LanguageCode {
    /// Looks a language up by code or by English name, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`HarmonizeError::LanguageUnrecognized`] when the value is
    /// neither a registered code nor a registered name.
    pub fn parse(value: &str) -> Result<Self> {
        let needle = value.trim();
        LANGUAGES
            .iter()
            .find(|(code, name)| {
                code.eq_ignore_ascii_case(needle) || name.eq_ignore_ascii_case(needle)
            })
            .map(|&(code, name)| Self { code, name })
            .ok_or_else(|| HarmonizeError::LanguageUnrecognized(value.to_string()))
    }

    /// Resolves a `{code, name}` pair, preferring the code when both are given.
    ///
    /// A pair whose code and name disagree is rejected.
    pub fn from_parts(code: Option<&str>, name: Option<&str>) -> Result<Self> {
        match (code, name) {
            (Some(code), Some(name)) => {
                let by_code = Self::parse(code)?;
                let by_name = Self::parse(name)?;
                if by_code == by_name {
                    Ok(by_code)
                } else {
                    Err(HarmonizeError::LanguageUnrecognized(format!(
                        "{code} ({name})"
                    )))
                }
            }
            (Some(code), None) => Self::parse(code),
            (None, Some(name)) => Self::parse(name),
            (None, None) => Err(HarmonizeError::LanguageUnrecognized(String::new())),
        }
    }

    pub fn english() -> Self {
        Self {
            code: "en",
            name: "english",
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.code
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl FromStr for LanguageCode {
    type Err = HarmonizeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for LanguageCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

impl<'de> Deserialize<'de> for LanguageCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// All registered languages in registry order.
pub fn languages() -> impl Iterator<Item = LanguageCode> {
    LANGUAGES
        .iter()
        .map(|&(code, name)| LanguageCode { code, name })
}

/// Language reference as written in metadata documents: either a bare code
/// or name, or a `{code, name}` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LanguageRef {
    Text(String),
    Parts {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl LanguageRef {
    pub fn resolve(&self) -> Result<LanguageCode> {
        match self {
            Self::Text(value) => LanguageCode::parse(value),
            Self::Parts { code, name } => {
                LanguageCode::from_parts(code.as_deref(), name.as_deref())
            }
        }
    }
}

impl From<LanguageCode> for LanguageRef {
    fn from(value: LanguageCode) -> Self {
        Self::Parts {
            code: Some(value.as_str().to_string()),
            name: Some(value.name().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_and_names() {
        assert_eq!(LanguageCode::parse("fr").unwrap().name(), "french");
        assert_eq!(LanguageCode::parse("German").unwrap().as_str(), "de");
        assert_eq!(LanguageCode::parse(" EN ").unwrap(), LanguageCode::english());
        assert_eq!(LanguageCode::parse("scots gaelic").unwrap().as_str(), "gd");
    }

    #[test]
    fn rejects_unknown_language() {
        let err = LanguageCode::parse("klingon").unwrap_err();
        assert!(matches!(err, HarmonizeError::LanguageUnrecognized(ref v) if v == "klingon"));
    }

    #[test]
    fn rejects_disagreeing_parts() {
        assert!(LanguageCode::from_parts(Some("fr"), Some("german")).is_err());
        assert_eq!(
            LanguageCode::from_parts(Some("fr"), Some("french")).unwrap().as_str(),
            "fr"
        );
    }

    #[test]
    fn registry_has_unique_codes() {
        let mut codes: Vec<&str> = languages().map(|lang| lang.as_str()).collect();
        let total = codes.len();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), total);
        assert_eq!(total, 48);
    }

    #[test]
    fn language_ref_accepts_both_shapes() {
        let text: LanguageRef = serde_json::from_str("\"fr\"").unwrap();
        let parts: LanguageRef = serde_json::from_str(r#"{"name": "french"}"#).unwrap();
        assert_eq!(text.resolve().unwrap(), parts.resolve().unwrap());
    }

    proptest::proptest! {
        #[test]
        fn parse_is_case_insensitive(idx in 0usize..48, upper in proptest::bool::ANY) {
            let lang = languages().nth(idx).unwrap();
            let name = if upper { lang.name().to_uppercase() } else { lang.name().to_string() };
            proptest::prop_assert_eq!(LanguageCode::parse(&name).unwrap(), lang);
            proptest::prop_assert_eq!(LanguageCode::parse(&lang.as_str().to_uppercase()).unwrap(), lang);
        }
    }
}
