use std::fmt;

use serde::{Deserialize, Serialize};

/// How trustworthy the coordinates of a record are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoQuality {
    /// Taken from the source data.
    Direct,
    /// Produced by a geocoder; no quality score is assigned.
    GeocodedUnscored,
}

impl GeoQuality {
    /// Value stored in the quality column; geocoded rows stay null.
    pub fn flag(&self) -> Option<i64> {
        match self {
            GeoQuality::Direct => Some(1),
            GeoQuality::GeocodedUnscored => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeoQuality::Direct => "direct",
            GeoQuality::GeocodedUnscored => "geocoded",
        }
    }
}

impl fmt::Display for GeoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
