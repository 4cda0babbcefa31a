use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical identifier of a discovery source or verification capability.
///
/// Identifiers are trimmed and lowercased; only ASCII alphanumerics, `_`, `-`
/// and `.` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceId(String);

impl SourceId {
    pub const GOOGLE_PLACES: &'static str = "google_places";
    pub const FOURSQUARE: &'static str = "foursquare";
    pub const STATE_REGISTRY: &'static str = "state_registry";
    pub const YELP: &'static str = "yelp";
    pub const WEBSITE_SCRAPE: &'static str = "website_scrape";
    pub const DIRECTORY: &'static str = "directory";
    pub const WEBSITE_PROBE: &'static str = "website_probe";
    pub const RECORDED: &'static str = "recorded";

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(ValidationError::EmptySourceId);
        }

        if let Some(ch) = normalized
            .chars()
            .find(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.')))
        {
            return Err(ValidationError::SourceIdInvalidChar {
                value: normalized,
                ch,
            });
        }

        Ok(Self(normalized))
    }

    pub fn google_places() -> Self {
        Self(String::from(Self::GOOGLE_PLACES))
    }

    pub fn foursquare() -> Self {
        Self(String::from(Self::FOURSQUARE))
    }

    pub fn website_probe() -> Self {
        Self(String::from(Self::WEBSITE_PROBE))
    }

    pub fn recorded() -> Self {
        Self(String::from(Self::RECORDED))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for SourceId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SourceId> for String {
    fn from(value: SourceId) -> Self {
        value.0
    }
}
