//! The fixed-schema catalog record

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Dataset column order
pub const COLUMNS: &[&str] = &[
    "name", "category", "status", "year", "added", "updated", "views", "videos", "photos",
    "comments", "tags", "type", "about", "history", "other", "picture", "origin", "url",
];

/// Entry year: an integer when the page shows digits, free text otherwise
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Year {
    Number(i64),
    Text(String),
}

impl Year {
    /// Parses a caption value, lowercasing anything that is not a plain number
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(year) = raw.parse() {
                return Self::Number(year);
            }
        }
        Self::Text(raw.to_lowercase())
    }
}

impl Default for Year {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(year) => write!(f, "{}", year),
            Self::Text(text) => write!(f, "{}", text),
        }
    }
}

impl Serialize for Year {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(year) => serializer.serialize_i64(*year),
            Self::Text(text) => serializer.serialize_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for Year {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// One extracted catalog entry
///
/// Fields the page does not provide keep their defaults: empty strings for text
/// and zero for counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub category: String,
    pub status: String,
    pub year: Year,
    pub added: String,
    pub updated: String,
    pub views: u64,
    pub videos: u64,
    pub photos: u64,
    pub comments: u64,
    pub tags: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub about: String,
    pub history: String,
    pub other: String,
    pub picture: String,
    pub origin: String,
    pub url: String,
}

impl Record {
    /// Creates an empty record for the entry at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}
