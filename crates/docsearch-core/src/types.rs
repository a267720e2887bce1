//! Domain types shared by the index, the query path and the tools.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A locale code of the form `ll` or `ll_CC`.
///
/// Parsing accepts `-` as separator and normalizes case, so `en-us`,
/// `EN_us` and `en_US` are the same locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Locale {
    language: String,
    country: Option<String>,
}

impl Locale {
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        let mut parts = code.split(['_', '-']);
        let language = parts.next()?;
        if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        let country = match parts.next() {
            None => None,
            Some(c) if (2..=3).contains(&c.len()) && c.chars().all(|c| c.is_ascii_alphanumeric()) => {
                Some(c.to_ascii_uppercase())
            }
            Some(_) => return None,
        };
        // Variants (`en_US_POSIX`) are not distinguished by the index.
        Some(Self { language: language.to_ascii_lowercase(), country })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn language_only(&self) -> Locale {
        Locale { language: self.language.clone(), country: None }
    }
}

/// English, the locale of last resort.
impl Default for Locale {
    fn default() -> Self {
        Locale { language: "en".to_string(), country: None }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.country {
            Some(country) => write!(f, "{}_{}", self.language, country),
            None => f.write_str(&self.language),
        }
    }
}

/// A versioned provider of documents, e.g. an installed documentation bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSource {
    pub id: String,
    pub version: String,
}

impl ContentSource {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self { id: id.into(), version: version.into() }
    }
}

/// One ranked search result.
///
/// - `href`: document name with the query attached as `resultof` for highlighting
/// - `label`: display title
/// - `score`: rescaled relevance in (0, 1]
/// - `collection`: owning top-level collection, when known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub href: String,
    pub label: String,
    pub score: f32,
    pub collection: Option<String>,
}
