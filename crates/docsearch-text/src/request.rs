//! The `key=value&...` search request format.

use std::fmt::Write;

/// A parsed search request:
///
/// - `searchWord`: free text query
/// - `field` (repeatable): fields to search
/// - `fieldSearch`: search only the named fields
/// - `scope` (repeatable): working sets restricting the results
/// - `maxHits`: result cap, the manager's `max_hits` setting when absent
/// - `lang`: locale code, the manager's default when absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub search_word: String,
    pub fields: Vec<String>,
    pub field_search: bool,
    pub scopes: Vec<String>,
    pub max_hits: Option<usize>,
    pub locale: Option<String>,
}

fn decode(value: &str) -> String {
    let value = value.replace('+', " ");
    match urlencoding::decode(&value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value,
    }
}

impl SearchQuery {
    pub fn new(search_word: impl Into<String>) -> Self {
        Self { search_word: search_word.into(), ..Self::default() }
    }

    /// Parse a request string. Unknown keys are ignored and values that do
    /// not parse keep their defaults; free text is never rejected.
    pub fn parse(input: &str) -> Self {
        let mut query = SearchQuery::default();
        for pair in input.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode(value);
            match key {
                "searchWord" => query.search_word = value,
                "field" => {
                    if !value.trim().is_empty() {
                        query.fields.push(value.trim().to_string());
                    }
                }
                "fieldSearch" => query.field_search = value.trim().eq_ignore_ascii_case("true"),
                "scope" => {
                    if !value.trim().is_empty() {
                        query.scopes.push(value.trim().to_string());
                    }
                }
                "maxHits" => match value.trim().parse::<usize>() {
                    Ok(n) if n > 0 => query.max_hits = Some(n),
                    _ => tracing::debug!(value = %value, "ignoring invalid maxHits"),
                },
                "lang" => {
                    if !value.trim().is_empty() {
                        query.locale = Some(value.trim().to_string());
                    }
                }
                _ => {}
            }
        }
        query
    }

    pub fn to_wire(&self) -> String {
        let mut out = format!("searchWord={}", urlencoding::encode(&self.search_word));
        for field in &self.fields {
            let _ = write!(out, "&field={}", urlencoding::encode(field));
        }
        if self.field_search {
            out.push_str("&fieldSearch=true");
        }
        for scope in &self.scopes {
            let _ = write!(out, "&scope={}", urlencoding::encode(scope));
        }
        if let Some(max_hits) = self.max_hits {
            let _ = write!(out, "&maxHits={}", max_hits);
        }
        if let Some(locale) = &self.locale {
            let _ = write!(out, "&lang={}", urlencoding::encode(locale));
        }
        out
    }
}
