//! Extraction of searchable text from documentation files.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::DocumentError;

static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").expect("valid regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

// Wide enough that html2text never wraps a paragraph.
const RENDER_WIDTH: usize = 10_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    pub title: String,
    pub body: String,
}

fn is_markup(name: &str, text: &str) -> bool {
    let path = name.split(['?', '#']).next().unwrap_or(name).to_ascii_lowercase();
    [".htm", ".html", ".xhtml", ".xml"].iter().any(|ext| path.ends_with(ext)) || text.trim_start().starts_with('<')
}

pub fn parse_document(name: &str, text: &str) -> Result<ParsedDocument, DocumentError> {
    if is_markup(name, text) {
        parse_markup(name, text)
    } else {
        let title = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default().to_string();
        Ok(ParsedDocument { title, body: text.to_string() })
    }
}

fn parse_markup(name: &str, text: &str) -> Result<ParsedDocument, DocumentError> {
    let title = match TITLE_RE.captures(text).and_then(|c| c.get(1)) {
        Some(m) => render(name, m.as_str())?,
        None => String::new(),
    };
    // The title is indexed on its own fields.
    let body = TITLE_RE.replace_all(text, " ");
    Ok(ParsedDocument { title, body: render(name, &body)? })
}

fn render(name: &str, html: &str) -> Result<String, DocumentError> {
    let text = html2text::config::plain()
        .string_from_read(html.as_bytes(), RENDER_WIDTH)
        .map_err(|source| DocumentError::Unparsable { name: name.to_string(), source })?;
    Ok(SPACE_RE.replace_all(text.trim(), " ").into_owned())
}
