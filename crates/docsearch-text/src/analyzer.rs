//! Locale-specific text analysis.
//!
//! An [`Analyzer`] turns field text into index terms. The same analyzer is
//! registered with tantivy for indexing and used directly by the query
//! builder, so query words and indexed words always go through one pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use docsearch_core::Locale;
use tantivy::tokenizer::{
    Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer, TokenStream,
};

/// Prefix of the fields that keep unstemmed text for literal phrase matching.
pub const EXACT_PREFIX: &str = "exact_";

const MAX_TOKEN_LEN: usize = 40;

pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it", "no", "not", "of",
    "on", "or", "such", "that", "the", "their", "then", "there", "these", "they", "this", "to", "was", "will",
    "with",
];

/// One analyzed word and its position in the source text. Positions keep
/// the gaps left by removed stop words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub position: usize,
}

impl Word {
    pub fn new(text: impl Into<String>, position: usize) -> Self {
        Self { text: text.into(), position }
    }
}

pub trait Analyzer: Send + Sync {
    /// Identifier recorded with an index; a different id forces a rebuild.
    fn id(&self) -> &str;

    /// The tantivy pipeline used for `field`.
    fn text_analyzer(&self, field: &str) -> TextAnalyzer;

    /// Whether quoted phrases should be matched against the `exact_` fields.
    fn exact_phrases(&self) -> bool {
        false
    }

    fn tokenize(&self, field: &str, text: &str) -> Vec<Word> {
        let mut analyzer = self.text_analyzer(field);
        let mut stream = analyzer.token_stream(text);
        let mut words = Vec::new();
        while stream.advance() {
            let token = stream.token();
            words.push(Word::new(token.text.clone(), token.position));
        }
        words
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StemLanguage {
    Arabic,
    Danish,
    Dutch,
    English,
    Finnish,
    French,
    German,
    Greek,
    Hungarian,
    Italian,
    Norwegian,
    Portuguese,
    Romanian,
    Russian,
    Spanish,
    Swedish,
    Tamil,
    Turkish,
}

impl StemLanguage {
    const ALL: [(&'static str, StemLanguage); 18] = [
        ("arabic", StemLanguage::Arabic),
        ("danish", StemLanguage::Danish),
        ("dutch", StemLanguage::Dutch),
        ("english", StemLanguage::English),
        ("finnish", StemLanguage::Finnish),
        ("french", StemLanguage::French),
        ("german", StemLanguage::German),
        ("greek", StemLanguage::Greek),
        ("hungarian", StemLanguage::Hungarian),
        ("italian", StemLanguage::Italian),
        ("norwegian", StemLanguage::Norwegian),
        ("portuguese", StemLanguage::Portuguese),
        ("romanian", StemLanguage::Romanian),
        ("russian", StemLanguage::Russian),
        ("spanish", StemLanguage::Spanish),
        ("swedish", StemLanguage::Swedish),
        ("tamil", StemLanguage::Tamil),
        ("turkish", StemLanguage::Turkish),
    ];

    pub fn name(self) -> &'static str {
        Self::ALL.iter().find(|(_, l)| *l == self).map_or("english", |(n, _)| *n)
    }

    fn tantivy(self) -> Language {
        match self {
            StemLanguage::Arabic => Language::Arabic,
            StemLanguage::Danish => Language::Danish,
            StemLanguage::Dutch => Language::Dutch,
            StemLanguage::English => Language::English,
            StemLanguage::Finnish => Language::Finnish,
            StemLanguage::French => Language::French,
            StemLanguage::German => Language::German,
            StemLanguage::Greek => Language::Greek,
            StemLanguage::Hungarian => Language::Hungarian,
            StemLanguage::Italian => Language::Italian,
            StemLanguage::Norwegian => Language::Norwegian,
            StemLanguage::Portuguese => Language::Portuguese,
            StemLanguage::Romanian => Language::Romanian,
            StemLanguage::Russian => Language::Russian,
            StemLanguage::Spanish => Language::Spanish,
            StemLanguage::Swedish => Language::Swedish,
            StemLanguage::Tamil => Language::Tamil,
            StemLanguage::Turkish => Language::Turkish,
        }
    }
}

impl FromStr for StemLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, l)| *l)
            .ok_or_else(|| format!("unknown stemming language '{}'", s))
    }
}

/// The closed set of analysis pipelines, as written in configuration:
/// `default`, `stemming:<language>` or `smart:<language>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerKind {
    Default,
    Stemming(StemLanguage),
    /// Stemming for regular fields, the default pipeline for `exact_` fields.
    Smart(StemLanguage),
}

impl FromStr for AnalyzerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(':') {
            None if s.eq_ignore_ascii_case("default") => Ok(AnalyzerKind::Default),
            Some((kind, lang)) if kind.eq_ignore_ascii_case("stemming") => Ok(AnalyzerKind::Stemming(lang.parse()?)),
            Some((kind, lang)) if kind.eq_ignore_ascii_case("smart") => Ok(AnalyzerKind::Smart(lang.parse()?)),
            _ => Err(format!("unknown analyzer kind '{}'", s)),
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerKind::Default => f.write_str("default"),
            AnalyzerKind::Stemming(lang) => write!(f, "stemming:{}", lang.name()),
            AnalyzerKind::Smart(lang) => write!(f, "smart:{}", lang.name()),
        }
    }
}

fn default_pipeline() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
        .filter(LowerCaser)
        .build()
}

fn stemming_pipeline(lang: StemLanguage) -> TextAnalyzer {
    if lang == StemLanguage::English {
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
            .filter(LowerCaser)
            .filter(StopWordFilter::remove(ENGLISH_STOP_WORDS.iter().map(|s| s.to_string())))
            .filter(Stemmer::new(lang.tantivy()))
            .build()
    } else {
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
            .filter(LowerCaser)
            .filter(Stemmer::new(lang.tantivy()))
            .build()
    }
}

/// An analyzer of a given kind bound to the locale it serves.
#[derive(Debug, Clone)]
pub struct LocaleAnalyzer {
    kind: AnalyzerKind,
    id: String,
}

impl LocaleAnalyzer {
    pub fn new(kind: AnalyzerKind, locale: &Locale) -> Self {
        Self { kind, id: format!("{}@{}", kind, locale) }
    }

    pub fn kind(&self) -> AnalyzerKind {
        self.kind
    }
}

impl Analyzer for LocaleAnalyzer {
    fn id(&self) -> &str {
        &self.id
    }

    fn text_analyzer(&self, field: &str) -> TextAnalyzer {
        match self.kind {
            AnalyzerKind::Default => default_pipeline(),
            AnalyzerKind::Stemming(lang) => stemming_pipeline(lang),
            AnalyzerKind::Smart(_) if field.starts_with(EXACT_PREFIX) => default_pipeline(),
            AnalyzerKind::Smart(lang) => stemming_pipeline(lang),
        }
    }

    fn exact_phrases(&self) -> bool {
        matches!(self.kind, AnalyzerKind::Smart(_))
    }
}

const BUILTIN_ANALYZERS: &[(&str, AnalyzerKind)] = &[
    ("en", AnalyzerKind::Smart(StemLanguage::English)),
    ("de", AnalyzerKind::Smart(StemLanguage::German)),
    ("fr", AnalyzerKind::Smart(StemLanguage::French)),
    ("es", AnalyzerKind::Smart(StemLanguage::Spanish)),
    ("it", AnalyzerKind::Smart(StemLanguage::Italian)),
    ("pt", AnalyzerKind::Smart(StemLanguage::Portuguese)),
    ("nl", AnalyzerKind::Smart(StemLanguage::Dutch)),
    ("sv", AnalyzerKind::Smart(StemLanguage::Swedish)),
];

/// Locale to analyzer lookup, owned by the search manager.
#[derive(Debug, Clone)]
pub struct AnalyzerRegistry {
    default_locale: Locale,
    table: BTreeMap<Locale, AnalyzerKind>,
}

impl AnalyzerRegistry {
    /// Built-in table extended by `overrides` (locale code to analyzer kind).
    /// Entries that do not parse are logged and ignored.
    pub fn new(default_locale: Locale, overrides: &BTreeMap<String, String>) -> Self {
        let mut table: BTreeMap<Locale, AnalyzerKind> = BUILTIN_ANALYZERS
            .iter()
            .filter_map(|(code, kind)| Some((Locale::parse(code)?, *kind)))
            .collect();
        for (code, kind) in overrides {
            let Some(locale) = Locale::parse(code) else {
                tracing::warn!(locale = %code, "ignoring analyzer entry with invalid locale");
                continue;
            };
            match kind.parse::<AnalyzerKind>() {
                Ok(kind) => {
                    table.insert(locale, kind);
                }
                Err(e) => tracing::warn!(locale = %code, error = %e, "ignoring analyzer entry"),
            }
        }
        Self { default_locale, table }
    }

    pub fn default_locale(&self) -> &Locale {
        &self.default_locale
    }

    /// The locale whose analyzer serves `requested`:
    /// `ll_CC`, then `ll`, then the default locale.
    pub fn resolve(&self, requested: &Locale) -> Locale {
        if self.table.contains_key(requested) {
            return requested.clone();
        }
        let language = requested.language_only();
        if language != *requested && self.table.contains_key(&language) {
            tracing::warn!(requested = %requested, resolved = %language, "locale not supported, using language");
            return language;
        }
        if *requested != self.default_locale {
            tracing::warn!(requested = %requested, resolved = %self.default_locale, "locale not supported, using default");
        }
        self.default_locale.clone()
    }

    pub fn kind_for(&self, locale: &Locale) -> AnalyzerKind {
        self.table.get(locale).copied().unwrap_or(AnalyzerKind::Default)
    }

    /// Analyzer for an already resolved locale.
    pub fn analyzer_for(&self, locale: &Locale) -> Arc<dyn Analyzer> {
        Arc::new(LocaleAnalyzer::new(self.kind_for(locale), locale))
    }
}
