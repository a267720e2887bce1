use std::io::Read;
use std::path::PathBuf;

use crate::types::{ContentSource, Locale};

/// The documentation corpus as seen by the indexer.
///
/// Document names are corpus-relative and always of the form
/// `/<source-id>/<path>`, which is how the index attributes documents to the
/// source that contributed them.
pub trait Corpus: Send + Sync {
    fn sources(&self) -> Vec<ContentSource>;
    fn documents(&self, source_id: &str, locale: &Locale) -> Vec<String>;
    fn open(&self, name: &str, locale: &Locale) -> std::io::Result<Box<dyn Read + Send>>;

    /// Index directories the source ships prebuilt for `locale`, most
    /// specific first. Merged instead of indexing the source's documents.
    fn prebuilt_indexes(&self, _source_id: &str, _locale: &Locale) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Navigation structure used to scope and label search results.
pub trait Collections: Send + Sync {
    /// Top-level collection the document belongs to.
    fn owning_collection(&self, href: &str) -> Option<String>;
    /// Navigable label of the document, used when it has no stored title.
    fn label(&self, href: &str) -> Option<String>;
    /// Whether the document is reachable from the named scope (working set).
    fn scope_contains(&self, scope: &str, href: &str) -> bool;
}
