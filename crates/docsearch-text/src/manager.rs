//! Entry point owning the analyzers and the per-locale indexes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use docsearch_core::{Collections, Corpus, Locale, SearchHit, SearchSettings};

use crate::analyzer::{Analyzer, AnalyzerRegistry};
use crate::collector::ResultCollector;
use crate::error::IndexError;
use crate::indexing::{IndexingOperation, IndexingOutcome};
use crate::prebuilt;
use crate::progress::{ProgressDistributor, ProgressMonitor};
use crate::query::QueryBuilder;
use crate::request::SearchQuery;
use crate::schema::is_searchable;
use crate::search::compile;
use crate::store::IndexStore;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    /// The locale's index is missing or unusable and must be rebuilt.
    pub index_missing: bool,
}

/// The index of one locale. Updates hold the write lock for their whole
/// duration, searches the read lock.
pub struct LocaleIndex {
    locale: Locale,
    analyzer: Arc<dyn Analyzer>,
    store: RwLock<IndexStore>,
    progress: Arc<ProgressDistributor>,
}

impl LocaleIndex {
    pub fn locale(&self) -> &Locale { &self.locale }
    pub fn progress(&self) -> &Arc<ProgressDistributor> { &self.progress }
    pub fn exists(&self) -> bool { self.store.read().exists() }
}

pub struct SearchManager {
    settings: SearchSettings,
    analyzers: AnalyzerRegistry,
    indexes: RwLock<HashMap<Locale, Arc<LocaleIndex>>>,
    closed: AtomicBool,
}

impl SearchManager {
    pub fn new(settings: SearchSettings) -> Self {
        let default_locale = Locale::parse(&settings.default_locale).unwrap_or_else(|| {
            tracing::warn!(locale = %settings.default_locale, "invalid default locale, using en");
            Locale::default()
        });
        let analyzers = AnalyzerRegistry::new(default_locale, &settings.analyzers);
        Self { settings, analyzers, indexes: RwLock::new(HashMap::new()), closed: AtomicBool::new(false) }
    }

    pub fn settings(&self) -> &SearchSettings { &self.settings }

    /// The locale whose index serves `requested` (a locale code, or the
    /// default when `None` or invalid). Every locale gets its own index even
    /// when its analyzer is borrowed from another locale.
    pub fn resolve_locale(&self, requested: Option<&str>) -> Locale {
        requested
            .and_then(|code| {
                let locale = Locale::parse(code);
                if locale.is_none() {
                    tracing::warn!(locale = %code, "invalid locale code");
                }
                locale
            })
            .unwrap_or_else(|| self.analyzers.default_locale().clone())
    }

    /// The index of `locale`, opened on first use. A missing index is
    /// seeded from the prebuilt archive when one is configured.
    pub fn index(&self, locale: Option<&str>) -> Result<Arc<LocaleIndex>, IndexError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(IndexError::Closed);
        }
        let locale = self.resolve_locale(locale);
        if let Some(index) = self.indexes.read().get(&locale) {
            return Ok(index.clone());
        }

        let mut indexes = self.indexes.write();
        if let Some(index) = indexes.get(&locale) {
            return Ok(index.clone());
        }
        let analyzer = self.analyzers.analyzer_for(&self.analyzers.resolve(&locale));
        let mut store = IndexStore::open(&self.settings.state_dir, locale.clone(), analyzer.clone(), self.settings.writer_memory_bytes)?;
        if !store.exists() {
            self.install_prebuilt(&mut store);
        }
        let index = Arc::new(LocaleIndex {
            locale: locale.clone(),
            analyzer,
            store: RwLock::new(store),
            progress: Arc::new(ProgressDistributor::new()),
        });
        indexes.insert(locale, index.clone());
        Ok(index)
    }

    fn install_prebuilt(&self, store: &mut IndexStore) {
        let Some(dir) = &self.settings.prebuilt_dir else { return };
        let Some(archive) = prebuilt::find_archive(dir, store.locale()) else {
            tracing::debug!(locale = %store.locale(), dir = %dir.display(), "no prebuilt index");
            return;
        };
        if let Err(e) = store.install_prebuilt(&archive) {
            tracing::warn!(locale = %store.locale(), archive = %archive.display(), error = %e, "prebuilt index not installed");
        }
    }

    pub fn progress(&self, locale: Option<&str>) -> Result<Arc<ProgressDistributor>, IndexError> {
        Ok(self.index(locale)?.progress.clone())
    }

    pub fn needs_updating(&self, locale: Option<&str>, corpus: &dyn Corpus) -> Result<bool, IndexError> {
        let index = self.index(locale)?;
        let sources = corpus.sources();
        let needs = index.store.read().needs_updating(&sources);
        Ok(needs)
    }

    /// Bring the locale's index in line with `corpus`, reporting through the
    /// locale's progress distributor.
    pub fn update_index(&self, locale: Option<&str>, corpus: &dyn Corpus) -> Result<IndexingOutcome, IndexError> {
        let index = self.index(locale)?;
        let mut store = index.store.write();
        let outcome = IndexingOperation::new(&mut store, corpus, index.progress.as_ref()).execute()?;
        if outcome == IndexingOutcome::Cancelled {
            // The request is consumed; the next update starts afresh.
            index.progress.set_canceled(false);
        }
        Ok(outcome)
    }

    /// Run `query`. Never fails: a broken index yields no hits and a log
    /// entry, a missing one sets `index_missing`.
    pub fn search(&self, query: &SearchQuery, collections: &dyn Collections) -> SearchResults {
        if self.closed.load(Ordering::SeqCst) {
            return SearchResults::default();
        }
        let index = match self.index(query.locale.as_deref()) {
            Ok(index) => index,
            Err(e) => {
                tracing::error!(error = %e, "search index unavailable");
                return SearchResults { hits: Vec::new(), index_missing: true };
            }
        };
        let store = index.store.read();
        if !store.exists() {
            return SearchResults { hits: Vec::new(), index_missing: true };
        }

        let schema = store.schema();
        let fields: Vec<String> = query
            .fields
            .iter()
            .filter(|f| {
                let ok = is_searchable(&schema, f);
                if !ok {
                    tracing::warn!(field = %f, "ignoring unknown search field");
                }
                ok
            })
            .cloned()
            .collect();
        // Field-only search with no usable field left falls back to the defaults.
        let field_search = query.field_search && !fields.is_empty();

        let Some(tree) = QueryBuilder::new(index.analyzer.as_ref()).build(&query.search_word, &fields, field_search) else {
            return SearchResults::default();
        };
        tracing::debug!(locale = %index.locale, query = %tree, "search");
        let Some(compiled) = compile(&tree, &schema) else {
            return SearchResults::default();
        };

        let max_hits = query.max_hits.unwrap_or(self.settings.max_hits).max(1);
        let raw = match store.search(compiled.as_ref(), self.settings.raw_hit_limit.max(max_hits)) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(locale = %index.locale, error = %e, "search failed");
                return SearchResults::default();
            }
        };
        let hits = ResultCollector::new(collections, &query.scopes, max_hits, &query.search_word).collect(&raw);
        SearchResults { hits, index_missing: false }
    }

    /// Release every index. Later searches return no hits.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for index in self.indexes.write().drain().map(|(_, index)| index) {
            index.store.write().close();
        }
    }
}
