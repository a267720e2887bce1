//! One incremental update of a locale index: remove the documents of
//! removed or upgraded sources, then add the documents of added ones.
//! Added sources that ship a compatible prebuilt index are merged instead.

use std::collections::BTreeSet;
use std::path::PathBuf;

use docsearch_core::{indexable_name, Corpus};

use crate::error::{DocumentError, IndexError};
use crate::progress::ProgressMonitor;
use crate::store::IndexStore;
use crate::versions::{self, CorpusDelta};

pub const PREPARE_WORK: u64 = 1;
pub const DOCUMENT_WORK: u64 = 1;
pub const FINALIZE_WORK: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexingState {
    Idle,
    Preparing,
    Removing,
    Adding,
    Finalizing,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexingOutcome {
    /// The recorded versions match the corpus; nothing was touched.
    UpToDate,
    Completed { removed: usize, added: usize, skipped: usize },
    /// Stopped on request. Nothing of the interrupted batch was committed
    /// and the index stays marked for a rebuild.
    Cancelled,
}

pub struct IndexingOperation<'a> {
    store: &'a mut IndexStore,
    corpus: &'a dyn Corpus,
    monitor: &'a dyn ProgressMonitor,
    state: IndexingState,
}

impl<'a> IndexingOperation<'a> {
    pub fn new(store: &'a mut IndexStore, corpus: &'a dyn Corpus, monitor: &'a dyn ProgressMonitor) -> Self {
        Self { store, corpus, monitor, state: IndexingState::Idle }
    }

    pub fn state(&self) -> IndexingState {
        self.state
    }

    pub fn execute(&mut self) -> Result<IndexingOutcome, IndexError> {
        let result = self.run();
        if self.store.batch_open().is_some() {
            self.store.abandon_batch();
        }
        self.state = match &result {
            Ok(IndexingOutcome::Cancelled) => IndexingState::Cancelled,
            _ => IndexingState::Idle,
        };
        match &result {
            Ok(outcome) => tracing::info!(locale = %self.store.locale(), ?outcome, "index update finished"),
            Err(e) => tracing::error!(locale = %self.store.locale(), error = %e, "index update failed"),
        }
        self.monitor.done();
        result
    }

    fn cancel_requested(&self) -> bool {
        let canceled = self.monitor.is_canceled();
        if canceled {
            tracing::info!(locale = %self.store.locale(), state = ?self.state, "index update canceled");
        }
        canceled
    }

    fn run(&mut self) -> Result<IndexingOutcome, IndexError> {
        if self.cancel_requested() {
            return Ok(IndexingOutcome::Cancelled);
        }
        self.state = IndexingState::Preparing;
        let locale = self.store.locale().clone();
        let sources = self.corpus.sources();
        let delta = versions::diff(&self.store.version_stamps(), &sources);
        if !delta.changed() && self.store.exists() {
            tracing::debug!(locale = %locale, "index is up to date");
            return Ok(IndexingOutcome::UpToDate);
        }

        let to_remove = self.store.indexed_docs().names_for_sources(&delta.removed);
        let (to_merge, to_add) = self.plan_additions(&delta);
        tracing::info!(
            locale = %locale,
            removed = delta.removed.len(),
            added = delta.added.len(),
            documents_removed = to_remove.len(),
            documents_added = to_add.len(),
            prebuilt = to_merge.len(),
            "updating index"
        );

        let documents = (to_remove.len() + to_merge.len() + to_add.len()) as u64;
        self.monitor.begin_task("Updating search index", PREPARE_WORK + documents * DOCUMENT_WORK + FINALIZE_WORK);
        self.monitor.worked(PREPARE_WORK);

        if !to_remove.is_empty() {
            self.state = IndexingState::Removing;
            self.store.begin_delete_batch()?;
            for name in &to_remove {
                if self.cancel_requested() {
                    return Ok(IndexingOutcome::Cancelled);
                }
                self.store.remove_document(name)?;
                self.monitor.worked(DOCUMENT_WORK);
            }
            self.store.end_delete_batch(false)?;
        }

        self.state = IndexingState::Adding;
        self.store.begin_add_batch(to_remove.is_empty())?;
        let mut added = 0;
        let mut skipped = 0;
        for (source, dirs) in &to_merge {
            if self.cancel_requested() {
                return Ok(IndexingOutcome::Cancelled);
            }
            self.monitor.sub_task(source);
            let report = self.store.merge_prebuilt(source, dirs)?;
            added += report.documents.len();
            self.monitor.worked(DOCUMENT_WORK);
        }
        for name in &to_add {
            if self.cancel_requested() {
                return Ok(IndexingOutcome::Cancelled);
            }
            self.monitor.sub_task(name);
            match self.add_document(name, &locale) {
                Ok(()) => added += 1,
                Err(DocumentError::Batch(e)) => return Err(e),
                Err(e) => {
                    tracing::warn!(document = %name, error = %e, "skipping document");
                    skipped += 1;
                }
            }
            self.monitor.worked(DOCUMENT_WORK);
        }

        self.state = IndexingState::Finalizing;
        self.store.set_version_stamps(versions::stamp_map(&sources));
        self.store.end_add_batch(true, true)?;
        self.monitor.worked(FINALIZE_WORK);
        Ok(IndexingOutcome::Completed { removed: to_remove.len(), added, skipped })
    }

    fn add_document(&mut self, name: &str, locale: &docsearch_core::Locale) -> Result<(), DocumentError> {
        let content = self
            .corpus
            .open(name, locale)
            .map_err(|source| DocumentError::Unreadable { name: name.to_string(), source })?;
        self.store.add_document(name, content)
    }

    /// Split the added sources into those merged from compatible prebuilt
    /// indexes and the documents of the rest.
    fn plan_additions(&self, delta: &CorpusDelta) -> (Vec<(String, Vec<PathBuf>)>, BTreeSet<String>) {
        let locale = self.store.locale();
        let mut to_merge = Vec::new();
        let mut to_add = BTreeSet::new();
        for source in &delta.added {
            let dirs: Vec<PathBuf> = self
                .corpus
                .prebuilt_indexes(source, locale)
                .into_iter()
                .filter(|dir| self.store.accepts_prebuilt(dir))
                .collect();
            if dirs.is_empty() {
                to_add.extend(self.corpus.documents(source, locale).iter().filter_map(|name| indexable_name(name)));
            } else {
                to_merge.push((source.clone(), dirs));
            }
        }
        (to_merge, to_add)
    }
}
