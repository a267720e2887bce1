//! The on-disk index of one locale.
//!
//! Layout under the state root:
//!
//! - `<locale>/` tantivy files plus `indexed_docs`, `indexed_contributions`
//!   and `indexed_dependencies`
//! - `<locale>.inconsistent` present while an update batch is open
//! - `<locale>.lock` cross-process update lock

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tantivy::collector::TopDocs;
use tantivy::indexer::NoMergePolicy;
use tantivy::query::Query;
use tantivy::schema::{Field, Schema, Value};
use tantivy::{doc, DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use docsearch_core::{source_id, ContentSource, Locale};

use crate::analyzer::Analyzer;
use crate::document::parse_document;
use crate::error::{DocumentError, IndexError};
use crate::lock::IndexLock;
use crate::persist::{load_json, save_json};
use crate::prebuilt;
use crate::schema::{build_schema, register_tokenizers, IndexFields};
use crate::search::RawHit;
use crate::versions::{self, VersionStampMap};

const INDEXED_DOCS_FILE: &str = "indexed_docs";
const VERSION_STAMPS_FILE: &str = "indexed_contributions";
const DEPENDENCIES_FILE: &str = "indexed_dependencies";
const META_FILE: &str = "meta.json";
const MIN_WRITER_MEMORY: usize = 15_000_000;

/// Registry of indexed document names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexedDocs(BTreeMap<String, String>);

impl IndexedDocs {
	pub fn contains(&self, name: &str) -> bool { self.0.contains_key(name) }
	pub fn len(&self) -> usize { self.0.len() }
	pub fn is_empty(&self) -> bool { self.0.is_empty() }
	pub fn names(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }

	fn insert(&mut self, name: &str) { self.0.insert(name.to_string(), "0".to_string()); }
	fn remove(&mut self, name: &str) { self.0.remove(name); }

	/// Names of indexed documents contributed by any of `sources`.
	pub fn names_for_sources(&self, sources: &BTreeSet<String>) -> Vec<String> {
		self.names().filter(|n| source_id(n).is_some_and(|s| sources.contains(s))).map(str::to_string).collect()
	}
}

/// What an index was built with. A mismatch makes the index unusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
	pub engine_format: u32,
	pub analyzer: String,
}

/// Result of merging the prebuilt indexes of one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
	/// Merged documents, each with the directories whose copies of it were
	/// dropped as duplicates.
	pub documents: BTreeMap<String, Vec<PathBuf>>,
	/// Directories left out because they were built incompatibly.
	pub skipped: Vec<PathBuf>,
}

impl MergeReport {
	pub fn duplicates(&self) -> usize { self.documents.values().map(Vec::len).sum() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
	Add,
	Delete,
}

struct Batch {
	kind: BatchKind,
	writer: IndexWriter,
	fields: IndexFields,
	_lock: IndexLock,
}

pub struct IndexStore {
	locale: Locale,
	dir: PathBuf,
	marker: PathBuf,
	lock_path: PathBuf,
	analyzer: Arc<dyn Analyzer>,
	writer_memory: usize,
	index: Option<(Index, IndexFields)>,
	batch: Option<Batch>,
	indexed_docs: IndexedDocs,
	stamps: VersionStampMap,
	reader: Mutex<Option<IndexReader>>,
}

impl IndexStore {
	/// Open the index of `locale` under `state_dir`, creating the directory if needed.
	pub fn open(state_dir: &Path, locale: Locale, analyzer: Arc<dyn Analyzer>, writer_memory: usize) -> Result<Self, IndexError> {
		let dir = state_dir.join(locale.to_string());
		fs::create_dir_all(&dir).map_err(|e| IndexError::io(&dir, e))?;
		let mut store = Self {
			marker: state_dir.join(format!("{}.inconsistent", locale)),
			lock_path: state_dir.join(format!("{}.lock", locale)),
			locale,
			dir,
			analyzer,
			writer_memory: writer_memory.max(MIN_WRITER_MEMORY),
			index: None,
			batch: None,
			indexed_docs: IndexedDocs::default(),
			stamps: VersionStampMap::new(),
			reader: Mutex::new(None),
		};
		store.load_state();
		Ok(store)
	}

	pub fn locale(&self) -> &Locale { &self.locale }
	pub fn dir(&self) -> &Path { &self.dir }
	pub fn analyzer(&self) -> &Arc<dyn Analyzer> { &self.analyzer }

	/// True only when the index files are present, no batch left the
	/// consistency marker behind and the index was built compatibly.
	pub fn exists(&self) -> bool {
		self.has_index_files() && !self.is_inconsistent() && self.is_compatible()
	}

	pub fn is_inconsistent(&self) -> bool { self.marker.exists() }

	pub fn batch_open(&self) -> Option<BatchKind> { self.batch.as_ref().map(|b| b.kind) }

	pub fn indexed_docs(&self) -> &IndexedDocs { &self.indexed_docs }

	/// Stamps recorded by the last successful update; empty for an unusable index.
	pub fn version_stamps(&self) -> VersionStampMap {
		if self.exists() { self.stamps.clone() } else { VersionStampMap::new() }
	}

	pub fn needs_updating(&self, sources: &[ContentSource]) -> bool {
		!self.exists() || versions::diff(&self.version_stamps(), sources).changed()
	}

	pub fn schema(&self) -> Schema {
		self.index.as_ref().map_or_else(build_schema, |(index, _)| index.schema())
	}

	fn has_index_files(&self) -> bool { self.dir.join(META_FILE).is_file() }

	fn current_dependencies(&self) -> Dependencies {
		Dependencies { engine_format: tantivy::INDEX_FORMAT_VERSION, analyzer: self.analyzer.id().to_string() }
	}

	fn is_compatible(&self) -> bool { self.accepts_prebuilt(&self.dir) }

	/// Whether the index in `dir` was built with this store's engine format
	/// and analyzer.
	pub fn accepts_prebuilt(&self, dir: &Path) -> bool {
		match load_json::<Option<Dependencies>>(&dir.join(DEPENDENCIES_FILE)) {
			Ok(Some(recorded)) => recorded == self.current_dependencies(),
			_ => false,
		}
	}

	fn set_inconsistent(&self, inconsistent: bool) -> Result<(), IndexError> {
		if inconsistent {
			fs::write(&self.marker, b"").map_err(|e| IndexError::io(&self.marker, e))
		} else {
			match fs::remove_file(&self.marker) {
				Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(IndexError::io(&self.marker, e)),
				_ => Ok(()),
			}
		}
	}

	fn load_state(&mut self) {
		self.index = None;
		self.indexed_docs = IndexedDocs::default();
		self.stamps = VersionStampMap::new();
		self.reader.lock().take();
		if !self.exists() { return; }
		if let Err(e) = self.open_index().and_then(|()| self.load_registry()) {
			tracing::warn!(locale = %self.locale, error = %e, "index is unreadable, it will be rebuilt");
			self.index = None;
			if let Err(e) = self.set_inconsistent(true) {
				tracing::error!(locale = %self.locale, error = %e, "cannot mark index inconsistent");
			}
		}
	}

	fn open_index(&mut self) -> Result<(), IndexError> {
		let index = Index::open_in_dir(&self.dir)?;
		register_tokenizers(&index, self.analyzer.as_ref());
		let fields = IndexFields::from_schema(&index.schema())?;
		self.index = Some((index, fields));
		Ok(())
	}

	fn load_registry(&mut self) -> Result<(), IndexError> {
		self.indexed_docs = load_json(&self.dir.join(INDEXED_DOCS_FILE))?;
		self.stamps = load_json(&self.dir.join(VERSION_STAMPS_FILE))?;
		Ok(())
	}

	fn persist_registry(&self) -> Result<(), IndexError> {
		save_json(&self.dir.join(INDEXED_DOCS_FILE), &self.indexed_docs)?;
		save_json(&self.dir.join(VERSION_STAMPS_FILE), &self.stamps)
	}

	fn create_index(&mut self) -> Result<(), IndexError> {
		self.reader.lock().take();
		self.index = None;
		if self.dir.exists() {
			fs::remove_dir_all(&self.dir).map_err(|e| IndexError::io(&self.dir, e))?;
		}
		fs::create_dir_all(&self.dir).map_err(|e| IndexError::io(&self.dir, e))?;
		let index = Index::create_in_dir(&self.dir, build_schema())?;
		register_tokenizers(&index, self.analyzer.as_ref());
		let fields = IndexFields::from_schema(&index.schema())?;
		self.index = Some((index, fields));
		self.indexed_docs = IndexedDocs::default();
		self.stamps = VersionStampMap::new();
		save_json(&self.dir.join(DEPENDENCIES_FILE), &self.current_dependencies())
	}

	fn acquire_lock(&self) -> Result<IndexLock, IndexError> {
		IndexLock::try_acquire(&self.lock_path)?.ok_or_else(|| IndexError::Locked(self.locale.to_string()))
	}

	fn start_batch(&mut self, kind: BatchKind, lock: IndexLock) -> Result<(), IndexError> {
		if self.index.is_none() { self.open_index()?; }
		let Some((index, fields)) = &self.index else { return Err(IndexError::NoBatchOpen) };
		let writer: IndexWriter = index.writer_with_num_threads(1, self.writer_memory)?;
		writer.set_merge_policy(Box::new(NoMergePolicy));
		self.batch = Some(Batch { kind, writer, fields: *fields, _lock: lock });
		Ok(())
	}

	/// Start adding documents. The index is recreated when it is missing or
	/// incompatible, or when a previous session left it inconsistent and this
	/// is the first batch of the update.
	pub fn begin_add_batch(&mut self, first_operation: bool) -> Result<(), IndexError> {
		if self.batch.is_some() { return Err(IndexError::BatchOpen); }
		let lock = self.acquire_lock()?;
		let recreate = !self.has_index_files() || !self.is_compatible() || (self.is_inconsistent() && first_operation);
		self.set_inconsistent(true)?;
		if recreate { self.create_index()?; }
		self.start_batch(BatchKind::Add, lock)?;
		tracing::debug!(locale = %self.locale, recreate, "add batch started");
		Ok(())
	}

	pub fn begin_delete_batch(&mut self) -> Result<(), IndexError> {
		if self.batch.is_some() { return Err(IndexError::BatchOpen); }
		let lock = self.acquire_lock()?;
		self.set_inconsistent(true)?;
		self.start_batch(BatchKind::Delete, lock)?;
		tracing::debug!(locale = %self.locale, "delete batch started");
		Ok(())
	}

	/// Index one document, replacing any earlier version with the same name.
	pub fn add_document(&mut self, name: &str, mut content: impl Read) -> Result<(), DocumentError> {
		let batch = match self.batch.as_mut() {
			Some(batch) if batch.kind == BatchKind::Add => batch,
			_ => return Err(IndexError::NoBatchOpen.into()),
		};
		let mut bytes = Vec::new();
		content.read_to_end(&mut bytes).map_err(|source| DocumentError::Unreadable { name: name.to_string(), source })?;
		let text = String::from_utf8_lossy(&bytes);
		let parsed = parse_document(name, &text)?;

		let f = batch.fields;
		batch.writer.delete_term(Term::from_field_text(f.name, name));
		batch
			.writer
			.add_document(doc!(
				f.name => name.to_string(),
				f.contents => parsed.body.clone(),
				f.exact_contents => parsed.body,
				f.title => parsed.title.clone(),
				f.exact_title => parsed.title.clone(),
				f.raw_title => parsed.title,
			))
			.map_err(|source| DocumentError::Engine { name: name.to_string(), source })?;
		self.indexed_docs.insert(name);
		Ok(())
	}

	/// Delete every entry keyed by `name`. Requires an open delete batch.
	pub fn remove_document(&mut self, name: &str) -> Result<(), IndexError> {
		let batch = match self.batch.as_mut() {
			Some(batch) if batch.kind == BatchKind::Delete => batch,
			_ => return Err(IndexError::NoBatchOpen),
		};
		batch.writer.delete_term(Term::from_field_text(batch.fields.name, name));
		self.indexed_docs.remove(name);
		Ok(())
	}

	/// Copy the documents of `source`'s prebuilt indexes into the open add
	/// batch. `dirs` are ordered most specific first: once a document was
	/// taken from one directory, its copies in later ones are duplicates and
	/// are dropped. A merged document replaces any indexed one of that name.
	pub fn merge_prebuilt(&mut self, source: &str, dirs: &[PathBuf]) -> Result<MergeReport, IndexError> {
		let mut report = MergeReport::default();
		let compatible: Vec<&PathBuf> = dirs
			.iter()
			.filter(|dir| {
				let ok = self.accepts_prebuilt(dir);
				if !ok {
					tracing::warn!(source, index = %dir.display(), "skipping incompatible prebuilt index");
					report.skipped.push((*dir).clone());
				}
				ok
			})
			.collect();
		let batch = match self.batch.as_mut() {
			Some(batch) if batch.kind == BatchKind::Add => batch,
			_ => return Err(IndexError::NoBatchOpen),
		};
		let f = batch.fields;

		for dir in compatible {
			let index = Index::open_in_dir(dir)?;
			let from = IndexFields::from_schema(&index.schema())?;
			let searcher = index.reader()?.searcher();
			for (segment_ord, segment) in searcher.segment_readers().iter().enumerate() {
				for doc_id in segment.doc_ids_alive() {
					let doc: TantivyDocument = searcher.doc(DocAddress::new(segment_ord as u32, doc_id))?;
					let name = stored_text(&doc, from.name);
					if source_id(&name) != Some(source) {
						tracing::warn!(source, document = %name, "prebuilt index holds a foreign document");
						continue;
					}
					if let Some(duplicates) = report.documents.get_mut(&name) {
						duplicates.push(dir.clone());
						continue;
					}
					let body = stored_text(&doc, from.contents);
					let title = stored_text(&doc, from.raw_title);
					batch.writer.delete_term(Term::from_field_text(f.name, &name));
					batch.writer.add_document(doc!(
						f.name => name.clone(),
						f.contents => body.clone(),
						f.exact_contents => body,
						f.title => title.clone(),
						f.exact_title => title.clone(),
						f.raw_title => title,
					))?;
					report.documents.insert(name, Vec::new());
				}
			}
		}
		for name in report.documents.keys() {
			self.indexed_docs.insert(name);
		}
		tracing::debug!(locale = %self.locale, source, documents = report.documents.len(), duplicates = report.duplicates(), "prebuilt indexes merged");
		Ok(report)
	}

	/// Stamps to persist with the next successful `end_*_batch`.
	pub fn set_version_stamps(&mut self, stamps: VersionStampMap) { self.stamps = stamps; }

	fn take_batch(&mut self, kind: BatchKind) -> Result<Batch, IndexError> {
		match self.batch.take() {
			Some(batch) if batch.kind == kind => Ok(batch),
			other => {
				self.batch = other;
				Err(IndexError::NoBatchOpen)
			}
		}
	}

	/// Commit the add batch and persist the registry. The consistency marker
	/// is cleared only when this is the last batch of the update.
	pub fn end_add_batch(&mut self, optimize: bool, last_operation: bool) -> Result<(), IndexError> {
		let Batch { mut writer, _lock, .. } = self.take_batch(BatchKind::Add)?;
		writer.commit()?;
		if optimize {
			if let Some((index, _)) = &self.index {
				let segments = index.searchable_segment_ids()?;
				if segments.len() > 1 {
					let _merged = writer.merge(&segments).wait()?;
				}
			}
		}
		writer.wait_merging_threads()?;
		self.finish_batch(last_operation)?;
		tracing::info!(locale = %self.locale, documents = self.indexed_docs.len(), "add batch committed");
		Ok(())
	}

	pub fn end_delete_batch(&mut self, last_operation: bool) -> Result<(), IndexError> {
		let Batch { mut writer, _lock, .. } = self.take_batch(BatchKind::Delete)?;
		writer.commit()?;
		writer.wait_merging_threads()?;
		self.finish_batch(last_operation)?;
		tracing::info!(locale = %self.locale, documents = self.indexed_docs.len(), "delete batch committed");
		Ok(())
	}

	fn finish_batch(&mut self, last_operation: bool) -> Result<(), IndexError> {
		self.persist_registry()?;
		if last_operation { self.set_inconsistent(false)?; }
		self.reader.lock().take();
		Ok(())
	}

	/// Drop the open batch without committing. The marker stays set, so the
	/// index is rebuilt by the next update.
	pub fn abandon_batch(&mut self) {
		let Some(Batch { mut writer, .. }) = self.batch.take() else { return };
		if let Err(e) = writer.rollback() {
			tracing::warn!(locale = %self.locale, error = %e, "rollback of abandoned batch failed");
		}
		drop(writer);
		if let Err(e) = self.load_registry() {
			tracing::warn!(locale = %self.locale, error = %e, "cannot reload index registry");
		}
		self.reader.lock().take();
		tracing::info!(locale = %self.locale, "update batch abandoned");
	}

	/// Replace the index with the contents of a prebuilt archive. Returns
	/// `false` when another process holds the lock and nothing was installed.
	pub fn install_prebuilt(&mut self, archive: &Path) -> Result<bool, IndexError> {
		if self.batch.is_some() { return Err(IndexError::BatchOpen); }
		let Some(_lock) = IndexLock::try_acquire(&self.lock_path)? else {
			tracing::info!(locale = %self.locale, "index locked by another process, skipping prebuilt install");
			return Ok(false);
		};
		self.set_inconsistent(true)?;
		self.reader.lock().take();
		self.index = None;
		let files = prebuilt::extract_archive(archive, &self.dir)?;
		self.set_inconsistent(false)?;
		self.load_state();
		tracing::info!(locale = %self.locale, archive = %archive.display(), files, usable = self.exists(), "prebuilt index installed");
		Ok(true)
	}

	/// Run `query` and return up to `limit` hits in engine rank order.
	pub fn search(&self, query: &dyn Query, limit: usize) -> Result<Vec<RawHit>, IndexError> {
		let Some((index, fields)) = &self.index else { return Ok(Vec::new()) };
		let reader = {
			let mut cached = self.reader.lock();
			match cached.as_ref() {
				Some(reader) => reader.clone(),
				None => {
					let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
					*cached = Some(reader.clone());
					reader
				}
			}
		};
		let searcher = reader.searcher();
		let top_docs = searcher.search(query, &TopDocs::with_limit(limit.max(1)))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			hits.push(RawHit { name: stored_text(&doc, fields.name), raw_title: stored_text(&doc, fields.raw_title), score });
		}
		Ok(hits)
	}

	/// Abandon any open batch and release the engine handles.
	pub fn close(&mut self) {
		if self.batch.is_some() { self.abandon_batch(); }
		self.reader.lock().take();
		self.index = None;
	}
}

fn stored_text(doc: &TantivyDocument, field: Field) -> String {
	doc.get_first(field).and_then(|v| v.as_str()).unwrap_or_default().to_string()
}
