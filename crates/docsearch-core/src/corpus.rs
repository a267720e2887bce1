//! A corpus backed by a directory tree.
//!
//! Every top-level directory is one content source. A source may carry a
//! `VERSION` file; otherwise its version is a fingerprint of the file listing
//! so that edits on disk still show up as a version change. Translated copies
//! live under `<source>/nl/<locale>/` and shadow the default file when present.
//! Prebuilt indexes shipped with a source live under `<source>/index/`, with
//! per-locale ones in `<source>/index/<locale>/`.

use std::collections::BTreeSet;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::{Path, PathBuf};

use twox_hash::XxHash64;

use crate::error::{Error, Result};
use crate::traits::{Collections, Corpus};
use crate::types::{ContentSource, Locale};

const VERSION_FILE: &str = "VERSION";
const TRANSLATIONS_DIR: &str = "nl";
const PREBUILT_DIR: &str = "index";
const INDEX_META_FILE: &str = "meta.json";
const INDEXABLE_EXTENSIONS: &[&str] = &["htm", "html", "xhtml", "xml", "txt"];

#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    root: PathBuf,
}

impl DirectoryCorpus {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::NotFound(format!("corpus directory {}", root.display())));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn source_dirs(&self) -> Vec<(String, PathBuf)> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            tracing::warn!(root = %self.root.display(), "corpus root is not readable");
            return Vec::new();
        };
        let mut dirs: Vec<(String, PathBuf)> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| Some((e.file_name().to_str()?.to_string(), e.path())))
            .filter(|(name, _)| !name.starts_with('.'))
            .collect();
        dirs.sort();
        dirs
    }

    fn version_of(&self, dir: &Path) -> String {
        if let Ok(text) = fs::read_to_string(dir.join(VERSION_FILE)) {
            let text = text.trim();
            if !text.is_empty() {
                return text.to_string();
            }
        }
        fingerprint(dir)
    }

    fn resolve(&self, name: &str) -> Option<(String, String)> {
        let trimmed = name.split(['#', '?']).next()?.trim_start_matches('/');
        let (source, rel) = trimmed.split_once('/')?;
        if source.is_empty() || rel.is_empty() || rel.split('/').any(|seg| seg == ".." || seg == ".") {
            return None;
        }
        Some((source.to_string(), rel.to_string()))
    }
}

/// `nl/<ll_CC>` then `nl/<ll>` under a source directory.
fn translation_dirs(source_dir: &Path, locale: &Locale) -> Vec<PathBuf> {
    let base = source_dir.join(TRANSLATIONS_DIR);
    let mut dirs = Vec::with_capacity(2);
    if locale.country().is_some() {
        dirs.push(base.join(locale.to_string()));
    }
    dirs.push(base.join(locale.language()));
    dirs
}

/// Files under `dir` as `/`-joined relative paths, skipping the top-level
/// translations and prebuilt index directories.
fn relative_files(dir: &Path) -> Vec<String> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && (e.file_name() == TRANSLATIONS_DIR || e.file_name() == PREBUILT_DIR)))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let rel = e.path().strip_prefix(dir).ok()?;
            let rel: Vec<&str> = rel.components().filter_map(|c| c.as_os_str().to_str()).collect();
            Some(rel.join("/"))
        })
        .collect()
}

/// Hash of the relative paths, sizes and modification times under `dir`.
fn fingerprint(dir: &Path) -> String {
    let mut hasher = XxHash64::with_seed(0);
    for entry in walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        rel.to_string_lossy().hash(&mut hasher);
        if let Ok(meta) = entry.metadata() {
            meta.len().hash(&mut hasher);
            if let Ok(modified) = meta.modified() {
                modified.hash(&mut hasher);
            }
        }
    }
    format!("{:016x}", hasher.finish())
}

impl Corpus for DirectoryCorpus {
    fn sources(&self) -> Vec<ContentSource> {
        self.source_dirs()
            .into_iter()
            .map(|(id, dir)| {
                let version = self.version_of(&dir);
                ContentSource::new(id, version)
            })
            .collect()
    }

    fn documents(&self, source_id: &str, locale: &Locale) -> Vec<String> {
        let dir = self.root.join(source_id);
        let mut rels: BTreeSet<String> = relative_files(&dir)
            .into_iter()
            .filter(|rel| rel != VERSION_FILE)
            .collect();
        // Documents that exist only in translation.
        for translated in translation_dirs(&dir, locale) {
            rels.extend(relative_files(&translated));
        }
        rels.into_iter().map(|rel| format!("/{}/{}", source_id, rel)).collect()
    }

    fn open(&self, name: &str, locale: &Locale) -> std::io::Result<Box<dyn Read + Send>> {
        let (source, rel) = self.resolve(name).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("not a document name: {}", name))
        })?;
        let base = self.root.join(&source);
        let mut candidates: Vec<PathBuf> = translation_dirs(&base, locale).into_iter().map(|dir| dir.join(&rel)).collect();
        candidates.push(base.join(&rel));

        for path in &candidates {
            if path.is_file() {
                return Ok(Box::new(fs::File::open(path)?));
            }
        }
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, format!("no such document: {}", name)))
    }

    fn prebuilt_indexes(&self, source_id: &str, locale: &Locale) -> Vec<PathBuf> {
        let base = self.root.join(source_id).join(PREBUILT_DIR);
        let mut dirs = Vec::with_capacity(3);
        if locale.country().is_some() {
            dirs.push(base.join(locale.to_string()));
        }
        dirs.push(base.join(locale.language()));
        dirs.push(base);
        dirs.retain(|dir| dir.join(INDEX_META_FILE).is_file());
        dirs
    }
}

impl Collections for DirectoryCorpus {
    fn owning_collection(&self, href: &str) -> Option<String> {
        source_id(href).map(str::to_string)
    }

    fn label(&self, _href: &str) -> Option<String> {
        None
    }

    fn scope_contains(&self, scope: &str, href: &str) -> bool {
        source_id(href) == Some(scope)
    }
}

/// Source id of a document name: the first path segment.
pub fn source_id(name: &str) -> Option<&str> {
    let rest = name.strip_prefix('/')?;
    let (source, _) = rest.split_once('/')?;
    (!source.is_empty()).then_some(source)
}

/// Name under which a document is indexed, or `None` when its type is not
/// searchable. Fragments are dropped so `a.html#part` indexes `a.html`.
pub fn indexable_name(name: &str) -> Option<String> {
    let name = name.split('#').next().unwrap_or(name);
    let path = name.split('?').next().unwrap_or(name);
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    INDEXABLE_EXTENSIONS.contains(&ext.as_str()).then(|| name.to_string())
}
