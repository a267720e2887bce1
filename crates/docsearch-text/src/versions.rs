//! Detection of content sources that were added, removed or upgraded since
//! the last successful index update.

use std::collections::{BTreeMap, BTreeSet};

use docsearch_core::ContentSource;

/// Content source id to version token, as recorded by the last update.
pub type VersionStampMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusDelta {
    /// Sources whose documents must be indexed.
    pub added: BTreeSet<String>,
    /// Sources whose indexed documents must be deleted.
    pub removed: BTreeSet<String>,
}

impl CorpusDelta {
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

pub fn stamp_map(sources: &[ContentSource]) -> VersionStampMap {
    sources.iter().map(|s| (s.id.clone(), s.version.clone())).collect()
}

/// Compare the recorded stamps with the current sources. An upgraded source
/// shows up in both sets: its old documents go, its new ones come in.
pub fn diff(previous: &VersionStampMap, current: &[ContentSource]) -> CorpusDelta {
    let current = stamp_map(current);
    let mut delta = CorpusDelta::default();
    for (id, version) in &current {
        match previous.get(id) {
            None => {
                delta.added.insert(id.clone());
            }
            Some(old) if old != version => {
                delta.added.insert(id.clone());
                delta.removed.insert(id.clone());
            }
            Some(_) => {}
        }
    }
    delta.removed.extend(previous.keys().filter(|id| !current.contains_key(*id)).cloned());
    delta
}
