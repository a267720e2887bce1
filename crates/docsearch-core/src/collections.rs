use std::collections::{HashMap, HashSet};

use crate::traits::Collections;

/// In-memory navigation data, mostly for tests and tools.
#[derive(Debug, Clone, Default)]
pub struct StaticCollections {
    owners: HashMap<String, String>,
    labels: HashMap<String, String>,
    scopes: HashMap<String, HashSet<String>>,
}

impl StaticCollections {
    pub fn new() -> Self { Self::default() }

    pub fn with_document(mut self, href: &str, collection: &str, label: Option<&str>) -> Self {
        self.owners.insert(href.to_string(), collection.to_string());
        if let Some(label) = label {
            self.labels.insert(href.to_string(), label.to_string());
        }
        self
    }

    pub fn with_scope<I, S>(mut self, scope: &str, hrefs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes.entry(scope.to_string()).or_default().extend(hrefs.into_iter().map(Into::into));
        self
    }
}

impl Collections for StaticCollections {
    fn owning_collection(&self, href: &str) -> Option<String> {
        self.owners.get(href).cloned()
    }

    fn label(&self, href: &str) -> Option<String> {
        self.labels.get(href).cloned()
    }

    fn scope_contains(&self, scope: &str, href: &str) -> bool {
        self.scopes.get(scope).is_some_and(|docs| docs.contains(href))
    }
}
