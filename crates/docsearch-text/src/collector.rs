//! Turns raw engine hits into the hits shown to users.

use docsearch_core::{Collections, SearchHit};

use crate::search::RawHit;

const TOP_SCORE: f32 = 0.99;
const SCORE_OFFSET: f32 = 0.005;

/// Maps raw engine scores into (0, 1]. The first hit fixes the scale; a
/// later hit that would come out higher shrinks the scale instead, so the
/// output never increases.
#[derive(Debug)]
struct ScoreScaler {
    scale: Option<f32>,
    last: f32,
}

impl ScoreScaler {
    fn new() -> Self {
        Self { scale: None, last: 1.0 }
    }

    fn rescale(&mut self, raw: f32) -> f32 {
        let raw = if raw.is_finite() { raw.max(0.0) } else { 0.0 };
        let scale = *self.scale.get_or_insert(if raw > 0.0 { TOP_SCORE / raw } else { 1.0 });
        let mut value = raw * scale + SCORE_OFFSET;
        if value > self.last {
            if raw > 0.0 {
                self.scale = Some((self.last - SCORE_OFFSET).max(0.0) / raw);
            }
            value = self.last;
        }
        let value = value.clamp(SCORE_OFFSET.min(self.last), 1.0);
        self.last = value;
        value
    }
}

/// Rescale a descending run of raw scores.
pub fn rescale_scores(raw: &[f32]) -> Vec<f32> {
    let mut scaler = ScoreScaler::new();
    raw.iter().map(|s| scaler.rescale(*s)).collect()
}

pub struct ResultCollector<'a> {
    collections: &'a dyn Collections,
    scopes: &'a [String],
    max_hits: usize,
    query_text: &'a str,
}

impl<'a> ResultCollector<'a> {
    pub fn new(collections: &'a dyn Collections, scopes: &'a [String], max_hits: usize, query_text: &'a str) -> Self {
        Self { collections, scopes, max_hits, query_text }
    }

    /// Keep hits inside the scopes, in engine order, stopping at `max_hits`.
    pub fn collect(&self, raw: &[RawHit]) -> Vec<SearchHit> {
        let mut scaler = ScoreScaler::new();
        let mut hits = Vec::with_capacity(self.max_hits.min(raw.len()));
        for hit in raw {
            if hits.len() >= self.max_hits {
                break;
            }
            if !self.in_scope(&hit.name) {
                continue;
            }
            hits.push(SearchHit {
                href: self.href(&hit.name),
                label: self.label(hit),
                score: scaler.rescale(hit.score),
                collection: self.collections.owning_collection(&hit.name),
            });
        }
        hits
    }

    fn in_scope(&self, name: &str) -> bool {
        self.scopes.is_empty() || self.scopes.iter().any(|s| self.collections.scope_contains(s, name))
    }

    fn label(&self, hit: &RawHit) -> String {
        let title = hit.raw_title.trim();
        if !title.is_empty() {
            return title.to_string();
        }
        self.collections
            .label(&hit.name)
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| hit.name.clone())
    }

    fn href(&self, name: &str) -> String {
        if self.query_text.trim().is_empty() {
            return name.to_string();
        }
        let separator = if name.contains('?') { '&' } else { '?' };
        format!("{}{}resultof={}", name, separator, urlencoding::encode(self.query_text))
    }
}
