//! docsearch-text
//!
//! Tantivy-based incremental help search: per-locale index stores with a
//! consistency marker, the indexing operation that keeps them in line with
//! the corpus, and the query path from raw text to ranked hits.

pub mod analyzer;
pub mod collector;
pub mod document;
pub mod error;
pub mod indexing;
pub mod lock;
pub mod manager;
mod persist;
pub mod prebuilt;
pub mod progress;
pub mod query;
pub mod request;
pub mod schema;
pub mod search;
pub mod store;
pub mod versions;

pub use analyzer::{Analyzer, AnalyzerKind, AnalyzerRegistry, LocaleAnalyzer, StemLanguage, Word};
pub use collector::{rescale_scores, ResultCollector};
pub use error::{DocumentError, IndexError};
pub use indexing::{IndexingOperation, IndexingOutcome, IndexingState};
pub use manager::{LocaleIndex, SearchManager, SearchResults};
pub use progress::{MonitorId, NullMonitor, ProgressDistributor, ProgressMonitor, ProgressState};
pub use query::{tokenize, QueryBuilder, QueryToken, QueryTree};
pub use request::SearchQuery;
pub use search::{compile, RawHit};
pub use store::{BatchKind, IndexStore, IndexedDocs, MergeReport};
pub use versions::{CorpusDelta, VersionStampMap};
