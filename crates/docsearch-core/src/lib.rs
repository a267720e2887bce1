//! docsearch-core
//!
//! Configuration, domain types and the collaborator traits shared by the
//! text index crate and the command line tools.

pub mod collections;
pub mod config;
pub mod corpus;
pub mod error;
pub mod traits;
pub mod types;

pub use collections::StaticCollections;
pub use config::{Config, SearchSettings};
pub use corpus::{indexable_name, source_id, DirectoryCorpus};
pub use error::{Error, Result};
pub use traits::{Collections, Corpus};
pub use types::{ContentSource, Locale, SearchHit};
