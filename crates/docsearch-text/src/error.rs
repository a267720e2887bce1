use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Batch-level failures. Any of these leaves the consistency marker set, so
/// the next update rebuilds the index from scratch.
#[derive(Debug, Error)]
pub enum IndexError {
	#[error("I/O error on {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("Search engine error: {0}")]
	Engine(#[from] tantivy::TantivyError),

	#[error("Prebuilt archive error: {0}")]
	Archive(#[from] zip::result::ZipError),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("No update batch is open")]
	NoBatchOpen,

	#[error("An update batch is already open")]
	BatchOpen,

	#[error("Index for locale {0} is locked by another process")]
	Locked(String),

	#[error("Search manager is closed")]
	Closed,
}

impl IndexError {
	pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
		IndexError::Io { path: path.into(), source }
	}
}

/// Failure to index one document. The indexing operation logs these and moves
/// on, except for `Batch`, which aborts the update.
#[derive(Debug, Error)]
pub enum DocumentError {
	#[error("Cannot read {name}: {source}")]
	Unreadable {
		name: String,
		#[source]
		source: io::Error,
	},

	#[error("Cannot index {name}: {source}")]
	Engine {
		name: String,
		#[source]
		source: tantivy::TantivyError,
	},

	#[error("Cannot parse {name}: {source}")]
	Unparsable {
		name: String,
		#[source]
		source: html2text::Error,
	},

	#[error(transparent)]
	Batch(#[from] IndexError),
}
