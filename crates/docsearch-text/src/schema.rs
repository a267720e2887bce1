use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::Index;

use crate::analyzer::{Analyzer, EXACT_PREFIX};

pub const NAME: &str = "name";
pub const CONTENTS: &str = "contents";
pub const TITLE: &str = "title";
pub const RAW_TITLE: &str = "raw_title";
pub const EXACT_CONTENTS: &str = "exact_contents";
pub const EXACT_TITLE: &str = "exact_title";

/// Fields searched when a query names none.
pub const DEFAULT_FIELDS: &[&str] = &[CONTENTS, TITLE];

const TEXT_TOKENIZER: &str = "docsearch_text";
const EXACT_TOKENIZER: &str = "docsearch_exact";

fn analyzed(tokenizer: &str) -> TextOptions {
	let indexing = TextFieldIndexing::default().set_tokenizer(tokenizer).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	TextOptions::default().set_indexing_options(indexing)
}

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field(NAME, STRING | STORED);
	// Stored so that prebuilt source indexes can be merged into a locale index.
	schema_builder.add_text_field(CONTENTS, analyzed(TEXT_TOKENIZER).set_stored());
	schema_builder.add_text_field(TITLE, analyzed(TEXT_TOKENIZER));
	schema_builder.add_text_field(RAW_TITLE, STORED);
	schema_builder.add_text_field(EXACT_CONTENTS, analyzed(EXACT_TOKENIZER));
	schema_builder.add_text_field(EXACT_TITLE, analyzed(EXACT_TOKENIZER));
	schema_builder.build()
}

/// Register the analyzer's pipelines under the tokenizer names the schema uses.
pub fn register_tokenizers(index: &Index, analyzer: &dyn Analyzer) {
	index.tokenizers().register(TEXT_TOKENIZER, analyzer.text_analyzer(CONTENTS));
	index.tokenizers().register(EXACT_TOKENIZER, analyzer.text_analyzer(EXACT_CONTENTS));
}

/// The exact counterpart of a default field, if it has one.
pub fn exact_field(field: &str) -> Option<String> {
	matches!(field, CONTENTS | TITLE).then(|| format!("{}{}", EXACT_PREFIX, field))
}

/// Whether `field` can be searched with analyzed terms.
pub fn is_searchable(schema: &Schema, field: &str) -> bool {
	schema.get_field(field).map(|f| schema.get_field_entry(f).is_indexed()).unwrap_or(false)
}

#[derive(Debug, Clone, Copy)]
pub struct IndexFields {
	pub name: Field,
	pub contents: Field,
	pub title: Field,
	pub raw_title: Field,
	pub exact_contents: Field,
	pub exact_title: Field,
}

impl IndexFields {
	pub fn from_schema(schema: &Schema) -> tantivy::Result<Self> {
		Ok(Self {
			name: schema.get_field(NAME)?,
			contents: schema.get_field(CONTENTS)?,
			title: schema.get_field(TITLE)?,
			raw_title: schema.get_field(RAW_TITLE)?,
			exact_contents: schema.get_field(EXACT_CONTENTS)?,
			exact_title: schema.get_field(EXACT_TITLE)?,
		})
	}
}
