use tantivy::query::{BooleanQuery, BoostQuery, Occur, PhraseQuery, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema};
use tantivy::Term;

use crate::analyzer::Word;
use crate::query::{Occurrence, QueryTree};

/// A hit as ranked by the engine, before scoping and rescaling.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
	pub name: String,
	pub raw_title: String,
	pub score: f32,
}

/// Translate a query tree into a tantivy query. Clauses on fields missing
/// from `schema` are dropped; `None` means nothing searchable remained.
pub fn compile(tree: &QueryTree, schema: &Schema) -> Option<Box<dyn Query>> {
	match tree {
		QueryTree::Term { field, text, boost } => {
			let field = schema.get_field(field).ok()?;
			Some(boosted(term_query(field, text), *boost))
		}
		QueryTree::Phrase { field, words, boost } => {
			let field = schema.get_field(field).ok()?;
			Some(boosted(phrase_query(schema, field, words)?, *boost))
		}
		QueryTree::Boolean { clauses } => {
			let subqueries: Vec<(Occur, Box<dyn Query>)> =
				clauses.iter().filter_map(|(occurrence, clause)| Some((occur(*occurrence), compile(clause, schema)?))).collect();
			if subqueries.iter().all(|(o, _)| *o == Occur::MustNot) { return None; }
			Some(Box::new(BooleanQuery::new(subqueries)))
		}
	}
}

fn occur(occurrence: Occurrence) -> Occur {
	match occurrence {
		Occurrence::Must => Occur::Must,
		Occurrence::MustNot => Occur::MustNot,
		Occurrence::Should => Occur::Should,
	}
}

fn term_query(field: Field, text: &str) -> Box<dyn Query> {
	Box::new(TermQuery::new(Term::from_field_text(field, text), IndexRecordOption::WithFreqs))
}

fn phrase_query(schema: &Schema, field: Field, words: &[Word]) -> Option<Box<dyn Query>> {
	match words {
		[] => None,
		[word] => Some(term_query(field, &word.text)),
		_ => {
			let has_positions = schema.get_field_entry(field).field_type().get_index_record_option().is_some_and(|o| o.has_positions());
			if !has_positions {
				// Without positions the best we can do is require every word.
				let terms = words.iter().map(|w| (Occur::Must, term_query(field, &w.text))).collect();
				return Some(Box::new(BooleanQuery::new(terms)));
			}
			let first = words[0].position;
			let terms = words.iter().map(|w| (w.position.saturating_sub(first), Term::from_field_text(field, &w.text))).collect();
			Some(Box::new(PhraseQuery::new_with_offset(terms)))
		}
	}
}

fn boosted(query: Box<dyn Query>, boost: f32) -> Box<dyn Query> {
	if (boost - 1.0).abs() <= f32::EPSILON { query } else { Box::new(BoostQuery::new(query, boost)) }
}
