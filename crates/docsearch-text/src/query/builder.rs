//! Turns normalized query tokens into a [`QueryTree`].

use crate::analyzer::Analyzer;
use crate::query::tokens::{normalize, split, Lexeme, Operator, QueryToken};
use crate::query::tree::{Occurrence, QueryTree};
use crate::schema::{exact_field, DEFAULT_FIELDS};

/// Boost of fields named in the query when searched alongside the defaults.
pub const NAMED_FIELD_BOOST: f32 = 5.0;
pub const DEFAULT_FIELD_BOOST: f32 = 1.0;
/// Boost of the phrase built from a query made only of plain words.
pub const UNQUOTED_PHRASE_BOOST: f32 = 10.0;

/// Tokens after analysis. Operands whose text analyzes to nothing are gone.
#[derive(Debug, Clone)]
enum Analyzed {
    Op(Operator),
    Word(String),
    Phrase(Vec<String>),
}

impl Lexeme for Analyzed {
    fn operator(&self) -> Option<Operator> {
        match self {
            Analyzed::Op(op) => Some(*op),
            Analyzed::Word(_) | Analyzed::Phrase(_) => None,
        }
    }

    fn from_operator(op: Operator) -> Self {
        Analyzed::Op(op)
    }
}

struct SearchField {
    name: String,
    boost: f32,
}

pub struct QueryBuilder<'a> {
    analyzer: &'a dyn Analyzer,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(analyzer: &'a dyn Analyzer) -> Self {
        Self { analyzer }
    }

    /// Build the query for the raw `text`, searching the named `fields`
    /// (only those when `field_search_only`, otherwise together with the
    /// default fields). Returns `None` when nothing searchable is left.
    pub fn build(&self, text: &str, fields: &[String], field_search_only: bool) -> Option<QueryTree> {
        let raw = split(text);
        let plain_words = raw.len() > 1 && raw.iter().all(|t| matches!(t, QueryToken::Word(_)));
        let tokens = normalize(raw);

        let fields = search_fields(fields, field_search_only);
        let analyzed: Vec<Analyzed> = tokens
            .iter()
            .filter_map(|token| match token {
                QueryToken::Word(w) => self.has_words(&fields, w, false).then(|| Analyzed::Word(w.clone())),
                QueryToken::Phrase(words) => {
                    self.has_words(&fields, &words.join(" "), true).then(|| Analyzed::Phrase(words.clone()))
                }
                other => other.operator().map(Analyzed::Op),
            })
            .collect();
        // Removing stop words can leave dangling operators.
        let analyzed = normalize(analyzed);

        let base = self.expression(&analyzed, &fields)?;
        let phrase = if plain_words { self.unquoted_phrase(&analyzed, &fields) } else { None };
        match phrase {
            Some(phrase) => Some(QueryTree::Boolean {
                clauses: vec![(Occurrence::Should, base), (Occurrence::Should, phrase)],
            }),
            None => Some(base),
        }
    }

    /// Whether `text` leaves any word in one of `fields`. Quoted phrases are
    /// checked against the field they will actually be matched in.
    fn has_words(&self, fields: &[SearchField], text: &str, quoted: bool) -> bool {
        fields.iter().any(|f| !self.analyzer.tokenize(&self.target_field(&f.name, quoted), text).is_empty())
    }

    fn target_field(&self, field: &str, quoted: bool) -> String {
        let exact = if quoted && self.analyzer.exact_phrases() { exact_field(field) } else { None };
        exact.unwrap_or_else(|| field.to_string())
    }

    /// OR of the groups separated by top-level `Or`.
    fn expression(&self, tokens: &[Analyzed], fields: &[SearchField]) -> Option<QueryTree> {
        let mut groups: Vec<&[Analyzed]> = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;
        for (i, token) in tokens.iter().enumerate() {
            match token.operator() {
                Some(Operator::Open) => depth += 1,
                Some(Operator::Close) => depth = depth.saturating_sub(1),
                Some(Operator::Or) if depth == 0 => {
                    groups.push(&tokens[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        groups.push(&tokens[start..]);

        let trees: Vec<QueryTree> = groups.into_iter().filter_map(|g| self.group(g, fields)).collect();
        any_of(trees)
    }

    /// AND of the group's operands, with `Not`-prefixed ones prohibited.
    /// A group without a required operand matches nothing on its own and
    /// is dropped.
    fn group(&self, tokens: &[Analyzed], fields: &[SearchField]) -> Option<QueryTree> {
        let mut clauses = Vec::new();
        let mut negate = false;
        let mut i = 0;
        while i < tokens.len() {
            let clause = match &tokens[i] {
                Analyzed::Op(Operator::Not) => {
                    negate = true;
                    i += 1;
                    continue;
                }
                Analyzed::Op(Operator::Open) => {
                    let end = matching_close(tokens, i);
                    let inner = &tokens[i + 1..end];
                    i = end;
                    self.expression(inner, fields)
                }
                Analyzed::Op(_) => None,
                Analyzed::Word(word) => self.word(word, fields),
                Analyzed::Phrase(words) => self.phrase(words, fields),
            };
            if let Some(clause) = clause {
                let occurrence = if negate { Occurrence::MustNot } else { Occurrence::Must };
                clauses.push((occurrence, clause));
            }
            negate = false;
            i += 1;
        }

        if !clauses.iter().any(|(o, _)| *o == Occurrence::Must) {
            return None;
        }
        if clauses.len() == 1 {
            return clauses.pop().map(|(_, c)| c);
        }
        Some(QueryTree::Boolean { clauses })
    }

    fn word(&self, text: &str, fields: &[SearchField]) -> Option<QueryTree> {
        any_of(fields.iter().filter_map(|f| self.field_query(&f.name, text, f.boost)).collect())
    }

    fn phrase(&self, words: &[String], fields: &[SearchField]) -> Option<QueryTree> {
        let text = words.join(" ");
        let per_field = fields
            .iter()
            .filter_map(|f| self.field_query(&self.target_field(&f.name, true), &text, f.boost))
            .collect();
        any_of(per_field)
    }

    /// Phrase over every word of a query typed as plain words, so that
    /// documents containing the input verbatim rank first.
    fn unquoted_phrase(&self, tokens: &[Analyzed], fields: &[SearchField]) -> Option<QueryTree> {
        let mut words = Vec::new();
        for token in tokens {
            match token {
                Analyzed::Word(w) => words.push(w.as_str()),
                Analyzed::Op(Operator::And) => {}
                _ => return None,
            }
        }
        if words.len() < 2 {
            return None;
        }
        let text = words.join(" ");
        let per_field = fields
            .iter()
            .filter_map(|f| {
                let analyzed = self.analyzer.tokenize(&f.name, &text);
                (analyzed.len() > 1).then(|| QueryTree::Phrase {
                    field: f.name.clone(),
                    words: analyzed,
                    boost: f.boost * UNQUOTED_PHRASE_BOOST,
                })
            })
            .collect();
        any_of(per_field)
    }

    /// Term or phrase for `text` in one field, depending on how many words
    /// it analyzes to.
    fn field_query(&self, field: &str, text: &str, boost: f32) -> Option<QueryTree> {
        let mut words = self.analyzer.tokenize(field, text);
        match words.len() {
            0 => None,
            1 => words.pop().map(|w| QueryTree::Term { field: field.to_string(), text: w.text, boost }),
            _ => Some(QueryTree::Phrase { field: field.to_string(), words, boost }),
        }
    }
}

fn search_fields(named: &[String], field_search_only: bool) -> Vec<SearchField> {
    if field_search_only && !named.is_empty() {
        return named.iter().map(|n| SearchField { name: n.clone(), boost: DEFAULT_FIELD_BOOST }).collect();
    }
    let mut fields: Vec<SearchField> =
        DEFAULT_FIELDS.iter().map(|n| SearchField { name: n.to_string(), boost: DEFAULT_FIELD_BOOST }).collect();
    for name in named {
        match fields.iter_mut().find(|f| f.name == *name) {
            Some(existing) => existing.boost = NAMED_FIELD_BOOST,
            None => fields.push(SearchField { name: name.clone(), boost: NAMED_FIELD_BOOST }),
        }
    }
    fields
}

fn matching_close(tokens: &[Analyzed], open: usize) -> usize {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.operator() {
            Some(Operator::Open) => depth += 1,
            Some(Operator::Close) => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    tokens.len()
}

fn any_of(mut trees: Vec<QueryTree>) -> Option<QueryTree> {
    match trees.len() {
        0 => None,
        1 => trees.pop(),
        _ => Some(QueryTree::Boolean { clauses: trees.into_iter().map(|t| (Occurrence::Should, t)).collect() }),
    }
}
