use docsearch_core::Locale;
use docsearch_text::analyzer::{AnalyzerKind, LocaleAnalyzer, StemLanguage, Word};
use docsearch_text::query::{normalize, render, split, tokenize, Occurrence, QueryBuilder, QueryToken, QueryTree};

use QueryToken::{And, Close, Not, Open, Or};

fn word(s: &str) -> QueryToken {
    QueryToken::Word(s.to_string())
}

fn phrase(words: &[&str]) -> QueryToken {
    QueryToken::Phrase(words.iter().map(|w| w.to_string()).collect())
}

fn en() -> Locale {
    Locale::parse("en").unwrap()
}

fn term(field: &str, text: &str, boost: f32) -> QueryTree {
    QueryTree::Term { field: field.to_string(), text: text.to_string(), boost }
}

fn contents() -> Vec<String> {
    vec!["contents".to_string()]
}

#[test]
fn tokenize_phrase_and_operators() {
    assert_eq!(
        tokenize("\"foo bar\" AND baz NOT qux"),
        vec![phrase(&["foo", "bar"]), And, word("baz"), Not, word("qux")]
    );
}

#[test]
fn missing_operator_becomes_and() {
    assert_eq!(tokenize("foo bar"), vec![word("foo"), And, word("bar")]);
}

#[test]
fn operators_are_case_insensitive() {
    assert_eq!(tokenize("foo or bar"), vec![word("foo"), Or, word("bar")]);
    assert_eq!(tokenize("foo AnD bar"), vec![word("foo"), And, word("bar")]);
}

#[test]
fn malformed_sequences_are_repaired() {
    assert_eq!(tokenize("AND foo"), vec![word("foo")]);
    assert_eq!(tokenize("OR foo NOT"), vec![word("foo")]);
    assert_eq!(tokenize("foo AND AND bar"), vec![word("foo"), And, word("bar")]);
    assert_eq!(tokenize("foo AND OR bar"), vec![word("foo"), And, word("bar")]);
    assert_eq!(tokenize("foo NOT NOT bar"), vec![word("foo"), Not, word("bar")]);
    assert_eq!(tokenize("() foo"), vec![word("foo")]);
    assert_eq!(tokenize("a ) b"), vec![word("a"), And, word("b")]);
    assert_eq!(tokenize("(a b"), vec![Open, word("a"), And, word("b"), Close]);
    assert_eq!(tokenize("( AND a )"), vec![Open, word("a"), Close]);
    assert!(tokenize("   ").is_empty());
    assert!(tokenize("AND OR NOT").is_empty());
}

#[test]
fn implied_operator_follows_preceding_not() {
    assert_eq!(tokenize("foo NOT bar baz"), vec![word("foo"), Not, word("bar"), Not, word("baz")]);
    // A NOT inside a closed group does not leak out of it.
    assert_eq!(
        tokenize("(a NOT b) c"),
        vec![Open, word("a"), Not, word("b"), Close, And, word("c")]
    );
}

#[test]
fn unterminated_quote_runs_to_end() {
    assert_eq!(tokenize("foo \"bar baz"), vec![word("foo"), And, phrase(&["bar", "baz"])]);
    assert_eq!(split("\"\" foo"), vec![word("foo")]);
}

fn well_formed(tokens: &[QueryToken]) -> bool {
    let operand_end = |t: &QueryToken| matches!(t, QueryToken::Word(_) | QueryToken::Phrase(_) | Close);
    let operand_start = |t: &QueryToken| matches!(t, QueryToken::Word(_) | QueryToken::Phrase(_) | Open);
    let mut depth = 0i32;
    for t in tokens {
        match t {
            Open => depth += 1,
            Close => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }
    if depth != 0 {
        return false;
    }
    if matches!(tokens.first(), Some(And | Or | Close)) || matches!(tokens.last(), Some(And | Or | Not | Open)) {
        return false;
    }
    tokens.windows(2).all(|w| {
        let adjacent_operands = operand_end(&w[0]) && operand_start(&w[1]);
        let doubled = matches!(w[0], And | Or | Not | Open) && matches!(w[1], And | Or);
        let empty_group = matches!(w[0], Open) && matches!(w[1], Close);
        !adjacent_operands && !doubled && !empty_group && !matches!((&w[0], &w[1]), (Not, Not))
    })
}

#[test]
fn normalization_is_idempotent_for_all_short_sequences() {
    let alphabet = [And, Or, Not, Open, Close, word("w"), phrase(&["p", "q"])];
    let mut sequences: Vec<Vec<QueryToken>> = vec![Vec::new()];
    let mut checked = 0;
    for _ in 0..5 {
        let mut next = Vec::new();
        for seq in &sequences {
            for token in &alphabet {
                let mut s = seq.clone();
                s.push(token.clone());
                let once = normalize(s.clone());
                assert_eq!(normalize(once.clone()), once, "not idempotent for {:?}", s);
                assert!(well_formed(&once), "malformed result {:?} for {:?}", once, s);
                assert_eq!(tokenize(&render(&once)), once, "render does not round trip for {:?}", s);
                checked += 1;
                next.push(s);
            }
        }
        sequences = next;
    }
    assert_eq!(checked, 7 + 49 + 343 + 2401 + 16807);
}

#[test]
fn builder_required_phrase_term_and_prohibited_term() {
    let analyzer = LocaleAnalyzer::new(AnalyzerKind::Default, &en());
    let tree = QueryBuilder::new(&analyzer).build("\"foo bar\" AND baz NOT qux", &contents(), true).unwrap();
    assert_eq!(
        tree,
        QueryTree::Boolean {
            clauses: vec![
                (
                    Occurrence::Must,
                    QueryTree::Phrase {
                        field: "contents".to_string(),
                        words: vec![Word::new("foo", 0), Word::new("bar", 1)],
                        boost: 1.0
                    }
                ),
                (Occurrence::Must, term("contents", "baz", 1.0)),
                (Occurrence::MustNot, term("contents", "qux", 1.0)),
            ]
        }
    );
}

#[test]
fn builder_adds_boosted_phrase_for_plain_words() {
    let analyzer = LocaleAnalyzer::new(AnalyzerKind::Default, &en());
    let tree = QueryBuilder::new(&analyzer).build("data structures", &contents(), true).unwrap();
    assert_eq!(
        tree,
        QueryTree::Boolean {
            clauses: vec![
                (
                    Occurrence::Should,
                    QueryTree::Boolean {
                        clauses: vec![
                            (Occurrence::Must, term("contents", "data", 1.0)),
                            (Occurrence::Must, term("contents", "structures", 1.0)),
                        ]
                    }
                ),
                (
                    Occurrence::Should,
                    QueryTree::Phrase {
                        field: "contents".to_string(),
                        words: vec![Word::new("data", 0), Word::new("structures", 1)],
                        boost: 10.0
                    }
                ),
            ]
        }
    );
}

#[test]
fn no_phrase_boost_with_explicit_booleans_or_single_word() {
    let analyzer = LocaleAnalyzer::new(AnalyzerKind::Default, &en());
    let builder = QueryBuilder::new(&analyzer);
    assert_eq!(builder.build("data", &contents(), true), Some(term("contents", "data", 1.0)));
    let tree = builder.build("data OR structures", &contents(), true).unwrap();
    assert_eq!(
        tree,
        QueryTree::Boolean {
            clauses: vec![
                (Occurrence::Should, term("contents", "data", 1.0)),
                (Occurrence::Should, term("contents", "structures", 1.0)),
            ]
        }
    );
}

#[test]
fn explicit_and_gets_no_phrase_boost() {
    let analyzer = LocaleAnalyzer::new(AnalyzerKind::Default, &en());
    let tree = QueryBuilder::new(&analyzer).build("data AND structures", &contents(), true).unwrap();
    assert_eq!(
        tree,
        QueryTree::Boolean {
            clauses: vec![
                (Occurrence::Must, term("contents", "data", 1.0)),
                (Occurrence::Must, term("contents", "structures", 1.0)),
            ]
        }
    );
}

#[test]
fn named_fields_are_boosted_in_combined_search() {
    let analyzer = LocaleAnalyzer::new(AnalyzerKind::Default, &en());
    let tree = QueryBuilder::new(&analyzer).build("data", &["title".to_string()], false).unwrap();
    assert_eq!(
        tree,
        QueryTree::Boolean {
            clauses: vec![
                (Occurrence::Should, term("contents", "data", 1.0)),
                (Occurrence::Should, term("title", "data", 5.0)),
            ]
        }
    );
}

#[test]
fn default_fields_searched_when_none_named() {
    let analyzer = LocaleAnalyzer::new(AnalyzerKind::Default, &en());
    let tree = QueryBuilder::new(&analyzer).build("data", &[], false).unwrap();
    assert_eq!(tree.fields(), vec!["contents", "title"]);
}

#[test]
fn pure_negation_yields_no_query() {
    let analyzer = LocaleAnalyzer::new(AnalyzerKind::Default, &en());
    let builder = QueryBuilder::new(&analyzer);
    assert_eq!(builder.build("NOT foo", &contents(), true), None);
    assert_eq!(builder.build("", &contents(), true), None);
    // The negated OR branch is dropped, the other one survives.
    assert_eq!(builder.build("foo OR NOT bar", &contents(), true), Some(term("contents", "foo", 1.0)));
}

#[test]
fn stop_words_vanish_without_breaking_the_expression() {
    let analyzer = LocaleAnalyzer::new(AnalyzerKind::Stemming(StemLanguage::English), &en());
    let builder = QueryBuilder::new(&analyzer);
    assert_eq!(builder.build("the AND foo", &contents(), true), Some(term("contents", "foo", 1.0)));
    assert_eq!(builder.build("the", &contents(), true), None);
}

#[test]
fn smart_analyzer_matches_quoted_phrases_literally() {
    let analyzer = LocaleAnalyzer::new(AnalyzerKind::Smart(StemLanguage::English), &en());
    let builder = QueryBuilder::new(&analyzer);
    let tree = builder.build("\"running dogs\"", &contents(), true).unwrap();
    assert_eq!(
        tree,
        QueryTree::Phrase {
            field: "exact_contents".to_string(),
            words: vec![Word::new("running", 0), Word::new("dogs", 1)],
            boost: 1.0
        }
    );
    // Unquoted words are stemmed.
    assert_eq!(builder.build("running", &contents(), true), Some(term("contents", "run", 1.0)));
}

#[test]
fn quoted_stop_words_still_match_literally() {
    let analyzer = LocaleAnalyzer::new(AnalyzerKind::Smart(StemLanguage::English), &en());
    let builder = QueryBuilder::new(&analyzer);
    let words = ["to", "be", "or", "not"].iter().enumerate().map(|(i, w)| Word::new(*w, i)).collect();
    assert_eq!(
        builder.build("\"to be or not\"", &contents(), true),
        Some(QueryTree::Phrase { field: "exact_contents".to_string(), words, boost: 1.0 })
    );
    // Unquoted, the same words are all stop words.
    assert_eq!(builder.build("to be", &contents(), true), None);
}

#[test]
fn parenthesised_group_becomes_nested_node() {
    let analyzer = LocaleAnalyzer::new(AnalyzerKind::Default, &en());
    let tree = QueryBuilder::new(&analyzer).build("a AND (b OR c)", &contents(), true).unwrap();
    assert_eq!(
        tree,
        QueryTree::Boolean {
            clauses: vec![
                (Occurrence::Must, term("contents", "a", 1.0)),
                (
                    Occurrence::Must,
                    QueryTree::Boolean {
                        clauses: vec![
                            (Occurrence::Should, term("contents", "b", 1.0)),
                            (Occurrence::Should, term("contents", "c", 1.0)),
                        ]
                    }
                ),
            ]
        }
    );
}
