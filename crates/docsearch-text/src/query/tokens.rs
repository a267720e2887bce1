//! Splitting of raw query text into tokens and repair of malformed
//! operator sequences.

use std::fmt;

/// Operators and brackets, shared by every token type that goes through
/// [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
    Open,
    Close,
}

/// A token that is either an [`Operator`] or an operand.
pub trait Lexeme: Clone {
    fn operator(&self) -> Option<Operator>;
    fn from_operator(op: Operator) -> Self;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryToken {
    And,
    Or,
    Not,
    Open,
    Close,
    Word(String),
    Phrase(Vec<String>),
}

impl Lexeme for QueryToken {
    fn operator(&self) -> Option<Operator> {
        match self {
            QueryToken::And => Some(Operator::And),
            QueryToken::Or => Some(Operator::Or),
            QueryToken::Not => Some(Operator::Not),
            QueryToken::Open => Some(Operator::Open),
            QueryToken::Close => Some(Operator::Close),
            QueryToken::Word(_) | QueryToken::Phrase(_) => None,
        }
    }

    fn from_operator(op: Operator) -> Self {
        match op {
            Operator::And => QueryToken::And,
            Operator::Or => QueryToken::Or,
            Operator::Not => QueryToken::Not,
            Operator::Open => QueryToken::Open,
            Operator::Close => QueryToken::Close,
        }
    }
}

impl fmt::Display for QueryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryToken::And => f.write_str("AND"),
            QueryToken::Or => f.write_str("OR"),
            QueryToken::Not => f.write_str("NOT"),
            QueryToken::Open => f.write_str("("),
            QueryToken::Close => f.write_str(")"),
            QueryToken::Word(w) => f.write_str(w),
            QueryToken::Phrase(words) => write!(f, "\"{}\"", words.join(" ")),
        }
    }
}

/// Render tokens as query text that tokenizes back to the same tokens.
pub fn render(tokens: &[QueryToken]) -> String {
    tokens.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

/// Split and normalize `raw`.
pub fn tokenize(raw: &str) -> Vec<QueryToken> {
    normalize(split(raw))
}

/// Split `raw` without repairing it. Quoted text becomes one phrase; an
/// unterminated quote runs to the end of the input.
pub fn split(raw: &str) -> Vec<QueryToken> {
    let mut tokens = Vec::new();
    for (i, segment) in raw.split('"').enumerate() {
        if i % 2 == 1 {
            let words: Vec<String> = segment.split_whitespace().map(str::to_string).collect();
            if !words.is_empty() {
                tokens.push(QueryToken::Phrase(words));
            }
        } else {
            split_unquoted(segment, &mut tokens);
        }
    }
    tokens
}

fn split_unquoted(segment: &str, tokens: &mut Vec<QueryToken>) {
    for piece in segment.split_whitespace() {
        let mut word = String::new();
        for c in piece.chars() {
            match c {
                '(' | ')' => {
                    push_word(&mut word, tokens);
                    tokens.push(if c == '(' { QueryToken::Open } else { QueryToken::Close });
                }
                _ => word.push(c),
            }
        }
        push_word(&mut word, tokens);
    }
}

fn push_word(word: &mut String, tokens: &mut Vec<QueryToken>) {
    if word.is_empty() {
        return;
    }
    let token = if word.eq_ignore_ascii_case("and") {
        QueryToken::And
    } else if word.eq_ignore_ascii_case("or") {
        QueryToken::Or
    } else if word.eq_ignore_ascii_case("not") {
        QueryToken::Not
    } else {
        QueryToken::Word(std::mem::take(word))
    };
    word.clear();
    tokens.push(token);
}

fn is_binary(op: Option<Operator>) -> bool {
    matches!(op, Some(Operator::And | Operator::Or))
}

fn ends_operand(op: Option<Operator>) -> bool {
    matches!(op, None | Some(Operator::Close))
}

fn starts_operand(op: Option<Operator>) -> bool {
    matches!(op, None | Some(Operator::Open))
}

/// Repair `tokens` into a well-formed boolean expression. The rules are
/// applied until nothing changes, so the result is a fixpoint and
/// normalizing it again is a no-op.
pub fn normalize<T: Lexeme>(mut tokens: Vec<T>) -> Vec<T> {
    loop {
        let (next, changed) = normalize_pass(tokens);
        tokens = next;
        if !changed {
            return tokens;
        }
    }
}

fn normalize_pass<T: Lexeme>(tokens: Vec<T>) -> (Vec<T>, bool) {
    let before = tokens.len();
    let mut changed = false;

    // Balance brackets.
    let mut balanced = Vec::with_capacity(tokens.len());
    let mut depth = 0usize;
    for token in tokens {
        match token.operator() {
            Some(Operator::Open) => depth += 1,
            Some(Operator::Close) if depth == 0 => {
                changed = true;
                continue;
            }
            Some(Operator::Close) => depth -= 1,
            _ => {}
        }
        balanced.push(token);
    }
    for _ in 0..depth {
        balanced.push(T::from_operator(Operator::Close));
        changed = true;
    }

    let mut out: Vec<T> = Vec::with_capacity(balanced.len());
    for token in balanced {
        let op = token.operator();
        let prev = out.last().map(T::operator);
        match op {
            // Leading, doubled, or right after an opening bracket.
            Some(Operator::And | Operator::Or)
                if matches!(prev, None | Some(Some(Operator::And | Operator::Or | Operator::Not | Operator::Open))) =>
            {
                changed = true;
            }
            Some(Operator::Not) if prev == Some(Some(Operator::Not)) => changed = true,
            Some(Operator::Close) => {
                while out.last().map(T::operator).is_some_and(|p| matches!(p, Some(Operator::And | Operator::Or | Operator::Not))) {
                    out.pop();
                    changed = true;
                }
                if out.last().map(T::operator) == Some(Some(Operator::Open)) {
                    out.pop();
                    changed = true;
                } else {
                    out.push(token);
                }
            }
            _ if starts_operand(op) && prev.is_some_and(ends_operand) => {
                out.push(T::from_operator(implied_operator(&out)));
                out.push(token);
                changed = true;
            }
            _ => out.push(token),
        }
    }

    while let Some(last) = out.last().map(T::operator) {
        if matches!(last, Some(Operator::And | Operator::Or | Operator::Not | Operator::Open)) {
            out.pop();
            changed = true;
        } else {
            break;
        }
    }

    let changed = changed || out.len() != before;
    (out, changed)
}

/// Operator to insert between two adjacent operands: `Not` when the nearest
/// earlier operator at the same bracket depth is `Not`, otherwise `And`.
fn implied_operator<T: Lexeme>(preceding: &[T]) -> Operator {
    let mut depth = 0usize;
    for token in preceding.iter().rev() {
        match token.operator() {
            Some(Operator::Close) => depth += 1,
            Some(Operator::Open) if depth == 0 => break,
            Some(Operator::Open) => depth -= 1,
            Some(Operator::Not) if depth == 0 => return Operator::Not,
            Some(op) if depth == 0 && is_binary(Some(op)) => return Operator::And,
            _ => {}
        }
    }
    Operator::And
}
