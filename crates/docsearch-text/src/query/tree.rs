use std::fmt;

use crate::analyzer::Word;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    Must,
    MustNot,
    Should,
}

/// Engine-independent boolean query, built per search and then discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryTree {
    Term { field: String, text: String, boost: f32 },
    Phrase { field: String, words: Vec<Word>, boost: f32 },
    Boolean { clauses: Vec<(Occurrence, QueryTree)> },
}

impl QueryTree {
    pub fn clauses(&self) -> &[(Occurrence, QueryTree)] {
        match self {
            QueryTree::Boolean { clauses } => clauses,
            _ => &[],
        }
    }

    /// Fields referenced anywhere in the tree.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields.sort_unstable();
        fields.dedup();
        fields
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            QueryTree::Term { field, .. } | QueryTree::Phrase { field, .. } => out.push(field),
            QueryTree::Boolean { clauses } => clauses.iter().for_each(|(_, c)| c.collect_fields(out)),
        }
    }
}

fn write_boost(f: &mut fmt::Formatter<'_>, boost: f32) -> fmt::Result {
    if (boost - 1.0).abs() > f32::EPSILON {
        write!(f, "^{}", boost)?;
    }
    Ok(())
}

impl fmt::Display for QueryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryTree::Term { field, text, boost } => {
                write!(f, "{}:{}", field, text)?;
                write_boost(f, *boost)
            }
            QueryTree::Phrase { field, words, boost } => {
                let words: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
                write!(f, "{}:\"{}\"", field, words.join(" "))?;
                write_boost(f, *boost)
            }
            QueryTree::Boolean { clauses } => {
                f.write_str("(")?;
                for (i, (occurrence, clause)) in clauses.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    match occurrence {
                        Occurrence::Must => f.write_str("+")?,
                        Occurrence::MustNot => f.write_str("-")?,
                        Occurrence::Should => {}
                    }
                    write!(f, "{}", clause)?;
                }
                f.write_str(")")
            }
        }
    }
}
