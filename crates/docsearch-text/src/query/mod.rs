//! Query text to boolean query tree.
//!
//! [`QueryBuilder`] splits and repairs the raw text (see [`tokens::tokenize`]),
//! analyzes the operands with the locale's analyzer and assembles a
//! [`QueryTree`].

pub mod builder;
pub mod tokens;
pub mod tree;

pub use builder::{QueryBuilder, DEFAULT_FIELD_BOOST, NAMED_FIELD_BOOST, UNQUOTED_PHRASE_BOOST};
pub use tokens::{normalize, render, split, tokenize, Lexeme, Operator, QueryToken};
pub use tree::{Occurrence, QueryTree};
