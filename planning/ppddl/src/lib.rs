//! Front end for probabilistic PDDL (PPDDL) domains and problems.
//!
//! The crate reads domain and problem files into a syntactic representation ([`parser::Domain`],
//! [`parser::Problem`]) whose action bodies are kept as located s-expressions. Interpreting those
//! bodies is left to downstream crates.

pub mod errors;
mod find_file;
pub mod input;
pub mod parser;
pub mod sexpr;

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

pub use find_file::find_domain_of;
pub use parser::{parse_pddl_domain, parse_pddl_problem};
pub use sexpr::{ListIter, SAtom, SExpr, SList};

use errors::{Message, Span, Spanned};

pub type Res<T> = std::result::Result<T, Message>;

/// A symbol of a PPDDL file, lower-cased, and located in its input when read from one.
///
/// The location is ignored by comparisons and hashing.
#[derive(Clone)]
pub struct Sym {
    pub symbol: String,
    pub span: Option<Span>,
}

impl Sym {
    pub fn with_source(symbol: impl Into<String>, source: Span) -> Sym {
        Sym {
            symbol: symbol.into(),
            span: Some(source),
        }
    }

    pub fn canonical_str(&self) -> &str {
        &self.symbol
    }

    /// True for variables (`?x`), false for constants.
    pub fn is_variable(&self) -> bool {
        self.symbol.starts_with('?')
    }
}

impl From<String> for Sym {
    fn from(symbol: String) -> Self {
        Sym { symbol, span: None }
    }
}

impl From<&str> for Sym {
    fn from(symbol: &str) -> Self {
        Sym::from(symbol.to_string())
    }
}

impl Spanned for Sym {
    fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }
}

impl Display for Sym {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.symbol)
    }
}

impl Debug for Sym {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.symbol)
    }
}

impl PartialEq for Sym {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}
impl Eq for Sym {}

impl PartialOrd for Sym {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Sym {
    fn cmp(&self, other: &Self) -> Ordering {
        self.symbol.cmp(&other.symbol)
    }
}

impl Hash for Sym {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state)
    }
}

impl AsRef<str> for Sym {
    fn as_ref(&self) -> &str {
        &self.symbol
    }
}

impl Borrow<str> for Sym {
    fn borrow(&self) -> &str {
        &self.symbol
    }
}
