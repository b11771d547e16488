//! Closed representation of a planning task, as consumed by the translation passes.
//!
//! Expressions and effects share a single tagged type, [`Node`], produced once by the
//! [`adapter`](crate::adapter) from the front end's s-expressions.

use std::fmt::{Display, Formatter};

use itertools::Itertools;
use ppddl::Sym;

#[derive(Copy, Clone, Debug, PartialEq, Eq, derive_more::Display)]
pub enum Connective {
    #[display("and")]
    And,
    #[display("or")]
    Or,
}

/// Reference to a predicate applied to arguments. Arguments are either variables (`?x`)
/// or object names.
#[derive(Clone, Debug)]
pub struct AtomRef {
    pub predicate: Sym,
    pub args: Vec<Sym>,
}

impl Display for AtomRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.args.is_empty() {
            write!(f, "({})", self.predicate)
        } else {
            write!(f, "({} {})", self.predicate, self.args.iter().format(" "))
        }
    }
}

/// Representation of a probability as written in the source, before resolution to a number.
#[derive(Clone, Debug, PartialEq)]
pub enum ProbValue {
    Number(f64),
    /// A token that is not directly a float, e.g. `1/3`.
    Text(String),
    /// Division of two terms, e.g. `(/ 1 3)`.
    Ratio(Box<ProbValue>, Box<ProbValue>),
    /// Any other compound term, with its textual rendering.
    Compound { text: String, fields: Vec<ProbValue> },
}

impl Display for ProbValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbValue::Number(x) => write!(f, "{x}"),
            ProbValue::Text(s) => write!(f, "{s}"),
            ProbValue::Ratio(num, denum) => write!(f, "(/ {num} {denum})"),
            ProbValue::Compound { text, .. } => write!(f, "{text}"),
        }
    }
}

/// One alternative of a probabilistic effect.
#[derive(Clone, Debug)]
pub struct Branch {
    pub probability: ProbValue,
    pub effect: Node,
}

#[derive(Clone, Debug)]
pub enum Node {
    Container { op: Connective, children: Vec<Node> },
    Negation(Option<Box<Node>>),
    Conditional { condition: Box<Node>, effect: Box<Node> },
    Probabilistic(Vec<Branch>),
    Atom(AtomRef),
    Equality(Sym, Sym),
    /// A construct that has no translation (quantifiers, numeric updates, ...), with its textual rendering.
    Unsupported(String),
}

impl Node {
    /// The empty conjunction.
    pub fn empty() -> Node {
        Node::Container {
            op: Connective::And,
            children: Vec::new(),
        }
    }

    pub fn and(children: Vec<Node>) -> Node {
        Node::Container {
            op: Connective::And,
            children,
        }
    }

    pub fn not(child: Node) -> Node {
        Node::Negation(Some(Box::new(child)))
    }

    pub fn atom(predicate: impl Into<Sym>, args: Vec<Sym>) -> Node {
        Node::Atom(AtomRef {
            predicate: predicate.into(),
            args,
        })
    }

    /// Wraps a list of nodes into a single one, avoiding a container for a single element.
    pub fn conjunction(mut nodes: Vec<Node>) -> Node {
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::and(nodes)
        }
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Container { op, children } => {
                write!(f, "({op}")?;
                for c in children {
                    write!(f, " {c}")?;
                }
                write!(f, ")")
            }
            Node::Negation(Some(child)) => write!(f, "(not {child})"),
            Node::Negation(None) => write!(f, "(not)"),
            Node::Conditional { condition, effect } => write!(f, "(when {condition} {effect})"),
            Node::Probabilistic(branches) => {
                write!(f, "(probabilistic")?;
                for b in branches {
                    write!(f, " {} {}", b.probability, b.effect)?;
                }
                write!(f, ")")
            }
            Node::Atom(atom) => write!(f, "{atom}"),
            Node::Equality(a, b) => write!(f, "(= {a} {b})"),
            Node::Unsupported(text) => write!(f, "{text}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, derive_more::Display)]
#[display("{name} - {tpe}")]
pub struct Parameter {
    pub name: Sym,
    pub tpe: Sym,
}

impl Parameter {
    pub fn new(name: impl Into<Sym>, tpe: impl Into<Sym>) -> Self {
        Parameter {
            name: name.into(),
            tpe: tpe.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PredicateSig {
    pub name: Sym,
    pub params: Vec<Parameter>,
}

#[derive(Clone, Debug)]
pub struct ActionSig {
    pub name: Sym,
    pub params: Vec<Parameter>,
    pub precondition: Node,
    pub effect: Node,
}

#[derive(Clone, Debug)]
pub struct TypeDecl {
    pub name: Sym,
    pub parent: Option<Sym>,
}

/// A domain and problem pair, with all bodies mapped to [`Node`]s.
#[derive(Clone, Debug)]
pub struct Description {
    pub domain: Sym,
    pub problem: Sym,
    pub types: Vec<TypeDecl>,
    pub constants: Vec<Parameter>,
    pub predicates: Vec<PredicateSig>,
    pub actions: Vec<ActionSig>,
    pub objects: Vec<Parameter>,
    /// Facts that hold in the initial state.
    pub initial: Vec<AtomRef>,
    /// Probabilistic part of the initial state, if any.
    pub initial_distribution: Option<Vec<Branch>>,
    pub goal: Option<Node>,
}

impl Description {
    pub fn predicate(&self, name: &str) -> Option<&PredicateSig> {
        self.predicates.iter().find(|p| p.name.canonical_str() == name)
    }

    pub fn action(&self, name: &str) -> Option<&ActionSig> {
        self.actions.iter().find(|a| a.name.canonical_str() == name)
    }
}
