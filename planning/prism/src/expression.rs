//! Translation of conditions into boolean guards over ground atoms.

use ppddl::Sym;

use crate::model::{Connective, Node};
use crate::naming::ground_name;

/// Maps the parameters of an action (`?x`) to the objects they are bound to.
pub type Bindings<'a> = hashbrown::HashMap<&'a str, &'a str>;

/// Object denoted by a term: its binding if it is a bound parameter, the term itself otherwise.
pub fn substitute<'a>(term: &'a Sym, bindings: &Bindings<'a>) -> &'a str {
    let term = term.canonical_str();
    bindings.get(term).copied().unwrap_or(term)
}

/// Translates a condition into a guard expression.
///
/// Constructs without a boolean counterpart (quantifiers, numeric comparisons, ...) are
/// translated as `true`, i.e., they do not restrict the guard.
pub fn translate(node: &Node, bindings: &Bindings) -> String {
    match node {
        Node::Container { op, children } if children.is_empty() => match op {
            Connective::And => "true".to_string(),
            Connective::Or => "false".to_string(),
        },
        Node::Container { op, children } => {
            let sep = match op {
                Connective::And => " & ",
                Connective::Or => " | ",
            };
            let parts: Vec<String> = children.iter().map(|c| translate(c, bindings)).collect();
            format!("({})", parts.join(sep))
        }
        Node::Negation(Some(child)) => format!("!({})", translate(child, bindings)),
        Node::Negation(None) => "true".to_string(),
        Node::Atom(atom) => {
            let args: Vec<&str> = atom.args.iter().map(|a| substitute(a, bindings)).collect();
            ground_name(atom.predicate.canonical_str(), &args)
        }
        Node::Equality(a, b) => {
            if substitute(a, bindings) == substitute(b, bindings) {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        Node::Conditional { .. } | Node::Probabilistic(_) | Node::Unsupported(_) => "true".to_string(),
    }
}
