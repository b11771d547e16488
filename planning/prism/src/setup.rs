//! Desugaring of a probabilistic initial state into a first, mandatory transition.
//!
//! A problem whose `:init` contains a `(probabilistic ...)` block is rewritten so that its initial
//! state is deterministic: the fact `(not-setup)` initially holds and the only applicable action is
//! `prob_setup_init`, whose effect deletes `(not-setup)` and applies the distribution.

use crate::model::*;

/// Predicate that holds until the initial distribution has been applied.
pub const SETUP_PREDICATE: &str = "not-setup";
/// Action that applies the initial distribution.
pub const SETUP_ACTION: &str = "prob_setup_init";
/// Name of the state variable of [`SETUP_PREDICATE`] in the generated model.
pub const SETUP_ATOM: &str = "not_setup";

/// Rewrites the probabilistic part of the initial state, if any, into the setup action.
/// Returns true if the description was modified.
pub fn desugar_initial_distribution(description: &mut Description) -> bool {
    let Some(branches) = description.initial_distribution.take() else {
        return false;
    };
    if description.predicate(SETUP_PREDICATE).is_none() {
        description.predicates.push(PredicateSig {
            name: SETUP_PREDICATE.into(),
            params: Vec::new(),
        });
    }
    description.initial.push(AtomRef {
        predicate: SETUP_PREDICATE.into(),
        args: Vec::new(),
    });
    description.actions.push(ActionSig {
        name: SETUP_ACTION.into(),
        params: Vec::new(),
        precondition: Node::atom(SETUP_PREDICATE, Vec::new()),
        effect: Node::and(vec![
            Node::not(Node::atom(SETUP_PREDICATE, Vec::new())),
            Node::Probabilistic(branches),
        ]),
    });
    tracing::debug!("probabilistic initial state of {} moved to action {SETUP_ACTION}", description.problem);
    true
}

/// True if the description contains the setup predicate and action.
pub fn has_setup(description: &Description) -> bool {
    description.predicate(SETUP_PREDICATE).is_some() && description.action(SETUP_ACTION).is_some()
}
