//! Translation of action effects into probabilistic updates of the ground atoms.
//!
//! An effect is split into its base part, applied in every outcome, and at most one
//! probabilistic effect. Each alternative of the probabilistic effect yields one [`Outcome`]
//! combining its own assignments with the base ones. If the alternatives do not cover the full
//! probability mass, an additional outcome applies only the base assignments.

use itertools::Itertools;
use thiserror::Error;

use crate::expression::{self, Bindings, substitute};
use crate::model::{Branch, Connective, Node};
use crate::naming::ground_name;
use crate::probability;

/// Tolerance used when checking that the probabilities of the outcomes of an action sum to 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// A value given to a ground atom by an effect, under the conditions of the enclosing `when`s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub atom: String,
    pub value: bool,
    /// Translated conditions, all of which must hold for the assignment to apply.
    pub conditions: Vec<String>,
}

impl Assignment {
    fn unconditional(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub probability: f64,
    /// Update formula, e.g. `(on_a_b' = true) & (clear_b' = false)`, or `true` if nothing changes.
    pub update: String,
}

impl Outcome {
    pub fn new(probability: f64, update: impl Into<String>) -> Self {
        Outcome {
            probability,
            update: update.into(),
        }
    }
}

/// Result of processing the effect of a ground action.
#[derive(Clone, Debug, PartialEq)]
pub enum Effects {
    Outcomes(Vec<Outcome>),
    /// Some outcome gives two different values to the same atom.
    Infeasible { atom: String },
}

#[derive(Error, Debug)]
pub enum EffectError {
    #[error("probabilistic effect not at the top level of the effect: {0}")]
    NestedProbabilistic(String),
    #[error("more than one probabilistic effect")]
    MultipleProbabilistic,
    #[error("disjunctive effect: {0}")]
    Disjunctive(String),
    #[error("probabilities of the outcomes sum to {total}")]
    ExcessMass { total: f64 },
}

/// Translates a deterministic effect into the assignments it makes, in order of appearance.
pub fn translate_effect(node: &Node, bindings: &Bindings) -> Result<Vec<Assignment>, EffectError> {
    match node {
        Node::Atom(atom) => {
            let args: Vec<&str> = atom.args.iter().map(|a| substitute(a, bindings)).collect();
            Ok(vec![Assignment {
                atom: ground_name(atom.predicate.canonical_str(), &args),
                value: true,
                conditions: Vec::new(),
            }])
        }
        Node::Negation(Some(child)) => Ok(translate_effect(child, bindings)?
            .into_iter()
            .map(|a| Assignment { value: false, ..a })
            .collect()),
        Node::Negation(None) => Ok(Vec::new()),
        Node::Conditional { condition, effect } => {
            let cond = expression::translate(condition, bindings);
            Ok(translate_effect(effect, bindings)?
                .into_iter()
                .map(|mut a| {
                    a.conditions.insert(0, cond.clone());
                    a
                })
                .collect())
        }
        Node::Container {
            op: Connective::And,
            children,
        } => {
            let mut assignments = Vec::new();
            for c in children {
                assignments.extend(translate_effect(c, bindings)?);
            }
            Ok(assignments)
        }
        Node::Container { op: Connective::Or, .. } => Err(EffectError::Disjunctive(node.to_string())),
        Node::Probabilistic(_) => Err(EffectError::NestedProbabilistic(node.to_string())),
        Node::Equality(..) | Node::Unsupported(_) => {
            tracing::warn!("ignoring unsupported effect {node}");
            Ok(Vec::new())
        }
    }
}

/// Splits the top-level conjunction of an effect into its deterministic parts and its probabilistic part.
fn split<'a>(
    node: &'a Node,
    base: &mut Vec<&'a Node>,
    probabilistic: &mut Option<&'a [Branch]>,
) -> Result<(), EffectError> {
    match node {
        Node::Container {
            op: Connective::And,
            children,
        } => {
            for c in children {
                split(c, base, probabilistic)?;
            }
        }
        Node::Probabilistic(branches) => {
            if probabilistic.is_some() {
                return Err(EffectError::MultipleProbabilistic);
            }
            *probabilistic = Some(branches);
        }
        _ => base.push(node),
    }
    Ok(())
}

/// Computes the outcomes of an effect under the given bindings.
pub fn process(effect: &Node, bindings: &Bindings) -> Result<Effects, EffectError> {
    let mut base_nodes = Vec::new();
    let mut probabilistic = None;
    split(effect, &mut base_nodes, &mut probabilistic)?;

    let mut base = Vec::new();
    for n in base_nodes {
        base.extend(translate_effect(n, bindings)?);
    }

    let mut outcomes: Vec<(f64, Vec<Assignment>)> = Vec::new();
    match probabilistic {
        None => outcomes.push((1.0, base)),
        Some(branches) => {
            // probabilities that could not be resolved share the mass left by the others
            let resolved: Vec<Option<f64>> = branches
                .iter()
                .map(|b| probability::try_resolve(&b.probability))
                .collect();
            let known: f64 = resolved.iter().flatten().sum();
            if known > 1.0 + PROBABILITY_TOLERANCE {
                return Err(EffectError::ExcessMass { total: known });
            }
            let unknown = resolved.iter().filter(|p| p.is_none()).count();
            let share = if unknown > 0 { residual(known) / unknown as f64 } else { 0.0 };

            let mut total = 0.0;
            for (branch, p) in branches.iter().zip(resolved) {
                let p = p.unwrap_or_else(|| {
                    tracing::warn!(
                        "unable to extract a probability from `{}`, using {share}",
                        branch.probability
                    );
                    share
                });
                let mut assignments = translate_effect(&branch.effect, bindings)?;
                assignments.extend(base.iter().cloned());
                total += p;
                outcomes.push((p, assignments));
            }
            if total < 1.0 - PROBABILITY_TOLERANCE {
                outcomes.push((residual(total), base));
            }
        }
    }

    let mut result = Vec::with_capacity(outcomes.len());
    for (p, assignments) in outcomes {
        match fold(&assignments) {
            Ok(updates) => result.push(Outcome::new(p, format_update(&updates))),
            Err(atom) => return Ok(Effects::Infeasible { atom }),
        }
    }
    Ok(Effects::Outcomes(result))
}

/// Probability mass not covered by the explicit outcomes, rounded to hide floating point noise.
fn residual(total: f64) -> f64 {
    ((1.0 - total) * 1e12).round() / 1e12
}

/// Combines the assignments of an outcome into one value expression per atom, atoms being in
/// order of first appearance.
///
/// Unconditional assignments set the default value of the atom, its current value otherwise.
/// Conditional ones are layered over it, later ones taking precedence.
/// Returns the name of the atom if two unconditional assignments disagree.
fn fold(assignments: &[Assignment]) -> Result<Vec<(String, String)>, String> {
    let atoms = assignments.iter().map(|a| a.atom.as_str()).unique();
    atoms
        .map(|atom| {
            let of_atom = || assignments.iter().filter(move |a| a.atom == atom);
            let mut literals = of_atom().filter(|a| a.unconditional()).map(|a| a.value).dedup();
            let mut value = match (literals.next(), literals.next()) {
                (Some(_), Some(_)) => return Err(atom.to_string()),
                (Some(v), None) => v.to_string(),
                (None, _) => atom.to_string(),
            };
            for a in of_atom().filter(|a| !a.unconditional()) {
                value = format!("({} ? {} : {value})", a.conditions.join(" & "), a.value);
            }
            Ok((atom.to_string(), value))
        })
        .collect()
}

/// Formats the values of some atoms as an update of the target language.
pub fn format_update(updates: &[(String, String)]) -> String {
    if updates.is_empty() {
        "true".to_string()
    } else {
        updates
            .iter()
            .map(|(var, val)| format!("({var}' = {val})"))
            .join(" & ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProbValue;
    use ppddl::Sym;

    fn atom(pred: &str, args: &[&str]) -> Node {
        Node::atom(pred, args.iter().map(|&a| Sym::from(a)).collect())
    }

    fn branch(p: f64, effect: Node) -> Branch {
        Branch {
            probability: ProbValue::Number(p),
            effect,
        }
    }

    fn outcomes(effects: Effects) -> Vec<Outcome> {
        match effects {
            Effects::Outcomes(outcomes) => outcomes,
            Effects::Infeasible { atom } => panic!("unexpected conflict on {atom}"),
        }
    }

    fn bindings() -> Bindings<'static> {
        [("?x", "a"), ("?y", "b")].into_iter().collect()
    }

    #[test]
    fn deterministic_effect() -> Result<(), EffectError> {
        let effect = Node::and(vec![atom("on", &["?x", "?y"]), Node::not(atom("clear", &["?y"]))]);
        let res = outcomes(process(&effect, &bindings())?);
        assert_eq!(res, vec![Outcome::new(1.0, "(on_a_b' = true) & (clear_b' = false)")]);

        let res = outcomes(process(&Node::empty(), &bindings())?);
        assert_eq!(res, vec![Outcome::new(1.0, "true")]);
        Ok(())
    }

    #[test]
    fn conditional_effect() -> Result<(), EffectError> {
        let effect = Node::Conditional {
            condition: Box::new(atom("clear", &["?x"])),
            effect: Box::new(Node::not(atom("free", &["?y"]))),
        };
        let assignments = translate_effect(&effect, &bindings())?;
        assert_eq!(
            assignments,
            vec![Assignment {
                atom: "free_b".to_string(),
                value: false,
                conditions: vec!["clear_a".to_string()],
            }]
        );
        let res = outcomes(process(&effect, &bindings())?);
        assert_eq!(res, vec![Outcome::new(1.0, "(free_b' = (clear_a ? false : free_b))")]);
        Ok(())
    }

    #[test]
    fn conditional_effect_over_base_value() -> Result<(), EffectError> {
        // (and (not (p ?x)) (when (q ?x) (p ?x)))
        let effect = Node::and(vec![
            Node::not(atom("p", &["?x"])),
            Node::Conditional {
                condition: Box::new(atom("q", &["?x"])),
                effect: Box::new(atom("p", &["?x"])),
            },
        ]);
        let res = outcomes(process(&effect, &bindings())?);
        assert_eq!(res, vec![Outcome::new(1.0, "(p_a' = (q_a ? true : false))")]);
        Ok(())
    }

    #[test]
    fn successive_conditional_effects() -> Result<(), EffectError> {
        let when = |cond: Node, effect: Node| Node::Conditional {
            condition: Box::new(cond),
            effect: Box::new(effect),
        };
        let effect = Node::and(vec![
            when(atom("q", &["?x"]), atom("p", &["?x"])),
            when(atom("r", &["?y"]), Node::not(atom("p", &["?x"]))),
            when(atom("q", &["?x"]), when(atom("r", &["?y"]), atom("s", &["?y"]))),
        ]);
        let res = outcomes(process(&effect, &bindings())?);
        assert_eq!(
            res,
            vec![Outcome::new(
                1.0,
                "(p_a' = (r_b ? false : (q_a ? true : p_a))) & (s_b' = (q_a & r_b ? true : s_b))"
            )]
        );
        Ok(())
    }

    #[test]
    fn unresolved_probability_takes_remaining_mass() -> Result<(), EffectError> {
        let effect = Node::Probabilistic(vec![
            Branch {
                probability: ProbValue::Text("heavy".to_string()),
                effect: atom("p", &["?x"]),
            },
            branch(0.5, atom("q", &["?x"])),
        ]);
        let res = outcomes(process(&effect, &bindings())?);
        assert_eq!(
            res,
            vec![Outcome::new(0.5, "(p_a' = true)"), Outcome::new(0.5, "(q_a' = true)")]
        );

        let alone = Node::Probabilistic(vec![Branch {
            probability: ProbValue::Text("heavy".to_string()),
            effect: atom("p", &["?x"]),
        }]);
        assert_eq!(outcomes(process(&alone, &bindings())?), vec![Outcome::new(1.0, "(p_a' = true)")]);
        Ok(())
    }

    #[test]
    fn probabilistic_effect() -> Result<(), EffectError> {
        let effect = Node::Probabilistic(vec![
            branch(0.7, atom("on", &["?x", "?y"])),
            branch(0.3, atom("dropped", &["?x"])),
        ]);
        let res = outcomes(process(&effect, &bindings())?);
        assert_eq!(
            res,
            vec![
                Outcome::new(0.7, "(on_a_b' = true)"),
                Outcome::new(0.3, "(dropped_a' = true)")
            ]
        );

        // missing mass goes to an outcome with only the base effects
        let effect = Node::and(vec![
            Node::not(atom("holding", &["?x"])),
            Node::Probabilistic(vec![branch(0.7, atom("on", &["?x", "?y"]))]),
        ]);
        let res = outcomes(process(&effect, &bindings())?);
        assert_eq!(
            res,
            vec![
                Outcome::new(0.7, "(on_a_b' = true) & (holding_a' = false)"),
                Outcome::new(0.3, "(holding_a' = false)")
            ]
        );
        let total: f64 = res.iter().map(|o| o.probability).sum();
        assert!((total - 1.0).abs() < PROBABILITY_TOLERANCE);
        Ok(())
    }

    #[test]
    fn conflicts() -> Result<(), EffectError> {
        let effect = Node::and(vec![atom("clear", &["?x"]), Node::not(atom("clear", &["?x"]))]);
        assert_eq!(
            process(&effect, &bindings())?,
            Effects::Infeasible {
                atom: "clear_a".to_string()
            }
        );
        // same assignment twice is not a conflict
        let effect = Node::and(vec![atom("clear", &["?x"]), atom("clear", &["?x"])]);
        assert_eq!(outcomes(process(&effect, &bindings())?), vec![Outcome::new(1.0, "(clear_a' = true)")]);
        // a conflict between a branch and the base effects
        let effect = Node::and(vec![
            atom("clear", &["?x"]),
            Node::Probabilistic(vec![branch(0.5, Node::not(atom("clear", &["?x"])))]),
        ]);
        assert!(matches!(process(&effect, &bindings())?, Effects::Infeasible { .. }));
        Ok(())
    }

    #[test]
    fn malformed_effects() {
        let nested = Node::not(Node::Probabilistic(vec![branch(0.5, atom("clear", &["?x"]))]));
        assert!(matches!(
            process(&nested, &bindings()),
            Err(EffectError::NestedProbabilistic(_))
        ));
        let twice = Node::and(vec![
            Node::Probabilistic(vec![branch(0.5, atom("clear", &["?x"]))]),
            Node::Probabilistic(vec![branch(0.5, atom("clear", &["?y"]))]),
        ]);
        assert!(matches!(process(&twice, &bindings()), Err(EffectError::MultipleProbabilistic)));
        let excess = Node::Probabilistic(vec![
            branch(0.7, atom("clear", &["?x"])),
            branch(0.7, atom("clear", &["?y"])),
        ]);
        assert!(matches!(process(&excess, &bindings()), Err(EffectError::ExcessMass { .. })));
        let disjunction = Node::Container {
            op: Connective::Or,
            children: vec![atom("clear", &["?x"])],
        };
        assert!(matches!(process(&disjunction, &bindings()), Err(EffectError::Disjunctive(_))));
    }
}
