//! Symbolic policies and their instantiation over the ground actions of a task.
//!
//! A policy is an ordered list of rules `{"name": .., "if": guard, "then": action}` where the
//! guard and the action refer to predicates and actions whose arguments are free variables
//! written as trailing `_k` markers: `{"if": "clear_1 & on_2_1", "then": "unstack_2_1"}`.
//! The same marker denotes the same object in the guard and in the action of a rule.

use std::collections::BTreeMap;
use std::path::Path;

use hashbrown::HashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::emit::Command;
use crate::effects::Outcome;
use crate::grounding::{Translator, after_setup, product};
use crate::model::Parameter;
use crate::naming::sanitize;

/// Label of the transition taken when no rule applies.
pub const STUCK_LABEL: &str = "stuck";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub name: String,
    #[serde(rename = "if")]
    pub guard: String,
    #[serde(rename = "then")]
    pub action: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Policy {
    pub rules: Vec<PolicyRule>,
}

impl Policy {
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let json = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("cannot read policy file {path}")]
    Io { path: String, source: std::io::Error },
    #[error("invalid policy: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rule `{rule}`: invalid template `{template}`: {reason}")]
    InvalidTemplate { rule: String, template: String, reason: String },
    #[error("rule `{rule}`: no predicate matches `{name}`")]
    UnknownPredicate { rule: String, name: String },
    #[error("rule `{rule}`: no action matches `{name}`")]
    UnknownAction { rule: String, name: String },
    #[error("rule `{rule}`: `{name}` has {expected} parameter(s) but {found} variable(s) are given")]
    ArityMismatch { rule: String, name: String, expected: usize, found: usize },
    #[error("rule `{rule}`: variable _{marker} is used both as `{first}` and as `{second}`")]
    IncompatibleTypes { rule: String, marker: u32, first: String, second: String },
    #[error("rule `{rule}`: `{atom}` is not a state variable")]
    UnknownAtom { rule: String, atom: String },
}

#[derive(Clone, Debug, PartialEq)]
enum Piece {
    /// Operators, parentheses, spaces and literals, copied verbatim.
    Text(String),
    /// A state variable or action without free variables.
    Ground(String),
    /// A symbol applied to free variables, e.g. `on_2_1`.
    Lifted { base: String, markers: Vec<u32> },
}

/// A guard or action of a rule, split into pieces.
#[derive(Clone, Debug, PartialEq)]
struct Template {
    pieces: Vec<Piece>,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

impl Template {
    fn parse(template: &str) -> Template {
        let mut pieces = Vec::new();
        let mut rest = template;
        while let Some(c) = rest.chars().next() {
            let len = if is_ident_char(c) {
                let len = rest.find(|c| !is_ident_char(c)).unwrap_or(rest.len());
                pieces.push(identifier(&rest[..len]));
                len
            } else {
                let len = rest.find(is_ident_char).unwrap_or(rest.len());
                pieces.push(Piece::Text(rest[..len].to_string()));
                len
            };
            rest = &rest[len..];
        }
        Template { pieces }
    }

    fn lifted(&self) -> impl Iterator<Item = (&str, &[u32])> + '_ {
        self.pieces.iter().filter_map(|p| match p {
            Piece::Lifted { base, markers } => Some((base.as_str(), markers.as_slice())),
            _ => None,
        })
    }

    /// Replaces each marker by its binding and returns the resulting text, together with the
    /// names of the symbols it refers to.
    fn instantiate(&self, binding: &HashMap<u32, &str>) -> (String, Vec<String>) {
        let mut text = String::new();
        let mut symbols = Vec::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(s) => text.push_str(s),
                Piece::Ground(name) => {
                    text.push_str(name);
                    symbols.push(name.clone());
                }
                Piece::Lifted { base, markers } => {
                    let mut name = base.clone();
                    for m in markers {
                        name.push('_');
                        // all markers are bound
                        name.push_str(&sanitize(binding.get(m).copied().unwrap_or_default()));
                    }
                    text.push_str(&name);
                    symbols.push(name);
                }
            }
        }
        (text, symbols)
    }
}

fn identifier(ident: &str) -> Piece {
    if ident.starts_with(|c: char| c.is_ascii_digit()) || ident == "true" || ident == "false" {
        return Piece::Text(ident.to_string());
    }
    let ident = sanitize(ident);
    let components: Vec<&str> = ident.split('_').collect();
    let num_markers = components
        .iter()
        .rev()
        .take_while(|c| !c.is_empty() && c.bytes().all(|b| b.is_ascii_digit()))
        .count();
    let markers: Option<Vec<u32>> = components[components.len() - num_markers..]
        .iter()
        .map(|c| c.parse().ok())
        .collect();
    match markers {
        Some(markers) if !markers.is_empty() => Piece::Lifted {
            base: components[..components.len() - num_markers].join("_"),
            markers,
        },
        _ => Piece::Ground(ident),
    }
}

/// Finds the signature referred to by the base of a lifted symbol, and the position of its first
/// free variable. The base is either the name of the symbol, with one variable per parameter, or
/// the name followed by some constant arguments, the variables being the last arguments.
///
/// Returns `Some(Err((name, arity)))` if the number of variables does not fit the signature.
fn signature<'a>(
    base: &str,
    num_markers: usize,
    candidates: impl Iterator<Item = (&'a str, &'a [Parameter])>,
) -> Option<Result<(usize, &'a [Parameter]), (String, usize)>> {
    let candidates: Vec<(&str, String, &[Parameter])> = candidates
        .map(|(name, params)| (name, sanitize(name), params))
        .collect();
    if let Some(&(name, _, params)) = candidates.iter().find(|(_, s, _)| s == base) {
        return Some(if params.len() == num_markers {
            Ok((0, params))
        } else {
            Err((name.to_string(), params.len()))
        });
    }
    // constant arguments between the name and the variables
    let &(name, _, params) = candidates
        .iter()
        .filter(|(_, s, _)| base.len() > s.len() && base.starts_with(s.as_str()) && base.as_bytes()[s.len()] == b'_')
        .max_by_key(|(_, s, _)| s.len())?;
    if params.len() > num_markers {
        Some(Ok((params.len() - num_markers, params)))
    } else {
        Some(Err((name.to_string(), params.len())))
    }
}

struct Rule<'a> {
    rule: &'a PolicyRule,
    guard: Template,
    action: Template,
}

impl<'a> Rule<'a> {
    fn parse(rule: &'a PolicyRule) -> Result<Self, PolicyError> {
        let guard = Template::parse(&rule.guard);
        let action = Template::parse(rule.action.trim());
        let invalid = |reason: &str| PolicyError::InvalidTemplate {
            rule: rule.name.clone(),
            template: rule.action.clone(),
            reason: reason.to_string(),
        };
        match action.pieces.as_slice() {
            [Piece::Ground(_)] | [Piece::Lifted { .. }] => {}
            _ => return Err(invalid("expected a single action")),
        }
        if guard.pieces.iter().all(|p| matches!(p, Piece::Text(s) if s.trim().is_empty())) {
            return Err(PolicyError::InvalidTemplate {
                rule: rule.name.clone(),
                template: rule.guard.clone(),
                reason: "empty guard".to_string(),
            });
        }
        Ok(Rule { rule, guard, action })
    }

    fn name(&self) -> String {
        self.rule.name.clone()
    }

    /// Type of each free variable: the most specific type among the parameters it is used for.
    fn marker_types<'t>(&self, translator: &'t Translator) -> Result<BTreeMap<u32, &'t str>, PolicyError> {
        let description = translator.description();
        let catalog = translator.catalog();
        let mut types: BTreeMap<u32, &str> = BTreeMap::new();

        let mut uses: Vec<(u32, &'t str)> = Vec::new();
        for (base, markers) in self.guard.lifted() {
            let predicates = description
                .predicates
                .iter()
                .map(|p| (p.name.canonical_str(), p.params.as_slice()));
            let (offset, params) = match signature(base, markers.len(), predicates) {
                None => {
                    return Err(PolicyError::UnknownPredicate {
                        rule: self.name(),
                        name: base.to_string(),
                    });
                }
                Some(Err((name, expected))) => return Err(self.arity_mismatch(name, expected, markers.len())),
                Some(Ok(sig)) => sig,
            };
            for (i, &m) in markers.iter().enumerate() {
                uses.push((m, params[offset + i].tpe.canonical_str()));
            }
        }
        for (base, markers) in self.action.lifted() {
            let actions = description
                .actions
                .iter()
                .map(|a| (a.name.canonical_str(), a.params.as_slice()));
            let (offset, params) = match signature(base, markers.len(), actions) {
                None => {
                    return Err(PolicyError::UnknownAction {
                        rule: self.name(),
                        name: base.to_string(),
                    });
                }
                Some(Err((name, expected))) => return Err(self.arity_mismatch(name, expected, markers.len())),
                Some(Ok(sig)) => sig,
            };
            for (i, &m) in markers.iter().enumerate() {
                uses.push((m, params[offset + i].tpe.canonical_str()));
            }
        }

        for (m, tpe) in uses {
            match types.get(&m).copied() {
                None => {
                    types.insert(m, tpe);
                }
                Some(previous) => {
                    if catalog.is_subtype(tpe, previous) {
                        types.insert(m, tpe);
                    } else if !catalog.is_subtype(previous, tpe) {
                        return Err(PolicyError::IncompatibleTypes {
                            rule: self.name(),
                            marker: m,
                            first: previous.to_string(),
                            second: tpe.to_string(),
                        });
                    }
                }
            }
        }
        Ok(types)
    }

    fn arity_mismatch(&self, name: String, expected: usize, found: usize) -> PolicyError {
        PolicyError::ArityMismatch {
            rule: self.name(),
            name,
            expected,
            found,
        }
    }
}

/// Instantiates all rules of the policy, followed by the `stuck` transition that applies when no
/// rule does.
///
/// A binding of the free variables of a rule is kept only if the action it designates is one of
/// the ground actions of the task.
pub fn instantiate(translator: &Translator, policy: &Policy) -> Result<Vec<Command>, PolicyError> {
    let catalog = translator.catalog();
    let setup = translator.has_setup();
    let mut commands = Vec::new();
    let mut used_guards: Vec<String> = Vec::new();

    for rule in &policy.rules {
        let parsed = Rule::parse(rule)?;
        let label = rule.name.replace(['-', ' '], "_");
        let types = parsed.marker_types(translator)?;
        let markers: Vec<u32> = types.keys().copied().collect();
        let domains = types
            .values()
            .map(|tpe| catalog.objects_of_type(tpe))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PolicyError::InvalidTemplate {
                rule: rule.name.clone(),
                template: rule.guard.clone(),
                reason: e.to_string(),
            })?;

        let mut num_bindings = 0;
        for objects in product(&domains) {
            let binding: HashMap<u32, &str> = markers.iter().copied().zip(objects).collect();
            let (action, _) = parsed.action.instantiate(&binding);
            let Some(ground_action) = translator.ground_action(&action) else {
                continue;
            };
            let (guard, atoms) = parsed.guard.instantiate(&binding);
            if let Some(atom) = atoms.into_iter().find(|a| !translator.is_ground_atom(a)) {
                return Err(PolicyError::UnknownAtom {
                    rule: rule.name.clone(),
                    atom,
                });
            }
            let guard = guard.trim().to_string();
            let full_guard = if setup { after_setup(&guard) } else { guard.clone() };
            commands.push(Command::new(&label, full_guard, ground_action.outcomes.clone()));
            if !used_guards.contains(&guard) {
                used_guards.push(guard);
            }
            num_bindings += 1;
        }
        tracing::debug!("rule {}: {num_bindings} instance(s)", rule.name);
    }

    let stuck = if used_guards.is_empty() {
        "true".to_string()
    } else {
        used_guards.iter().map(|g| format!("!({g})")).join(" & ")
    };
    let stuck = if setup { after_setup(&stuck) } else { stuck };
    commands.push(Command::new(STUCK_LABEL, stuck, vec![Outcome::new(1.0, "true")]));
    Ok(commands)
}
