//! Conversion of the front end's s-expressions into a [`Description`].
//!
//! This is the only place where the syntax of action bodies is inspected: the rest of the
//! translation exclusively works on the closed [`Node`] type.

use hashbrown::{HashMap, HashSet};
use ppddl::errors::{Message, ResultExt, Spanned};
use ppddl::parser::{Domain, Param, Problem};
use ppddl::{SExpr, Sym};

use crate::catalog::TOP_TYPE;
use crate::config::TranslatorConfig;
use crate::error::Res;
use crate::model::*;

/// Operators that have no counterpart in a model made of boolean variables.
const UNSUPPORTED_OPERATORS: [&str; 11] = [
    "forall",
    "exists",
    "increase",
    "decrease",
    "assign",
    "scale-up",
    "scale-down",
    "<",
    ">",
    "<=",
    ">=",
];

/// Builds the description of a planning task from a parsed domain and problem.
///
/// Unless `config.skip_sanity_checks` is set, references to undeclared predicates, types,
/// constants and variables are reported as errors pointing to the faulty symbol.
pub fn description(domain: &Domain, problem: &Problem, config: &TranslatorConfig) -> Res<Description> {
    let ctx = Context::new(domain, problem, !config.skip_sanity_checks);

    let types = domain
        .types
        .iter()
        .map(|t| match t.tpe.as_slice() {
            [] => Ok(TypeDecl {
                name: t.symbol.clone(),
                parent: None,
            }),
            [parent] => {
                ctx.check_type(parent)?;
                Ok(TypeDecl {
                    name: t.symbol.clone(),
                    parent: Some(parent.clone()),
                })
            }
            [_, second, ..] => {
                Err(second.invalid("unexpected second parent type").info(&t.symbol, "for type"))
            }
        })
        .collect::<Result<Vec<_>, Message>>()?;

    let constants = ctx.parameters(&domain.constants)?;
    let objects = ctx.parameters(&problem.objects)?;

    let predicates = domain
        .predicates
        .iter()
        .map(|p| {
            Ok(PredicateSig {
                name: p.name.clone(),
                params: ctx.parameters(&p.args)?,
            })
        })
        .collect::<Result<Vec<_>, Message>>()?;

    let mut actions = Vec::with_capacity(domain.actions.len());
    for a in &domain.actions {
        let action = ctx.action(a).located(&a.name, "when converting action")?;
        actions.push(action);
    }

    let mut initial = Vec::new();
    let mut initial_distribution: Option<Vec<Branch>> = None;
    for fact in &problem.init {
        match ctx.node(fact, &[])? {
            Node::Atom(atom) => initial.push(atom),
            Node::Probabilistic(branches) => {
                if initial_distribution.is_some() {
                    return Err(fact.invalid("only one probabilistic block is supported in the initial state").into());
                }
                initial_distribution = Some(branches);
            }
            other => tracing::debug!("ignoring initial fact {other}"),
        }
    }

    let mut goals = problem
        .goal
        .iter()
        .map(|g| ctx.node(g, &[]))
        .collect::<Result<Vec<_>, Message>>()?;
    let goal = match goals.len() {
        0 => None,
        1 => goals.pop(),
        _ => Some(Node::and(goals)),
    };

    Ok(Description {
        domain: domain.name.clone(),
        problem: problem.problem_name.clone(),
        types,
        constants,
        predicates,
        actions,
        objects,
        initial,
        initial_distribution,
        goal,
    })
}

struct Context<'a> {
    /// If false, no reference is checked.
    strict: bool,
    /// Arity of each declared predicate.
    predicates: HashMap<&'a str, usize>,
    types: HashSet<&'a str>,
    /// Constants of the domain and objects of the problem.
    objects: HashSet<&'a str>,
}

impl<'a> Context<'a> {
    fn new(domain: &'a Domain, problem: &'a Problem, strict: bool) -> Self {
        let mut types: HashSet<&str> = domain.types.iter().map(|t| t.symbol.canonical_str()).collect();
        types.extend(domain.types.iter().flat_map(|t| t.tpe.iter().map(|p| p.canonical_str())));
        types.insert(TOP_TYPE);
        Context {
            strict,
            predicates: domain
                .predicates
                .iter()
                .map(|p| (p.name.canonical_str(), p.args.len()))
                .collect(),
            types,
            objects: domain
                .constants
                .iter()
                .chain(problem.objects.iter())
                .map(|o| o.symbol.canonical_str())
                .collect(),
        }
    }

    fn check_type(&self, tpe: &Sym) -> Result<(), Message> {
        if self.strict && !self.types.contains(tpe.canonical_str()) {
            return Err(tpe.invalid("undeclared type"));
        }
        Ok(())
    }

    fn parameters(&self, params: &[Param]) -> Result<Vec<Parameter>, Message> {
        params.iter().map(|p| self.parameter(p)).collect()
    }

    fn parameter(&self, param: &Param) -> Result<Parameter, Message> {
        let tpe = match param.tpe.as_slice() {
            [] => Sym::from(TOP_TYPE),
            [tpe] => {
                self.check_type(tpe)?;
                tpe.clone()
            }
            [_, second, ..] => {
                return Err(second
                    .invalid("`either` types are not supported")
                    .info(&param.symbol, "for parameter"));
            }
        };
        Ok(Parameter {
            name: param.symbol.clone(),
            tpe,
        })
    }

    fn action(&self, a: &ppddl::parser::Action) -> Result<ActionSig, Message> {
        let params = self.parameters(&a.args)?;
        let precondition = a
            .pre
            .iter()
            .map(|e| self.node(e, &params))
            .collect::<Result<Vec<_>, Message>>()?;
        let effect = a
            .eff
            .iter()
            .map(|e| self.node(e, &params))
            .collect::<Result<Vec<_>, Message>>()?;
        Ok(ActionSig {
            name: a.name.clone(),
            params,
            precondition: Node::conjunction(precondition),
            effect: Node::conjunction(effect),
        })
    }

    /// Checks that a term denotes a variable in scope or a known object.
    fn check_term(&self, term: &Sym, scope: &[Parameter]) -> Result<(), Message> {
        if !self.strict {
            return Ok(());
        }
        if term.is_variable() {
            if !scope.iter().any(|p| &p.name == term) {
                return Err(term.invalid("unbound variable"));
            }
        } else if !self.objects.contains(term.canonical_str()) {
            return Err(term.invalid("unknown object"));
        }
        Ok(())
    }

    fn node(&self, expr: &SExpr, scope: &[Parameter]) -> Result<Node, Message> {
        let mut items = expr
            .as_list_iter()
            .ok_or_else(|| expr.invalid("expected a parenthesized expression"))?;
        if items.is_empty() {
            return Ok(Node::empty());
        }
        let head = items.pop_atom()?;
        match head.canonical_str() {
            op @ ("and" | "or") => {
                let op = if op == "and" { Connective::And } else { Connective::Or };
                let children = items
                    .map(|c| self.node(c, scope))
                    .collect::<Result<Vec<_>, Message>>()?;
                Ok(Node::Container { op, children })
            }
            "not" => match items.len() {
                0 => Ok(Node::Negation(None)),
                1 => Ok(Node::not(self.node(items.pop()?, scope)?)),
                _ => Err(expr.invalid("negation expects a single argument")),
            },
            "imply" => {
                let premise = self.node(items.pop()?, scope)?;
                let conclusion = self.node(items.pop()?, scope)?;
                if let Some(extra) = items.next() {
                    return Err(extra.invalid("unexpected argument of `imply`"));
                }
                Ok(Node::Container {
                    op: Connective::Or,
                    children: vec![Node::not(premise), conclusion],
                })
            }
            "when" => {
                let condition = self.node(items.pop()?, scope)?;
                let effect = self.node(items.pop()?, scope)?;
                if let Some(extra) = items.next() {
                    return Err(extra.invalid("unexpected argument of `when`"));
                }
                Ok(Node::Conditional {
                    condition: Box::new(condition),
                    effect: Box::new(effect),
                })
            }
            "probabilistic" => {
                if items.len() % 2 != 0 {
                    return Err(expr.invalid("expected pairs of probabilities and effects"));
                }
                let mut branches = Vec::with_capacity(items.len() / 2);
                while !items.is_empty() {
                    let probability = prob_value(items.pop()?);
                    let effect = self.node(items.pop()?, scope)?;
                    branches.push(Branch { probability, effect });
                }
                Ok(Node::Probabilistic(branches))
            }
            "=" => match (items.pop()?.as_atom(), items.pop()?.as_atom()) {
                (Some(a), Some(b)) if items.is_empty() => {
                    self.check_term(a, scope)?;
                    self.check_term(b, scope)?;
                    Ok(Node::Equality(a.clone(), b.clone()))
                }
                _ => {
                    tracing::warn!("unsupported numeric comparison {expr}");
                    Ok(Node::Unsupported(expr.to_string()))
                }
            },
            op if UNSUPPORTED_OPERATORS.contains(&op) => {
                tracing::warn!("unsupported construct `{op}` in {expr}");
                Ok(Node::Unsupported(expr.to_string()))
            }
            _ => {
                let mut args = Vec::with_capacity(items.len());
                while !items.is_empty() {
                    let arg = items.pop_atom()?;
                    self.check_term(arg, scope)?;
                    args.push(arg.clone());
                }
                if self.strict {
                    match self.predicates.get(head.canonical_str()) {
                        None => return Err(head.invalid("undeclared predicate")),
                        Some(&arity) if arity != args.len() => {
                            return Err(expr.invalid(format!(
                                "predicate `{head}` expects {arity} argument(s) but got {}",
                                args.len()
                            )));
                        }
                        _ => {}
                    }
                }
                Ok(Node::Atom(AtomRef {
                    predicate: head.clone(),
                    args,
                }))
            }
        }
    }
}

/// Reads a probability term, keeping its structure when it is not a plain number.
fn prob_value(expr: &SExpr) -> ProbValue {
    match expr {
        SExpr::Atom(a) => match a.canonical_str().parse::<f64>() {
            Ok(x) => ProbValue::Number(x),
            Err(_) => ProbValue::Text(a.canonical_str().to_string()),
        },
        SExpr::List(l) => match expr.as_application("/") {
            Some([num, denum]) => ProbValue::Ratio(Box::new(prob_value(num)), Box::new(prob_value(denum))),
            _ => ProbValue::Compound {
                text: expr.to_string(),
                fields: l.elems().iter().map(prob_value).collect(),
            },
        },
    }
}
