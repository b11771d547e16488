//! Reading of PPDDL domains and problems from their s-expression form.
//!
//! Only the structure of the files is checked here: action preconditions, effects, initial
//! facts and goals are kept as s-expressions.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use itertools::Itertools;
use smallvec::{SmallVec, smallvec};

use crate::errors::{ResultExt, Span, Spanned};
use crate::input::Input;
use crate::sexpr::{ListIter, SExpr, parse};
use crate::{Res, Sym};

pub fn parse_pddl_domain(input: Input) -> Res<Domain> {
    let expr = parse(Arc::new(input))?;
    read_domain(&expr).title("Invalid domain: Syntax error")
}

pub fn parse_pddl_problem(input: Input) -> Res<Problem> {
    let expr = parse(Arc::new(input))?;
    read_problem(&expr).title("Invalid problem: Syntax error")
}

/// A requirement flag of a domain.
#[derive(Debug, Clone, Eq, PartialEq, derive_more::Display)]
pub enum PddlFeature {
    #[display(":strips")]
    Strips,
    #[display(":typing")]
    Typing,
    #[display(":equality")]
    Equality,
    #[display(":negative-preconditions")]
    NegativePreconditions,
    #[display(":disjunctive-preconditions")]
    DisjunctivePreconditions,
    #[display(":existential-preconditions")]
    ExistentialPreconditions,
    #[display(":universal-preconditions")]
    UniversalPreconditions,
    #[display(":quantified-preconditions")]
    QuantifiedPreconditions,
    #[display(":conditional-effects")]
    ConditionalEffects,
    #[display(":probabilistic-effects")]
    ProbabilisticEffects,
    #[display(":rewards")]
    Rewards,
    #[display(":fluents")]
    Fluents,
    #[display(":action-costs")]
    ActionCosts,
    #[display(":adl")]
    Adl,
    /// A requirement this front end does not know about, kept verbatim.
    #[display("{_0}")]
    Other(String),
}

impl PddlFeature {
    const KNOWN: [PddlFeature; 14] = [
        PddlFeature::Strips,
        PddlFeature::Typing,
        PddlFeature::Equality,
        PddlFeature::NegativePreconditions,
        PddlFeature::DisjunctivePreconditions,
        PddlFeature::ExistentialPreconditions,
        PddlFeature::UniversalPreconditions,
        PddlFeature::QuantifiedPreconditions,
        PddlFeature::ConditionalEffects,
        PddlFeature::ProbabilisticEffects,
        PddlFeature::Rewards,
        PddlFeature::Fluents,
        PddlFeature::ActionCosts,
        PddlFeature::Adl,
    ];
}

impl FromStr for PddlFeature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with(':') {
            return Err(format!("Invalid requirement `{s}`"));
        }
        let known = Self::KNOWN.iter().find(|f| f.to_string() == s);
        Ok(known.cloned().unwrap_or_else(|| PddlFeature::Other(s.to_string())))
    }
}

pub type Types = SmallVec<[Sym; 1]>;

/// A symbol declared with its types: a parameter, an object, a constant or a type with its parents.
#[derive(Debug, Clone)]
pub struct Param {
    pub symbol: Sym,
    /// Possible types of the symbol, any if empty.
    pub tpe: Types,
}

pub type TypedSymbol = Param;

impl Param {
    pub fn new(symbol: impl Into<Sym>, tpe: impl Into<Sym>) -> Self {
        Param {
            symbol: symbol.into(),
            tpe: smallvec![tpe.into()],
        }
    }

    pub fn untyped(symbol: impl Into<Sym>) -> Self {
        Param {
            symbol: symbol.into(),
            tpe: Types::new(),
        }
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.tpe.as_slice() {
            [] => write!(f, "{}", self.symbol),
            [single] => write!(f, "{}: {single}", self.symbol),
            several => write!(f, "{}: {{{}}}", self.symbol, several.iter().format(", ")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Predicate {
    pub name: Sym,
    pub args: Vec<Param>,
    pub source: Option<Span>,
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.args.iter().format(", "))
    }
}

#[derive(Clone, Debug)]
pub struct Action {
    pub name: Sym,
    pub args: Vec<Param>,
    pub pre: Vec<SExpr>,
    pub eff: Vec<SExpr>,
    /// The whole `(:action ...)` block
    pub span: Span,
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.args.iter().format(", "))
    }
}

#[derive(Debug, Clone)]
pub struct Domain {
    pub name: Sym,
    pub features: Vec<PddlFeature>,
    pub types: Vec<TypedSymbol>,
    pub constants: Vec<TypedSymbol>,
    pub predicates: Vec<Predicate>,
    pub actions: Vec<Action>,
}

impl Display for Domain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# Domain: {}", self.name)?;
        writeln!(f, "# Requirements: {}", self.features.iter().format(" "))?;
        writeln!(f, "# Types\n  {}", self.types.iter().format("\n  "))?;
        writeln!(f, "# Constants\n  {}", self.constants.iter().format("\n  "))?;
        writeln!(f, "# Predicates\n  {}", self.predicates.iter().format("\n  "))?;
        write!(f, "# Actions\n  {}", self.actions.iter().format("\n  "))
    }
}

#[derive(Clone, Debug)]
pub struct Problem {
    pub problem_name: Sym,
    pub domain_name: Sym,
    pub objects: Vec<TypedSymbol>,
    pub init: Vec<SExpr>,
    pub goal: Vec<SExpr>,
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# Problem: {} (domain {})", self.problem_name, self.domain_name)?;
        writeln!(f, "# Objects\n  {}", self.objects.iter().format("\n  "))?;
        writeln!(f, "# Init\n  {}", self.init.iter().format("\n  "))?;
        write!(f, "# Goal\n  {}", self.goal.iter().format("\n  "))
    }
}

/// Reads the remaining elements of a list as typed symbols.
///
/// `(a b - t c)` declares `a` and `b` of type `t`, and `c` without a type.
/// A type may also be given as `(either t1 t2)`.
pub fn consume_typed_symbols(input: &mut ListIter) -> Res<Vec<TypedSymbol>> {
    let mut declared = Vec::with_capacity(input.len());
    // symbols whose type annotation has not been seen yet
    let mut pending: Vec<Sym> = Vec::new();
    while let Some(next) = input.next() {
        let next = next.as_atom().ok_or_else(|| next.invalid("Expected a symbol"))?;
        if next.canonical_str() != "-" {
            pending.push(next.clone());
            continue;
        }
        if pending.is_empty() {
            return Err(next.invalid("Type annotation without any preceding symbol"));
        }
        let types = read_type(input.pop()?)?;
        declared.extend(pending.drain(..).map(|symbol| Param {
            symbol,
            tpe: types.clone(),
        }));
    }
    declared.extend(pending.into_iter().map(Param::untyped));
    Ok(declared)
}

fn read_type(expr: &SExpr) -> Res<Types> {
    let type_name = |e: &SExpr| e.as_atom().cloned().ok_or_else(|| e.invalid("expected type name"));
    match expr.as_application("either") {
        Some(variants) => variants.iter().map(type_name).collect(),
        None => Ok(smallvec![type_name(expr)?]),
    }
}

/// Opens a `(define (<kind> <name>) ...)` block, returning its name and its remaining content.
fn read_header<'a>(expr: &'a SExpr, kind: &str) -> Res<(Sym, ListIter<'a>)> {
    let mut content = expr.as_list_iter().ok_or_else(|| expr.invalid("Expected a list"))?;
    content.pop_known_atom("define")?;
    let mut header = content
        .pop_list()
        .title(format!("Expected a declaration of the form `({kind} NAME)`"))?
        .iter();
    header.pop_known_atom(kind)?;
    let name = header.pop_atom().title(format!("missing name of {kind}"))?.clone();
    Ok((name, content))
}

/// Splits a block `(:key ...)` into its key and its content.
fn read_block<'a>(block: &'a SExpr) -> Res<(&'a str, ListIter<'a>)> {
    let mut content = block
        .as_list_iter()
        .ok_or_else(|| block.invalid("expected a block of the form `(:key ...)`"))?;
    let key = content.pop_atom()?.canonical_str();
    Ok((key, content))
}

fn read_domain(expr: &SExpr) -> Res<Domain> {
    let (name, blocks) = read_header(expr, "domain")?;
    let mut dom = Domain {
        name,
        features: vec![],
        types: vec![],
        constants: vec![],
        predicates: vec![],
        actions: vec![],
    };

    for block in blocks {
        let (key, mut content) = read_block(block)?;
        match key {
            ":requirements" => dom.features.extend(read_requirements(content, &dom.name)?),
            ":types" if dom.types.is_empty() => dom.types = consume_typed_symbols(&mut content)?,
            ":constants" if dom.constants.is_empty() => dom.constants = consume_typed_symbols(&mut content)?,
            ":types" | ":constants" => return Err(block.invalid(format!("More than one '{key}' block"))),
            ":predicates" => {
                for decl in content {
                    dom.predicates.push(read_predicate(decl)?);
                }
            }
            ":action" => dom.actions.push(read_action(block, content)?),
            ":functions" | ":constraints" => tracing::debug!("ignoring block {key} of domain {}", dom.name),
            _ => return Err(block.invalid("unsupported block")),
        }
    }
    Ok(dom)
}

fn read_requirements(content: ListIter, domain: &Sym) -> Res<Vec<PddlFeature>> {
    content
        .map(|req| -> Res<PddlFeature> {
            let req = req
                .as_atom()
                .ok_or_else(|| req.invalid("Expected feature name but got list"))?;
            let feature = PddlFeature::from_str(req.canonical_str()).map_err(|e| req.invalid(e))?;
            if let PddlFeature::Other(unknown) = &feature {
                tracing::warn!("unknown requirement `{unknown}` in domain {domain}");
            }
            Ok(feature)
        })
        .collect()
}

fn read_predicate(decl: &SExpr) -> Res<Predicate> {
    let mut content = decl.as_list_iter().ok_or_else(|| decl.invalid("Expected a list"))?;
    let name = content.pop_atom()?.clone();
    let args = consume_typed_symbols(&mut content)?;
    Ok(Predicate {
        name,
        args,
        source: Some(decl.loc()),
    })
}

/// Reads the content of an `(:action NAME :key value ...)` block.
fn read_action(block: &SExpr, mut content: ListIter) -> Res<Action> {
    let mut action = Action {
        name: content.pop_atom()?.clone(),
        args: vec![],
        pre: vec![],
        eff: vec![],
        span: block.loc(),
    };
    let mut has_parameters = false;
    while let Some(key) = content.next() {
        let key = key.as_atom().ok_or_else(|| key.invalid("Expected a key of the form `:key`"))?;
        let value = content.pop().located(key, "No value associated to key")?;
        match key.canonical_str() {
            ":parameters" if has_parameters => {
                return Err(key.invalid("Duplicated ':parameters' tag is not allowed"));
            }
            ":parameters" => {
                has_parameters = true;
                let mut params = value
                    .as_list_iter()
                    .ok_or_else(|| value.invalid("Expected a parameter list"))?;
                action.args = consume_typed_symbols(&mut params)?;
            }
            ":precondition" => action.pre.push(value.clone()),
            ":effect" => action.eff.push(value.clone()),
            _ => return Err(key.invalid("unsupported key in action")),
        }
    }
    Ok(action)
}

fn read_problem(expr: &SExpr) -> Res<Problem> {
    let (problem_name, mut blocks) = read_header(expr, "problem")?;
    let mut domain_decl = blocks.pop_list()?.iter();
    domain_decl.pop_known_atom(":domain")?;
    let mut pb = Problem {
        problem_name,
        domain_name: domain_decl.pop_atom()?.clone(),
        objects: vec![],
        init: vec![],
        goal: vec![],
    };

    for block in blocks {
        let (key, mut content) = read_block(block)?;
        match key {
            ":objects" => pb.objects.extend(consume_typed_symbols(&mut content)?),
            ":init" => pb.init.extend(content.cloned()),
            ":goal" => pb.goal.extend(content.cloned()),
            // requirements belong to the domain
            ":requirements" => {}
            ":metric" | ":constraints" | ":goal-reward" | ":horizon" => {
                tracing::debug!("ignoring block {key} of problem {}", pb.problem_name)
            }
            _ => return Err(block.invalid("unsupported block")),
        }
    }
    Ok(pb)
}
