//! Grounding of a planning task: enumeration of its state variables and ground actions.

use std::collections::BTreeMap;
use std::path::Path;

use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use ppddl::input::Input;
use ppddl::parser::{Domain, Problem};
use ppddl::{parse_pddl_domain, parse_pddl_problem};

use crate::adapter;
use crate::catalog::ObjectCatalog;
use crate::config::TranslatorConfig;
use crate::effects::{self, Effects, Outcome};
use crate::emit::{Command, Model, ModelType};
use crate::error::{Res, TranslationError};
use crate::expression::{self, Bindings};
use crate::model::{Description, Parameter};
use crate::naming::ground_name;
use crate::policy::{self, Policy};
use crate::setup::{self, SETUP_ACTION, SETUP_ATOM};

/// An action with all its parameters bound to objects.
#[derive(Clone, Debug)]
pub struct GroundAction {
    /// Name in the generated model, e.g. `move_a_b`.
    pub name: String,
    /// Name of the lifted action.
    pub schema: String,
    pub arguments: Vec<String>,
    pub guard: String,
    pub outcomes: Vec<Outcome>,
}

/// Ground representation of a planning task, from which the models are generated.
///
/// The translator is built once per domain and problem pair and is immutable afterward.
pub struct Translator {
    description: Description,
    catalog: ObjectCatalog,
    /// Ground atoms, sorted.
    atoms: Vec<String>,
    actions: Vec<GroundAction>,
    /// Index of each ground action in `actions`, by name.
    index: HashMap<String, usize>,
    /// Ground atoms true in the initial state.
    initial: HashSet<String>,
    setup: bool,
}

impl Translator {
    pub fn new(mut description: Description, config: &TranslatorConfig) -> Res<Self> {
        setup::desugar_initial_distribution(&mut description);
        let setup = setup::has_setup(&description);
        let catalog = ObjectCatalog::of(&description, config.skip_sanity_checks)?;
        let atoms = ground_state_variables(&description, &catalog)?;
        let actions = ground_actions(&description, &catalog, setup)?;
        let index = actions
            .iter()
            .enumerate()
            .map(|(i, a)| (a.name.clone(), i))
            .collect();
        let initial = description
            .initial
            .iter()
            .map(|a| ground_name(a.predicate.canonical_str(), &a.args))
            .collect();
        tracing::debug!(
            "grounded {}/{}: {} objects, {} atoms, {} actions",
            description.domain,
            description.problem,
            catalog.num_objects(),
            atoms.len(),
            actions.len()
        );
        Ok(Translator {
            description,
            catalog,
            atoms,
            actions,
            index,
            initial,
            setup,
        })
    }

    pub fn from_pddl(domain: &Domain, problem: &Problem, config: &TranslatorConfig) -> Res<Self> {
        let description = adapter::description(domain, problem, config)?;
        Self::new(description, config)
    }

    pub fn from_files(domain: &Path, problem: &Path, config: &TranslatorConfig) -> Res<Self> {
        let domain = parse_pddl_domain(Input::from_file(domain)?)?;
        let problem = parse_pddl_problem(Input::from_file(problem)?)?;
        Self::from_pddl(&domain, &problem, config)
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn catalog(&self) -> &ObjectCatalog {
        &self.catalog
    }

    pub fn ground_atoms(&self) -> &[String] {
        &self.atoms
    }

    pub fn is_ground_atom(&self, name: &str) -> bool {
        self.atoms.binary_search_by(|a| a.as_str().cmp(name)).is_ok()
    }

    pub fn ground_actions(&self) -> &[GroundAction] {
        &self.actions
    }

    pub fn ground_action(&self, name: &str) -> Option<&GroundAction> {
        self.index.get(name).map(|&i| &self.actions[i])
    }

    pub fn outcomes_of(&self, name: &str) -> Option<&[Outcome]> {
        self.ground_action(name).map(|a| a.outcomes.as_slice())
    }

    pub fn initial_atoms(&self) -> &HashSet<String> {
        &self.initial
    }

    /// True if the initial state is probabilistic, i.e., the first transition must be the setup action.
    pub fn has_setup(&self) -> bool {
        self.setup
    }

    /// Expression of the goal over the ground atoms, if the problem has a goal.
    pub fn goal_label(&self) -> Option<String> {
        self.description
            .goal
            .as_ref()
            .map(|g| expression::translate(g, &Bindings::new()))
    }

    /// Model where all ground actions are available in every state where they are applicable.
    pub fn generate_mdp(&self) -> String {
        let commands = self
            .actions
            .iter()
            .map(|a| Command::new(&a.name, &a.guard, a.outcomes.clone()))
            .collect();
        self.model(ModelType::Mdp, commands).render()
    }

    /// Model where the choices are made by the given policy.
    pub fn generate_dtmc(&self, policy: &Policy) -> Res<String> {
        let mut commands = Vec::new();
        if self.setup
            && let Some(action) = self.ground_action(SETUP_ACTION)
        {
            commands.push(Command::new(SETUP_ACTION, &action.guard, action.outcomes.clone()));
        }
        commands.extend(policy::instantiate(self, policy)?);
        Ok(self.model(ModelType::Dtmc, commands).render())
    }

    fn model(&self, kind: ModelType, commands: Vec<Command>) -> Model<'_> {
        Model {
            kind,
            atoms: &self.atoms,
            initial: &self.initial,
            commands,
            goal: self.goal_label(),
        }
    }
}

/// Adds the condition that the setup action has fired to a guard.
pub(crate) fn after_setup(guard: &str) -> String {
    if guard == "true" {
        format!("!{SETUP_ATOM}")
    } else {
        format!("({guard}) & !{SETUP_ATOM}")
    }
}

/// All sequences made of one element of each list, the first list varying slowest.
/// A single empty sequence is produced for an empty list of lists.
pub(crate) fn product<T: Clone>(lists: &[Vec<T>]) -> impl Iterator<Item = Vec<T>> + '_ {
    lists.iter().map(|l| l.iter().cloned()).multi_cartesian_product()
}

fn objects_of_params<'a>(params: &[Parameter], catalog: &'a ObjectCatalog) -> Res<Vec<Vec<&'a str>>> {
    params
        .iter()
        .map(|p| catalog.objects_of_type(p.tpe.canonical_str()).map_err(TranslationError::from))
        .collect()
}

/// Sorted names of all ground atoms.
pub fn ground_state_variables(description: &Description, catalog: &ObjectCatalog) -> Res<Vec<String>> {
    // ground atom name -> (predicate, arguments) it was created from
    let mut atoms: BTreeMap<String, (&str, Vec<&str>)> = BTreeMap::new();
    for pred in &description.predicates {
        let domains = objects_of_params(&pred.params, catalog)?;
        for args in product(&domains) {
            let name = ground_name(pred.name.canonical_str(), &args);
            let origin = (pred.name.canonical_str(), args);
            match atoms.get(&name) {
                Some(previous) if *previous == origin => {}
                Some(previous) => {
                    return Err(TranslationError::NameCollision {
                        name,
                        first: format_origin(previous.0, &previous.1),
                        second: format_origin(origin.0, &origin.1),
                    });
                }
                None => {
                    atoms.insert(name, origin);
                }
            }
        }
    }
    Ok(atoms.into_keys().collect())
}

/// All ground actions whose effect is consistent, in declaration order.
pub fn ground_actions(description: &Description, catalog: &ObjectCatalog, setup: bool) -> Res<Vec<GroundAction>> {
    let mut actions = Vec::new();
    let mut origins: HashMap<String, String> = HashMap::new();
    for action in &description.actions {
        let schema = action.name.canonical_str();
        let domains = objects_of_params(&action.params, catalog)?;
        let mut num_infeasible = 0;
        for args in product(&domains) {
            let bindings: Bindings = action
                .params
                .iter()
                .map(|p| p.name.canonical_str())
                .zip(args.iter().copied())
                .collect();
            let name = ground_name(schema, &args);
            let mut guard = expression::translate(&action.precondition, &bindings);
            if setup && schema != SETUP_ACTION {
                guard = after_setup(&guard);
            }
            let outcomes = match effects::process(&action.effect, &bindings) {
                Ok(Effects::Outcomes(outcomes)) => outcomes,
                Ok(Effects::Infeasible { atom }) => {
                    tracing::warn!("dropping action {name}: conflicting assignments to {atom}");
                    num_infeasible += 1;
                    continue;
                }
                Err(source) => {
                    return Err(TranslationError::Effect {
                        action: schema.to_string(),
                        source,
                    });
                }
            };
            let origin = format_origin(schema, &args);
            if let Some(previous) = origins.insert(name.clone(), origin.clone()) {
                return Err(TranslationError::NameCollision {
                    name,
                    first: previous,
                    second: origin,
                });
            }
            actions.push(GroundAction {
                name,
                schema: schema.to_string(),
                arguments: args.iter().map(|a| a.to_string()).collect(),
                guard,
                outcomes,
            });
        }
        if num_infeasible > 0 {
            tracing::debug!("{num_infeasible} infeasible instance(s) of action {schema}");
        }
    }
    Ok(actions)
}

fn format_origin(symbol: &str, args: &[&str]) -> String {
    if args.is_empty() {
        format!("({symbol})")
    } else {
        format!("({symbol} {})", args.join(" "))
    }
}
