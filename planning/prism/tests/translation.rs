use itertools::Itertools;
use ppddl::{parse_pddl_domain, parse_pddl_problem};
use ppddl2prism::policy::PolicyError;
use ppddl2prism::{Outcome, Policy, Res, TranslationError, Translator, TranslatorConfig};

fn translator(domain: &str, problem: &str) -> Res<Translator> {
    let domain = parse_pddl_domain(domain.into())?;
    let problem = parse_pddl_problem(problem.into())?;
    Translator::from_pddl(&domain, &problem, &TranslatorConfig::default())
}

const CLEAR: &str = "(define (domain clear) (:predicates (clear ?x)))";
const OBJECTS: &str = "(define (problem p) (:domain clear) (:objects b a) (:init (clear a)))";

const BLOCKS: &str = "
(define (domain blocks)
  (:requirements :probabilistic-effects)
  (:predicates (clear ?x) (on ?x ?y) (dropped ?x))
  (:action move
    :parameters (?x ?y)
    :precondition (clear ?y)
    :effect (and (on ?x ?y) (not (clear ?y))))
  (:action try-move
    :parameters (?x ?y)
    :precondition (clear ?y)
    :effect (probabilistic 0.7 (on ?x ?y) 0.3 (dropped ?x)))
  (:action slip
    :parameters (?x ?y)
    :precondition (clear ?y)
    :effect (probabilistic 0.7 (on ?x ?y))))";

const TWO_BLOCKS: &str = "
(define (problem two) (:domain blocks)
  (:objects a b)
  (:init (clear a) (clear b))
  (:goal (on a b)))";

#[test]
fn atoms_of_predicate_without_actions() -> Res<()> {
    let t = translator(CLEAR, OBJECTS)?;
    assert_eq!(t.ground_atoms(), ["clear_a", "clear_b"]);
    assert!(t.ground_actions().is_empty());
    assert!(t.initial_atoms().contains("clear_a"));
    assert_eq!(t.goal_label(), None);
    Ok(())
}

#[test]
fn number_of_atoms() -> Res<()> {
    let t = translator(BLOCKS, TWO_BLOCKS)?;
    // clear: 2, on: 2x2, dropped: 2
    assert_eq!(t.ground_atoms().len(), 8);
    let mut sorted = t.ground_atoms().to_vec();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted, t.ground_atoms());
    Ok(())
}

#[test]
fn deterministic_action() -> Res<()> {
    let t = translator(BLOCKS, TWO_BLOCKS)?;
    let a = t.ground_action("move_a_b").expect("missing move_a_b");
    assert_eq!(a.guard, "clear_b");
    assert_eq!(a.outcomes, [Outcome::new(1.0, "(on_a_b' = true) & (clear_b' = false)")]);
    Ok(())
}

#[test]
fn probabilistic_actions() -> Res<()> {
    let t = translator(BLOCKS, TWO_BLOCKS)?;
    assert_eq!(
        t.outcomes_of("try_move_a_b"),
        Some(
            [
                Outcome::new(0.7, "(on_a_b' = true)"),
                Outcome::new(0.3, "(dropped_a' = true)")
            ]
            .as_slice()
        )
    );
    assert_eq!(
        t.outcomes_of("slip_a_b"),
        Some([Outcome::new(0.7, "(on_a_b' = true)"), Outcome::new(0.3, "true")].as_slice())
    );
    for action in t.ground_actions() {
        let total: f64 = action.outcomes.iter().map(|o| o.probability).sum();
        assert!((total - 1.0).abs() < 1e-6, "{}: {total}", action.name);
    }
    Ok(())
}

#[test]
fn policy_enumerates_bindings() -> Res<()> {
    let t = translator(BLOCKS, TWO_BLOCKS)?;
    let policy = Policy::from_json(r#"[{"name": "stack", "if": "clear_1 & on_2_1", "then": "move_1_2"}]"#)?;
    let dtmc = t.generate_dtmc(&policy)?;
    let commands: Vec<&str> = dtmc.lines().filter(|l| l.starts_with("\t[")).collect();
    assert_eq!(
        commands,
        [
            "\t[stack] clear_a & on_a_a -> 1.0 : (on_a_a' = true) & (clear_a' = false);",
            "\t[stack] clear_a & on_b_a -> 1.0 : (on_a_b' = true) & (clear_b' = false);",
            "\t[stack] clear_b & on_a_b -> 1.0 : (on_b_a' = true) & (clear_a' = false);",
            "\t[stack] clear_b & on_b_b -> 1.0 : (on_b_b' = true) & (clear_b' = false);",
            "\t[stuck] !(clear_a & on_a_a) & !(clear_a & on_b_a) & !(clear_b & on_a_b) & !(clear_b & on_b_b) -> 1.0 : true;",
        ]
    );
    assert!(dtmc.ends_with("label \"goal\" = on_a_b;\n"));
    Ok(())
}

#[test]
fn policy_errors() -> Res<()> {
    let domain = BLOCKS.replace(":precondition (clear ?y)\n    :effect (and", ":precondition (and (clear ?y) (not (= ?x ?y)))\n    :effect (and");
    let t = translator(&domain, TWO_BLOCKS)?;
    // move_a_a is grounded with a guard that is always false
    assert_eq!(t.ground_action("move_a_a").map(|a| a.guard.as_str()), Some("(clear_a & !(true))"));

    let policy = Policy::from_json(r#"[{"name": "r", "if": "clear_1", "then": "undefined_1"}]"#)?;
    assert!(matches!(
        t.generate_dtmc(&policy),
        Err(TranslationError::Policy(PolicyError::UnknownAction { .. }))
    ));
    let policy = Policy::from_json(r#"[{"name": "r", "if": "clear_1", "then": "move_1"}]"#)?;
    assert!(matches!(
        t.generate_dtmc(&policy),
        Err(TranslationError::Policy(PolicyError::ArityMismatch { .. }))
    ));
    let policy = Policy::from_json(r#"[{"name": "r", "if": "clear_1 & sunny", "then": "move_1_1"}]"#)?;
    assert!(matches!(
        t.generate_dtmc(&policy),
        Err(TranslationError::Policy(PolicyError::UnknownAtom { .. }))
    ));
    Ok(())
}

#[test]
fn empty_policy_is_total() -> Res<()> {
    let t = translator(BLOCKS, TWO_BLOCKS)?;
    let dtmc = t.generate_dtmc(&Policy::default())?;
    assert!(dtmc.contains("\t[stuck] true -> 1.0 : true;\n"));
    Ok(())
}

#[test]
fn infeasible_actions_are_dropped() -> Res<()> {
    let domain = "
    (define (domain toggle)
      (:predicates (on ?x))
      (:action toggle
        :parameters (?x ?y)
        :effect (and (on ?x) (not (on ?y)))))";
    let problem = "(define (problem p) (:domain toggle) (:objects a b))";
    let t = translator(domain, problem)?;
    let names: Vec<&str> = t.ground_actions().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["toggle_a_b", "toggle_b_a"]);
    Ok(())
}

#[test]
fn reports_unknown_types() {
    let problem = "(define (problem p) (:domain clear) (:objects a - block))";
    assert!(matches!(translator(CLEAR, problem), Err(TranslationError::Syntax(_))));
    let domain = parse_pddl_domain(CLEAR.into()).unwrap();
    let problem = parse_pddl_problem(problem.into()).unwrap();
    let t = Translator::from_pddl(&domain, &problem, &TranslatorConfig::lenient()).unwrap();
    assert_eq!(t.ground_atoms(), ["clear_a"]);
}

/// Guards of the commands of a DTMC with the given label.
fn guards<'a>(dtmc: &'a str, label: &str) -> Vec<&'a str> {
    let prefix = format!("\t[{label}] ");
    dtmc.lines()
        .filter_map(|l| l.strip_prefix(prefix.as_str()))
        .filter_map(|l| l.split_once(" -> ").map(|(guard, _)| guard))
        .collect()
}

#[test]
fn conditional_effects_on_assigned_atoms() -> Res<()> {
    let domain = "
    (define (domain switch)
      (:requirements :conditional-effects)
      (:predicates (p ?x) (q ?x) (r ?x))
      (:action reset
        :parameters (?x)
        :effect (and (not (p ?x)) (when (q ?x) (p ?x))))
      (:action flip
        :parameters (?x)
        :effect (and (when (q ?x) (p ?x)) (when (r ?x) (not (p ?x))))))";
    let problem = "(define (problem p) (:domain switch) (:objects a))";
    let t = translator(domain, problem)?;
    assert_eq!(
        t.outcomes_of("reset_a"),
        Some([Outcome::new(1.0, "(p_a' = (q_a ? true : false))")].as_slice())
    );
    assert_eq!(
        t.outcomes_of("flip_a"),
        Some([Outcome::new(1.0, "(p_a' = (r_a ? false : (q_a ? true : p_a)))")].as_slice())
    );
    Ok(())
}

#[test]
fn unresolved_probability_is_not_fatal() -> Res<()> {
    let domain = "
    (define (domain heavy)
      (:predicates (p ?x) (q ?x))
      (:action act
        :parameters (?x)
        :effect (probabilistic heavy (p ?x) 0.5 (q ?x))))";
    let problem = "(define (problem p) (:domain heavy) (:objects a))";
    let t = translator(domain, problem)?;
    assert_eq!(
        t.outcomes_of("act_a"),
        Some([Outcome::new(0.5, "(p_a' = true)"), Outcome::new(0.5, "(q_a' = true)")].as_slice())
    );
    Ok(())
}

#[test]
fn stuck_negates_every_rule_guard() -> Res<()> {
    let t = translator(BLOCKS, TWO_BLOCKS)?;
    let policy = Policy::from_json(
        r#"[{"name": "stack", "if": "clear_1 & on_2_1", "then": "move_1_2"},
            {"name": "grab", "if": "clear_1", "then": "try-move_1_2"}]"#,
    )?;
    let dtmc = t.generate_dtmc(&policy)?;
    let mut rule_guards = guards(&dtmc, "stack");
    rule_guards.extend(guards(&dtmc, "grab"));
    assert_eq!(rule_guards.len(), 8);
    let expected = rule_guards.iter().unique().map(|g| format!("!({g})")).join(" & ");
    assert_eq!(guards(&dtmc, "stuck"), [expected.as_str()]);
    Ok(())
}

#[test]
fn instances_map_back_to_their_rule() -> Res<()> {
    let t = translator(BLOCKS, TWO_BLOCKS)?;
    let policy = Policy::from_json(r#"[{"name": "stack", "if": "clear_1 & on_2_1", "then": "move_1_2"}]"#)?;
    let dtmc = t.generate_dtmc(&policy)?;
    let objects = ["a", "b"];
    for guard in guards(&dtmc, "stack") {
        // objects are replaced by markers numbered in order of first appearance
        let mut markers: Vec<&str> = Vec::new();
        let lifted = guard
            .split(' ')
            .map(|token| {
                token
                    .split('_')
                    .map(|c| {
                        if !objects.contains(&c) {
                            return c.to_string();
                        }
                        let pos = markers.iter().position(|&m| m == c).unwrap_or_else(|| {
                            markers.push(c);
                            markers.len() - 1
                        });
                        (pos + 1).to_string()
                    })
                    .join("_")
            })
            .join(" ");
        // a binding of both markers to the same object unifies them
        let expected = if markers.len() == 2 { "clear_1 & on_2_1" } else { "clear_1 & on_1_1" };
        assert_eq!(lifted, expected, "{guard}");
    }
    Ok(())
}

const DEPOT: &str = "
(define (domain depot)
  (:types truck plane - vehicle vehicle place - object)
  (:predicates (at ?v - vehicle ?p - place) (fueled ?t - truck))
  (:action drive
    :parameters (?t - truck ?from ?to - place)
    :precondition (at ?t ?from)
    :effect (and (not (at ?t ?from)) (at ?t ?to))))";

const DEPOT_PROBLEM: &str = "
(define (problem deliver) (:domain depot)
  (:objects t1 - truck p1 - plane home work - place)
  (:init (at t1 home) (at p1 home)))";

#[test]
fn variable_types_follow_the_hierarchy() -> Res<()> {
    let t = translator(DEPOT, DEPOT_PROBLEM)?;
    assert!(t.is_ground_atom("at_p1_home"));
    // driving to the current place both deletes and adds the same atom
    assert!(t.ground_action("drive_t1_home_home").is_none());
    // `at` accepts any vehicle, `drive` restricts the first variable to trucks
    let policy = Policy::from_json(r#"[{"name": "go", "if": "at_1_2", "then": "drive_1_2_3"}]"#)?;
    let dtmc = t.generate_dtmc(&policy)?;
    assert_eq!(guards(&dtmc, "go"), ["at_t1_home", "at_t1_work"]);

    let policy = Policy::from_json(r#"[{"name": "go", "if": "fueled_1", "then": "drive_2_1_3"}]"#)?;
    assert!(matches!(
        t.generate_dtmc(&policy),
        Err(TranslationError::Policy(PolicyError::IncompatibleTypes { marker: 1, .. }))
    ));
    Ok(())
}
