//! Rendering of the generated models in the PRISM language.

use std::fmt::Write;

use hashbrown::HashSet;
use itertools::Itertools;

use crate::effects::Outcome;

#[derive(Copy, Clone, Debug, PartialEq, Eq, derive_more::Display)]
pub enum ModelType {
    /// Nondeterministic choice between all applicable ground actions.
    #[display("mdp")]
    Mdp,
    /// Choices resolved by a policy.
    #[display("dtmc")]
    Dtmc,
}

/// A guarded command: `[label] guard -> p1 : u1 + p2 : u2;`
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    pub label: String,
    pub guard: String,
    pub outcomes: Vec<Outcome>,
}

impl Command {
    pub fn new(label: impl Into<String>, guard: impl Into<String>, outcomes: Vec<Outcome>) -> Self {
        Command {
            label: label.into(),
            guard: guard.into(),
            outcomes,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} -> {};",
            self.label,
            self.guard,
            self.outcomes
                .iter()
                .format_with(" + ", |o, f| f(&format_args!("{:?} : {}", o.probability, o.update)))
        )
    }
}

/// A model ready to be rendered: one boolean variable per atom and a list of commands.
pub struct Model<'a> {
    pub kind: ModelType,
    /// State variables, in output order.
    pub atoms: &'a [String],
    /// Variables that are initially true.
    pub initial: &'a HashSet<String>,
    pub commands: Vec<Command>,
    /// Expression of the `goal` label, if any.
    pub goal: Option<String>,
}

impl Model<'_> {
    pub fn render(&self) -> String {
        let mut out = String::new();
        // writing to a string cannot fail
        let _ = self.write(&mut out);
        out
    }

    fn write(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "{}", self.kind)?;
        writeln!(out)?;
        writeln!(out, "module main")?;
        for atom in self.atoms {
            writeln!(out, "\t{atom} : bool init {};", self.initial.contains(atom))?;
        }
        writeln!(out)?;
        for command in &self.commands {
            writeln!(out, "\t{command}")?;
        }
        writeln!(out, "endmodule")?;
        if let Some(goal) = &self.goal {
            writeln!(out)?;
            writeln!(out, "label \"goal\" = {goal};")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command() {
        let c = Command::new(
            "pick_a",
            "clear_a",
            vec![
                Outcome::new(0.7, "(holding_a' = true)"),
                Outcome::new(0.3, "true"),
            ],
        );
        assert_eq!(c.to_string(), "[pick_a] clear_a -> 0.7 : (holding_a' = true) + 0.3 : true;");
        let c = Command::new("stuck", "true", vec![Outcome::new(1.0, "true")]);
        assert_eq!(c.to_string(), "[stuck] true -> 1.0 : true;");
    }

    #[test]
    fn model() {
        let atoms = vec!["clear_a".to_string(), "clear_b".to_string()];
        let initial: HashSet<String> = ["clear_b".to_string()].into_iter().collect();
        let model = Model {
            kind: ModelType::Mdp,
            atoms: &atoms,
            initial: &initial,
            commands: vec![Command::new(
                "clean_a",
                "!(clear_a)",
                vec![Outcome::new(1.0, "(clear_a' = true)")],
            )],
            goal: Some("(clear_a & clear_b)".to_string()),
        };
        let expected = "mdp

module main
\tclear_a : bool init false;
\tclear_b : bool init true;

\t[clean_a] !(clear_a) -> 1.0 : (clear_a' = true);
endmodule

label \"goal\" = (clear_a & clear_b);
";
        assert_eq!(model.render(), expected);
    }
}
