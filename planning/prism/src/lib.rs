//! Translation of probabilistic PDDL planning tasks into PRISM models.
//!
//! A task is grounded once by a [`Translator`], from which two models can be generated:
//!  - an MDP where every applicable ground action can be chosen ([`Translator::generate_mdp`]),
//!  - a DTMC where choices are made by a symbolic [`Policy`] ([`Translator::generate_dtmc`]).
//!
//! ```no_run
//! use ppddl2prism::{Policy, Translator, TranslatorConfig};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let translator = Translator::from_files(
//!     "domain.pddl".as_ref(),
//!     "problem.pddl".as_ref(),
//!     &TranslatorConfig::default(),
//! )?;
//! let mdp = translator.generate_mdp();
//! let policy = Policy::from_json(r#"[{"name": "r1", "if": "clear_1", "then": "pick_1"}]"#)?;
//! let dtmc = translator.generate_dtmc(&policy)?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod catalog;
pub mod checker;
pub mod config;
pub mod effects;
pub mod emit;
pub mod error;
pub mod expression;
pub mod grounding;
pub mod model;
pub mod naming;
pub mod policy;
pub mod probability;
pub mod setup;

pub use config::TranslatorConfig;
pub use effects::Outcome;
pub use error::{Res, TranslationError};
pub use grounding::{GroundAction, Translator};
pub use policy::{Policy, PolicyRule};
