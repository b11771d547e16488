//! Interface to an external probabilistic model checker.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Answer of a model checker to a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Value of the property, as printed by the checker.
    Value(String),
    /// The checker rejected the model or the property.
    Failed { diagnostics: String },
}

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("cannot run model checker `{binary}`")]
    Launch { binary: String, source: std::io::Error },
}

pub trait ModelChecker {
    /// Evaluates the property on the model stored in the given file.
    fn check(&self, model: &Path, property: &str) -> Result<CheckOutcome, CheckError>;
}

/// The PRISM model checker, run as a subprocess.
#[derive(Clone, Debug)]
pub struct Prism {
    pub binary: PathBuf,
}

impl Prism {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Prism { binary: binary.into() }
    }
}

impl Default for Prism {
    fn default() -> Self {
        Prism::new("prism")
    }
}

static RESULT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^Result:\s*(\S+)").unwrap());

/// Extracts the value from the output of PRISM, e.g. `Result: 0.75 (exact floating point)`.
pub fn parse_result(output: &str) -> Option<&str> {
    RESULT.captures(output).and_then(|c| c.get(1)).map(|m| m.as_str())
}

impl ModelChecker for Prism {
    fn check(&self, model: &Path, property: &str) -> Result<CheckOutcome, CheckError> {
        tracing::debug!("checking {} with {}", model.display(), self.binary.display());
        let output = Command::new(&self.binary)
            .arg(model)
            .arg("-pctl")
            .arg(property)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| CheckError::Launch {
                binary: self.binary.display().to_string(),
                source,
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Ok(CheckOutcome::Failed {
                diagnostics: format!("{stdout}{stderr}"),
            });
        }
        Ok(match parse_result(&stdout) {
            Some(value) => CheckOutcome::Value(value.to_string()),
            None => CheckOutcome::Failed {
                diagnostics: format!("no result in output of {}:\n{stdout}{stderr}", self.binary.display()),
            },
        })
    }
}
