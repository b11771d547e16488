//! Locates the domain file of a problem from common naming conventions.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::Res;
use crate::errors::{Message, OptionExt};

/// `XXX.pb.pddl`, whose domain is expected in `XXX.dom.pddl`
static SPLIT_NAMING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)\.pb\.(p?pddl)$").unwrap());
static PLAIN_NAMING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)\.(p?pddl)$").unwrap());

/// Looks for the domain of a problem file, in the directory of the problem and in its parent.
///
/// Accepted names are, by order of preference, `domain.pddl`, `XXX.dom.pddl` for a problem
/// `XXX.pb.pddl`, and `XXX-domain.pddl` or `domain-XXX.pddl` for a problem `XXX.pddl`.
/// The `.ppddl` extension is accepted as well.
pub fn find_domain_of(problem_file: &Path) -> Res<PathBuf> {
    let file_name = problem_file
        .file_name()
        .or_error("Invalid file")?
        .to_str()
        .or_error("Could not convert file name to utf8")?;

    let mut names: Vec<String> = vec![match problem_file.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("domain.{ext}"),
        None => "domain.pddl".to_string(),
    }];
    names.extend(
        SPLIT_NAMING
            .captures(file_name)
            .map(|c| format!("{}.dom.{}", &c[1], &c[2])),
    );
    if let Some(c) = PLAIN_NAMING.captures(file_name) {
        names.push(format!("{}-domain.{}", &c[1], &c[2]));
        names.push(format!("domain-{}.{}", &c[1], &c[2]));
    }

    let dirs: Vec<&Path> = problem_file.ancestors().skip(1).take(2).collect();
    names
        .iter()
        .flat_map(|name| dirs.iter().map(move |dir| dir.join(name)))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| Message::error(format!("No domain file found next to the problem, tried {names:?}")))
}
