use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use ppddl::find_domain_of;
use ppddl2prism::checker::{CheckOutcome, ModelChecker, Prism};
use ppddl2prism::{Policy, Translator, TranslatorConfig};

/// Translates a probabilistic PDDL problem into PRISM models: an MDP with all ground actions and,
/// given a policy, the DTMC of the policy.
#[derive(Parser, Debug)]
#[clap(about = "PPDDL to PRISM translator")]
struct Opt {
    /// Problem file.
    problem: PathBuf,

    /// If not set, will look for a `domain.pddl` file in the directory of the
    /// problem file or in the parent directory.
    #[clap(long, short)]
    domain: Option<PathBuf>,

    /// JSON file with the policy from which to build the DTMC.
    #[clap(long, short)]
    policy: Option<PathBuf>,

    /// File containing the path formula to check on the DTMC, e.g. `F "goal"`.
    #[clap(long)]
    property: Option<PathBuf>,

    /// Directory where the models are written.
    #[clap(long, default_value = "tmp")]
    out_dir: PathBuf,

    /// Accept undeclared predicates, types and objects.
    #[clap(long)]
    skip_sanity_checks: bool,

    /// Run the model checker on the DTMC (requires a policy and a property).
    #[clap(long)]
    check: bool,

    /// PRISM executable.
    #[clap(long, env = "PRISM_BIN", default_value = "prism")]
    prism: PathBuf,

    /// Logging level to use: one of "error", "warn", "info", "debug", "trace"
    #[clap(short, long, default_value = "info")]
    log_level: tracing::Level,
}

fn main() -> Result<()> {
    let opt = Opt::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(opt.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let problem_file = &opt.problem;
    ensure!(
        problem_file.exists(),
        "Problem file {} does not exist",
        problem_file.display()
    );
    let domain_file = match &opt.domain {
        Some(name) => name.clone(),
        None => find_domain_of(problem_file).context("Consider specifying the domain with the option -d/--domain")?,
    };

    let config = TranslatorConfig {
        skip_sanity_checks: opt.skip_sanity_checks,
    };
    let translator = Translator::from_files(&domain_file, problem_file, &config)?;
    tracing::info!(
        "{} state variables, {} ground actions",
        translator.ground_atoms().len(),
        translator.ground_actions().len()
    );

    std::fs::create_dir_all(&opt.out_dir)
        .with_context(|| format!("Cannot create directory {}", opt.out_dir.display()))?;
    let mdp_file = opt.out_dir.join("mdp.prism");
    std::fs::write(&mdp_file, translator.generate_mdp())?;
    tracing::info!("MDP written to {}", mdp_file.display());

    let Some(policy_file) = &opt.policy else {
        ensure!(!opt.check, "A policy is required to check a property");
        return Ok(());
    };
    let policy = Policy::from_file(policy_file)?;
    let dtmc_file = opt.out_dir.join("dtmc.prism");
    std::fs::write(&dtmc_file, translator.generate_dtmc(&policy)?)?;
    tracing::info!("DTMC written to {}", dtmc_file.display());

    if opt.check {
        let property_file = opt.property.as_ref().context("A property is required with --check")?;
        let formula = std::fs::read_to_string(property_file)
            .with_context(|| format!("Cannot read property file {}", property_file.display()))?;
        let property = format!("P=? [{}]", formula.trim());
        match Prism::new(&opt.prism).check(&dtmc_file, &property)? {
            CheckOutcome::Value(value) => println!("{property}: {value}"),
            CheckOutcome::Failed { diagnostics } => anyhow::bail!("Model checking failed:\n{diagnostics}"),
        }
    }
    Ok(())
}
