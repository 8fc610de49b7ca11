//! rulekit - run, test and extend document rules from the command line.
//!
//! Every command loads a JSON workspace file (block rules, test cases,
//! stored suggestions, optional `suggest` config) and prints JSON on stdout.
//! Logs go to stderr.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rulekit_catalog::TestFilter;
use rulekit_core::{RuleId, Value};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod workspace;

use workspace::Workspace;

/// rulekit - document rule kit
#[derive(Parser, Debug)]
#[command(name = "rulekit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct WorkspaceArg {
    /// Path to the workspace JSON file
    #[arg(env = "RULEKIT_WORKSPACE")]
    workspace: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a document through the enabled rules
    Run {
        #[command(flatten)]
        ws: WorkspaceArg,

        /// Path to the input document JSON
        document: PathBuf,
    },

    /// Evaluate the enabled test cases
    Test {
        #[command(flatten)]
        ws: WorkspaceArg,

        /// Only tests of this suite
        #[arg(long)]
        suite: Option<String>,

        /// Only tests carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// Print the (rule, field-path) pairs the tests exercise
    Coverage {
        #[command(flatten)]
        ws: WorkspaceArg,

        /// Print the per-field summary instead
        #[arg(long)]
        fields: bool,

        /// Restrict the per-field summary to one rule
        #[arg(long, requires = "fields")]
        rule: Option<String>,
    },

    /// Suggest tests for uncovered rule writes
    Suggest {
        #[command(flatten)]
        ws: WorkspaceArg,

        /// Maximum number of suggestions (defaults to the workspace config)
        #[arg(short, long, env = "RULEKIT_SUGGEST_LIMIT")]
        limit: Option<usize>,
    },

    /// Check determinism and idempotence of one rule on random inputs
    Property {
        #[command(flatten)]
        ws: WorkspaceArg,

        /// Rule id or name
        rule: String,

        /// Number of random inputs
        #[arg(long)]
        trials: Option<usize>,

        /// Random seed
        #[arg(long, env = "RULEKIT_SEED")]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Run { ws, document } => run(&ws.workspace, &document),
        Commands::Test { ws, suite, tag } => test(&ws.workspace, suite, tag),
        Commands::Coverage { ws, fields, rule } => coverage(&ws.workspace, fields, rule),
        Commands::Suggest { ws, limit } => suggest(&ws.workspace, limit),
        Commands::Property {
            ws,
            rule,
            trials,
            seed,
        } => property(&ws.workspace, &rule, trials, seed),
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(workspace: &Path, document: &Path) -> Result<()> {
    let session = Workspace::load(workspace)?.into_session()?;
    let text = fs::read_to_string(document)
        .with_context(|| format!("failed to read document {}", document.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("invalid document {}", document.display()))?;

    let result = session.run_rule(&Value::from(json), Vec::new())?;
    print_json(&result)
}

fn test(workspace: &Path, suite: Option<String>, tag: Option<String>) -> Result<()> {
    let session = Workspace::load(workspace)?.into_session()?;
    let filter = TestFilter { suite, tag };
    let outcomes = session.evaluate_tests(&filter)?;
    print_json(&outcomes)?;

    let failed = outcomes.iter().filter(|o| !o.passed()).count();
    if failed > 0 {
        bail!("{failed} of {} tests failed", outcomes.len());
    }
    info!(tests = outcomes.len(), "all tests passed");
    Ok(())
}

fn coverage(workspace: &Path, fields: bool, rule: Option<String>) -> Result<()> {
    let session = Workspace::load(workspace)?.into_session()?;
    if fields {
        let rule = rule.map(RuleId::from);
        print_json(&session.field_coverage(rule.as_ref())?)
    } else {
        print_json(&session.compute_coverage()?)
    }
}

fn suggest(workspace: &Path, limit: Option<usize>) -> Result<()> {
    let session = Workspace::load(workspace)?.into_session()?;
    let limit = limit.unwrap_or(session.suggest_config().limit);
    print_json(&session.suggest_tests(limit)?)
}

fn property(workspace: &Path, rule: &str, trials: Option<usize>, seed: Option<u64>) -> Result<()> {
    let session = Workspace::load(workspace)?.into_session()?;
    let snapshot = session.snapshot()?;
    let rule_id = snapshot
        .registry()
        .get_by_name(rule)
        .map(|r| r.id.clone())
        .unwrap_or_else(|| RuleId::from(rule));

    let report = session.check_properties(&rule_id, trials, seed)?;
    print_json(&report)?;
    if report.failed > 0 {
        bail!("{} of {} trials violated a property", report.failed, report.trials);
    }
    Ok(())
}
