use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use buddy::output::{write_check_errors, write_human, write_json, write_tsv};
use buddy::{
    SetupConfig, SetupSummary, SystemEnv, SystemGit, ValidationReport, ValidationWorkflow,
    load_validators, run_setup,
};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::info;

use crate::logging;

#[derive(Parser, Debug)]
#[command(name = "sidekick")]
#[command(version, about = "Project setup and file validation")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides it.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the environment and directories, then clone pinned repositories
    Setup(SetupArgs),
    /// Check files against the checksums recorded in a manifest
    Validate(ValidateArgs),
}

#[derive(clap::Args, Debug)]
pub struct SetupArgs {
    /// Expected prefix of the active conda environment
    #[arg(long, value_name = "PREFIX")]
    pub conda_prefix: Option<String>,

    /// Also require `Rscript` from the active environment
    #[arg(long, requires = "conda_prefix")]
    pub require_r: bool,

    /// YAML list of directories that must exist
    #[arg(long, value_name = "FILE")]
    pub dirs: Option<PathBuf>,

    /// YAML manifest of repositories to clone at pinned commits
    #[arg(long, value_name = "FILE")]
    pub repos: Option<PathBuf>,

    /// Minimum length of a pinned commit identifier (never below 7)
    #[arg(long, value_name = "N", default_value_t = buddy::MIN_COMMIT_LEN)]
    pub min_commit_len: usize,
}

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Validation manifest
    #[arg(long, value_name = "FILE")]
    pub yaml: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    /// Only the failure report lines
    Tsv,
}

/// Parse arguments and run the chosen command.
///
/// Returns `Ok(false)` when the command ran but found problems.
///
/// # Errors
///
/// Returns an error if the command could not run to completion.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Setup(args) => setup(&args),
        Commands::Validate(args) => validate(&args),
    }
}

fn setup(args: &SetupArgs) -> Result<bool> {
    let config = setup_config(args);
    let summary = run_setup(&config, &SystemEnv, &SystemGit).context("setup failed")?;
    print_setup_summary(&summary);
    Ok(true)
}

fn setup_config(args: &SetupArgs) -> SetupConfig {
    let mut config = SetupConfig::default();
    config.conda_prefix.clone_from(&args.conda_prefix);
    config.require_r = args.require_r;
    config.required_dirs.clone_from(&args.dirs);
    config.repositories.clone_from(&args.repos);
    config.clone.min_commit_len = args.min_commit_len;
    config
}

fn print_setup_summary(summary: &SetupSummary) {
    if summary.environment_checked {
        println!("{} environment", "ok".green());
    }
    if summary.dirs_checked > 0 {
        println!("{} {} required directories", "ok".green(), summary.dirs_checked);
    }
    for name in &summary.cloned {
        println!("{} {name}", "cloned".green());
    }
    for name in &summary.already_present {
        println!("{} {name}", "present".cyan());
    }
    println!("{}", "Setup complete".green().bold());
}

fn validate(args: &ValidateArgs) -> Result<bool> {
    let validators = load_validators(&args.yaml)
        .with_context(|| format!("cannot load validators from {}", args.yaml.display()))?;
    info!(count = validators.len(), manifest = %args.yaml.display(), "loaded validators");

    let report = ValidationWorkflow::new(validators).run();
    print_report(&report, args.format).context("failed to write report")?;
    Ok(report.ok)
}

fn print_report(report: &ValidationReport, format: OutputFormat) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Json => write_json(report, &mut stdout)?,
        OutputFormat::Tsv => {
            write_tsv(report, &mut stdout)?;
            write_check_errors(report, &mut io::stderr().lock())?;
        }
        OutputFormat::Human => {
            write_human(report, &mut stdout)?;
            let status = if report.ok {
                "PASS".green().bold()
            } else {
                "FAIL".red().bold()
            };
            writeln!(stdout, "{status}")?;
        }
    }
    stdout.flush()
}
