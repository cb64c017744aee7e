//! Experiment setup CLI.
//!
//! Run from a control directory: `expt init` creates the laboratory,
//! `expt setup` prepares `work/`, `expt sweep` removes it again.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use expt::core::policy::SetupPolicy;
use expt::core::state::ExperimentState;
use expt::error::SetupError;
use expt::exit_codes;
use expt::io::config::{ExperimentConfig, load_experiment_config};
use expt::io::work::WorkDirectory;
use expt::setup::{SetupOptions, experiment_status, resolve_lab_path, run_init, run_setup, run_sweep};

const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(
    name = "expt",
    version,
    about = "Prepare laboratory and work directories for model runs"
)]
struct Cli {
    /// Control directory holding `config.yaml` (defaults to the current directory).
    #[arg(short, long, global = true)]
    control: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the laboratory directory layout.
    Init {
        /// Laboratory root (overrides `laboratory` in config.yaml).
        #[arg(short, long)]
        laboratory: Option<PathBuf>,
    },
    /// Check the version gate and prepare the work directory.
    Setup {
        #[arg(short, long)]
        laboratory: Option<PathBuf>,
        /// Remove any existing work directory first.
        #[arg(long)]
        sweep: bool,
        /// Re-stage into an existing work directory.
        #[arg(short, long)]
        force: bool,
        /// Print the prepared work directory as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Remove the work directory and its `work` link.
    Sweep,
    /// Print where this control directory is in the setup lifecycle.
    Status {
        #[arg(short, long)]
        laboratory: Option<PathBuf>,
    },
}

fn main() {
    expt::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        let code = err
            .downcast_ref::<SetupError>()
            .map_or(exit_codes::INVALID, SetupError::exit_code);
        std::process::exit(code);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let control_dir = match cli.control {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolve current directory")?,
    };
    match cli.command {
        Command::Init { laboratory } => cmd_init(&control_dir, laboratory.as_deref()),
        Command::Setup {
            laboratory,
            sweep,
            force,
            json,
        } => cmd_setup(
            &control_dir,
            laboratory.as_deref(),
            SetupPolicy { sweep, force },
            json,
        ),
        Command::Sweep => cmd_sweep(&control_dir),
        Command::Status { laboratory } => cmd_status(&control_dir, laboratory.as_deref()),
    }
}

fn cmd_init(control_dir: &Path, laboratory: Option<&Path>) -> Result<()> {
    let lab_path = lab_path_for(control_dir, laboratory)?;
    let lab = run_init(&lab_path)?;
    println!("init: laboratory={}", lab.root.display());
    Ok(())
}

fn cmd_setup(
    control_dir: &Path,
    laboratory: Option<&Path>,
    policy: SetupPolicy,
    json: bool,
) -> Result<()> {
    let config = load_experiment_config(control_dir)?;
    let options = SetupOptions {
        control_dir,
        lab_path: laboratory,
        policy,
        tool_version: TOOL_VERSION,
    };
    let work = run_setup(&options, &config)?;
    if json {
        print_json(&SetupReport {
            tool_version: TOOL_VERSION,
            policy,
            work: &work,
        })?;
    } else {
        println!(
            "setup: work={} target={}",
            work.link.display(),
            work.target.display()
        );
    }
    Ok(())
}

fn cmd_sweep(control_dir: &Path) -> Result<()> {
    let removed = run_sweep(control_dir)?;
    println!("sweep: removed={removed}");
    Ok(())
}

fn cmd_status(control_dir: &Path, laboratory: Option<&Path>) -> Result<()> {
    let lab_path = lab_path_for(control_dir, laboratory)?;
    let state: ExperimentState = experiment_status(control_dir, &lab_path)?;
    println!("{state}");
    Ok(())
}

/// Laboratory from the flag, or from config.yaml when no flag is given.
fn lab_path_for(control_dir: &Path, laboratory: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = laboratory {
        return Ok(path.to_path_buf());
    }
    let config: ExperimentConfig = load_experiment_config(control_dir)?;
    Ok(resolve_lab_path(None, &config, control_dir)?)
}

#[derive(Serialize)]
struct SetupReport<'a> {
    tool_version: &'a str,
    policy: SetupPolicy,
    work: &'a WorkDirectory,
}

/// Serialize `value` to pretty-printed JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}
