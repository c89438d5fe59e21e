use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::json;

use geoglows_suite::domain::builder::stage::EnsembleLayout;
use geoglows_suite::domain::forecast::job_table::{JOB_TABLE_FILE, JobTable, PrepareOptions};
use geoglows_suite::domain::forecast::qinit::{ForecastChronometry, resolve_qinit};
use geoglows_suite::logger::{self, LoggerOptions};
use geoglows_suite::{create_definition, load_config};

#[derive(Parser, Debug)]
#[command(name = "geoglows-suite")]
#[command(version)]
#[command(about = "Builds the ecFlow suite definition for the GEOGLOWS RAPID forecast")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Also write the log to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build, validate and write the suite definition
    Create {
        /// Suite configuration (.json, .yaml or .yml)
        #[arg(short, long)]
        config: PathBuf,
        /// Definition path, defaults to {ecflow_home}/{suite}.def
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the definition instead of writing it
        #[arg(short, long)]
        dry_run: bool,
    },
    /// Write the job table for the current forecast cycle
    Prep {
        workspace: PathBuf,
        /// Directory holding the runoff files, defaults to the workspace
        #[arg(long)]
        runoff_dir: Option<PathBuf>,
        /// Start every run cold
        #[arg(long)]
        no_init_flows: bool,
    },
    /// Show the parameters a worker task receives for one job
    Job { workspace: PathBuf, job_id: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let options = LoggerOptions::from_verbosity(cli.verbose, cli.quiet, cli.log_file.clone());
    let logging = match logger::init(&options) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("{} {}", "warning:".yellow().bold(), e);
            false
        }
    };

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_failure(&e, logging);
            ExitCode::FAILURE
        }
    }
}

/// Without an installed logger `log::error!` goes nowhere, so the error is printed directly.
fn report_failure(error: &anyhow::Error, logging: bool) {
    if logging {
        log::error!("{:#}", error);
    } else {
        eprintln!("{} {:#}", "error:".red().bold(), error);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Create { config, output, dry_run } => {
            let forecast_config = load_config(&config).with_context(|| format!("loading '{}'", config.display()))?;
            let text = create_definition(&forecast_config, output.as_deref(), dry_run)?;
            if dry_run {
                print!("{}", text);
            }
        }
        Command::Prep { workspace, runoff_dir, no_init_flows } => {
            let mut options = PrepareOptions::for_workspace(&workspace);
            if let Some(runoff_dir) = runoff_dir {
                options.runoff_dir = runoff_dir;
            }
            options.initialize_flows = !no_init_flows;

            let table = JobTable::prepare(&options).context("preparing the job table")?;
            let path = table.write(&workspace)?;
            println!("{} job(s) written to {}", table.len(), path.display());
        }
        Command::Job { workspace, job_id } => {
            let table = JobTable::load(&workspace.join(JOB_TABLE_FILE))?;
            let job = table.job(&job_id)?;
            let qinit = resolve_qinit(&job.input_dir, &table.date, job.initialize_flows)?;
            let chronometry = ForecastChronometry::for_member(job.ensemble, EnsembleLayout::default().high_res_member());

            let summary = json!({
                "job_id": job.job_id,
                "vpu": job.basin,
                "ensemble": job.ensemble,
                "runoff": job.runoff,
                "input_dir": job.input_dir,
                "output_file": job.output_file,
                "qinit": qinit,
                "chronometry": chronometry,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
