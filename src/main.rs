use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mitosim::manager::Manager;
use mitosim::pathology::Selection;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// Simulation directory containing config.toml.
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a fresh simulation to completion.
    Run,

    /// Classify the final population of a finished run.
    Classify {
        #[arg(long)]
        run_idx: usize,

        /// Restrict the assessment to one clone.
        #[arg(long)]
        clone: Option<String>,

        /// Restrict the assessment to one cell.
        #[arg(long, conflicts_with = "clone")]
        cell: Option<u64>,
    },

    /// Compute trajectory observables for all runs.
    Analyze,

    /// Delete all run directories.
    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(&args.sim_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Run => mgr.run_simulation()?,
        Command::Classify {
            run_idx,
            clone,
            cell,
        } => {
            let selection = match (cell, clone) {
                (Some(id), _) => Selection::Cell(id),
                (None, Some(clone_id)) => Selection::Clone(clone_id),
                (None, None) => Selection::Population,
            };
            mgr.classify_run(run_idx, &selection)?;
        }
        Command::Analyze => mgr.run_analysis()?,
        Command::Clean => mgr.clean_sim()?,
    }

    Ok(())
}
