//! Simulation-directory orchestration.
//!
//! The manager owns all filesystem layout: the engine itself never reads
//! from storage and only receives the parsed configuration value.

use crate::analysis::Analyzer;
use crate::config::Config;
use crate::engine::Engine;
use crate::pathology::{self, Selection};
use crate::tracking::{LogTracker, RunStarted, UsageTracker};
use anyhow::{Context, Result};
use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Run a fresh simulation to completion in a new run directory,
    /// leaving behind a trajectory, a checkpoint, and a JSON state export.
    pub fn run_simulation(&self) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let mut engine = Engine::new(self.cfg.clone()).context("failed to construct engine")?;

        let mut tracker = LogTracker;
        let user = self.cfg.user.as_ref();
        tracker.run_started(
            user,
            &RunStarted {
                population_size: self.cfg.run.population_size,
                duration_hours: self.cfg.run.duration_hours,
                scheduled_events: self.cfg.events.len(),
            },
        );

        let trajectory_file = self.trajectory_file(run_idx, 0);
        let file = fs::File::create(&trajectory_file)
            .with_context(|| format!("failed to create {trajectory_file:?}"))?;
        let mut writer = BufWriter::new(file);

        engine
            .run_to_completion(&mut writer)
            .context("failed to run simulation")?;

        writer.flush().context("failed to flush writer stream")?;

        tracker.run_finished(user, &engine.summary());

        engine
            .save_checkpoint(self.checkpoint_file(run_idx))
            .context("failed to save checkpoint")?;

        let export = engine.export_state().context("failed to export state")?;
        let export_file = self.export_file(run_idx);
        let file = fs::File::create(&export_file)
            .with_context(|| format!("failed to create {export_file:?}"))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &export)
            .context("failed to write state export")?;

        Ok(())
    }

    /// Classify the final population of a finished run and write the
    /// pathology report next to its checkpoint.
    pub fn classify_run(&self, run_idx: usize, selection: &Selection) -> Result<()> {
        let checkpoint_file = self.checkpoint_file(run_idx);
        let engine = Engine::load_checkpoint(&checkpoint_file)
            .with_context(|| format!("failed to load {checkpoint_file:?}"))?;

        let report = pathology::assess(&engine.state().cells, selection)
            .context("failed to assess selection")?;

        log::info!(
            "run {run_idx}: {} cells assessed, stage {:?}, status {:?}",
            report.cells_assessed,
            report.stage,
            report.status,
        );

        let report_file = self.pathology_file(run_idx);
        let file = fs::File::create(&report_file)
            .with_context(|| format!("failed to create {report_file:?}"))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)
            .context("failed to write pathology report")?;

        Ok(())
    }

    /// Compute trajectory observables for every run.
    pub fn run_analysis(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let mut analyzer = Analyzer::new();

            let n_files = self
                .count_trajectory_files(run_idx)
                .context("failed to count trajectory files")?;
            for file_idx in 0..n_files {
                analyzer
                    .add_file(self.trajectory_file(run_idx, file_idx))
                    .context("failed to add file")?;
            }

            analyzer
                .save_results(self.results_file(run_idx))
                .context("failed to save results")?;
        }

        Ok(())
    }

    /// Delete every run directory, keeping the configuration.
    pub fn clean_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let run_dir = self.run_dir(run_idx);
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        Ok(())
    }

    fn count_run_dirs(&self) -> Result<usize> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let count = glob::glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|path| path.is_dir())
            .count();
        Ok(count)
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn count_trajectory_files(&self, run_idx: usize) -> Result<usize> {
        let pattern = self.run_dir(run_idx).join("trajectory-*.msgpack");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let count = glob::glob(pattern)
            .context("failed to glob trajectory files")?
            .filter_map(Result::ok)
            .count();
        Ok(count)
    }

    fn trajectory_file(&self, run_idx: usize, file_idx: usize) -> PathBuf {
        self.run_dir(run_idx)
            .join(format!("trajectory-{file_idx:04}.msgpack"))
    }

    fn checkpoint_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("checkpoint.msgpack")
    }

    fn export_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("export.json")
    }

    fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.json")
    }

    fn pathology_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("pathology.json")
    }
}
