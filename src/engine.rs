//! Simulation engine.
//!
//! Owns the configuration, the full run state, and the random number
//! generator, and drives the discrete tick loop. All state mutation goes
//! through the tick sequence on one thread; an embedding that introduces
//! real parallelism must keep a single writer in front of [`SimState`].

use crate::config::Config;
use crate::environment::{Environment, MetaboliteSnapshot};
use crate::events::{EventKind, ExpressionTarget, MutationTarget, Schedule};
use crate::genetics::{
    self, ExpressionAction, ExpressionRecord, Gene, MutationKind, MutationRecord,
};
use crate::model::{CellAgent, Clock, FOUNDER_CLONE, HistoryEntry, Phase, SimState};
use crate::tracking::RunFinished;
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Uniform;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Outcome of a single stepper tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Time advanced by one timestep.
    Advanced,
    /// The clock is paused; nothing changed.
    Paused,
    /// This tick reached the configured duration; the run is stopped.
    Completed,
}

#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    state: SimState,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create an idle engine from a validated configuration.
    pub fn new(cfg: Config) -> Result<Self> {
        let rng = match cfg.run.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        let state = SimState {
            clock: Clock::new(cfg.run.duration_hours, cfg.run.time_step_hours),
            cells: Vec::new(),
            next_cell_id: 0,
            environment: cfg.environment.clone(),
            schedule: Schedule::from_specs(&cfg.events),
            history: Vec::new(),
        };

        Ok(Self { cfg, state, rng })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.clock.phase
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.state.history
    }

    /// Initialize the population, history, and clock, and begin running.
    ///
    /// The agent set is created fresh on every start; the t=0 snapshot is
    /// the first history entry.
    pub fn start(&mut self) -> Result<()> {
        match self.state.clock.phase {
            Phase::Running | Phase::Paused => bail!("simulation is already running"),
            Phase::Idle | Phase::Stopped => {}
        }

        self.state.cells.clear();
        self.state.next_cell_id = 0;
        self.state.environment = self.cfg.environment.clone();
        self.state.schedule.reset_applied();
        self.state.clock = Clock::new(self.cfg.run.duration_hours, self.cfg.run.time_step_hours);
        self.state.clock.phase = Phase::Running;

        for idx in 0..self.cfg.run.population_size {
            let id = self.next_cell_id();
            let clone_id = founder_clone_id(idx, self.cfg.run.founder_clones);
            self.state.cells.push(CellAgent::founder(
                id,
                clone_id,
                self.cfg.cell.proliferation_rate,
                self.cfg.cell.apoptosis_rate,
            ));
        }

        self.state.history = vec![self.state.snapshot()];

        log::info!(
            "simulation started: {} cells, {}h duration, {}h step, capacity {}",
            self.cfg.run.population_size,
            self.cfg.run.duration_hours,
            self.cfg.run.time_step_hours,
            self.cfg.run.capacity,
        );

        Ok(())
    }

    /// Freeze the clock; ticks no-op until [`Engine::resume`].
    pub fn pause(&mut self) -> Result<()> {
        if self.state.clock.phase != Phase::Running {
            bail!("can only pause a running simulation");
        }
        self.state.clock.phase = Phase::Paused;
        log::info!("simulation paused at {}h", self.state.clock.current_time);
        Ok(())
    }

    /// Continue exactly where the run left off.
    pub fn resume(&mut self) -> Result<()> {
        if self.state.clock.phase != Phase::Paused {
            bail!("can only resume a paused simulation");
        }
        self.state.clock.phase = Phase::Running;
        log::info!("simulation resumed at {}h", self.state.clock.current_time);
        Ok(())
    }

    /// Halt the run. Only future ticks are prevented; no work in flight is
    /// aborted.
    pub fn stop(&mut self) {
        self.state.clock.phase = Phase::Stopped;
        let summary = self.summary();
        log::info!(
            "simulation stopped at {}h: {} living cells in {} clones",
            summary.elapsed_hours,
            summary.final_population,
            summary.clone_count,
        );
    }

    /// Clear agents, history, and the clock back to idle.
    pub fn reset(&mut self) {
        self.state.cells.clear();
        self.state.next_cell_id = 0;
        self.state.environment = self.cfg.environment.clone();
        self.state.schedule.reset_applied();
        self.state.clock = Clock::new(self.cfg.run.duration_hours, self.cfg.run.time_step_hours);
        self.state.history.clear();
        log::info!("simulation reset");
    }

    /// Final aggregates of the current run.
    pub fn summary(&self) -> RunFinished {
        RunFinished {
            final_population: self.state.living_count(),
            clone_count: self.state.clone_counts().len(),
            elapsed_hours: self.state.clock.current_time,
        }
    }

    /// Advance the simulation by one tick.
    ///
    /// Per-tick order is fixed: advance time, apply due events, update the
    /// population, update the environment from the post-update living
    /// count, append a history snapshot.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        match self.state.clock.phase {
            Phase::Idle => bail!("simulation has not been started"),
            Phase::Stopped => bail!("simulation has already finished"),
            Phase::Paused => return Ok(TickOutcome::Paused),
            Phase::Running => {}
        }

        self.state.clock.advance();

        self.apply_due_events()
            .context("failed to apply due events")?;

        self.update_population();

        let alive = self.state.living_count();
        let dt = self.state.clock.time_step;
        self.state.environment.consume(alive, dt);

        self.state.history.push(self.state.snapshot());

        if self.state.clock.finished() {
            self.stop();
            return Ok(TickOutcome::Completed);
        }

        Ok(TickOutcome::Advanced)
    }

    /// Run from idle to completion, streaming one MessagePack history
    /// frame per recorded snapshot to `writer`.
    pub fn run_to_completion<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        self.start().context("failed to start simulation")?;

        write_frame(writer, &self.state.history[0])?;

        let total_ticks =
            (self.cfg.run.duration_hours / self.cfg.run.time_step_hours).ceil() as usize;
        let log_every = (total_ticks / 20).max(1);
        let mut ticks_done = 0usize;

        loop {
            let outcome = self.tick().context("failed to perform tick")?;
            ticks_done += 1;

            match outcome {
                TickOutcome::Paused => bail!("tick reported paused during a synchronous run"),
                TickOutcome::Advanced | TickOutcome::Completed => {
                    let entry = self
                        .state
                        .history
                        .last()
                        .context("history is empty after a tick")?;
                    write_frame(writer, entry)?;

                    if ticks_done % log_every == 0 || outcome == TickOutcome::Completed {
                        let progress =
                            100.0 * self.state.clock.current_time / self.state.clock.duration;
                        log::info!(
                            "t={:.1}h population={} ({progress:06.2}%)",
                            self.state.clock.current_time,
                            entry.population,
                        );
                    }

                    if outcome == TickOutcome::Completed {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Schedule an event mid-run; takes effect from the next tick.
    pub fn schedule_event(&mut self, time: f64, kind: EventKind) -> u64 {
        self.state.schedule.add(time, kind)
    }

    /// Remove a scheduled event by id.
    pub fn remove_event(&mut self, id: u64) -> bool {
        self.state.schedule.remove(id)
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// The random stream is included, so a loaded checkpoint continues the
    /// same trajectory.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize engine")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }

    /// Serialize the full current state as a JSON document, without
    /// interrupting the run.
    pub fn export_state(&self) -> Result<serde_json::Value> {
        let export = StateExport {
            simulated_time: self.state.clock.current_time,
            environment: &self.state.environment,
            total_cells: self.state.cells.len(),
            living_cells: self.state.living_count(),
            clones: self.state.clone_counts(),
            metabolites: self.state.environment.metabolites(),
            history: &self.state.history,
        };
        serde_json::to_value(&export).context("failed to serialize state export")
    }

    fn next_cell_id(&mut self) -> u64 {
        let id = self.state.next_cell_id;
        self.state.next_cell_id += 1;
        id
    }

    fn apply_due_events(&mut self) -> Result<()> {
        let now = self.state.clock.current_time;
        let tolerance = self
            .cfg
            .run
            .event_tolerance_hours
            .unwrap_or(self.state.clock.time_step);

        for event in self.state.schedule.due(now, tolerance) {
            log::info!("applying event at t={now}h: {event}");
            match event.kind {
                EventKind::Mutation { gene, kind, target } => self
                    .apply_mutation(gene, kind, target, now)
                    .context("failed to apply mutation event")?,
                EventKind::Expression {
                    gene,
                    action,
                    fold_change,
                    target,
                } => self.apply_expression(gene, action, fold_change, target, now),
                EventKind::Environment { perturbation, .. } => {
                    self.state.environment.apply_perturbation(perturbation);
                }
            }
            self.state.schedule.mark_applied(event.id);
        }

        for missed in self.state.schedule.sweep_missed(now, tolerance) {
            log::warn!(
                "event window passed without application (tolerance {tolerance}h): {missed}"
            );
        }

        Ok(())
    }

    /// Append a mutation record, reassign the clone, and scale the rates
    /// of every targeted living cell.
    fn apply_mutation(
        &mut self,
        gene: Gene,
        kind: MutationKind,
        target: MutationTarget,
        now: f64,
    ) -> Result<()> {
        let living: Vec<usize> = self
            .state
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.alive)
            .map(|(idx, _)| idx)
            .collect();
        if living.is_empty() {
            return Ok(());
        }

        let selected: Vec<usize> = match target {
            MutationTarget::Single => {
                let idx_dist = Uniform::new(0, living.len())?;
                vec![living[idx_dist.sample(&mut self.rng)]]
            }
            MutationTarget::Subset => {
                let count =
                    (living.len() as f64 * self.cfg.run.subset_fraction).floor() as usize;
                living
                    .choose_multiple(&mut self.rng, count)
                    .copied()
                    .collect()
            }
            MutationTarget::All => living,
        };

        // New clone defined by this mutation; all targets join it.
        let clone_id = format!("clone_{gene}_{}", now.floor() as i64);
        let effect = genetics::mutation_effect(gene, kind);

        for idx in selected {
            let cell = &mut self.state.cells[idx];
            cell.mutations.push(MutationRecord { gene, kind, time: now });
            cell.clone_id = clone_id.clone();
            if let Some(effect) = effect {
                cell.proliferation_rate *= effect.proliferation;
                cell.apoptosis_rate *= effect.apoptosis;
            }
        }

        Ok(())
    }

    fn apply_expression(
        &mut self,
        gene: Gene,
        action: ExpressionAction,
        fold_change: f64,
        target: ExpressionTarget,
        now: f64,
    ) {
        let effect = genetics::expression_effect(gene, action);

        for cell in self.state.cells.iter_mut().filter(|cell| cell.alive) {
            let eligible = match target {
                ExpressionTarget::All => true,
                ExpressionTarget::Mutants => cell.is_mutant(),
                ExpressionTarget::Wildtype => !cell.is_mutant(),
            };
            if !eligible {
                continue;
            }

            cell.expression_changes.push(ExpressionRecord {
                gene,
                action,
                fold_change,
                time: now,
            });
            if let Some(effect) = effect {
                cell.proliferation_rate *= effect.proliferation;
                cell.apoptosis_rate *= effect.apoptosis;
            }
        }
    }

    /// One stochastic proliferation/death pass over the living population.
    ///
    /// Division is gated on the pre-tick living count, so the population
    /// may transiently overshoot `capacity` by at most the number of
    /// divisions within the tick. Division is evaluated before death: a
    /// cell dying this tick may still have produced a daughter.
    fn update_population(&mut self) {
        let dt = self.state.clock.time_step;
        let capacity = self.cfg.run.capacity;

        let living: Vec<usize> = self
            .state
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.alive)
            .map(|(idx, _)| idx)
            .collect();
        let division_open = living.len() < capacity;

        for idx in living {
            self.state.cells[idx].age += dt;

            if division_open {
                let p_divide = (self.state.cells[idx].proliferation_rate / 100.0) * dt / 24.0;
                if self.rng.random::<f64>() < p_divide {
                    let id = self.next_cell_id();
                    let daughter = self.state.cells[idx].divide(id);
                    self.state.cells.push(daughter);
                }
            }

            let p_death = (self.state.cells[idx].apoptosis_rate / 100.0) * dt / 100.0;
            if self.rng.random::<f64>() < p_death {
                self.state.cells[idx].alive = false;
            }
        }
    }
}

fn founder_clone_id(idx: usize, founder_clones: usize) -> String {
    if founder_clones <= 1 {
        FOUNDER_CLONE.to_string()
    } else {
        format!("clone_{}", idx % founder_clones)
    }
}

fn write_frame<W: Write>(writer: &mut W, entry: &HistoryEntry) -> Result<()> {
    encode::write(writer, entry).context("failed to serialize history frame")
}

#[derive(Serialize)]
struct StateExport<'a> {
    simulated_time: f64,
    environment: &'a Environment,
    total_cells: usize,
    living_cells: usize,
    clones: BTreeMap<String, usize>,
    metabolites: MetaboliteSnapshot,
    history: &'a [HistoryEntry],
}
