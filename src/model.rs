//! Core simulation data types.

use crate::environment::{Environment, MetaboliteSnapshot};
use crate::events::Schedule;
use crate::genetics::{ExpressionRecord, MutationRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Clone identifier shared by the founding population.
pub const FOUNDER_CLONE: &str = "clone_0";

/// An individual simulated cell.
///
/// Lineage data (`generation`, inherited alteration history) never changes
/// after creation except through explicit events or division. Daughters are
/// independent: their history vectors are copies, so mutating one cell
/// never affects siblings or the parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellAgent {
    /// Unique within a run, never reused.
    pub id: u64,
    pub clone_id: String,
    /// 0 for founders, parent + 1 for daughters.
    pub generation: u32,
    pub mutations: Vec<MutationRecord>,
    pub expression_changes: Vec<ExpressionRecord>,
    /// Simulated hours since creation.
    pub age: f64,
    /// Percent-like rate; may exceed 100 under multiplicative effects.
    pub proliferation_rate: f64,
    pub apoptosis_rate: f64,
    /// Dead cells stay in the set for lineage queries but take no further
    /// part in the simulation.
    pub alive: bool,
}

impl CellAgent {
    pub fn founder(id: u64, clone_id: String, proliferation_rate: f64, apoptosis_rate: f64) -> Self {
        Self {
            id,
            clone_id,
            generation: 0,
            mutations: Vec::new(),
            expression_changes: Vec::new(),
            age: 0.0,
            proliferation_rate,
            apoptosis_rate,
            alive: true,
        }
    }

    /// Daughter cell produced at division: next generation, independent
    /// copies of the parent's alteration history, the parent's current
    /// rates and clone.
    pub fn divide(&self, id: u64) -> Self {
        Self {
            id,
            clone_id: self.clone_id.clone(),
            generation: self.generation + 1,
            mutations: self.mutations.clone(),
            expression_changes: self.expression_changes.clone(),
            age: 0.0,
            proliferation_rate: self.proliferation_rate,
            apoptosis_rate: self.apoptosis_rate,
            alive: true,
        }
    }

    pub fn is_mutant(&self) -> bool {
        !self.mutations.is_empty()
    }
}

/// Stepper lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// Discrete simulation clock. Simulated time advances by exactly
/// `time_step` hours per unpaused tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clock {
    pub current_time: f64,
    pub duration: f64,
    pub time_step: f64,
    pub phase: Phase,
}

impl Clock {
    pub fn new(duration: f64, time_step: f64) -> Self {
        Self {
            current_time: 0.0,
            duration,
            time_step,
            phase: Phase::Idle,
        }
    }

    pub fn advance(&mut self) {
        self.current_time += self.time_step;
    }

    pub fn finished(&self) -> bool {
        self.current_time >= self.duration
    }
}

/// One recorded tick: the snapshot the presentation layer consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub time: f64,
    /// Living cell count.
    pub population: usize,
    /// Living cells per clone.
    pub clones: BTreeMap<String, usize>,
    pub metabolites: MetaboliteSnapshot,
}

/// The full state of one simulation run.
///
/// Owned and mutated exclusively by the engine's tick sequence; everything
/// else reads it through shared references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    pub clock: Clock,
    pub cells: Vec<CellAgent>,
    /// Next cell id to assign; monotone, never reused.
    pub next_cell_id: u64,
    pub environment: Environment,
    pub schedule: Schedule,
    pub history: Vec<HistoryEntry>,
}

impl SimState {
    pub fn living(&self) -> impl Iterator<Item = &CellAgent> {
        self.cells.iter().filter(|cell| cell.alive)
    }

    pub fn living_count(&self) -> usize {
        self.living().count()
    }

    /// Living cells per clone id.
    pub fn clone_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for cell in self.living() {
            *counts.entry(cell.clone_id.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn snapshot(&self) -> HistoryEntry {
        HistoryEntry {
            time: self.clock.current_time,
            population: self.living_count(),
            clones: self.clone_counts(),
            metabolites: self.environment.metabolites(),
        }
    }
}
