//! Scheduled perturbation events and the timeline that matches them
//! against the simulation clock.

use crate::environment::Perturbation;
use crate::genetics::{ExpressionAction, Gene, MutationKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Which living cells a mutation event hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationTarget {
    /// One uniformly random living cell.
    Single,
    /// A random sample of the configured subset fraction.
    Subset,
    /// Every living cell.
    All,
}

/// Which living cells an expression event hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpressionTarget {
    All,
    /// Cells carrying at least one mutation.
    Mutants,
    /// Cells carrying no mutation.
    Wildtype,
}

/// The perturbation an event introduces when its trigger time is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventKind {
    Mutation {
        gene: Gene,
        kind: MutationKind,
        target: MutationTarget,
    },
    Expression {
        gene: Gene,
        action: ExpressionAction,
        fold_change: f64,
        target: ExpressionTarget,
    },
    Environment {
        perturbation: Perturbation,
        /// Recorded for display; the overwrite itself is instantaneous.
        duration_hours: f64,
    },
}

/// An event as specified in the configuration, before the schedule assigns
/// it an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSpec {
    /// Trigger time in simulated hours.
    pub time: f64,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// A scheduled event. Immutable once created, except for removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub time: f64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EventKind::Mutation { gene, kind, .. } => {
                write!(f, "{kind} of {gene} at {}h", self.time)
            }
            EventKind::Expression {
                gene,
                action,
                fold_change,
                ..
            } => write!(f, "{action} {gene} ({fold_change}x) at {}h", self.time),
            EventKind::Environment {
                perturbation,
                duration_hours,
            } => write!(
                f,
                "{perturbation} for {duration_hours}h starting at {}h",
                self.time
            ),
        }
    }
}

/// Ordered, mutable timeline of scheduled events.
///
/// An event is due when `|time - now| < tolerance` and it has not been
/// applied before. Tracking applied ids closes the double-application
/// window the matching rule would otherwise leave open when the timestep
/// or tolerance changes mid-run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    events: Vec<Event>,
    next_id: u64,
    applied: BTreeSet<u64>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_specs(specs: &[EventSpec]) -> Self {
        let mut schedule = Self::new();
        for spec in specs {
            schedule.add(spec.time, spec.kind.clone());
        }
        schedule
    }

    /// Schedule an event, returning its id.
    pub fn add(&mut self, time: f64, kind: EventKind) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.events.push(Event { id, time, kind });
        id
    }

    /// Remove an event by id. Returns whether it existed.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.events.len();
        self.events.retain(|event| event.id != id);
        self.applied.remove(&id);
        self.events.len() != before
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Unapplied events within the tolerance window of `now`, in trigger
    /// order.
    pub fn due(&self, now: f64, tolerance: f64) -> Vec<Event> {
        let mut due: Vec<Event> = self
            .events
            .iter()
            .filter(|event| {
                !self.applied.contains(&event.id) && (event.time - now).abs() < tolerance
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.time.total_cmp(&b.time));
        due
    }

    pub fn mark_applied(&mut self, id: u64) {
        self.applied.insert(id);
    }

    /// Unapplied events whose window has already passed. Each is reported
    /// once and then retired so the warning does not repeat every tick.
    pub fn sweep_missed(&mut self, now: f64, tolerance: f64) -> Vec<Event> {
        let missed: Vec<Event> = self
            .events
            .iter()
            .filter(|event| !self.applied.contains(&event.id) && now - event.time >= tolerance)
            .cloned()
            .collect();
        for event in &missed {
            self.applied.insert(event.id);
        }
        missed
    }

    /// Forget which events have been applied, so a fresh run re-applies the
    /// whole timeline.
    pub fn reset_applied(&mut self) {
        self.applied.clear();
    }
}
