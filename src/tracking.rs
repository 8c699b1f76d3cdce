//! Usage-tracking interface to the external identity and telemetry
//! collaborators.
//!
//! The core only ever emits two records per run, keyed by whatever
//! identity is present; a missing identity never blocks a run.

use serde::{Deserialize, Serialize};

/// Identity supplied by the external identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub name: String,
}

/// Parameters reported when a run starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStarted {
    pub population_size: usize,
    pub duration_hours: f64,
    pub scheduled_events: usize,
}

/// Aggregates reported when a run finishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunFinished {
    pub final_population: usize,
    pub clone_count: usize,
    pub elapsed_hours: f64,
}

pub trait UsageTracker {
    fn run_started(&mut self, user: Option<&UserIdentity>, run: &RunStarted);
    fn run_finished(&mut self, user: Option<&UserIdentity>, run: &RunFinished);
}

/// Forwards usage records to the log; stands in for the telemetry sink.
pub struct LogTracker;

impl UsageTracker for LogTracker {
    fn run_started(&mut self, user: Option<&UserIdentity>, run: &RunStarted) {
        log::info!(
            "usage: user={} started run: {} cells, {}h, {} scheduled events",
            user_label(user),
            run.population_size,
            run.duration_hours,
            run.scheduled_events
        );
    }

    fn run_finished(&mut self, user: Option<&UserIdentity>, run: &RunFinished) {
        log::info!(
            "usage: user={} finished run: {} cells in {} clones after {}h",
            user_label(user),
            run.final_population,
            run.clone_count,
            run.elapsed_hours
        );
    }
}

/// Discards all usage records.
pub struct NullTracker;

impl UsageTracker for NullTracker {
    fn run_started(&mut self, _user: Option<&UserIdentity>, _run: &RunStarted) {}
    fn run_finished(&mut self, _user: Option<&UserIdentity>, _run: &RunFinished) {}
}

fn user_label(user: Option<&UserIdentity>) -> &str {
    user.map_or("anonymous", |user| user.id.as_str())
}
