//! Simulation configuration.
//!
//! Loaded from a TOML file and validated before use; the engine itself
//! never touches storage and only ever receives the parsed value.

use crate::environment::Environment;
use crate::events::{EventKind, EventSpec};
use crate::tracking::UserIdentity;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub run: RunConfig,
    #[serde(default)]
    pub cell: CellConfig,
    #[serde(default = "Environment::physiological")]
    pub environment: Environment,
    /// Events scheduled before the run starts.
    #[serde(default)]
    pub events: Vec<EventSpec>,
    /// Identity supplied by the external identity provider, if any.
    /// A run never requires one.
    #[serde(default)]
    pub user: Option<UserIdentity>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of founder cells.
    pub population_size: usize,
    pub duration_hours: f64,
    pub time_step_hours: f64,
    /// Living-population bound that gates new divisions.
    pub capacity: usize,
    /// Event-matching window; defaults to the timestep.
    #[serde(default)]
    pub event_tolerance_hours: Option<f64>,
    /// Pins the random stream for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Founders are spread round-robin over this many clones.
    #[serde(default = "default_founder_clones")]
    pub founder_clones: usize,
    /// Fraction of living cells hit by a subset-targeted mutation.
    #[serde(default = "default_subset_fraction")]
    pub subset_fraction: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CellConfig {
    /// Initial per-cell rates, percent-like units.
    #[serde(default = "default_rate")]
    pub proliferation_rate: f64,
    #[serde(default = "default_rate")]
    pub apoptosis_rate: f64,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            proliferation_rate: default_rate(),
            apoptosis_rate: default_rate(),
        }
    }
}

fn default_rate() -> f64 {
    50.0
}

fn default_founder_clones() -> usize {
    1
}

fn default_subset_fraction() -> f64 {
    0.1
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized, or if any
    /// configuration value is out of range.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config =
            toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_num(self.run.population_size, 1..=1_000_000)
            .context("invalid population size")?;
        check_positive(self.run.duration_hours).context("invalid duration")?;
        check_positive(self.run.time_step_hours).context("invalid time step")?;
        check_num(self.run.capacity, 1..=10_000_000).context("invalid capacity")?;
        if let Some(tolerance) = self.run.event_tolerance_hours {
            check_positive(tolerance).context("invalid event tolerance")?;
        }
        check_num(self.run.founder_clones, 1..=self.run.population_size)
            .context("invalid founder clone count")?;
        check_num(self.run.subset_fraction, 0.0..=1.0).context("invalid subset fraction")?;

        check_num(self.cell.proliferation_rate, 0.0..=200.0)
            .context("invalid proliferation rate")?;
        check_num(self.cell.apoptosis_rate, 0.0..=200.0).context("invalid apoptosis rate")?;

        check_num(self.environment.glucose, 0.0..).context("invalid glucose level")?;
        check_num(self.environment.oxygen, 0.0..).context("invalid oxygen level")?;
        check_num(self.environment.lactate, 0.0..).context("invalid lactate level")?;
        check_num(self.environment.glutamine, 0.0..).context("invalid glutamine level")?;
        check_num(self.environment.ph, 0.0..=14.0).context("invalid pH")?;
        check_num(self.environment.temperature, 0.0..=60.0).context("invalid temperature")?;

        for (idx, spec) in self.events.iter().enumerate() {
            validate_event(spec).with_context(|| format!("invalid event {idx}"))?;
        }

        Ok(())
    }
}

fn validate_event(spec: &EventSpec) -> Result<()> {
    check_num(spec.time, 0.0..).context("invalid trigger time")?;
    match &spec.kind {
        EventKind::Expression { fold_change, .. } => {
            check_positive(*fold_change).context("invalid fold change")?;
        }
        EventKind::Environment { duration_hours, .. } => {
            check_num(*duration_hours, 0.0..).context("invalid perturbation duration")?;
        }
        EventKind::Mutation { .. } => {}
    }
    Ok(())
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_positive(num: f64) -> Result<()> {
    if !(num > 0.0) {
        bail!("number must be strictly positive, but is {num:?}");
    }
    Ok(())
}
