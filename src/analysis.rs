//! Trajectory analysis.
//!
//! Replays the MessagePack history frames written during a run through a
//! set of observables and reports them as JSON.

use crate::model::HistoryEntry;
use crate::stats::{Accumulator, TimeSeries};
use anyhow::{Context, Result};
use rmp_serde::decode;
use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind},
    path::Path,
};

pub trait Obs {
    fn update(&mut self, entry: &HistoryEntry) -> Result<()>;
    fn report(&self) -> serde_json::Value;
}

/// Per-tick relative population growth, in percent per simulated hour.
pub struct GrowthRate {
    prev: Option<(f64, usize)>,
    time_series: TimeSeries,
}

impl GrowthRate {
    pub fn new() -> Self {
        Self {
            prev: None,
            time_series: TimeSeries::new(),
        }
    }
}

impl Obs for GrowthRate {
    fn update(&mut self, entry: &HistoryEntry) -> Result<()> {
        if let Some((prev_time, prev_pop)) = self.prev {
            let dt = entry.time - prev_time;
            if prev_pop > 0 && dt > 0.0 {
                let rate =
                    (entry.population as f64 - prev_pop as f64) / prev_pop as f64 * 100.0 / dt;
                self.time_series.push(rate);
            }
        }
        self.prev = Some((entry.time, entry.population));
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        let report = self.time_series.report();
        serde_json::json!({ "growth_rate": report })
    }
}

/// Number of distinct living clones per tick.
pub struct CloneDiversity {
    acc: Accumulator,
    final_clones: usize,
}

impl CloneDiversity {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
            final_clones: 0,
        }
    }
}

impl Obs for CloneDiversity {
    fn update(&mut self, entry: &HistoryEntry) -> Result<()> {
        self.acc.add(entry.clones.len() as f64);
        self.final_clones = entry.clones.len();
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        let report = self.acc.report();
        serde_json::json!({ "clone_count": report, "final_clone_count": self.final_clones })
    }
}

/// Mean metabolite levels over the run.
pub struct Metabolites {
    glucose: Accumulator,
    oxygen: Accumulator,
    lactate: Accumulator,
}

impl Metabolites {
    pub fn new() -> Self {
        Self {
            glucose: Accumulator::new(),
            oxygen: Accumulator::new(),
            lactate: Accumulator::new(),
        }
    }
}

impl Obs for Metabolites {
    fn update(&mut self, entry: &HistoryEntry) -> Result<()> {
        self.glucose.add(entry.metabolites.glucose);
        self.oxygen.add(entry.metabolites.oxygen);
        self.lactate.add(entry.metabolites.lactate);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "glucose": self.glucose.report(),
            "oxygen": self.oxygen.report(),
            "lactate": self.lactate.report(),
        })
    }
}

pub struct Analyzer {
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new() -> Self {
        let mut obs_ptr_vec: Vec<Box<dyn Obs>> = Vec::new();
        obs_ptr_vec.push(Box::new(GrowthRate::new()));
        obs_ptr_vec.push(Box::new(CloneDiversity::new()));
        obs_ptr_vec.push(Box::new(Metabolites::new()));
        Self { obs_ptr_vec }
    }

    /// Feed every history frame in a trajectory file to the observables.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        loop {
            match decode::from_read::<_, HistoryEntry>(&mut reader) {
                Ok(entry) => {
                    for obs in &mut self.obs_ptr_vec {
                        obs.update(&entry).context("failed to update observable")?;
                    }
                }
                Err(decode::Error::InvalidMarkerRead(err))
                    if err.kind() == ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(err) => {
                    return Err(err).context("failed to read history frame");
                }
            }
        }
        Ok(())
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);

        let reports: Vec<_> = self.obs_ptr_vec.iter().map(|obs| obs.report()).collect();
        serde_json::to_writer_pretty(writer, &reports)?;
        Ok(())
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}
