//! Statistics primitives for trajectory analysis.

use serde::{Deserialize, Serialize};

/// Online mean and sample standard deviation (Welford update).
pub struct Accumulator {
    count: usize,
    mean: f64,
    sq_diff_sum: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            sq_diff_sum: 0.0,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.count += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.count as f64;

        let diff_b = val - self.mean;
        self.sq_diff_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: self.mean,
            std_dev: if self.count > 1 {
                (self.sq_diff_sum / (self.count as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// A stored time series with equilibration-aware summary statistics.
pub struct TimeSeries {
    vals: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimeSeriesReport {
    pub mean: f64,
    pub std_dev: f64,
    pub sem: f64,
    pub is_equil: bool,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self { vals: Vec::new() }
    }

    pub fn push(&mut self, val: f64) {
        self.vals.push(val);
    }

    pub fn len(&self) -> usize {
        self.vals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }

    /// Summary over the equilibrated tail of the series.
    pub fn report(&self) -> TimeSeriesReport {
        if self.vals.is_empty() {
            return TimeSeriesReport {
                mean: f64::NAN,
                std_dev: f64::NAN,
                sem: f64::NAN,
                is_equil: false,
            };
        }
        let i_equil = compute_opt_i_equil(&self.vals);
        let equil_series = &self.vals[i_equil..];
        TimeSeriesReport {
            mean: compute_mean(equil_series),
            std_dev: compute_var(equil_series).sqrt(),
            sem: compute_sem(equil_series),
            is_equil: i_equil != self.vals.len() / 2,
        }
    }
}

impl Default for TimeSeries {
    fn default() -> Self {
        Self::new()
    }
}

fn compute_mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return f64::NAN;
    }
    series.iter().sum::<f64>() / series.len() as f64
}

fn compute_var(series: &[f64]) -> f64 {
    let count = series.len();
    if count < 2 {
        return f64::NAN;
    }
    let mean = compute_mean(series);
    series.iter().map(|&val| (val - mean).powi(2)).sum::<f64>() / (count - 1) as f64
}

/// Standard error of the mean via the Flyvbjerg-Petersen blocking method.
fn compute_sem(series: &[f64]) -> f64 {
    let mut blocked = series.to_vec();
    let mut count = blocked.len();
    let mut sem2_ests = Vec::new();
    let mut sem2_errs = Vec::new();

    while count >= 2 {
        let sem2_est = compute_var(&blocked) / count as f64;
        let sem2_err = sem2_est * (2.0 / (count as f64 - 1.0)).sqrt();
        sem2_ests.push(sem2_est);
        sem2_errs.push(sem2_err);

        blocked = blocked
            .chunks_exact(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect();
        count = blocked.len();
    }

    for (idx, &sem2_est) in sem2_ests.iter().enumerate() {
        let max_low = sem2_ests[idx..]
            .iter()
            .zip(sem2_errs[idx..].iter())
            .map(|(est, err)| est - err)
            .fold(f64::NEG_INFINITY, f64::max);

        if sem2_est > max_low {
            return sem2_est.sqrt();
        }
    }

    sem2_ests.last().copied().unwrap_or(f64::NAN).sqrt()
}

/// Optimal equilibration index via the marginal standard error rule.
fn compute_opt_i_equil(series: &[f64]) -> usize {
    let count = series.len();
    let mut min_mse = f64::INFINITY;
    let mut opt_i_equil = count / 2;
    let n_idxs = count.ilog2() + 1;
    let candidates: Vec<_> = (0..n_idxs)
        .map(|idx| count / 2_usize.pow(n_idxs - idx))
        .collect();

    for i_equil in candidates {
        let tail = &series[i_equil..];
        let tail_count = tail.len();

        let var = compute_var(tail);
        let mse = var * (tail_count - 1) as f64 / tail_count.pow(2) as f64;

        if mse < min_mse {
            min_mse = mse;
            opt_i_equil = i_equil;
        }
    }

    opt_i_equil
}
