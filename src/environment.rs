//! Shared resource environment consumed by the living population.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Glucose drawn per living cell per simulated hour (mM).
const GLUCOSE_RATE: f64 = 0.001;
/// Oxygen drawn per living cell per simulated hour (%).
const OXYGEN_RATE: f64 = 0.0005;
/// Lactate produced per unit of glucose demand.
const LACTATE_YIELD: f64 = 0.5;

/// Metabolite concentrations and growth-factor levels shared by all cells.
///
/// Mutated only by [`Environment::consume`] each tick and by scheduled
/// perturbations, which overwrite fields as an instantaneous step change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub glucose: f64,
    pub oxygen: f64,
    pub lactate: f64,
    pub glutamine: f64,
    pub ph: f64,
    pub temperature: f64,
    pub growth_factors: BTreeMap<String, f64>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::physiological()
    }
}

impl Environment {
    /// Physiological defaults.
    pub fn physiological() -> Self {
        let growth_factors = BTreeMap::from([
            ("EGF".to_string(), 10.0),
            ("IGF1".to_string(), 50.0),
            ("VEGF".to_string(), 20.0),
            ("TNF".to_string(), 0.0),
        ]);
        Self {
            glucose: 5.0,
            oxygen: 5.0,
            lactate: 1.0,
            glutamine: 2.0,
            ph: 7.4,
            temperature: 37.0,
            growth_factors,
        }
    }

    /// Deduct the aggregate consumption of `alive` cells over `dt` hours.
    ///
    /// Glucose and oxygen are floored at zero; lactate accumulates in
    /// proportion to the glucose demand.
    pub fn consume(&mut self, alive: usize, dt: f64) {
        let glucose_demand = alive as f64 * GLUCOSE_RATE * dt;
        let oxygen_demand = alive as f64 * OXYGEN_RATE * dt;

        self.glucose = (self.glucose - glucose_demand).max(0.0);
        self.oxygen = (self.oxygen - oxygen_demand).max(0.0);
        self.lactate += glucose_demand * LACTATE_YIELD;
    }

    /// Overwrite the perturbed fields. No blending or ramp.
    pub fn apply_perturbation(&mut self, perturbation: Perturbation) {
        match perturbation {
            Perturbation::Hypoxia => self.oxygen = 1.0,
            Perturbation::NutrientDeprivation => self.glucose = 0.5,
            Perturbation::Acidosis => self.ph = 6.5,
            Perturbation::HeatShock => self.temperature = 42.0,
        }
    }

    pub fn metabolites(&self) -> MetaboliteSnapshot {
        MetaboliteSnapshot {
            glucose: self.glucose,
            oxygen: self.oxygen,
            lactate: self.lactate,
        }
    }
}

/// Externally scheduled step changes to the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Perturbation {
    Hypoxia,
    NutrientDeprivation,
    Acidosis,
    HeatShock,
}

impl fmt::Display for Perturbation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Perturbation::Hypoxia => "hypoxia",
            Perturbation::NutrientDeprivation => "nutrient-deprivation",
            Perturbation::Acidosis => "acidosis",
            Perturbation::HeatShock => "heat-shock",
        };
        write!(f, "{name}")
    }
}

/// The metabolite levels recorded in each history entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetaboliteSnapshot {
    pub glucose: f64,
    pub oxygen: f64,
    pub lactate: f64,
}
