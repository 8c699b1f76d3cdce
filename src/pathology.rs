//! Pathophysiology classifier.
//!
//! A pure, read-only view over the current agent set: aggregate rate
//! statistics mapped through fixed thresholds to a disease stage, hallmark
//! flags, and a tissue status. Safe to recompute at any time.

use crate::model::CellAgent;
use anyhow::{Result, bail};
use serde::Serialize;
use std::collections::BTreeSet;

/// Which cells an assessment covers.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// One cell by id, dead or alive.
    Cell(u64),
    /// The living cells of one clone.
    Clone(String),
    /// The whole living population.
    Population,
}

/// Ordered disease-stage labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DiseaseStage {
    Normal,
    Hyperplasia,
    Dysplasia,
    CarcinomaInSitu,
    Invasive,
}

impl DiseaseStage {
    pub fn label(self) -> &'static str {
        match self {
            DiseaseStage::Normal => "Normal",
            DiseaseStage::Hyperplasia => "Hyperplasia",
            DiseaseStage::Dysplasia => "Dysplasia",
            DiseaseStage::CarcinomaInSitu => "Carcinoma in Situ",
            DiseaseStage::Invasive => "Invasive Carcinoma",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DiseaseStage::Normal => {
                "Cells maintain normal architecture, growth control, and apoptosis regulation."
            }
            DiseaseStage::Hyperplasia => {
                "Increased cell proliferation but architecture preserved. Still responsive to signals."
            }
            DiseaseStage::Dysplasia => {
                "Abnormal cell morphology and architecture. Pre-cancerous changes present."
            }
            DiseaseStage::CarcinomaInSitu => {
                "Malignant transformation complete but cells contained. Basement membrane intact."
            }
            DiseaseStage::Invasive => {
                "Malignant cells with ability to invade surrounding tissue. Multiple hallmarks of cancer present."
            }
        }
    }
}

/// Two-threshold tissue status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TissueStatus {
    Healthy,
    Dysplastic,
    Cancerous,
}

/// Canonical hallmark flags associated with a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Hallmarks {
    pub sustained_proliferation: bool,
    pub growth_suppressor_evasion: bool,
    pub apoptosis_resistance: bool,
    pub genome_instability: bool,
    pub invasion_activation: bool,
}

/// Qualitative behavior labels for the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BehaviorProfile {
    pub proliferation: &'static str,
    pub apoptosis: &'static str,
    pub migration: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathologyReport {
    pub cells_assessed: usize,
    pub mean_proliferation: f64,
    pub mean_apoptosis: f64,
    pub has_mutations: bool,
    pub stage: DiseaseStage,
    pub stage_description: &'static str,
    pub status: TissueStatus,
    pub hallmarks: Hallmarks,
    pub behavior: BehaviorProfile,
    /// Deduplicated "GENE kind" labels across the selection.
    pub mutations: BTreeSet<String>,
    /// Deduplicated "GENE action" labels across the selection.
    pub expression_alterations: BTreeSet<String>,
}

/// Assess the selected cells.
///
/// # Errors
/// Returns an error if the selection matches no cell.
pub fn assess(cells: &[CellAgent], selection: &Selection) -> Result<PathologyReport> {
    let selected: Vec<&CellAgent> = match selection {
        Selection::Cell(id) => cells.iter().filter(|cell| cell.id == *id).collect(),
        Selection::Clone(clone_id) => cells
            .iter()
            .filter(|cell| cell.alive && cell.clone_id == *clone_id)
            .collect(),
        Selection::Population => cells.iter().filter(|cell| cell.alive).collect(),
    };

    if selected.is_empty() {
        bail!("selection matches no cells: {selection:?}");
    }

    let count = selected.len() as f64;
    let mean_proliferation = selected
        .iter()
        .map(|cell| cell.proliferation_rate)
        .sum::<f64>()
        / count;
    let mean_apoptosis = selected.iter().map(|cell| cell.apoptosis_rate).sum::<f64>() / count;
    let has_mutations = selected.iter().any(|cell| cell.is_mutant());

    let stage = classify_stage(mean_proliferation, mean_apoptosis);
    let status = classify_status(mean_proliferation, mean_apoptosis);
    let hallmarks = stage_hallmarks(stage, has_mutations);
    let behavior = behavior_profile(mean_proliferation, mean_apoptosis, has_mutations);

    let mut mutations = BTreeSet::new();
    let mut expression_alterations = BTreeSet::new();
    for cell in &selected {
        for record in &cell.mutations {
            mutations.insert(format!("{} {}", record.gene, record.kind));
        }
        for record in &cell.expression_changes {
            expression_alterations.insert(format!("{} {}", record.gene, record.action));
        }
    }

    Ok(PathologyReport {
        cells_assessed: selected.len(),
        mean_proliferation,
        mean_apoptosis,
        has_mutations,
        stage,
        stage_description: stage.description(),
        status,
        hallmarks,
        behavior,
        mutations,
        expression_alterations,
    })
}

fn classify_stage(proliferation: f64, apoptosis: f64) -> DiseaseStage {
    if proliferation > 80.0 && apoptosis < 20.0 {
        DiseaseStage::Invasive
    } else if proliferation > 70.0 && apoptosis < 40.0 {
        DiseaseStage::CarcinomaInSitu
    } else if proliferation > 60.0 {
        DiseaseStage::Dysplasia
    } else if proliferation > 55.0 {
        DiseaseStage::Hyperplasia
    } else {
        DiseaseStage::Normal
    }
}

fn classify_status(proliferation: f64, apoptosis: f64) -> TissueStatus {
    if proliferation > 70.0 && apoptosis < 30.0 {
        TissueStatus::Cancerous
    } else if proliferation > 60.0 {
        TissueStatus::Dysplastic
    } else {
        TissueStatus::Healthy
    }
}

fn stage_hallmarks(stage: DiseaseStage, has_mutations: bool) -> Hallmarks {
    match stage {
        DiseaseStage::Invasive => Hallmarks {
            sustained_proliferation: true,
            growth_suppressor_evasion: true,
            apoptosis_resistance: true,
            genome_instability: has_mutations,
            invasion_activation: true,
        },
        DiseaseStage::CarcinomaInSitu => Hallmarks {
            sustained_proliferation: true,
            growth_suppressor_evasion: true,
            apoptosis_resistance: true,
            ..Hallmarks::default()
        },
        DiseaseStage::Dysplasia => Hallmarks {
            sustained_proliferation: true,
            ..Hallmarks::default()
        },
        DiseaseStage::Hyperplasia | DiseaseStage::Normal => Hallmarks::default(),
    }
}

fn behavior_profile(proliferation: f64, apoptosis: f64, has_mutations: bool) -> BehaviorProfile {
    BehaviorProfile {
        proliferation: if proliferation > 70.0 {
            "High (Uncontrolled)"
        } else if proliferation > 40.0 {
            "Normal"
        } else {
            "Low"
        },
        apoptosis: if apoptosis < 30.0 {
            "Resistant"
        } else if apoptosis < 70.0 {
            "Normal"
        } else {
            "Elevated"
        },
        migration: if has_mutations { "Increased" } else { "None" },
    }
}
