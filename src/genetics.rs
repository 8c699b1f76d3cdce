//! Closed catalogs of genes, genetic alterations, and their rate effects.
//!
//! Alterations are dispatched through exhaustive `match` tables rather than
//! string comparison: a (gene, alteration) pair the tables do not recognize
//! is still recorded on the cell but changes no rates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Genes recognized by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gene {
    Tp53,
    Kras,
    Pten,
    Myc,
    Egfr,
    Bcl2,
    Bax,
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gene::Tp53 => "TP53",
            Gene::Kras => "KRAS",
            Gene::Pten => "PTEN",
            Gene::Myc => "MYC",
            Gene::Egfr => "EGFR",
            Gene::Bcl2 => "BCL2",
            Gene::Bax => "BAX",
        };
        write!(f, "{name}")
    }
}

/// Kinds of mutation a scheduled event can introduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationKind {
    Knockout,
    Activation,
    Amplification,
    PointMutation,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationKind::Knockout => "knockout",
            MutationKind::Activation => "activation",
            MutationKind::Amplification => "amplification",
            MutationKind::PointMutation => "point-mutation",
        };
        write!(f, "{name}")
    }
}

/// Directions an expression event can push a gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpressionAction {
    Activate,
    Suppress,
}

impl fmt::Display for ExpressionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExpressionAction::Activate => "activate",
            ExpressionAction::Suppress => "suppress",
        };
        write!(f, "{name}")
    }
}

/// Multiplicative effect of an alteration on the two per-cell rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateEffect {
    pub proliferation: f64,
    pub apoptosis: f64,
}

/// Effect of a mutation on the carrying cell, or `None` for recognized
/// combinations with no modeled rate change.
pub fn mutation_effect(gene: Gene, kind: MutationKind) -> Option<RateEffect> {
    match (gene, kind) {
        // Tumor-suppressor loss: apoptosis evasion plus a growth advantage.
        (Gene::Tp53, MutationKind::Knockout) => Some(RateEffect {
            proliferation: 1.5,
            apoptosis: 0.1,
        }),
        // Oncogene activation: hyperproliferation alone.
        (Gene::Kras, MutationKind::Activation) => Some(RateEffect {
            proliferation: 2.0,
            apoptosis: 1.0,
        }),
        (Gene::Pten, MutationKind::Knockout) => Some(RateEffect {
            proliferation: 1.8,
            apoptosis: 0.3,
        }),
        _ => None,
    }
}

/// Effect of an expression change on the carrying cell.
pub fn expression_effect(gene: Gene, action: ExpressionAction) -> Option<RateEffect> {
    match (gene, action) {
        // Anti-apoptotic.
        (Gene::Bcl2, ExpressionAction::Activate) => Some(RateEffect {
            proliferation: 1.0,
            apoptosis: 0.2,
        }),
        // Pro-apoptotic.
        (Gene::Bax, ExpressionAction::Activate) => Some(RateEffect {
            proliferation: 1.0,
            apoptosis: 3.0,
        }),
        _ => None,
    }
}

/// A mutation acquired by a cell, kept in acquisition order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub gene: Gene,
    pub kind: MutationKind,
    /// Simulated hour at which the mutation was introduced.
    pub time: f64,
}

/// An expression change applied to a cell, kept in acquisition order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionRecord {
    pub gene: Gene,
    pub action: ExpressionAction,
    pub fold_change: f64,
    pub time: f64,
}
