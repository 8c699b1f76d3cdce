use mitosim::genetics::{
    ExpressionAction, ExpressionRecord, Gene, MutationKind, MutationRecord, mutation_effect,
};
use mitosim::model::CellAgent;
use mitosim::pathology::{DiseaseStage, Selection, TissueStatus, assess};

fn cell(id: u64, clone_id: &str, proliferation: f64, apoptosis: f64) -> CellAgent {
    CellAgent::founder(id, clone_id.to_string(), proliferation, apoptosis)
}

fn mutant(id: u64, clone_id: &str, proliferation: f64, apoptosis: f64) -> CellAgent {
    let mut cell = cell(id, clone_id, proliferation, apoptosis);
    cell.mutations.push(MutationRecord {
        gene: Gene::Tp53,
        kind: MutationKind::Knockout,
        time: 5.0,
    });
    cell
}

#[test]
fn founder_population_is_healthy() {
    let cells = vec![
        cell(0, "clone_0", 50.0, 50.0),
        cell(1, "clone_0", 50.0, 50.0),
        cell(2, "clone_0", 50.0, 50.0),
    ];

    let report = assess(&cells, &Selection::Population).unwrap();
    assert_eq!(report.cells_assessed, 3);
    assert_eq!(report.stage, DiseaseStage::Normal);
    assert_eq!(report.status, TissueStatus::Healthy);
    assert!(!report.has_mutations);
    assert!(!report.hallmarks.sustained_proliferation);
    assert_eq!(report.behavior.proliferation, "Normal");
    assert_eq!(report.behavior.apoptosis, "Normal");
    assert_eq!(report.behavior.migration, "None");
    assert!(report.mutations.is_empty());
    assert!(report.expression_alterations.is_empty());
}

#[test]
fn stage_thresholds_are_ordered() {
    let grid = [
        (50.0, 50.0, DiseaseStage::Normal, TissueStatus::Healthy),
        (58.0, 50.0, DiseaseStage::Hyperplasia, TissueStatus::Healthy),
        (65.0, 50.0, DiseaseStage::Dysplasia, TissueStatus::Dysplastic),
        (75.0, 35.0, DiseaseStage::CarcinomaInSitu, TissueStatus::Dysplastic),
        (90.0, 10.0, DiseaseStage::Invasive, TissueStatus::Cancerous),
    ];

    for (proliferation, apoptosis, stage, status) in grid {
        let cells = vec![cell(0, "clone_0", proliferation, apoptosis)];
        let report = assess(&cells, &Selection::Population).unwrap();
        assert_eq!(report.stage, stage, "proliferation {proliferation}");
        assert_eq!(report.status, status, "proliferation {proliferation}");
    }
}

#[test]
fn invasive_hallmarks_track_mutation_presence() {
    let wildtype = vec![cell(0, "clone_0", 90.0, 10.0)];
    let report = assess(&wildtype, &Selection::Population).unwrap();
    assert!(report.hallmarks.sustained_proliferation);
    assert!(report.hallmarks.growth_suppressor_evasion);
    assert!(report.hallmarks.apoptosis_resistance);
    assert!(report.hallmarks.invasion_activation);
    assert!(!report.hallmarks.genome_instability);

    let mutated = vec![mutant(0, "clone_TP53_5", 90.0, 10.0)];
    let report = assess(&mutated, &Selection::Population).unwrap();
    assert!(report.hallmarks.genome_instability);
    assert_eq!(report.behavior.migration, "Increased");
}

#[test]
fn carcinoma_in_situ_has_contained_hallmarks() {
    let cells = vec![cell(0, "clone_0", 75.0, 35.0)];
    let report = assess(&cells, &Selection::Population).unwrap();
    assert!(report.hallmarks.sustained_proliferation);
    assert!(report.hallmarks.apoptosis_resistance);
    assert!(!report.hallmarks.invasion_activation);
    assert!(!report.hallmarks.genome_instability);
}

#[test]
fn clone_selection_ignores_other_clones_and_the_dead() {
    let mut dead = mutant(2, "clone_TP53_5", 500.0, 0.0);
    dead.alive = false;

    let cells = vec![
        cell(0, "clone_0", 45.0, 55.0),
        mutant(1, "clone_TP53_5", 80.0, 10.0),
        dead,
    ];

    let report = assess(&cells, &Selection::Clone("clone_TP53_5".to_string())).unwrap();
    assert_eq!(report.cells_assessed, 1);
    assert!((report.mean_proliferation - 80.0).abs() < 1e-9);
    assert_eq!(report.stage, DiseaseStage::CarcinomaInSitu);

    let report = assess(&cells, &Selection::Clone("clone_0".to_string())).unwrap();
    assert_eq!(report.cells_assessed, 1);
    assert_eq!(report.stage, DiseaseStage::Normal);
}

#[test]
fn single_cell_selection_reaches_dead_cells() {
    let mut dead = mutant(7, "clone_TP53_5", 80.0, 10.0);
    dead.alive = false;
    let cells = vec![cell(0, "clone_0", 50.0, 50.0), dead];

    let report = assess(&cells, &Selection::Cell(7)).unwrap();
    assert_eq!(report.cells_assessed, 1);
    assert!(report.has_mutations);
}

#[test]
fn empty_selection_is_an_error() {
    let cells = vec![cell(0, "clone_0", 50.0, 50.0)];
    assert!(assess(&cells, &Selection::Clone("clone_9".to_string())).is_err());
    assert!(assess(&cells, &Selection::Cell(99)).is_err());
    assert!(assess(&[], &Selection::Population).is_err());
}

#[test]
fn genetic_profile_deduplicates_labels() {
    let mut first = mutant(0, "clone_TP53_5", 75.0, 5.0);
    first.expression_changes.push(ExpressionRecord {
        gene: Gene::Bax,
        action: ExpressionAction::Activate,
        fold_change: 3.0,
        time: 8.0,
    });
    let second = mutant(1, "clone_TP53_5", 75.0, 5.0);

    let report = assess(&[first, second], &Selection::Population).unwrap();
    assert_eq!(report.mutations.len(), 1);
    assert!(report.mutations.contains("TP53 knockout"));
    assert_eq!(report.expression_alterations.len(), 1);
    assert!(report.expression_alterations.contains("BAX activate"));
}

#[test]
fn effect_table_distinguishes_recognized_pairs() {
    let effect = mutation_effect(Gene::Tp53, MutationKind::Knockout).unwrap();
    assert!(effect.proliferation > 1.0);
    assert!(effect.apoptosis < 1.0);

    let effect = mutation_effect(Gene::Kras, MutationKind::Activation).unwrap();
    assert!(effect.proliferation > 1.0);
    assert!((effect.apoptosis - 1.0).abs() < 1e-9);

    assert!(mutation_effect(Gene::Tp53, MutationKind::Activation).is_none());
    assert!(mutation_effect(Gene::Bax, MutationKind::Knockout).is_none());
}
