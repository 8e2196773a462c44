mod util;

use mesh_hp::debug_invariants::DebugInvariants;
use mesh_hp::forest::{AdaptFlag, QuadCellForest};
use mesh_hp::hp::refinement::{
    AdaptationIntent, HpDecision, PAdaptivity, PredictionOptions, classify_active,
    force_p_over_h, full_p_adaptivity, hp_adapt, predict_error,
};
use util::{assigned, flags, linear_fe, roots};

#[test]
fn full_then_force_on_four_cells() {
    let fe = linear_fe(4);
    let (mut forest, ids) = roots(&[
        (AdaptFlag::Refine, 0),
        (AdaptFlag::Refine, 1),
        (AdaptFlag::Refine, 2),
        (AdaptFlag::Refine, 3),
    ]);

    let report = full_p_adaptivity(&mut forest, &fe).unwrap();
    assert_eq!(report.p_refined, 4);
    let future: Vec<_> = ids
        .iter()
        .map(|id| forest.future_fe_index(*id).unwrap())
        .collect();
    assert_eq!(future, vec![1, 2, 3, 3]);

    assert_eq!(force_p_over_h(&mut forest).unwrap(), 4);
    assert!(flags(&forest).iter().all(|f| *f == AdaptFlag::None));
    assert!(
        classify_active(&forest)
            .iter()
            .all(|i| *i == AdaptationIntent::PureP)
    );
}

#[test]
fn coarsening_at_the_bottom_keeps_the_lowest_element() {
    let fe = linear_fe(3);
    let (mut forest, _) = roots(&[(AdaptFlag::Coarsen, 0), (AdaptFlag::Coarsen, 2)]);
    full_p_adaptivity(&mut forest, &fe).unwrap();
    assert_eq!(assigned(&forest), vec![Some(0), Some(1)]);
}

#[test]
fn two_cycles_with_prediction() {
    let fe = linear_fe(4);
    let mut forest = QuadCellForest::new();
    let root = forest.add_root(0);
    let children = forest.refine_cell(root).unwrap();
    for child in &children {
        forest.set_refine_flag(*child).unwrap();
    }

    // first cycle: no history, force p on the first two cells and h on the rest
    let errors = [1.0, 1.0, 1.0, 1.0];
    let bootstrap = [f64::INFINITY, f64::INFINITY, 0.0, 0.0];
    let summary = hp_adapt(
        &mut forest,
        &fe,
        PAdaptivity::Prediction {
            error_indicators: &errors,
            predicted_errors: &bootstrap,
        },
        HpDecision::ForcePOverH,
    )
    .unwrap();
    assert_eq!(summary.assigned.p_refined, 2);
    assert_eq!(summary.intents.pure_p, 2);
    assert_eq!(summary.intents.pure_h, 2);
    assert_eq!(summary.intents.h_and_p, 0);

    let predicted = predict_error(&forest, &fe, &errors, PredictionOptions::default()).unwrap();
    assert!(predicted[0] < 1.0 && predicted[1] < 1.0);
    // h refinement of a degree-1 cell: 2 * 0.5 = 1
    assert!((predicted[2] - 1.0).abs() < 1e-12);

    let executed = forest.execute_coarsening_and_refinement(&fe).unwrap();
    assert_eq!(executed.p_adapted, 2);
    assert_eq!(executed.refined, 2);
    assert_eq!(forest.n_active_cells(), 2 + 2 * 4);
    forest.validate_invariants().unwrap();
    assert!(
        classify_active(&forest)
            .iter()
            .all(|i| *i == AdaptationIntent::None)
    );
    assert_eq!(forest.active_fe_index(children[0]).unwrap(), 1);
    assert_eq!(forest.active_fe_index(children[1]).unwrap(), 1);
}

#[test]
fn execution_after_choose_merges_only_h_groups() {
    let fe = linear_fe(3);
    let mut forest = QuadCellForest::new();
    let a = forest.add_root(1);
    let b = forest.add_root(1);
    let a_children = forest.refine_cell(a).unwrap();
    let b_children = forest.refine_cell(b).unwrap();
    for child in a_children.iter().chain(&b_children) {
        forest.set_coarsen_flag(*child).unwrap();
    }

    // group a: all p-flagged -> p coarsening; group b: one missing -> h coarsening
    let p_flags = [true, true, true, true, true, false, true, true];
    hp_adapt(
        &mut forest,
        &fe,
        PAdaptivity::<f64>::Flags(&p_flags),
        HpDecision::ChoosePOverH,
    )
    .unwrap();

    let executed = forest.execute_coarsening_and_refinement(&fe).unwrap();
    assert_eq!(executed.coarsened_groups, 1);
    assert_eq!(executed.p_adapted, 4);
    assert!(forest.is_active(b).unwrap());
    assert!(!forest.is_active(a).unwrap());
    for child in &a_children {
        assert_eq!(forest.active_fe_index(*child).unwrap(), 0);
    }
    assert_eq!(forest.active_fe_index(b).unwrap(), 1);
}
