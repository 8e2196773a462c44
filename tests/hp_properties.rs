use mesh_hp::forest::{AdaptFlag, QuadCellForest};
use mesh_hp::hp::FeCollection;
use mesh_hp::hp::refinement::{
    AdaptationIntent, HpDecision, PAdaptivity, ThresholdOptions, classify_active,
    force_p_over_h, full_p_adaptivity, hp_adapt,
};
use proptest::prelude::*;

const N_FE: usize = 4;

fn flag_strategy() -> impl Strategy<Value = AdaptFlag> {
    prop_oneof![
        Just(AdaptFlag::None),
        Just(AdaptFlag::Refine),
        Just(AdaptFlag::Coarsen)
    ]
}

/// Two levels: `n_roots` roots, the first `n_refined` of them split once.
fn forest_strategy() -> impl Strategy<Value = QuadCellForest> {
    (1usize..5, 0usize..5)
        .prop_flat_map(|(n_roots, n_refined)| {
            let n_refined = n_refined.min(n_roots);
            let n_active = n_roots - n_refined + 4 * n_refined;
            (
                Just((n_roots, n_refined)),
                prop::collection::vec((flag_strategy(), 0..N_FE), n_active),
            )
        })
        .prop_map(|((n_roots, n_refined), markers)| {
            let mut forest = QuadCellForest::new();
            let roots: Vec<_> = (0..n_roots).map(|_| forest.add_root(0)).collect();
            for root in &roots[..n_refined] {
                forest.refine_cell(*root).unwrap();
            }
            let active: Vec<_> = forest.active_cells().collect();
            for (id, (flag, fe_index)) in active.into_iter().zip(markers) {
                forest.set_flag(id, flag).unwrap();
                forest.set_active_fe_index(id, fe_index).unwrap();
            }
            forest
        })
}

fn fe() -> FeCollection {
    FeCollection::from_degrees(&[1, 2, 3, 4]).unwrap()
}

proptest! {
    #[test]
    fn force_p_over_h_is_idempotent(mut forest in forest_strategy()) {
        full_p_adaptivity(&mut forest, &fe()).unwrap();
        force_p_over_h(&mut forest).unwrap();
        let once = forest.active_snapshot();
        prop_assert_eq!(force_p_over_h(&mut forest).unwrap(), 0);
        prop_assert_eq!(forest.active_snapshot(), once);
    }

    #[test]
    fn full_p_adaptivity_stays_inside_the_collection(mut forest in forest_strategy()) {
        full_p_adaptivity(&mut forest, &fe()).unwrap();
        for cell in forest.active_snapshot() {
            match cell.flag {
                AdaptFlag::Refine => prop_assert_eq!(
                    cell.future_fe_index,
                    Some((cell.active_fe_index + 1).min(N_FE - 1))
                ),
                AdaptFlag::Coarsen => prop_assert_eq!(
                    cell.future_fe_index,
                    Some(cell.active_fe_index.saturating_sub(1))
                ),
                AdaptFlag::None => prop_assert_eq!(cell.future_fe_index, None),
            }
        }
    }

    #[test]
    fn decisions_resolve_every_cell(
        mut forest in forest_strategy(),
        choose in any::<bool>(),
        seed in prop::collection::vec(0.0f64..10.0, 64),
        fraction in 0.0f64..=1.0,
    ) {
        let n = forest.n_active_cells();
        let decision = if choose { HpDecision::ChoosePOverH } else { HpDecision::ForcePOverH };
        let options = ThresholdOptions { p_refine_fraction: fraction, p_coarsen_fraction: fraction };
        let summary = hp_adapt(
            &mut forest,
            &fe(),
            PAdaptivity::Threshold { smoothness_indicators: &seed[..n], options },
            decision,
        ).unwrap();
        prop_assert_eq!(summary.intents.h_and_p, 0);
        prop_assert!(classify_active(&forest).iter().all(|i| *i != AdaptationIntent::HAndP));
    }
}
