use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use mesh_hp::forest::{AdaptFlag, QuadCellForest};
use mesh_hp::hp::FeCollection;
use mesh_hp::hp::refinement::{
    HpDecision, PAdaptivity, ThresholdOptions, choose_p_over_h, full_p_adaptivity, hp_adapt,
};

/// `n_roots` roots refined once, with random flags and fe indices.
fn random_forest(n_roots: usize, n_fe: usize, seed: u64) -> QuadCellForest {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut forest = QuadCellForest::new();
    for _ in 0..n_roots {
        let root = forest.add_root(rng.gen_range(0..n_fe));
        forest.refine_cell(root).expect("fresh root");
    }
    let active: Vec<_> = forest.active_cells().collect();
    for id in active {
        let flag = match rng.gen_range(0..3) {
            0 => AdaptFlag::Refine,
            1 => AdaptFlag::Coarsen,
            _ => AdaptFlag::None,
        };
        forest.set_flag(id, flag).expect("active cell");
    }
    forest
}

fn bench_strategies(c: &mut Criterion) {
    let fe = FeCollection::from_degrees(&[1, 2, 3, 4, 5]).expect("valid degrees");
    let mut group = c.benchmark_group("hp_refinement");
    for &n_roots in &[256usize, 4096] {
        let forest = random_forest(n_roots, fe.len(), 42);
        let mut rng = SmallRng::seed_from_u64(7);
        let smoothness: Vec<f64> = (0..forest.n_active_cells())
            .map(|_| rng.r#gen::<f64>())
            .collect();

        group.bench_with_input(BenchmarkId::new("full", n_roots), &forest, |b, forest| {
            b.iter(|| {
                let mut forest = forest.clone();
                full_p_adaptivity(&mut forest, &fe).expect("full");
                black_box(forest);
            })
        });
        group.bench_with_input(
            BenchmarkId::new("threshold_force", n_roots),
            &forest,
            |b, forest| {
                b.iter(|| {
                    let mut forest = forest.clone();
                    let summary = hp_adapt(
                        &mut forest,
                        &fe,
                        PAdaptivity::Threshold {
                            smoothness_indicators: &smoothness,
                            options: ThresholdOptions::default(),
                        },
                        HpDecision::ForcePOverH,
                    )
                    .expect("threshold");
                    black_box(summary);
                })
            },
        );
        group.bench_with_input(BenchmarkId::new("choose", n_roots), &forest, |b, forest| {
            let mut flagged = forest.clone();
            full_p_adaptivity(&mut flagged, &fe).expect("full");
            b.iter(|| {
                let mut forest = flagged.clone();
                black_box(choose_p_over_h(&mut forest).expect("choose"));
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
