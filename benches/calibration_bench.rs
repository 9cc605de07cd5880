//! Benchmark suite for miscalibration
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use miscalibration::{
    aggregate_uniform, miscalibration, CalibrationEvaluator, CategoryMatrix, IndexBase, ItemId,
    UserProfile,
};

const CATEGORIES: usize = 18;
const ITEMS: usize = 10_000;

fn catalogue(rng: &mut ChaCha8Rng) -> CategoryMatrix {
    let rows: Vec<Vec<f64>> = (0..ITEMS)
        .map(|_| {
            let mut row = vec![0.0; CATEGORIES];
            for _ in 0..rng.gen_range(1..=3) {
                row[rng.gen_range(0..CATEGORIES)] = 1.0;
            }
            row
        })
        .collect();
    CategoryMatrix::from_memberships(&rows, IndexBase::Zero).unwrap()
}

fn random_items(rng: &mut ChaCha8Rng, n: usize) -> Vec<ItemId> {
    (0..n).map(|_| rng.gen_range(0..ITEMS) as ItemId).collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let matrix = catalogue(&mut rng);
    let mut group = c.benchmark_group("aggregate_uniform");

    for size in [10, 100, 1_000] {
        let items = random_items(&mut rng, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, items| {
            b.iter(|| black_box(aggregate_uniform(items, &matrix).unwrap()))
        });
    }
    group.finish();
}

fn bench_miscalibration(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let matrix = catalogue(&mut rng);
    let p = aggregate_uniform(&random_items(&mut rng, 50), &matrix).unwrap();
    let q = aggregate_uniform(&random_items(&mut rng, 10), &matrix).unwrap();

    c.bench_function("miscalibration_18_categories", |b| {
        b.iter(|| black_box(miscalibration(p.as_slice(), q.as_slice(), 0.01).unwrap()))
    });
}

fn bench_score_users(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let matrix = catalogue(&mut rng);
    let users: Vec<UserProfile> = (0..1_000)
        .map(|user_id| UserProfile {
            user_id,
            history: random_items(&mut rng, 50),
            recommended: random_items(&mut rng, 10),
        })
        .collect();
    let evaluator = CalibrationEvaluator::new(&matrix);

    c.bench_function("score_users_1000", |b| {
        b.iter(|| black_box(evaluator.score_users(&users)))
    });
}

criterion_group!(
    benches,
    bench_aggregate,
    bench_miscalibration,
    bench_score_users
);
criterion_main!(benches);
