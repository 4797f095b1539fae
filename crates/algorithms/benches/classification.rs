//! Benchmarks for classification algorithms

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vectis_algorithms::classification::{natural_breaks, quantile_breaks};

fn create_values(n: usize) -> Vec<f64> {
    (0..n).map(|i| ((i * 7919) % 1000) as f64 + (i % 13) as f64 * 0.1).collect()
}

fn bench_quantile(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification/quantile");
    for n in [1_000, 10_000, 100_000] {
        let values = create_values(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| quantile_breaks(black_box(&values), 5).unwrap())
        });
    }
    group.finish();
}

fn bench_natural_breaks(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification/natural_breaks");
    for n in [100, 500, 2_000] {
        let values = create_values(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| natural_breaks(black_box(&values), 5).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_quantile, bench_natural_breaks);
criterion_main!(benches);
