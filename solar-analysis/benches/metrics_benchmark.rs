//! Benchmarks for the deterministic stages of an analysis run

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rooftop_vision::RooftopEstimate;
use solar_analysis::{compute, generate, SolarConstants};

fn bench_compute(c: &mut Criterion) {
    let constants = SolarConstants::default();
    let mut group = c.benchmark_group("compute");

    for area in [0.0, 120.0, 5_000.0] {
        group.bench_with_input(BenchmarkId::from_parameter(area), &area, |b, &area| {
            b.iter(|| black_box(compute(black_box(area), 0.104, &constants)))
        });
    }

    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let constants = SolarConstants::default();
    let estimate = RooftopEstimate::new(120.0, "Flat concrete roof", 0.85).unwrap();
    let metrics = compute(120.0, 0.104, &constants).unwrap();

    c.bench_function("generate_recommendation", |b| {
        b.iter(|| black_box(generate(black_box(&metrics), &estimate)))
    });
}

criterion_group!(benches, bench_compute, bench_generate);
criterion_main!(benches);
