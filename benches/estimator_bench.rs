use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kabc::{estimate_distance, estimate_round, kernel, Arm, GaussianArm, IndistinguishabilityGraph};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn batches(arms: usize, n: usize) -> Vec<Vec<Vec<f64>>> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    (0..arms)
        .map(|i| {
            let variance = if i % 2 == 0 { 1.0 } else { 200.0 };
            GaussianArm::isotropic(vec![0.0, 0.0], variance, None)
                .and_then(|arm| arm.sample(n, &mut rng))
                .unwrap_or_default()
        })
        .collect()
}

fn bench_kernel(c: &mut Criterion) {
    let x = vec![1.5, -3.0];
    let y = vec![12.0, 7.5];
    c.bench_function("kernel_2d", |b| b.iter(|| kernel(black_box(&x), black_box(&y))));
}

fn bench_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_distance");
    for n in [64, 256, 1024] {
        let data = batches(2, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| estimate_distance(black_box(&data[0]), black_box(&data[1])))
        });
    }
    group.finish();
}

fn bench_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_round");
    group.sample_size(10);
    for arms in [4, 8, 16] {
        let data = batches(arms, 256);
        group.bench_with_input(BenchmarkId::from_parameter(arms), &arms, |b, _| {
            b.iter(|| estimate_round(2, black_box(&data)))
        });
    }
    group.finish();
}

fn bench_components(c: &mut Criterion) {
    let size = 500;
    let mut graph = IndistinguishabilityGraph::new(size);
    for i in 1..size {
        if i % 7 != 0 {
            graph.connect(i, i - 1);
        }
    }
    c.bench_function("connected_components_500", |b| {
        b.iter(|| black_box(&graph).connected_components())
    });
}

criterion_group!(benches, bench_kernel, bench_distance, bench_round, bench_components);
criterion_main!(benches);
