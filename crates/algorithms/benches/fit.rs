//! Benchmarks for mixture fitting

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gaussmix_algorithms::mixture::{fit_mixture, GmmParams};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

fn create_blobs(per_center: usize) -> Array2<f64> {
    let centers = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)];
    let mut rng = StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 1.0).unwrap();

    let mut data = Array2::<f64>::zeros((centers.len() * per_center, 2));
    for (c, &(cx, cy)) in centers.iter().enumerate() {
        for i in 0..per_center {
            let row = c * per_center + i;
            data[[row, 0]] = cx + noise.sample(&mut rng);
            data[[row, 1]] = cy + noise.sample(&mut rng);
        }
    }
    data
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit_mixture");

    for per_center in [100, 500, 2000].iter() {
        let data = create_blobs(*per_center);
        let params = GmmParams {
            n_components: 3,
            restarts: 4,
            ..Default::default()
        };

        group.bench_with_input(
            BenchmarkId::from_parameter(per_center * 3),
            per_center,
            |b, _| b.iter(|| fit_mixture(black_box(&data), &params).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_fit);
criterion_main!(benches);
