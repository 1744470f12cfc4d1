use chemolv::benchmarks::config;
use chemolv_nn::{weights_from_distances, Metric, NeighborIndex, WeightKernel};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use ndarray_rand::{rand::SeedableRng, rand_distr::Uniform, RandomExt};
use rand_xoshiro::Xoshiro256Plus;

fn k_nearest_bench(c: &mut Criterion) {
    let mut rng = Xoshiro256Plus::seed_from_u64(40);
    let mut benchmark = c.benchmark_group("k_nearest");
    config::set_default_benchmark_configs(&mut benchmark);
    let n_features = 10;
    let distr = Uniform::new(-50., 50.);

    let metrics = &[
        (Metric::Euclidean, "euclidean"),
        (Metric::Mahalanobis, "mahalanobis"),
    ];

    for &(n_points, k) in &[(1000, 50), (10000, 200)] {
        let queries: Array2<f64> = Array2::random_using((100, n_features), distr, &mut rng);
        let points: Array2<f64> = Array2::random_using((n_points, n_features), distr, &mut rng);

        for (metric, name) in metrics {
            let nn = NeighborIndex::from_batch(&points, *metric).unwrap();
            benchmark.bench_with_input(
                BenchmarkId::new(*name, format!("{}-{}", n_points, k)),
                &k,
                |bencher, &k| {
                    bencher.iter(|| {
                        let out = nn.k_nearest_batch(&queries, k).unwrap();
                        assert_eq!(out.len(), 100);
                    });
                },
            );
        }
    }
    benchmark.finish();
}

fn weights_bench(c: &mut Criterion) {
    let mut rng = Xoshiro256Plus::seed_from_u64(40);
    let mut benchmark = c.benchmark_group("weights_from_distances");
    config::set_default_benchmark_configs(&mut benchmark);
    let distances: Array1<f64> = Array1::random_using(500, Uniform::new(0., 10.), &mut rng);

    let kernels = &[
        (WeightKernel::Bisquare, "bisquare"),
        (WeightKernel::Gaussian, "gaussian"),
        (WeightKernel::Exponential { cri: 4. }, "exponential"),
    ];
    for (kernel, name) in kernels {
        benchmark.bench_function(*name, |bencher| {
            bencher.iter(|| weights_from_distances(&distances, 1., *kernel, 1e-4).unwrap());
        });
    }
    benchmark.finish();
}

criterion_group!(benches, k_nearest_bench, weights_bench);
criterion_main!(benches);
