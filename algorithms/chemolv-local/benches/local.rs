use chemolv::benchmarks::config;
use chemolv::traits::Fit;
use chemolv::LvRange;
use chemolv_local::{KnnR, LwPlsr};
use chemolv_pls::AvgPolicy;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn lwplsr_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("Chemolv_lwplsr");
    config::set_default_benchmark_configs(&mut group);

    for &(n, k) in &[(500, 50), (2_000, 200)] {
        let train = chemolv_datasets::spectra(n, 200, 11);
        let test = chemolv_datasets::spectra(50, 200, 12);

        let single = LwPlsr::params(k, 10).nlvdis(15).fit(&train).unwrap();
        group.bench_with_input(BenchmarkId::new("pls", n), &test, |b, test| {
            b.iter(|| single.predict_local(test.records()))
        });

        let averaged = LwPlsr::params(k, 0)
            .nlvdis(15)
            .average(LvRange::new(1, 10).unwrap(), AvgPolicy::Aic)
            .fit(&train)
            .unwrap();
        group.bench_with_input(BenchmarkId::new("avg_aic", n), &test, |b, test| {
            b.iter(|| averaged.predict_local(test.records()))
        });

        let knn = KnnR::params(k).nlvdis(15).fit(&train).unwrap();
        group.bench_with_input(BenchmarkId::new("knnr", n), &test, |b, test| {
            b.iter(|| knn.predict_local(test.records()))
        });
    }
    group.finish();
}

criterion_group!(benches, lwplsr_bench);
criterion_main!(benches);
