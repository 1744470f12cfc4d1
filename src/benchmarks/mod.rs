#[cfg(feature = "benchmarks")]
pub mod config {
    use criterion::{measurement::WallTime, BenchmarkGroup};
    use std::time::Duration;

    /// Shared settings of the workspace benchmark groups
    ///
    /// Local models refit once per query, so the defaults keep the sample size small.
    pub fn set_default_benchmark_configs(benchmark: &mut BenchmarkGroup<WallTime>) {
        benchmark
            .sample_size(20)
            .measurement_time(Duration::new(10, 0))
            .confidence_level(0.97)
            .warm_up_time(Duration::new(3, 0))
            .noise_threshold(0.05);
    }
}
