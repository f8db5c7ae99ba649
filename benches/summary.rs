/// Summary statistic and histogram benchmarks
///
/// One collector report walks every parameter, gradient and activation
/// array, so these run over the array sizes typical of dense layers.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use anvil_telemetry::stats::{histogram, summarize, SummaryType};

const SIZES: &[usize] = &[1_000, 100_000, 1_000_000];

fn random_array(len: usize) -> Vec<f32> {
    let mut rng = fastrand::Rng::with_seed(1234);
    (0..len).map(|_| rng.f32() * 2.0 - 1.0).collect()
}

fn bench_summaries(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");
    for &size in SIZES {
        let values = random_array(size);
        let arrays = vec![("0_W".to_string(), values.as_slice())];

        for summary in [SummaryType::Mean, SummaryType::Stdev, SummaryType::MeanMagnitude] {
            group.bench_with_input(BenchmarkId::new(format!("{:?}", summary), size), &arrays, |b, arrays| {
                b.iter(|| summarize(black_box(arrays), summary))
            });
        }
    }
    group.finish();
}

fn bench_histograms(c: &mut Criterion) {
    let mut group = c.benchmark_group("histogram");
    for &size in SIZES {
        let values = random_array(size);
        for bins in [20, 100] {
            group.bench_with_input(BenchmarkId::new(format!("bins_{}", bins), size), &values, |b, values| {
                b.iter(|| histogram(black_box(values), bins))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_summaries, bench_histograms);
criterion_main!(benches);
