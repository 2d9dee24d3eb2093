// benches/aggregate_benchmarks.rs — CPU reference vs GPU aggregation.
//
//   cargo bench --bench aggregate_benchmarks
//
// GPU numbers include upload, submit, poll and the target readback: that is
// the latency a host frame pays before it knows the count. The GPU groups are
// skipped when no adapter is available.
//
// DATA_FILTER_PRECISION=packed forces the packed path on capable devices.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use data_filter_aggregator::reference::aggregate_cpu;
use data_filter_aggregator::{
    AggregatorConfig, DataFilterAggregator, FilterItem, GpuDevice, Precision,
};

// ============================================================
// Shared helpers
// ============================================================

/// `n` items where roughly half pass and a third change index.
fn make_frame(n: u32) -> Vec<FilterItem> {
    let mut rng = 0x2545_f491u32;
    (0..n)
        .map(|i| {
            rng = rng.wrapping_mul(1664525).wrapping_add(1013904223);
            let passes = rng >> 31 == 1;
            let prev = if (rng >> 8) % 3 == 0 { i.wrapping_add(1) } else { i };
            FilterItem::from_pass(passes, i % 65_536, prev % 65_536)
        })
        .collect()
}

const SIZES: [u32; 3] = [1_000, 65_536, 1_000_000];

// ============================================================
// CPU reference
// ============================================================

fn bench_cpu_reference(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_reference");
    for n in SIZES {
        let items = make_frame(n);
        for precision in [Precision::HighPrecision, Precision::Packed] {
            group.bench_with_input(
                BenchmarkId::new(format!("{precision:?}"), n),
                &items,
                |b, items| b.iter(|| aggregate_cpu(items, precision)),
            );
        }
    }
    group.finish();
}

// ============================================================
// GPU aggregation
// ============================================================

fn bench_gpu_aggregate(c: &mut Criterion) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();

    let gpu = match GpuDevice::new() {
        Ok(gpu) => gpu,
        Err(e) => {
            eprintln!("skipping GPU benchmarks: {e}");
            return;
        }
    };
    let agg = DataFilterAggregator::new(&gpu, AggregatorConfig::from_env())
        .expect("failed to build aggregator");

    let mut group = c.benchmark_group("gpu_aggregate");
    group.warm_up_time(Duration::from_secs(2));
    for n in SIZES {
        let items = make_frame(n);
        group.bench_with_input(
            BenchmarkId::new(format!("{:?}", agg.precision()), n),
            &items,
            |b, items| b.iter(|| agg.aggregate(&gpu, items).expect("aggregate failed")),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_cpu_reference, bench_gpu_aggregate);
criterion_main!(benches);
