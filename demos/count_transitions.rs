// demos/count_transitions.rs — Aggregate a synthetic frame sequence.
//
// Simulates a tiled point layer: each frame some tiles reload and their
// points receive fresh slot indices, while a range filter sweeps over a
// per-point attribute. Each frame is aggregated on the GPU and by the CPU
// reference, and both totals are printed.
//
// USAGE
//   cargo run --example count_transitions
//   DATA_FILTER_PRECISION=packed cargo run --example count_transitions
//   RUST_LOG=debug cargo run --example count_transitions

use log::info;

use data_filter_aggregator::reference::aggregate_cpu;
use data_filter_aggregator::{AggregatorConfig, DataFilterAggregator, FilterItem, GpuDevice};

const POINTS: u32 = 20_000;
const POINTS_PER_TILE: u32 = 500;
const FRAMES: u32 = 8;

/// Deterministic per-point attribute in [0, 1).
fn attribute(point: u32) -> f32 {
    let h = point.wrapping_mul(2_654_435_761);
    (h >> 8) as f32 / (1u32 << 24) as f32
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let gpu = GpuDevice::new().expect("failed to initialise a GPU device");
    println!("GPU: {gpu}");

    let agg = DataFilterAggregator::new(&gpu, AggregatorConfig::from_env())
        .expect("failed to build aggregator");
    println!("precision: {}", agg.precision());

    // Slot index per point; reloading a tile shifts its points by one tile.
    let mut slots: Vec<u32> = (0..POINTS).collect();

    for frame in 0..FRAMES {
        let prev = slots.clone();
        let reloaded_tile = frame * 3 % (POINTS / POINTS_PER_TILE);
        for p in reloaded_tile * POINTS_PER_TILE..(reloaded_tile + 1) * POINTS_PER_TILE {
            slots[p as usize] = (slots[p as usize] + POINTS_PER_TILE) % POINTS;
        }

        let lo = frame as f32 / FRAMES as f32 * 0.5;
        let hi = lo + 0.5;
        let items: Vec<FilterItem> = (0..POINTS)
            .map(|p| {
                let v = attribute(p);
                FilterItem::from_pass(v >= lo && v < hi, slots[p as usize], prev[p as usize])
            })
            .collect();

        let gpu_total = agg.aggregate(&gpu, &items).expect("aggregation failed").total();
        let cpu_total = aggregate_cpu(&items, agg.precision()).total();
        info!("frame {frame}: filter [{lo:.3}, {hi:.3}) tile {reloaded_tile} reloaded");
        println!("frame {frame}: gpu={gpu_total:>5} cpu={cpu_total:>5}");
    }
}
