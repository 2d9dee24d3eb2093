// reference.rs — CPU reference for the aggregation kernel.
//
// Mirrors shaders/aggregate.wgsl item by item: same delta, same 0.5 discard
// threshold, same slot mapping, same 8-bit saturation on the packed path.
// The GPU implementation is validated against this one, never the other way
// round.
//
// Per-item rule:
//
//   delta = filter_value * (index != prev_index ? 1 : 0)
//   delta < 0.5  →  discarded, nothing written
//
// so only items that pass the filter *and* whose index changed contribute.
// Negative filter values fall under the threshold and are dropped.

use crate::config::Precision;
use crate::item::FilterItem;
use crate::readout::{AggregateReadout, PackedCounts};
use crate::slot::PackedSlot;

/// Fragments with a delta below this are discarded.
pub const DISCARD_THRESHOLD: f32 = 0.5;

/// The delta an item deposits, or `None` if the fragment is discarded.
///
/// The index comparison is exact: indices are integers on both sides.
pub fn deposit_delta(item: &FilterItem) -> Option<f32> {
    let changed = if item.index != item.prev_index { 1.0 } else { 0.0 };
    let delta = item.filter_value * changed;
    // NaN fails this comparison and is dropped too.
    if delta >= DISCARD_THRESHOLD {
        Some(delta)
    } else {
        None
    }
}

/// Accumulate `items` into a freshly cleared target of the given precision.
pub fn aggregate_cpu(items: &[FilterItem], precision: Precision) -> AggregateReadout {
    match precision {
        Precision::HighPrecision => {
            // Colour is (0, 0, 0, 1) * delta; only alpha carries the count.
            let alpha = items.iter().filter_map(deposit_delta).sum::<f32>();
            AggregateReadout::HighPrecision(alpha)
        }
        Precision::Packed => {
            let mut counts = PackedCounts::zeroed();
            for item in items {
                if deposit_delta(item).is_none() {
                    continue;
                }
                // The packed colour is a fixed unit, independent of delta.
                if let Some(slot) = PackedSlot::for_index(item.index) {
                    counts.add_at(slot);
                }
            }
            AggregateReadout::Packed(counts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_passing_and_changed_contribute() {
        assert_eq!(deposit_delta(&FilterItem::new(1.0, 5, 4)), Some(1.0));
        assert_eq!(deposit_delta(&FilterItem::new(1.0, 5, 5)), None);
        assert_eq!(deposit_delta(&FilterItem::new(0.0, 5, 4)), None);
        assert_eq!(deposit_delta(&FilterItem::new(0.0, 5, 5)), None);
    }

    #[test]
    fn test_threshold_is_hard() {
        assert_eq!(deposit_delta(&FilterItem::new(0.49, 1, 0)), None);
        assert_eq!(deposit_delta(&FilterItem::new(0.5, 1, 0)), Some(0.5));
    }

    #[test]
    fn test_negative_and_nan_dropped() {
        assert_eq!(deposit_delta(&FilterItem::new(-1.0, 1, 0)), None);
        assert_eq!(deposit_delta(&FilterItem::new(f32::NAN, 1, 0)), None);
    }

    #[test]
    fn test_high_precision_counts_n() {
        let items: Vec<FilterItem> = (0..1000).map(|i| FilterItem::new(1.0, i + 1, i)).collect();
        let out = aggregate_cpu(&items, Precision::HighPrecision);
        assert_eq!(out, AggregateReadout::HighPrecision(1000.0));
        assert_eq!(out.total(), 1000);
    }

    #[test]
    fn test_high_precision_ignores_unchanged() {
        let items = [
            FilterItem::new(1.0, 1, 0),
            FilterItem::new(1.0, 2, 2),
            FilterItem::new(0.0, 3, 1),
        ];
        assert_eq!(aggregate_cpu(&items, Precision::HighPrecision).total(), 1);
    }

    #[test]
    fn test_packed_k_on_one_slot() {
        // 200 contributions on index 7, each with a different previous index.
        let items: Vec<FilterItem> = (0..200).map(|p| FilterItem::new(1.0, 7, 1000 + p)).collect();
        let AggregateReadout::Packed(counts) = aggregate_cpu(&items, Precision::Packed) else {
            panic!("expected packed readout");
        };
        assert_eq!(counts.count_at(7), 200);
        assert!((counts.value_at(7) - 200.0 / 255.0).abs() < 1e-6);
        assert_eq!(counts.occupied(), 1);
    }

    #[test]
    fn test_packed_drops_indices_without_slot() {
        let items = [FilterItem::new(1.0, 70_000, 0)];
        assert_eq!(aggregate_cpu(&items, Precision::Packed).total(), 0);
    }
}
