// tests/test_packed_slots.rs — Integration tests for the packed index mapping.
//
// The packed kernel places each point at a clip-space position and relies on
// the rasterizer to land it on texel (column, row). These tests replay the
// viewport transform on the CPU to pin that arithmetic for every slot.

use std::collections::HashSet;

use data_filter_aggregator::slot::{PackedSlot, PACKED_COLUMNS, PACKED_ROWS, PACKED_SLOTS};

/// Viewport transform for a PACKED_COLUMNS × PACKED_ROWS target, +y up in
/// clip space, row 0 at the top in framebuffer space.
fn rasterize(clip: [f32; 2]) -> (u32, u32) {
    let fx = (clip[0] + 1.0) * 0.5 * PACKED_COLUMNS as f32;
    let fy = (1.0 - clip[1]) * 0.5 * PACKED_ROWS as f32;
    (fx.floor() as u32, fy.floor() as u32)
}

#[test]
fn every_slot_rasterizes_onto_its_own_texel() {
    for i in 0..PACKED_SLOTS {
        let slot = PackedSlot::for_index(i).unwrap();
        let (x, y) = rasterize(slot.clip_position());
        assert_eq!((x, y), (slot.column, slot.row), "index {i} lands on the wrong texel");
    }
}

#[test]
fn mapping_is_stable() {
    for i in [0, 7, 256, 299, 40_000] {
        assert_eq!(PackedSlot::for_index(i), PackedSlot::for_index(i));
    }
}

#[test]
fn every_index_gets_a_distinct_slot() {
    let slots: HashSet<PackedSlot> =
        (0..PACKED_SLOTS).map(|i| PackedSlot::for_index(i).unwrap()).collect();
    assert_eq!(slots.len(), PACKED_SLOTS as usize);
}

#[test]
fn three_hundred_items_share_columns_not_slots() {
    // Items 0 and 256 land in the same column but on different rows.
    let a = PackedSlot::for_index(0).unwrap();
    let b = PackedSlot::for_index(256).unwrap();
    assert_eq!(a.column, b.column);
    assert_ne!((a.row, a.channel), (b.row, b.channel));

    for i in 0..300u32 {
        let s = PackedSlot::for_index(i).unwrap();
        assert_eq!(s.column, i % 256);
        assert_eq!(s.row + s.channel * PACKED_ROWS, i / 256);
    }
}
