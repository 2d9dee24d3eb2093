// slot.rs — Index → (column, row, channel) mapping for the packed target.
//
// When the device cannot accumulate into a float target, each item's stable
// index addresses its own 8-bit bucket in a 256×64 RGBA8 grid:
//
//   column  = index mod 256
//   band    = index / 256          (0..256)
//   row     = band mod 64          (0..64)
//   channel = band / 64            (0..4, one-hot R/G/B/A)
//
// 256 × 64 × 4 = 65 536 slots. Indices past the last slot have no bucket and
// never contribute. Row 0 is the first row in readback order (top of the
// texture), which is what `PackedCounts` indexes.
//
// This is the CPU half of `vs_packed` in shaders/aggregate.wgsl. The two must
// agree; `tests/test_packed_slots.rs` pins the arithmetic.

/// Columns in the packed target.
pub const PACKED_COLUMNS: u32 = 256;
/// Rows in the packed target.
pub const PACKED_ROWS: u32 = 64;
/// Colour channels per texel.
pub const PACKED_CHANNELS: u32 = 4;
/// Total addressable slots.
pub const PACKED_SLOTS: u32 = PACKED_COLUMNS * PACKED_ROWS * PACKED_CHANNELS;

/// Per-contribution increment on the packed path. Up to 255 contributions on
/// one slot stay representable in an 8-bit unorm channel.
pub const PACKED_UNIT: f32 = 1.0 / 255.0;

/// A single bucket in the packed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackedSlot {
    pub column: u32,
    pub row: u32,
    pub channel: u32,
}

impl PackedSlot {
    /// Map a stable index to its bucket. `None` past the last slot.
    pub fn for_index(index: u32) -> Option<Self> {
        if index >= PACKED_SLOTS {
            return None;
        }
        let band = index / PACKED_COLUMNS;
        Some(PackedSlot {
            column: index % PACKED_COLUMNS,
            row: band % PACKED_ROWS,
            channel: band / PACKED_ROWS,
        })
    }

    /// Inverse of [`for_index`](Self::for_index).
    pub fn index(&self) -> u32 {
        (self.channel * PACKED_ROWS + self.row) * PACKED_COLUMNS + self.column
    }

    /// Byte offset of this slot in a tightly packed RGBA8 readback
    /// (`PACKED_COLUMNS * 4` bytes per row).
    pub fn byte_offset(&self) -> usize {
        ((self.row * PACKED_COLUMNS + self.column) * PACKED_CHANNELS + self.channel) as usize
    }

    /// One-hot channel mask scaled by [`PACKED_UNIT`], i.e. the colour the
    /// kernel deposits for this slot.
    pub fn unit_color(&self) -> [f32; 4] {
        let mut c = [0.0; 4];
        c[self.channel as usize] = PACKED_UNIT;
        c
    }

    /// Clip-space position of the texel centre this slot lives in.
    ///
    /// wgpu clip space has +y up while texture row 0 is the top row, hence
    /// the flip on y.
    pub fn clip_position(&self) -> [f32; 2] {
        let x = (self.column as f32 + 0.5) / PACKED_COLUMNS as f32 * 2.0 - 1.0;
        let y = 1.0 - (self.row as f32 + 0.5) / PACKED_ROWS as f32 * 2.0;
        [x, y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_count() {
        assert_eq!(PACKED_SLOTS, 65_536);
    }

    #[test]
    fn test_first_slots() {
        assert_eq!(
            PackedSlot::for_index(0),
            Some(PackedSlot { column: 0, row: 0, channel: 0 })
        );
        assert_eq!(
            PackedSlot::for_index(255),
            Some(PackedSlot { column: 255, row: 0, channel: 0 })
        );
        assert_eq!(
            PackedSlot::for_index(256),
            Some(PackedSlot { column: 0, row: 1, channel: 0 })
        );
    }

    #[test]
    fn test_channel_quadrants() {
        // Every 256 × 64 = 16384 indices moves to the next channel.
        assert_eq!(PackedSlot::for_index(16_383).unwrap().channel, 0);
        assert_eq!(
            PackedSlot::for_index(16_384),
            Some(PackedSlot { column: 0, row: 0, channel: 1 })
        );
        assert_eq!(
            PackedSlot::for_index(65_535),
            Some(PackedSlot { column: 255, row: 63, channel: 3 })
        );
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(PackedSlot::for_index(PACKED_SLOTS), None);
        assert_eq!(PackedSlot::for_index(u32::MAX), None);
    }

    #[test]
    fn test_index_roundtrip_on_boundaries() {
        for i in [0, 1, 255, 256, 16_383, 16_384, 32_768, 49_151, 65_535] {
            assert_eq!(PackedSlot::for_index(i).unwrap().index(), i);
        }
    }

    #[test]
    fn test_byte_offsets_distinct_and_in_range() {
        let total = (PACKED_COLUMNS * PACKED_ROWS * PACKED_CHANNELS) as usize;
        let mut seen = vec![false; total];
        for i in 0..PACKED_SLOTS {
            let off = PackedSlot::for_index(i).unwrap().byte_offset();
            assert!(off < total);
            assert!(!seen[off], "index {i} collides at byte {off}");
            seen[off] = true;
        }
    }

    #[test]
    fn test_unit_color_is_one_hot() {
        let c = PackedSlot::for_index(16_384 * 2 + 5).unwrap().unit_color();
        assert_eq!(c, [0.0, 0.0, PACKED_UNIT, 0.0]);
    }

    #[test]
    fn test_clip_position_hits_texel_centres() {
        let [x, y] = PackedSlot { column: 0, row: 0, channel: 0 }.clip_position();
        assert!((x - (-1.0 + 1.0 / 256.0)).abs() < 1e-6);
        assert!((y - (1.0 - 1.0 / 64.0)).abs() < 1e-6);

        let [x, y] = PackedSlot { column: 255, row: 63, channel: 0 }.clip_position();
        assert!((x - (1.0 - 1.0 / 256.0)).abs() < 1e-6);
        assert!((y - (-1.0 + 1.0 / 64.0)).abs() < 1e-6);
    }
}
