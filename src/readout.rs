// readout.rs — Host-side view of an aggregation target after readback.
//
// The GPU path (`AggregationTarget::read`) and the CPU reference
// (`reference::aggregate_cpu`) both produce an `AggregateReadout`, so tests
// compare them directly.

use crate::slot::{PackedSlot, PACKED_CHANNELS, PACKED_COLUMNS, PACKED_ROWS};

/// Bytes in a tightly packed RGBA8 readback of the packed target.
pub const PACKED_BYTES: usize = (PACKED_COLUMNS * PACKED_ROWS * PACKED_CHANNELS) as usize;

/// Per-slot counts read from the packed target.
///
/// Each byte is the number of contributions that landed on one slot
/// (K contributions of 1/255 read back as the unorm byte K). Bytes saturate
/// at 255, as the blend unit clamps.
#[derive(Clone, PartialEq, Eq)]
pub struct PackedCounts {
    bytes: Vec<u8>,
}

impl PackedCounts {
    /// An all-zero grid, the state of a freshly cleared target.
    pub fn zeroed() -> Self {
        PackedCounts { bytes: vec![0; PACKED_BYTES] }
    }

    /// Wrap tightly packed RGBA8 rows. `None` if the length is wrong.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        (bytes.len() == PACKED_BYTES).then_some(PackedCounts { bytes })
    }

    /// Raw count at a stable index. Indices without a slot read as 0.
    pub fn count_at(&self, index: u32) -> u8 {
        PackedSlot::for_index(index).map_or(0, |s| self.bytes[s.byte_offset()])
    }

    /// Normalized channel value at a stable index (count / 255), the value a
    /// shader sampling the target would see.
    pub fn value_at(&self, index: u32) -> f32 {
        self.count_at(index) as f32 / 255.0
    }

    /// Sum of every slot.
    pub fn total(&self) -> u64 {
        self.bytes.iter().map(|&b| b as u64).sum()
    }

    /// Number of slots holding a nonzero count.
    pub fn occupied(&self) -> usize {
        self.bytes.iter().filter(|&&b| b != 0).count()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn add_at(&mut self, slot: PackedSlot) {
        let b = &mut self.bytes[slot.byte_offset()];
        *b = b.saturating_add(1);
    }
}

impl std::fmt::Debug for PackedCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackedCounts")
            .field("occupied", &self.occupied())
            .field("total", &self.total())
            .finish()
    }
}

/// Contents of an aggregation target.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateReadout {
    /// Accumulated alpha of the single float cell.
    HighPrecision(f32),
    /// Per-slot 8-bit counts.
    Packed(PackedCounts),
}

impl AggregateReadout {
    /// Total number of contributions, rounded to the nearest integer on the
    /// float path.
    pub fn total(&self) -> u64 {
        match self {
            AggregateReadout::HighPrecision(v) => v.max(0.0).round() as u64,
            AggregateReadout::Packed(counts) => counts.total(),
        }
    }
}
