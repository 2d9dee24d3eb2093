// data-filter-aggregator: GPU counting of filter transitions for map layers.
//
// A filter stage decides, per rendered item, whether the item passes. This
// crate counts the items that pass and whose stable index changed since the
// previous frame, entirely with draw calls and additive blending, and reads
// back only a fixed-size target.

pub mod config;
pub mod error;
pub mod gpu;
pub mod item;
pub mod readout;
pub mod reference;
pub mod slot;

pub use config::{AggregatorConfig, Precision, PrecisionMode};
pub use error::{AggregatorError, Result};
pub use gpu::aggregator::{AggregationParameters, DataFilterAggregator};
pub use gpu::device::{supports_high_precision_target, DeviceProfile, GpuDevice};
pub use gpu::target::AggregationTarget;
pub use item::FilterItem;
pub use readout::{AggregateReadout, PackedCounts};
pub use slot::PackedSlot;
