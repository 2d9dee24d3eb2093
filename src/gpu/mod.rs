// gpu/mod.rs — wgpu side of the aggregator.
//
// The CPU modules in the parent crate (`slot`, `reference`) are the
// authoritative description of what the kernel computes; every GPU path is
// validated against them.
//
// Per frame:
//
//   filter stage ──[FilterItem vertex buffer]──▶ aggregation draw
//                                                  │ additive blend
//                                                  ▼
//                                         AggregationTarget ──▶ read()
//
// Only the target is read back: 16 bytes on the float path, 64 KiB on the
// packed path, regardless of how many items were drawn.

pub mod aggregator;
pub mod device;
pub mod target;

mod scope;
