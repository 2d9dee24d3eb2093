// error.rs — Crate-wide error type.
//
// Failures are reported once and propagated with `?`. Nothing here retries:
// a negative capability probe is the caller's cue to use the packed path, an
// allocation failure is fatal to aggregator construction.

use thiserror::Error;

/// Errors from device initialization, target allocation and readback.
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// The device cannot both render into and additively blend into the
    /// requested format. Fall back to the packed target.
    #[error("device cannot render and blend into {format:?}; use the packed target")]
    CapabilityUnsupported { format: wgpu::TextureFormat },

    /// wgpu rejected a resource allocation (out of memory, validation, lost
    /// device). Captured through an error scope around the allocation.
    #[error("failed to create {what}: {source}")]
    ResourceCreation {
        what: &'static str,
        #[source]
        source: wgpu::Error,
    },

    /// No adapter survived selection.
    #[error("no suitable GPU adapter found (only CPU/software renderers visible)")]
    NoSuitableAdapter,

    /// wgpu device request failed (driver issue, unsupported limits, ...).
    #[error("device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// Mapping the readback buffer failed.
    #[error("aggregation target readback failed: {0}")]
    Readback(#[from] wgpu::BufferAsyncError),

    /// The readback did not have the size the target's shape implies.
    #[error("readback returned {actual} bytes, expected {expected}")]
    ReadbackSize { expected: usize, actual: usize },

    /// The map callback was dropped before reporting a result.
    #[error("readback callback dropped before completion")]
    ReadbackCancelled,
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, AggregatorError>;
