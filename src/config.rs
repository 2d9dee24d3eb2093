// config.rs — Precision selection and aggregator configuration.
//
// `PrecisionMode` is what the caller asks for; `Precision` is what the
// aggregator settles on after consulting the device. The resolution happens
// once, at construction, and the result is immutable for the aggregator's
// lifetime.

use std::fmt;

use log::warn;

use crate::error::{AggregatorError, Result};

/// Environment variable read by [`AggregatorConfig::from_env`].
pub const PRECISION_ENV: &str = "DATA_FILTER_PRECISION";

/// Accumulation strategy chosen for an aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// 1×1 `Rgba32Float` target, one float sum.
    HighPrecision,
    /// 256×64 `Rgba8Unorm` target, one 8-bit bucket per index.
    Packed,
}

impl Precision {
    /// Colour format of the target for this precision.
    pub fn target_format(self) -> wgpu::TextureFormat {
        match self {
            Precision::HighPrecision => wgpu::TextureFormat::Rgba32Float,
            Precision::Packed => wgpu::TextureFormat::Rgba8Unorm,
        }
    }

    /// Vertex entry point in shaders/aggregate.wgsl.
    pub fn vertex_entry_point(self) -> &'static str {
        match self {
            Precision::HighPrecision => "vs_high_precision",
            Precision::Packed => "vs_packed",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::HighPrecision => write!(f, "high-precision (Rgba32Float 1×1)"),
            Precision::Packed => write!(f, "packed (Rgba8Unorm 256×64)"),
        }
    }
}

/// Caller's precision request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecisionMode {
    /// High precision when the device supports it, packed otherwise.
    #[default]
    Auto,
    /// High precision or fail with `CapabilityUnsupported`.
    HighPrecision,
    /// Always packed.
    Packed,
}

impl PrecisionMode {
    /// Settle on a concrete precision given the device's capability probe.
    ///
    /// A forced high-precision request on an incapable device is an error,
    /// never a silent downgrade to an 8-bit format.
    pub fn resolve(self, high_precision_supported: bool) -> Result<Precision> {
        match self {
            PrecisionMode::Auto if high_precision_supported => Ok(Precision::HighPrecision),
            PrecisionMode::Auto => Ok(Precision::Packed),
            PrecisionMode::HighPrecision if high_precision_supported => {
                Ok(Precision::HighPrecision)
            }
            PrecisionMode::HighPrecision => Err(AggregatorError::CapabilityUnsupported {
                format: Precision::HighPrecision.target_format(),
            }),
            PrecisionMode::Packed => Ok(Precision::Packed),
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(PrecisionMode::Auto),
            "high" | "float" => Some(PrecisionMode::HighPrecision),
            "packed" => Some(PrecisionMode::Packed),
            _ => None,
        }
    }
}

/// Construction options for [`DataFilterAggregator`](crate::gpu::aggregator::DataFilterAggregator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregatorConfig {
    pub precision: PrecisionMode,
}

impl AggregatorConfig {
    /// Read the precision request from `DATA_FILTER_PRECISION`
    /// (`auto` | `high` | `packed`). Unset or unknown values mean `Auto`.
    pub fn from_env() -> Self {
        let precision = match std::env::var(PRECISION_ENV) {
            Ok(v) => PrecisionMode::parse(&v).unwrap_or_else(|| {
                warn!("ignoring unknown {PRECISION_ENV}={v:?}, using auto");
                PrecisionMode::Auto
            }),
            Err(_) => PrecisionMode::Auto,
        };
        AggregatorConfig { precision }
    }
}
