// gpu/device.rs — wgpu device abstraction and capability probe.
//
// Responsibilities:
//   - Enumerate adapters and select the first non-CPU one.
//   - Expose a `DeviceProfile` for simulating a weaker device on a
//     development machine (e.g., a driver without float blending).
//   - Probe, once, whether the device can accumulate into a float target.
//
// ADAPTER SELECTION:
// wgpu's default `request_adapter` may pick llvmpipe/softpipe when a real GPU
// is present. We enumerate explicitly and prefer hardware, falling back to
// software only when nothing else exists (headless CI).
//
// FLOAT TARGET PROBE:
// "Rgba32Float exists" does not mean "you can render into it", and "you can
// render into it" does not mean "you can blend into it". These are separate
// capabilities and the aggregator needs both. On wgpu the blendable flag for
// 32-bit float formats is adapter-specific: it is only usable when the device
// was created with TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES. Without that
// feature we fall back to the guaranteed format features, which never include
// float blending.
//
// The probe runs once in `init_async` and is cached in `GpuDevice`; format
// feature queries go through the driver and are not free.

use std::fmt;

use log::{debug, info, warn};

use crate::error::{AggregatorError, Result};

/// Format used by the wide-range target.
pub const HIGH_PRECISION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Hardware profile controlling which capabilities the device reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceProfile {
    /// Report the adapter's actual capabilities.
    #[default]
    Native,
    /// Simulate a device without float-target accumulation. The probe always
    /// answers false, so the packed path can be exercised on any GPU.
    PackedOnly,
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceProfile::Native => write!(f, "Native"),
            DeviceProfile::PackedOnly => write!(f, "PackedOnly (simulated, no float blending)"),
        }
    }
}

/// The two independently gated capabilities a float accumulation target
/// needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FloatTargetSupport {
    /// The format may be used as a render attachment.
    pub render_attachment: bool,
    /// Blending into the format is allowed.
    pub blendable: bool,
}

impl FloatTargetSupport {
    pub fn from_format_features(features: &wgpu::TextureFormatFeatures) -> Self {
        FloatTargetSupport {
            render_attachment: features
                .allowed_usages
                .contains(wgpu::TextureUsages::RENDER_ATTACHMENT),
            blendable: features
                .flags
                .contains(wgpu::TextureFormatFeatureFlags::BLENDABLE),
        }
    }

    /// Both capabilities present.
    pub fn is_supported(&self) -> bool {
        self.render_attachment && self.blendable
    }
}

/// Format features the *device* may use for `format`.
///
/// Adapter-reported features only apply when the device enabled
/// TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES; otherwise wgpu validates against
/// the guaranteed set.
pub fn usable_format_features(
    adapter: &wgpu::Adapter,
    device_features: wgpu::Features,
    format: wgpu::TextureFormat,
) -> wgpu::TextureFormatFeatures {
    if device_features.contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES) {
        adapter.get_texture_format_features(format)
    } else {
        format.guaranteed_format_features(device_features)
    }
}

/// Cached adapter information for logging and debugging.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: String,
    pub vendor: u32,
    pub device: u32,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
}

impl From<wgpu::AdapterInfo> for AdapterInfo {
    fn from(raw: wgpu::AdapterInfo) -> Self {
        AdapterInfo {
            name: raw.name,
            vendor: raw.vendor,
            device: raw.device,
            device_type: raw.device_type,
            backend: raw.backend,
        }
    }
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, {:?})", self.name, self.backend, self.device_type)
    }
}

/// The GPU context: device, queue, active profile and cached capabilities.
///
/// Owned by the host renderer; aggregators only borrow it.
///
/// # Field drop order
/// Fields drop top to bottom. `_instance` is declared last so the
/// `wgpu::Instance` outlives `device` and `queue`.
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub profile: DeviceProfile,
    pub adapter_info: AdapterInfo,
    /// Result of the float-target probe, after the profile is applied.
    pub float_target: FloatTargetSupport,
    _instance: Option<wgpu::Instance>,
}

impl GpuDevice {
    /// Create a `GpuDevice` on the best available adapter with
    /// `DeviceProfile::Native`.
    ///
    /// # Errors
    /// `NoSuitableAdapter` if no adapter is found, `DeviceRequest` if the
    /// device request fails.
    pub fn new() -> Result<Self> {
        Self::new_with_profile(DeviceProfile::Native)
    }

    /// Create a `GpuDevice` with an explicit profile.
    pub fn new_with_profile(profile: DeviceProfile) -> Result<Self> {
        pollster::block_on(Self::init_async(profile))
    }

    async fn init_async(profile: DeviceProfile) -> Result<Self> {
        let flags = if cfg!(debug_assertions) {
            wgpu::InstanceFlags::VALIDATION
        } else {
            wgpu::InstanceFlags::empty()
        };

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY | wgpu::Backends::GL,
            flags,
            ..Default::default()
        });

        let all_adapters = instance.enumerate_adapters(wgpu::Backends::all());
        if all_adapters.is_empty() {
            return Err(AggregatorError::NoSuitableAdapter);
        }
        for a in &all_adapters {
            let info = a.get_info();
            debug!("candidate adapter: {} ({:?}, {:?})", info.name, info.backend, info.device_type);
        }

        // Tier 1: real hardware. Tier 2: whatever exists (software in CI).
        let mut hardware = None;
        let mut fallback = None;
        for a in all_adapters {
            if a.get_info().device_type == wgpu::DeviceType::Cpu {
                fallback.get_or_insert(a);
            } else if hardware.is_none() {
                hardware = Some(a);
            }
        }
        let adapter = match (hardware, fallback) {
            (Some(a), _) => a,
            (None, Some(a)) => {
                warn!("no hardware adapter found, using software renderer {}", a.get_info().name);
                a
            }
            (None, None) => return Err(AggregatorError::NoSuitableAdapter),
        };

        let (device, queue) = request_device(&adapter, profile).await?;
        let mut gpu = Self::from_parts(&adapter, device, queue, profile);
        gpu._instance = Some(instance);
        Ok(gpu)
    }

    /// Wrap a device the host already created on `adapter`.
    ///
    /// The float-target probe runs here, against the features `device` was
    /// actually created with.
    pub fn from_parts(
        adapter: &wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        profile: DeviceProfile,
    ) -> Self {
        let adapter_info = AdapterInfo::from(adapter.get_info());
        let float_target = match profile {
            DeviceProfile::Native => FloatTargetSupport::from_format_features(
                &usable_format_features(adapter, device.features(), HIGH_PRECISION_FORMAT),
            ),
            DeviceProfile::PackedOnly => FloatTargetSupport::default(),
        };
        info!(
            "using adapter {adapter_info}, profile {profile}, float target: \
             render={} blend={}",
            float_target.render_attachment, float_target.blendable
        );
        GpuDevice { device, queue, profile, adapter_info, float_target, _instance: None }
    }

    /// True iff the device can both render and additively blend into the
    /// high-precision target format.
    pub fn supports_high_precision_target(&self) -> bool {
        self.float_target.is_supported()
    }
}

/// Free-function form of [`GpuDevice::supports_high_precision_target`].
pub fn supports_high_precision_target(gpu: &GpuDevice) -> bool {
    gpu.supports_high_precision_target()
}

impl fmt::Display for GpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GpuDevice {{ adapter: {}, profile: {}, high_precision: {} }}",
            self.adapter_info,
            self.profile,
            self.supports_high_precision_target()
        )
    }
}

// ============================================================
// Device request helpers
// ============================================================

/// Features to request for `profile`, given what the adapter offers.
///
/// Native asks for adapter-specific format features when available so the
/// float blend flag becomes usable. PackedOnly asks for nothing.
fn features_for_profile(profile: DeviceProfile, available: wgpu::Features) -> wgpu::Features {
    match profile {
        DeviceProfile::Native => {
            available & wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES
        }
        DeviceProfile::PackedOnly => wgpu::Features::empty(),
    }
}

async fn request_device(
    adapter: &wgpu::Adapter,
    profile: DeviceProfile,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    let required_features = features_for_profile(profile, adapter.features());
    // The targets are tiny; downlevel limits keep GL/WebGL2 adapters usable.
    let required_limits =
        wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits());

    let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("data-filter-aggregator"),
                required_features,
                required_limits,
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        )
        .await?;
    Ok((device, queue))
}

// ============================================================
// Tests
// ============================================================
