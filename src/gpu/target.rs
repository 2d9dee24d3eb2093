// gpu/target.rs — The off-screen surface contributions accumulate into.
//
// Two shapes, chosen by `Precision`:
//
//   HighPrecision  1×1    Rgba32Float   alpha holds the running sum
//   Packed         256×64 Rgba8Unorm    one 8-bit bucket per stable index
//
// The target is created once per aggregator and lives as long as it does.
// It is written only by the aggregation draw and read only by `read`.
//
// READBACK
// ─────────
// `copy_texture_to_buffer` needs `bytes_per_row` to be a multiple of
// wgpu::COPY_BYTES_PER_ROW_ALIGNMENT (256). The packed target's rows are
// 256 × 4 = 1024 bytes, already aligned; the float target's single row is 16
// bytes and gets padded. Rows are compacted back after mapping.
//
// `read` submits its own copy and blocks on `device.poll(Wait)`. Call it after
// the aggregation draw has been submitted on the same queue, otherwise it
// reads the previous frame.

use log::debug;

use crate::config::Precision;
use crate::error::{AggregatorError, Result};
use crate::gpu::device::GpuDevice;
use crate::gpu::scope::capture_creation;
use crate::readout::{AggregateReadout, PackedCounts, PACKED_BYTES};
use crate::slot::{PACKED_COLUMNS, PACKED_ROWS};

const COPY_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// Target dimensions for a precision.
pub fn target_extent(precision: Precision) -> (u32, u32) {
    match precision {
        Precision::HighPrecision => (1, 1),
        Precision::Packed => (PACKED_COLUMNS, PACKED_ROWS),
    }
}

fn bytes_per_texel(precision: Precision) -> u32 {
    match precision {
        Precision::HighPrecision => 16,
        Precision::Packed => 4,
    }
}

/// A render target sized and formatted for one precision.
pub struct AggregationTarget {
    pub texture: wgpu::Texture,
    /// Bound as the colour attachment of the aggregation pass.
    pub view: wgpu::TextureView,
    pub precision: Precision,
    pub width: u32,
    pub height: u32,
}

impl AggregationTarget {
    /// Allocate the target for `precision`.
    ///
    /// # Errors
    /// `CapabilityUnsupported` when asking for the float target on a device
    /// whose probe is negative. `ResourceCreation` when wgpu rejects the
    /// allocation. There is no retry and no silent format downgrade.
    pub fn new(gpu: &GpuDevice, precision: Precision) -> Result<Self> {
        if precision == Precision::HighPrecision && !gpu.supports_high_precision_target() {
            return Err(AggregatorError::CapabilityUnsupported {
                format: precision.target_format(),
            });
        }

        let (width, height) = target_extent(precision);
        let texture = capture_creation(&gpu.device, "aggregation target", || {
            gpu.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("AggregationTarget"),
                size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: precision.target_format(),
                // RENDER_ATTACHMENT for the draw, COPY_SRC for readback,
                // TEXTURE_BINDING so a host shader can sample the counts.
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
        })?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        debug!("allocated {precision} aggregation target {width}×{height}");
        Ok(AggregationTarget { texture, view, precision, width, height })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.precision.target_format()
    }

    /// Copy the target back to the host and decode it.
    pub fn read(&self, gpu: &GpuDevice) -> Result<AggregateReadout> {
        let bytes = self.read_bytes(gpu)?;
        match self.precision {
            Precision::HighPrecision => {
                let texel = bytes
                    .get(..16)
                    .ok_or(AggregatorError::ReadbackSize { expected: 16, actual: bytes.len() })?;
                let rgba: [f32; 4] = bytemuck::pod_read_unaligned(texel);
                Ok(AggregateReadout::HighPrecision(rgba[3]))
            }
            Precision::Packed => {
                let actual = bytes.len();
                PackedCounts::from_bytes(bytes)
                    .map(AggregateReadout::Packed)
                    .ok_or(AggregatorError::ReadbackSize { expected: PACKED_BYTES, actual })
            }
        }
    }

    /// Raw texel bytes, rows compacted (no alignment padding).
    fn read_bytes(&self, gpu: &GpuDevice) -> Result<Vec<u8>> {
        let unpadded = self.width * bytes_per_texel(self.precision);
        let padded = align_to(unpadded, COPY_ALIGNMENT);
        let size = (padded * self.height) as u64;

        let readback = capture_creation(&gpu.device, "aggregation readback buffer", || {
            gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("AggregationTarget readback"),
                size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })?;

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("AggregationTarget::read"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d { width: self.width, height: self.height, depth_or_array_layers: 1 },
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        gpu.device.poll(wgpu::Maintain::Wait);
        rx.recv().map_err(|_| AggregatorError::ReadbackCancelled)??;

        let mapped = slice.get_mapped_range();
        let mut out = Vec::with_capacity((unpadded * self.height) as usize);
        for row in mapped.chunks_exact(padded as usize) {
            out.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(mapped);
        readback.unmap();
        Ok(out)
    }
}

/// Round `value` up to the next multiple of `alignment` (a power of two).
fn align_to(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_to() {
        assert_eq!(align_to(16, 256), 256);
        assert_eq!(align_to(1024, 256), 1024);
        assert_eq!(align_to(1025, 256), 1280);
    }

    #[test]
    fn test_extents() {
        assert_eq!(target_extent(Precision::HighPrecision), (1, 1));
        assert_eq!(target_extent(Precision::Packed), (256, 64));
    }

    #[test]
    fn test_packed_rows_need_no_padding() {
        let row = PACKED_COLUMNS * bytes_per_texel(Precision::Packed);
        assert_eq!(align_to(row, COPY_ALIGNMENT), row);
    }
}
