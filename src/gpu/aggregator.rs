// gpu/aggregator.rs — The data-filter aggregator.
//
// Counts, on the GPU, the items whose filter passes and whose stable index
// changed since the previous frame, without reading any per-item data back.
//
// PIPELINE
// ─────────
// One render pipeline, point-list topology, one vertex per item. The vertex
// buffer holds `[FilterItem]` written by the upstream filter stage. The
// vertex entry point is picked by `Precision` when the pipeline is built and
// never changes afterwards:
//
//   HighPrecision → vs_high_precision → 1×1 Rgba32Float target
//   Packed        → vs_packed         → 256×64 Rgba8Unorm target
//
// Blending is One/One/Add on colour and alpha with no depth/stencil state.
// wgpu bakes blend state into the pipeline, so nothing global is touched and
// nothing has to be restored after the draw.
//
// FRAME SEQUENCE
// ───────────────
//   encode(encoder, items, n)   clear target, draw n points
//   queue.submit(...)
//   target().read(gpu)          blocks until the copy lands
//
// `aggregate` runs the whole sequence for host-side item slices.
//
// The aggregator keeps no per-item state. What it owns is the target and the
// compiled pipeline.

use log::{debug, info};
use wgpu::util::DeviceExt;

use crate::config::{AggregatorConfig, Precision};
use crate::error::Result;
use crate::gpu::device::GpuDevice;
use crate::gpu::scope::capture_creation;
use crate::gpu::target::AggregationTarget;
use crate::item::FilterItem;
use crate::readout::AggregateReadout;

const ADDITIVE_COMPONENT: wgpu::BlendComponent = wgpu::BlendComponent {
    src_factor: wgpu::BlendFactor::One,
    dst_factor: wgpu::BlendFactor::One,
    operation: wgpu::BlendOperation::Add,
};

/// Fixed raster state of the aggregation draw.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationParameters {
    pub blend: wgpu::BlendState,
    /// Always `None`: depth testing is disabled.
    pub depth_stencil: Option<wgpu::DepthStencilState>,
}

impl AggregationParameters {
    /// `dst += src` on every channel, no depth test.
    pub const ADDITIVE: AggregationParameters = AggregationParameters {
        blend: wgpu::BlendState { color: ADDITIVE_COMPONENT, alpha: ADDITIVE_COMPONENT },
        depth_stencil: None,
    };

    /// Colour target state for a pipeline writing `format` with these
    /// parameters.
    pub fn color_target(&self, format: wgpu::TextureFormat) -> wgpu::ColorTargetState {
        wgpu::ColorTargetState {
            format,
            blend: Some(self.blend),
            write_mask: wgpu::ColorWrites::ALL,
        }
    }
}

/// GPU transition counter over a filter stage's per-item output.
///
/// Create once per layer; call [`encode`](Self::encode) or
/// [`aggregate`](Self::aggregate) each frame.
pub struct DataFilterAggregator {
    precision: Precision,
    pipeline: wgpu::RenderPipeline,
    target: AggregationTarget,
}

impl DataFilterAggregator {
    /// Resolve `config.precision` against the device's capability probe and
    /// build the target and pipeline.
    ///
    /// # Errors
    /// `CapabilityUnsupported` if high precision is forced on a device that
    /// lacks it. `ResourceCreation` if the target or pipeline cannot be
    /// created.
    pub fn new(gpu: &GpuDevice, config: AggregatorConfig) -> Result<Self> {
        let precision = config.precision.resolve(gpu.supports_high_precision_target())?;
        Self::with_precision(gpu, precision)
    }

    /// Build for an explicit precision.
    pub fn with_precision(gpu: &GpuDevice, precision: Precision) -> Result<Self> {
        let target = AggregationTarget::new(gpu, precision)?;
        let pipeline = build_pipeline(gpu, precision)?;
        info!("data-filter aggregator ready: {precision}");
        Ok(DataFilterAggregator { precision, pipeline, target })
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// The accumulation target, for readback or sampling.
    pub fn target(&self) -> &AggregationTarget {
        &self.target
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    /// Raster state the pipeline was built with, for hosts that build their
    /// own pipelines around the same target.
    pub fn parameters(&self) -> AggregationParameters {
        AggregationParameters::ADDITIVE
    }

    /// Record the aggregation pass into `encoder`.
    ///
    /// Clears the target, then draws `item_count` points from `items`, a
    /// buffer with `VERTEX` usage holding tightly packed `FilterItem`s. The
    /// result is visible once the encoder is submitted and the queue has
    /// progressed past it.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, items: &wgpu::Buffer, item_count: u32) {
        self.encode_pass(encoder, Some((items, item_count)));
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        items: Option<(&wgpu::Buffer, u32)>,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("data-filter aggregation"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let Some((buffer, count)) = items.filter(|&(_, n)| n > 0) else {
            return;
        };
        let byte_len = count as u64 * std::mem::size_of::<FilterItem>() as u64;
        pass.set_pipeline(&self.pipeline);
        pass.set_vertex_buffer(0, buffer.slice(..byte_len));
        pass.draw(0..count, 0..1);
    }

    /// Upload `items`, aggregate them, and read the target back.
    ///
    /// Convenience for hosts whose filter output lives on the CPU; a GPU
    /// filter stage should call [`encode`](Self::encode) with its own buffer.
    pub fn aggregate(&self, gpu: &GpuDevice, items: &[FilterItem]) -> Result<AggregateReadout> {
        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("DataFilterAggregator::aggregate"),
        });

        if items.is_empty() {
            self.encode_pass(&mut encoder, None);
        } else {
            let buffer = capture_creation(&gpu.device, "filter item buffer", || {
                gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("DataFilterAggregator items"),
                    contents: bytemuck::cast_slice(items),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            })?;
            self.encode_pass(&mut encoder, Some((&buffer, items.len() as u32)));
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let readout = self.target.read(gpu)?;
        debug!("aggregated {} items: total {}", items.len(), readout.total());
        Ok(readout)
    }
}

fn build_pipeline(gpu: &GpuDevice, precision: Precision) -> Result<wgpu::RenderPipeline> {
    let params = AggregationParameters::ADDITIVE;
    capture_creation(&gpu.device, "aggregation pipeline", || {
        let shader = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("aggregate.wgsl"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/aggregate.wgsl").into()),
        });

        let layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("aggregation pipeline layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });

        gpu.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("data-filter aggregation"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: precision.vertex_entry_point(),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[FilterItem::buffer_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(params.color_target(precision.target_format()))],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                ..Default::default()
            },
            depth_stencil: params.depth_stencil.clone(),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    })
}
