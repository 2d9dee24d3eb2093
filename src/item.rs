// item.rs — Per-item attributes consumed by the aggregation draw.
//
// One `FilterItem` per rendered item, laid out exactly as the vertex buffer
// the aggregation kernel reads (see `VERTEX_ATTRIBUTES`). The upstream filter
// stage owns these values; the aggregator only reads them during the draw.

/// Filter output and stable indices for one item, in vertex-buffer layout.
///
/// Must match `struct ItemIn` in `shaders/aggregate.wgsl` field for field.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FilterItem {
    /// Pass/fail signal from the filter stage: 1.0 passes, 0.0 fails.
    pub filter_value: f32,
    /// Slot index assigned this frame.
    pub index: u32,
    /// Slot index assigned in the previous frame.
    pub prev_index: u32,
}

/// Shader locations for `FilterItem`, in declaration order.
pub const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32,
    1 => Uint32,
    2 => Uint32
];

impl FilterItem {
    pub fn new(filter_value: f32, index: u32, prev_index: u32) -> Self {
        FilterItem { filter_value, index, prev_index }
    }

    /// Build an item from a boolean filter result.
    pub fn from_pass(passes: bool, index: u32, prev_index: u32) -> Self {
        let filter_value = if passes { 1.0 } else { 0.0 };
        FilterItem { filter_value, index, prev_index }
    }

    /// Vertex buffer layout for a tightly packed `[FilterItem]`.
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<FilterItem>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<FilterItem>(), 12);
        let layout = FilterItem::buffer_layout();
        assert_eq!(layout.array_stride, 12);
        assert_eq!(layout.attributes[0].offset, 0);
        assert_eq!(layout.attributes[1].offset, 4);
        assert_eq!(layout.attributes[2].offset, 8);
        assert_eq!(layout.attributes[2].shader_location, 2);
    }

    #[test]
    fn test_from_pass() {
        assert_eq!(FilterItem::from_pass(true, 3, 2).filter_value, 1.0);
        assert_eq!(FilterItem::from_pass(false, 3, 2).filter_value, 0.0);
    }

    #[test]
    fn test_cast_to_bytes() {
        let items = [FilterItem::new(1.0, 7, 6)];
        let bytes: &[u8] = bytemuck::cast_slice(&items);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[4..8], &7u32.to_ne_bytes());
    }
}
