//! `wgpu` backend.
//!
//! Instance buffers are created as storage (raw) or uniform (constant)
//! buffers and filled with `Queue::write_buffer`. Binding the recorded batches
//! into bind groups is left to the frame renderer, which reads them back via
//! [`WgpuBackend::batch`] and [`WgpuBackend::buffer`].

use std::sync::Arc;

use super::{
    BatchId, BatchRecord, BufferId, BufferTarget, MaterialHandle, MaterialId, MeshHandle, MeshId,
    RenderBackend,
};
use crate::error::{RenderError, RenderResult};
use crate::instancing::MetadataValue;

/// Upper bound on named per-instance attributes for one batch.
const MAX_NAMED_ATTRIBUTES: usize = 16;

/// [`RenderBackend`] on top of a `wgpu` device.
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    target: BufferTarget,
    buffers: Vec<Option<wgpu::Buffer>>,
    batches: Vec<Option<BatchRecord>>,
    meshes: Vec<MeshHandle>,
    materials: Vec<MaterialHandle>,
}

impl WgpuBackend {
    /// Wraps a device and queue.
    #[must_use]
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, target: BufferTarget) -> Self {
        Self {
            device,
            queue,
            target,
            buffers: Vec::new(),
            batches: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
        }
    }

    /// A live GPU buffer.
    #[must_use]
    pub fn buffer(&self, id: BufferId) -> Option<&wgpu::Buffer> {
        self.buffers.get(id.0 as usize)?.as_ref()
    }

    /// A registered batch.
    #[must_use]
    pub fn batch(&self, id: BatchId) -> Option<&BatchRecord> {
        self.batches.get(id.0 as usize)?.as_ref()
    }

    /// Mesh handle behind a mesh id.
    #[must_use]
    pub fn mesh(&self, id: MeshId) -> Option<MeshHandle> {
        self.meshes.get(id.0 as usize).copied()
    }

    /// Material handle behind a material id.
    #[must_use]
    pub fn material(&self, id: MaterialId) -> Option<MaterialHandle> {
        self.materials.get(id.0 as usize).copied()
    }

    fn usage(&self) -> wgpu::BufferUsages {
        match self.target {
            BufferTarget::Raw => wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            BufferTarget::Constant => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
impl RenderBackend for WgpuBackend {
    fn buffer_target(&self) -> BufferTarget {
        self.target
    }

    fn constant_buffer_max_window_size(&self) -> usize {
        self.device.limits().max_uniform_buffer_binding_size as usize
    }

    fn max_named_attributes(&self) -> usize {
        MAX_NAMED_ATTRIBUTES
    }

    fn register_mesh(&mut self, mesh: MeshHandle) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() as u32 - 1)
    }

    fn register_material(&mut self, material: MaterialHandle) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() as u32 - 1)
    }

    fn create_buffer(&mut self, words: usize) -> RenderResult<BufferId> {
        let size = (words * std::mem::size_of::<f32>()) as u64;
        let max = self.device.limits().max_buffer_size;
        if size == 0 || size > max {
            return Err(RenderError::Backend(format!(
                "instance buffer of {size} bytes outside device range (1..={max})"
            )));
        }

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Horde Instance Buffer"),
            size,
            usage: self.usage(),
            mapped_at_creation: false,
        });
        self.buffers.push(Some(buffer));
        Ok(BufferId(self.buffers.len() as u32 - 1))
    }

    fn write_buffer(&mut self, buffer: BufferId, word_offset: usize, data: &[f32]) -> RenderResult<()> {
        let target = self
            .buffers
            .get(buffer.0 as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| RenderError::Backend(format!("unknown buffer {}", buffer.0)))?;
        let offset = (word_offset * std::mem::size_of::<f32>()) as u64;
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if offset + bytes.len() as u64 > target.size() {
            return Err(RenderError::Backend(format!(
                "write of {} bytes at {offset} overruns buffer {} ({} bytes)",
                bytes.len(),
                buffer.0,
                target.size()
            )));
        }
        self.queue.write_buffer(target, offset, bytes);
        Ok(())
    }

    fn add_batch(
        &mut self,
        metadata: &[MetadataValue],
        buffer: BufferId,
        byte_offset: u32,
        window_size: u32,
    ) -> BatchId {
        self.batches.push(Some(BatchRecord {
            metadata: metadata.to_vec(),
            buffer,
            byte_offset,
            window_size,
        }));
        BatchId(self.batches.len() as u32 - 1)
    }

    fn remove_batch(&mut self, batch: BatchId) {
        if let Some(slot) = self.batches.get_mut(batch.0 as usize) {
            *slot = None;
        }
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        if let Some(slot) = self.buffers.get_mut(buffer.0 as usize) {
            if let Some(buffer) = slot.take() {
                buffer.destroy();
            }
        }
    }
}
