//! Headless backend: keeps buffers in host memory and records every call.
//!
//! The state lives behind an `Arc<Mutex<_>>` so a [`HeadlessProbe`] can keep
//! inspecting it after the backend has been moved into a render system.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::{
    BatchId, BatchRecord, BufferId, BufferTarget, MaterialHandle, MaterialId, MeshHandle, MeshId,
    RenderBackend,
};
use crate::error::{RenderError, RenderResult};
use crate::instancing::MetadataValue;

/// Default uniform window size (64 KiB), the common desktop limit.
pub const DEFAULT_CONSTANT_WINDOW: usize = 64 * 1024;

/// Everything the headless backend has been asked to do.
#[derive(Debug, Default)]
pub struct HeadlessState {
    /// Buffers by id; `None` once released.
    pub buffers: Vec<Option<Vec<f32>>>,
    /// Batches by id; `None` once removed.
    pub batches: Vec<Option<BatchRecord>>,
    /// Registered meshes, in registration order.
    pub meshes: Vec<MeshHandle>,
    /// Registered materials, in registration order.
    pub materials: Vec<MaterialHandle>,
    /// Number of `write_buffer` calls.
    pub upload_calls: usize,
    /// Total words uploaded.
    pub words_uploaded: usize,
}

impl HeadlessState {
    /// Buffers not yet released.
    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_some()).count()
    }

    /// Batches not yet removed.
    #[must_use]
    pub fn live_batches(&self) -> usize {
        self.batches.iter().filter(|b| b.is_some()).count()
    }

    /// Contents of a live buffer.
    #[must_use]
    pub fn buffer(&self, id: BufferId) -> Option<&[f32]> {
        self.buffers.get(id.0 as usize)?.as_deref()
    }

    /// A live batch.
    #[must_use]
    pub fn batch(&self, id: BatchId) -> Option<&BatchRecord> {
        self.batches.get(id.0 as usize)?.as_ref()
    }
}

/// In-memory [`RenderBackend`].
pub struct HeadlessBackend {
    target: BufferTarget,
    constant_window: usize,
    max_attributes: usize,
    state: Arc<Mutex<HeadlessState>>,
}

/// Read-only view onto a [`HeadlessBackend`]'s recorded state.
#[derive(Clone)]
pub struct HeadlessProbe {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessProbe {
    /// Locks the recorded state.
    pub fn state(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock()
    }
}

impl HeadlessBackend {
    /// Storage-buffer backend (single window per buffer).
    #[must_use]
    pub fn raw() -> Self {
        Self::new(BufferTarget::Raw, DEFAULT_CONSTANT_WINDOW)
    }

    /// Uniform-buffer backend with the given window size in bytes.
    #[must_use]
    pub fn constant(window_bytes: usize) -> Self {
        Self::new(BufferTarget::Constant, window_bytes)
    }

    fn new(target: BufferTarget, constant_window: usize) -> Self {
        Self {
            target,
            constant_window,
            max_attributes: 16,
            state: Arc::new(Mutex::new(HeadlessState::default())),
        }
    }

    /// Overrides the named-attribute limit.
    #[must_use]
    pub fn with_max_attributes(mut self, limit: usize) -> Self {
        self.max_attributes = limit;
        self
    }

    /// A probe sharing this backend's state.
    #[must_use]
    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe {
            state: Arc::clone(&self.state),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
impl RenderBackend for HeadlessBackend {
    fn buffer_target(&self) -> BufferTarget {
        self.target
    }

    fn constant_buffer_max_window_size(&self) -> usize {
        self.constant_window
    }

    fn max_named_attributes(&self) -> usize {
        self.max_attributes
    }

    fn register_mesh(&mut self, mesh: MeshHandle) -> MeshId {
        let mut state = self.state.lock();
        state.meshes.push(mesh);
        MeshId(state.meshes.len() as u32 - 1)
    }

    fn register_material(&mut self, material: MaterialHandle) -> MaterialId {
        let mut state = self.state.lock();
        state.materials.push(material);
        MaterialId(state.materials.len() as u32 - 1)
    }

    fn create_buffer(&mut self, words: usize) -> RenderResult<BufferId> {
        let mut state = self.state.lock();
        state.buffers.push(Some(vec![0.0; words]));
        Ok(BufferId(state.buffers.len() as u32 - 1))
    }

    fn write_buffer(&mut self, buffer: BufferId, word_offset: usize, data: &[f32]) -> RenderResult<()> {
        let mut state = self.state.lock();
        let target = state
            .buffers
            .get_mut(buffer.0 as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| RenderError::Backend(format!("unknown buffer {}", buffer.0)))?;
        let end = word_offset + data.len();
        if end > target.len() {
            return Err(RenderError::Backend(format!(
                "write of {} words at {word_offset} overruns buffer {} ({} words)",
                data.len(),
                buffer.0,
                target.len()
            )));
        }
        target[word_offset..end].copy_from_slice(data);
        state.upload_calls += 1;
        state.words_uploaded += data.len();
        Ok(())
    }

    fn add_batch(
        &mut self,
        metadata: &[MetadataValue],
        buffer: BufferId,
        byte_offset: u32,
        window_size: u32,
    ) -> BatchId {
        let mut state = self.state.lock();
        state.batches.push(Some(BatchRecord {
            metadata: metadata.to_vec(),
            buffer,
            byte_offset,
            window_size,
        }));
        BatchId(state.batches.len() as u32 - 1)
    }

    fn remove_batch(&mut self, batch: BatchId) {
        if let Some(slot) = self.state.lock().batches.get_mut(batch.0 as usize) {
            *slot = None;
        }
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        if let Some(slot) = self.state.lock().buffers.get_mut(buffer.0 as usize) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_write_and_release() {
        let mut backend = HeadlessBackend::raw();
        let probe = backend.probe();
        let id = backend.create_buffer(8).unwrap();
        backend.write_buffer(id, 2, &[1.0, 2.0]).unwrap();

        assert_eq!(
            probe.state().buffer(id).unwrap(),
            &[0.0, 0.0, 1.0, 2.0, 0.0, 0.0, 0.0, 0.0]
        );
        assert_eq!(probe.state().words_uploaded, 2);

        backend.release_buffer(id);
        assert_eq!(probe.state().live_buffers(), 0);
        assert!(backend.write_buffer(id, 0, &[1.0]).is_err());
    }

    #[test]
    fn test_out_of_range_write_rejected() {
        let mut backend = HeadlessBackend::constant(1024);
        let id = backend.create_buffer(4).unwrap();
        assert!(backend.write_buffer(id, 3, &[1.0, 2.0]).is_err());
        assert_eq!(backend.buffer_target(), BufferTarget::Constant);
        assert_eq!(backend.constant_buffer_max_window_size(), 1024);
    }
}
