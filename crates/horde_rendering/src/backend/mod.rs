//! # Rendering Backend
//!
//! The seam between batch descriptors and whatever owns GPU memory.
//!
//! ```text
//! BatchDescriptor ── register / create / add_batch ──► RenderBackend
//!        │                                                 │
//!        └──── write_buffer (at unlock) ──────────────────►┘
//! ```
//!
//! Two implementations ship with the crate:
//! - [`HeadlessBackend`]: records every call in memory (tests, replay, benches)
//! - [`WgpuBackend`]: real `wgpu` buffers uploaded through the queue

mod headless;
mod wgpu_backend;

pub use headless::{HeadlessBackend, HeadlessProbe, HeadlessState};
pub use wgpu_backend::WgpuBackend;

use crate::error::RenderResult;
use crate::instancing::MetadataValue;

/// Opaque mesh asset handle supplied by the asset layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Opaque material asset handle supplied by the asset layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u32);

/// Backend-side mesh id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MeshId(pub u32);

/// Backend-side material id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// Backend-side buffer id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Backend-side batch id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BatchId(pub u32);

/// How instance buffers are bound by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferTarget {
    /// Storage buffer, one unbounded window.
    Raw,
    /// Uniform buffer bound in windows of at most
    /// [`RenderBackend::constant_buffer_max_window_size`] bytes.
    Constant,
}

/// One registered batch: a window of a buffer plus its attribute metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchRecord {
    /// Attribute offsets within the window.
    pub metadata: Vec<MetadataValue>,
    /// Buffer the window lives in.
    pub buffer: BufferId,
    /// Byte offset of the window.
    pub byte_offset: u32,
    /// Window size in bytes, 0 for raw buffers.
    pub window_size: u32,
}

/// Operations batch descriptors need from the GPU side.
pub trait RenderBackend {
    /// Buffer binding model.
    fn buffer_target(&self) -> BufferTarget;

    /// Largest window a constant buffer binding may address, in bytes.
    fn constant_buffer_max_window_size(&self) -> usize;

    /// Most named attributes one batch may carry.
    fn max_named_attributes(&self) -> usize;

    /// Registers a mesh asset.
    fn register_mesh(&mut self, mesh: MeshHandle) -> MeshId;

    /// Registers a material asset.
    fn register_material(&mut self, material: MaterialHandle) -> MaterialId;

    /// Allocates a zeroed buffer of `words` 32-bit words.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Backend`](crate::RenderError::Backend) if the
    /// allocation is rejected.
    fn create_buffer(&mut self, words: usize) -> RenderResult<BufferId>;

    /// Copies `data` into `buffer` starting at `word_offset`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Backend`](crate::RenderError::Backend) for an
    /// unknown buffer or an out-of-range write.
    fn write_buffer(&mut self, buffer: BufferId, word_offset: usize, data: &[f32])
        -> RenderResult<()>;

    /// Registers a batch over one window of `buffer`.
    fn add_batch(
        &mut self,
        metadata: &[MetadataValue],
        buffer: BufferId,
        byte_offset: u32,
        window_size: u32,
    ) -> BatchId;

    /// Unregisters a batch.
    fn remove_batch(&mut self, batch: BatchId);

    /// Frees a buffer.
    fn release_buffer(&mut self, buffer: BufferId);
}
