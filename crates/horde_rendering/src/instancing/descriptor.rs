//! Batch descriptors.
//!
//! A [`BatchDescriptor`] owns one triple-buffered set of instance buffers
//! for a single (mesh, material) pair. Each frame it is locked exactly once:
//!
//! ```text
//! lock_for_write ──► WriteLease ──► writer() ──► fill jobs
//!                        │
//!                        ├──► emit_draw_commands
//!                        └──► unlock (upload, advance ring slot)
//! ```
//!
//! The lease is the only way to write or emit, and only [`WriteLease::unlock`]
//! uploads. A lease dropped without unlock still advances the ring so the
//! slot cadence never stalls.

use crate::backend::{
    BatchId, BufferId, BufferTarget, MaterialHandle, MaterialId, MeshHandle, MeshId,
    RenderBackend,
};
use crate::error::{RenderError, RenderResult};
use crate::pipeline::FrameDrawPlan;

use super::commands::{DrawCommand, DrawCommandOutput, ALL_SPLITS};
use super::layout::{compute_layout, InstanceLayout, WORD_BYTES};
use super::metadata::{AttributeKind, MetadataTable, HEADER_BYTES};
use super::view::{InstanceWriter, WindowAddressing};

/// Number of buffer copies cycled across frames.
pub const RING_DEPTH: usize = 3;

const TRANSFORM: [AttributeKind; 2] = [AttributeKind::ObjectToWorld, AttributeKind::WorldToObject];
const SPRITE: [AttributeKind; 6] = [
    AttributeKind::ObjectToWorld,
    AttributeKind::WorldToObject,
    AttributeKind::Color,
    AttributeKind::UvRect,
    AttributeKind::Blink,
    AttributeKind::Outline,
];
const HEALTH_BAR: [AttributeKind; 3] = [
    AttributeKind::ObjectToWorld,
    AttributeKind::WorldToObject,
    AttributeKind::Health,
];
const VFX: [AttributeKind; 3] = [
    AttributeKind::ObjectToWorld,
    AttributeKind::WorldToObject,
    AttributeKind::UvRect,
];

/// Per-instance layout families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BatchKind {
    /// Transform pair only (debuff overlays).
    Overlay,
    /// Animated creep sprite.
    Sprite,
    /// Health bar with a fill fraction.
    HealthBar,
    /// Muzzle flash or impact with an atlas rectangle.
    Vfx,
}

impl BatchKind {
    /// Attributes of this kind, in layout order.
    #[must_use]
    pub const fn attributes(self) -> &'static [AttributeKind] {
        match self {
            Self::Overlay => &TRANSFORM,
            Self::Sprite => &SPRITE,
            Self::HealthBar => &HEALTH_BAR,
            Self::Vfx => &VFX,
        }
    }
}

/// Construction parameters of a [`BatchDescriptor`].
#[derive(Clone, Debug)]
pub struct BatchDescriptorDesc {
    /// Name used in logs and errors.
    pub label: String,
    /// Layout family.
    pub kind: BatchKind,
    /// Material asset.
    pub material: MaterialHandle,
    /// Mesh asset.
    pub mesh: MeshHandle,
    /// Added to the command index to form the sorting position.
    pub sorting_priority: i32,
    /// Most instances one frame may write.
    pub max_instances: usize,
}

/// A triple-buffered instance batch.
pub struct BatchDescriptor {
    label: String,
    kind: BatchKind,
    material: MaterialId,
    mesh: MeshId,
    layout: InstanceLayout,
    metadata: MetadataTable,
    addressing: WindowAddressing,
    window_stride_bytes: usize,
    max_instances: usize,
    sorting_priority: i32,
    target: BufferTarget,
    buffers: [BufferId; RING_DEPTH],
    batch_ids: Vec<BatchId>,
    staging: Box<[f32]>,
    slot: usize,
}

impl BatchDescriptor {
    /// Registers assets, lays out the buffer, allocates the ring and
    /// registers one batch per (slot, window).
    ///
    /// In constant-buffer mode the zeroed header lives inside each window, so
    /// instances are laid out in the backend window size minus
    /// [`HEADER_BYTES`] and windows are placed one backend window apart.
    ///
    /// # Errors
    ///
    /// Layout, attribute-limit and backend allocation errors.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new<B: RenderBackend>(backend: &mut B, desc: BatchDescriptorDesc) -> RenderResult<Self> {
        let attributes = desc.kind.attributes();
        let bytes_per_instance = MetadataTable::bytes_per_instance(attributes);
        let target = backend.buffer_target();

        let (layout, window_stride_bytes) = match target {
            BufferTarget::Raw => {
                let layout = compute_layout(bytes_per_instance, desc.max_instances, None)?;
                (layout, layout.window_size_bytes)
            }
            BufferTarget::Constant => {
                let bound = backend.constant_buffer_max_window_size() / WORD_BYTES * WORD_BYTES;
                let layout = compute_layout(
                    bytes_per_instance,
                    desc.max_instances,
                    Some(bound.saturating_sub(HEADER_BYTES)),
                )?;
                (layout, bound)
            }
        };

        let metadata = MetadataTable::build(
            attributes,
            layout.instances_per_window,
            backend.max_named_attributes(),
        )?;
        let addressing = WindowAddressing::new(&metadata, layout.instances_per_window, window_stride_bytes);
        let material = backend.register_material(desc.material);
        let mesh = backend.register_mesh(desc.mesh);

        let window_words = addressing.window_words();
        let buffer_words = window_words * layout.window_count;
        let sentinel = [0.0f32; HEADER_BYTES / WORD_BYTES];

        let mut buffers = [BufferId::default(); RING_DEPTH];
        for buffer in &mut buffers {
            *buffer = backend.create_buffer(buffer_words)?;
            for window in 0..layout.window_count {
                backend.write_buffer(*buffer, window * window_words, &sentinel)?;
            }
        }

        let values = metadata.values();
        let window_size = match target {
            BufferTarget::Raw => 0,
            BufferTarget::Constant => window_stride_bytes as u32,
        };
        let mut batch_ids = Vec::with_capacity(RING_DEPTH * layout.window_count);
        for buffer in &buffers {
            for window in 0..layout.window_count {
                let offset = (window * window_stride_bytes) as u32;
                batch_ids.push(backend.add_batch(&values, *buffer, offset, window_size));
            }
        }

        tracing::debug!(
            label = %desc.label,
            bytes_per_instance,
            instances_per_window = layout.instances_per_window,
            windows = layout.window_count,
            "batch descriptor created"
        );

        Ok(Self {
            label: desc.label,
            kind: desc.kind,
            material,
            mesh,
            layout,
            metadata,
            addressing,
            window_stride_bytes,
            max_instances: desc.max_instances,
            sorting_priority: desc.sorting_priority,
            target,
            buffers,
            batch_ids,
            staging: vec![0.0; buffer_words].into_boxed_slice(),
            slot: 0,
        })
    }

    /// Draw commands needed for `entity_count` instances.
    #[inline]
    #[must_use]
    pub const fn commands_needed(&self, entity_count: usize) -> usize {
        self.layout.windows_for(entity_count)
    }

    /// Fails if `entity_count` exceeds the configured capacity.
    ///
    /// # Errors
    ///
    /// [`RenderError::CapacityExceeded`].
    pub fn check_capacity(&self, entity_count: usize) -> RenderResult<()> {
        if entity_count > self.max_instances {
            return Err(RenderError::CapacityExceeded {
                batch: self.label.clone(),
                requested: entity_count,
                capacity: self.max_instances,
            });
        }
        Ok(())
    }

    /// Locks the current ring slot for `entity_count` instances.
    ///
    /// With `with_visibility_mask` every instance starts hidden and the fill
    /// kernel decides which ones are emitted.
    ///
    /// # Errors
    ///
    /// [`RenderError::CapacityExceeded`]; nothing is locked in that case.
    pub fn lock_for_write(
        &mut self,
        entity_count: usize,
        with_visibility_mask: bool,
    ) -> RenderResult<WriteLease<'_>> {
        self.check_capacity(entity_count)?;
        Ok(WriteLease {
            descriptor: self,
            count: entity_count,
            mask: with_visibility_mask.then(|| vec![false; entity_count]),
            unlocked: false,
        })
    }

    /// Unregisters every batch and frees the ring buffers.
    pub fn release<B: RenderBackend>(self, backend: &mut B) {
        for batch in &self.batch_ids {
            backend.remove_batch(*batch);
        }
        for buffer in &self.buffers {
            backend.release_buffer(*buffer);
        }
        tracing::debug!(label = %self.label, "batch descriptor released");
    }

    /// Batch id of `window` in ring `slot`.
    #[inline]
    #[must_use]
    pub fn batch_id(&self, slot: usize, window: usize) -> BatchId {
        self.batch_ids[slot * self.layout.window_count + window]
    }

    /// Name used in logs and errors.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Layout family.
    #[must_use]
    pub const fn kind(&self) -> BatchKind {
        self.kind
    }

    /// Window layout.
    #[must_use]
    pub const fn layout(&self) -> &InstanceLayout {
        &self.layout
    }

    /// Attribute offsets.
    #[must_use]
    pub const fn metadata(&self) -> &MetadataTable {
        &self.metadata
    }

    /// Word addressing of the staging buffer.
    #[must_use]
    pub const fn addressing(&self) -> &WindowAddressing {
        &self.addressing
    }

    /// Bytes between window starts.
    #[must_use]
    pub const fn window_stride_bytes(&self) -> usize {
        self.window_stride_bytes
    }

    /// Configured capacity.
    #[must_use]
    pub const fn max_instances(&self) -> usize {
        self.max_instances
    }

    /// Sorting priority.
    #[must_use]
    pub const fn sorting_priority(&self) -> i32 {
        self.sorting_priority
    }

    /// Buffer binding model the descriptor was built for.
    #[must_use]
    pub const fn target(&self) -> BufferTarget {
        self.target
    }

    /// Ring slot the next lock will write.
    #[must_use]
    pub const fn slot(&self) -> usize {
        self.slot
    }

    /// Buffer backing ring `slot`.
    #[must_use]
    pub const fn buffer(&self, slot: usize) -> BufferId {
        self.buffers[slot]
    }

    /// Registered material.
    #[must_use]
    pub const fn material(&self) -> MaterialId {
        self.material
    }

    /// Registered mesh.
    #[must_use]
    pub const fn mesh(&self) -> MeshId {
        self.mesh
    }

    fn advance_slot(&mut self) {
        self.slot = (self.slot + 1) % RING_DEPTH;
    }
}

/// Exclusive write access to one ring slot for one frame.
#[must_use = "a locked batch must be unlocked"]
pub struct WriteLease<'d> {
    descriptor: &'d mut BatchDescriptor,
    count: usize,
    mask: Option<Vec<bool>>,
    unlocked: bool,
}

impl WriteLease<'_> {
    /// Instances locked this frame.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Label of the locked descriptor.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.descriptor.label
    }

    /// Writer over every locked instance. Split it to fan out fill jobs.
    pub fn writer(&mut self) -> InstanceWriter<'_> {
        InstanceWriter::new(
            &mut self.descriptor.staging,
            self.descriptor.addressing,
            self.count,
            self.mask.as_deref_mut(),
        )
    }

    /// Visibility mask, if one was requested.
    #[must_use]
    pub fn visibility(&self) -> Option<&[bool]> {
        self.mask.as_deref()
    }

    /// Appends one draw command per window in use and the window-local
    /// indices of visible instances, advancing the plan cursors.
    ///
    /// # Errors
    ///
    /// [`RenderError::DrawPlanOverflow`] if the output arrays are too small.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn emit_draw_commands(
        &self,
        output: &mut DrawCommandOutput,
        plan: &mut FrameDrawPlan,
    ) -> RenderResult<()> {
        let descriptor = &*self.descriptor;
        let windows = descriptor.commands_needed(self.count);
        let per_window = descriptor.layout.instances_per_window;
        let planned_visible = output.visible_instances.len();

        for window in 0..windows {
            let command_index = plan.command_cursor;
            if command_index >= output.draw_commands.len() {
                return Err(RenderError::DrawPlanOverflow {
                    what: "draw commands",
                    needed: command_index + 1,
                    planned: output.draw_commands.len(),
                });
            }

            let start = window * per_window;
            let end = (start + per_window).min(self.count);
            let offset = plan.visible_cursor;
            let mut written = 0;
            for index in start..end {
                if self.mask.as_ref().map_or(true, |mask| mask[index]) {
                    let slot = output.visible_instances.get_mut(offset + written).ok_or(
                        RenderError::DrawPlanOverflow {
                            what: "visible instances",
                            needed: offset + written + 1,
                            planned: planned_visible,
                        },
                    )?;
                    *slot = (index - start) as u32;
                    written += 1;
                }
            }

            output.draw_commands[command_index] = DrawCommand {
                batch: descriptor.batch_id(descriptor.slot, window),
                material: descriptor.material,
                mesh: descriptor.mesh,
                submesh: 0,
                split_visibility_mask: ALL_SPLITS,
                sorting_position: command_index as i32 + descriptor.sorting_priority,
                visible_offset: offset as u32,
                visible_count: written as u32,
            };
            plan.command_cursor += 1;
            plan.visible_cursor += written;
        }

        output.visible_written = plan.visible_cursor;
        Ok(())
    }

    /// Uploads the windows in use, releases the mask and advances the ring.
    ///
    /// # Errors
    ///
    /// Backend upload errors. The ring still advances.
    pub fn unlock<B: RenderBackend>(mut self, backend: &mut B) -> RenderResult<()> {
        self.unlocked = true;
        if self.count == 0 {
            return Ok(());
        }
        let descriptor = &*self.descriptor;
        let words = descriptor.commands_needed(self.count) * descriptor.addressing.window_words();
        backend.write_buffer(descriptor.buffers[descriptor.slot], 0, &descriptor.staging[..words])
    }
}

impl Drop for WriteLease<'_> {
    fn drop(&mut self) {
        if !self.unlocked {
            tracing::error!(
                label = %self.descriptor.label,
                slot = self.descriptor.slot,
                "batch lease dropped without unlock; frame data discarded"
            );
        }
        self.descriptor.advance_slot();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use crate::instancing::metadata::PER_INSTANCE_FLAG;
    use crate::pipeline::allocate_draw_output;

    fn desc(kind: BatchKind, max_instances: usize) -> BatchDescriptorDesc {
        BatchDescriptorDesc {
            label: "test".into(),
            kind,
            material: MaterialHandle(4),
            mesh: MeshHandle(1),
            sorting_priority: 10,
            max_instances,
        }
    }

    #[test]
    fn test_construction_registers_ring() {
        let mut backend = HeadlessBackend::raw();
        let probe = backend.probe();
        let descriptor = BatchDescriptor::new(&mut backend, desc(BatchKind::Sprite, 100)).unwrap();

        let state = probe.state();
        assert_eq!(state.live_buffers(), RING_DEPTH);
        assert_eq!(state.live_batches(), RING_DEPTH);
        assert_eq!(descriptor.layout().window_count, 1);
        assert_eq!(descriptor.metadata().instance_bytes(), 136);

        let batch = state.batch(descriptor.batch_id(2, 0)).unwrap();
        assert_eq!(batch.buffer, descriptor.buffer(2));
        assert_eq!(batch.window_size, 0);
        assert_eq!(batch.metadata.len(), 6);
        assert_eq!(batch.metadata[0].value, PER_INSTANCE_FLAG | 96);
    }

    #[test]
    fn test_constant_mode_windows() {
        let mut backend = HeadlessBackend::constant(1096);
        let probe = backend.probe();
        // 1000 usable bytes / 100 bytes per health bar = 10 per window
        let descriptor = BatchDescriptor::new(&mut backend, desc(BatchKind::HealthBar, 25)).unwrap();
        assert_eq!(descriptor.layout().instances_per_window, 10);
        assert_eq!(descriptor.layout().window_count, 3);
        assert_eq!(descriptor.window_stride_bytes(), 1096);
        assert_eq!(descriptor.commands_needed(21), 3);

        let state = probe.state();
        assert_eq!(state.live_batches(), RING_DEPTH * 3);
        let second = state.batch(descriptor.batch_id(1, 2)).unwrap();
        assert_eq!(second.byte_offset, 2 * 1096);
        assert_eq!(second.window_size, 1096);
    }

    #[test]
    fn test_window_smaller_than_instance_fails() {
        let mut backend = HeadlessBackend::constant(200);
        let err = BatchDescriptor::new(&mut backend, desc(BatchKind::Sprite, 10)).err();
        assert!(matches!(err, Some(RenderError::ZeroInstancesPerWindow { .. })));
    }

    #[test]
    fn test_attribute_limit_enforced() {
        let mut backend = HeadlessBackend::raw().with_max_attributes(2);
        let err = BatchDescriptor::new(&mut backend, desc(BatchKind::Vfx, 10)).err();
        assert!(matches!(err, Some(RenderError::TooManyAttributes { .. })));
    }

    #[test]
    fn test_empty_lock_unlock_advances_once() {
        let mut backend = HeadlessBackend::raw();
        let probe = backend.probe();
        let mut descriptor = BatchDescriptor::new(&mut backend, desc(BatchKind::Overlay, 8)).unwrap();
        let uploads_before = probe.state().upload_calls;

        let lease = descriptor.lock_for_write(0, true).unwrap();
        lease.unlock(&mut backend).unwrap();

        assert_eq!(descriptor.slot(), 1);
        assert_eq!(probe.state().upload_calls, uploads_before);
    }

    #[test]
    fn test_ring_wraps() {
        let mut backend = HeadlessBackend::raw();
        let mut descriptor = BatchDescriptor::new(&mut backend, desc(BatchKind::Overlay, 8)).unwrap();
        for _ in 0..RING_DEPTH {
            descriptor.lock_for_write(1, false).unwrap().unlock(&mut backend).unwrap();
        }
        assert_eq!(descriptor.slot(), 0);
    }

    #[test]
    fn test_dropped_lease_still_advances() {
        let mut backend = HeadlessBackend::raw();
        let mut descriptor = BatchDescriptor::new(&mut backend, desc(BatchKind::Overlay, 8)).unwrap();
        {
            let _lease = descriptor.lock_for_write(3, false).unwrap();
        }
        assert_eq!(descriptor.slot(), 1);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut backend = HeadlessBackend::raw();
        let mut descriptor = BatchDescriptor::new(&mut backend, desc(BatchKind::Overlay, 8)).unwrap();
        let err = descriptor.lock_for_write(9, false).err();
        assert!(matches!(
            err,
            Some(RenderError::CapacityExceeded {
                requested: 9,
                capacity: 8,
                ..
            })
        ));
        assert_eq!(descriptor.slot(), 0);
    }

    #[test]
    fn test_unlock_uploads_written_data() {
        let mut backend = HeadlessBackend::raw();
        let probe = backend.probe();
        let mut descriptor = BatchDescriptor::new(&mut backend, desc(BatchKind::HealthBar, 4)).unwrap();
        let buffer = descriptor.buffer(0);
        let word = descriptor.addressing().word_of(AttributeKind::Health, 2).unwrap();

        let mut lease = descriptor.lock_for_write(3, false).unwrap();
        lease.writer().write_scalar(AttributeKind::Health, 2, 0.5);
        lease.unlock(&mut backend).unwrap();

        let state = probe.state();
        assert_eq!(state.buffer(buffer).unwrap()[word], 0.5);
        assert_eq!(state.buffer(buffer).unwrap()[0], 0.0);
    }

    #[test]
    fn test_emission_splits_windows_and_honors_mask() {
        let mut backend = HeadlessBackend::constant(96 + 4 * 96);
        let mut descriptor = BatchDescriptor::new(&mut backend, desc(BatchKind::Overlay, 12)).unwrap();
        assert_eq!(descriptor.layout().instances_per_window, 4);

        let mut plan = FrameDrawPlan::new(3, 10);
        let mut output = allocate_draw_output(&plan);
        let mut lease = descriptor.lock_for_write(10, true).unwrap();
        {
            let mut writer = lease.writer();
            for i in 0..10 {
                writer.set_visible(i, i % 3 != 0);
            }
        }
        lease.emit_draw_commands(&mut output, &mut plan).unwrap();

        let counts: Vec<u32> = output.draw_commands.iter().map(|c| c.visible_count).collect();
        // visible: 1,2 | 4,5,7 | 8
        assert_eq!(counts, vec![2, 3, 1]);
        assert_eq!(output.instances_of(&output.draw_commands[0]), &[1, 2]);
        assert_eq!(output.instances_of(&output.draw_commands[1]), &[0, 1, 3]);
        assert_eq!(output.instances_of(&output.draw_commands[2]), &[0]);
        assert_eq!(output.draw_commands[2].visible_offset, 5);
        assert_eq!(output.draw_commands[1].sorting_position, 11);
        assert_eq!(output.draw_commands[1].batch, descriptor_batch(&lease, 1));
        assert_eq!(plan.command_cursor, 3);
        assert_eq!(plan.visible_cursor, 6);
        lease.unlock(&mut backend).unwrap();
    }

    fn descriptor_batch(lease: &WriteLease<'_>, window: usize) -> BatchId {
        lease.descriptor.batch_id(lease.descriptor.slot, window)
    }

    #[test]
    fn test_emission_overflow_detected() {
        let mut backend = HeadlessBackend::raw();
        let mut descriptor = BatchDescriptor::new(&mut backend, desc(BatchKind::Overlay, 8)).unwrap();
        let mut plan = FrameDrawPlan::new(1, 2);
        let mut output = allocate_draw_output(&plan);
        let lease = descriptor.lock_for_write(3, false).unwrap();
        let err = lease.emit_draw_commands(&mut output, &mut plan).err();
        assert!(matches!(
            err,
            Some(RenderError::DrawPlanOverflow {
                what: "visible instances",
                ..
            })
        ));
        lease.unlock(&mut backend).unwrap();
    }
}
