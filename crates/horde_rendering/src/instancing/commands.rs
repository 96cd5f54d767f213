//! Draw command output consumed by the frame renderer.

use crate::backend::{BatchId, MaterialId, MeshId};

/// Rendering layer mask matching every instance.
pub const ALL_LAYERS: u32 = 0xFFFF_FFFF;

/// Split-visibility mask covering every view split.
pub const ALL_SPLITS: u16 = 0xFF;

/// One draw call over one window of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawCommand {
    /// Batch (ring slot x window) to draw from.
    pub batch: BatchId,
    /// Material to draw with.
    pub material: MaterialId,
    /// Mesh to draw.
    pub mesh: MeshId,
    /// Always 0; batches carry a single submesh.
    pub submesh: u16,
    /// View splits this command is visible in.
    pub split_visibility_mask: u16,
    /// Command index plus the batch's sorting priority.
    pub sorting_position: i32,
    /// First entry in the visible-instance array.
    pub visible_offset: u32,
    /// Entries in the visible-instance array.
    pub visible_count: u32,
}

/// A contiguous run of draw commands sharing render state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawRange {
    /// First command of the range.
    pub draw_command_begin: u32,
    /// Commands in the range.
    pub draw_command_count: u32,
    /// Layers the range renders into.
    pub rendering_layer_mask: u32,
}

/// Output arrays of one culling call.
///
/// Arrays are allocated once at their exact planned size. Visible instances
/// are window-local instance indices; commands reference them by offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawCommandOutput {
    /// Draw commands, in emission order.
    pub draw_commands: Vec<DrawCommand>,
    /// Draw ranges (one spanning every command, or none).
    pub draw_ranges: Vec<DrawRange>,
    /// Visible-instance index array.
    pub visible_instances: Vec<u32>,
    /// Entries of `visible_instances` actually written.
    pub visible_written: usize,
}

impl DrawCommandOutput {
    /// Output of a frame with nothing to draw.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` when no commands were allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.draw_commands.is_empty()
    }

    /// Visible instances referenced by `command`.
    #[must_use]
    pub fn instances_of(&self, command: &DrawCommand) -> &[u32] {
        let start = command.visible_offset as usize;
        &self.visible_instances[start..start + command.visible_count as usize]
    }
}
