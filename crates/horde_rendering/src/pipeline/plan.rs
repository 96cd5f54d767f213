//! Per-frame draw plan.

/// Sizes and write cursors of one culling call's output.
///
/// Built from the counts gathered before anything is locked; emission
/// advances the cursors and must never pass the totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameDrawPlan {
    /// Draw commands allocated.
    pub total_commands: usize,
    /// Visible-instance slots allocated.
    pub total_visible: usize,
    /// Next draw command to write.
    pub command_cursor: usize,
    /// Next visible-instance slot to write.
    pub visible_cursor: usize,
}

impl FrameDrawPlan {
    /// Creates a plan with both cursors at zero.
    #[inline]
    #[must_use]
    pub const fn new(total_commands: usize, total_visible: usize) -> Self {
        Self {
            total_commands,
            total_visible,
            command_cursor: 0,
            visible_cursor: 0,
        }
    }

    /// Returns `true` once every planned command has been written.
    #[inline]
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.command_cursor == self.total_commands
    }
}
