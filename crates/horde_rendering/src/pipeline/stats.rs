//! Rendering statistics.

/// Counters of the last culling call, plus a running frame count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Camera frames that produced output.
    pub frames_rendered: u64,
    /// Draw commands emitted last frame.
    pub draw_commands: u32,
    /// Visible instances emitted last frame.
    pub visible_instances: u32,
    /// Profiles skipped last frame for lack of a descriptor.
    pub profiles_skipped: u32,
    /// Fill jobs dispatched last frame.
    pub fill_jobs: u32,
}

impl RenderStats {
    /// Clears the per-frame counters, keeping the frame count.
    pub fn begin_frame(&mut self) {
        *self = Self {
            frames_rendered: self.frames_rendered,
            ..Self::default()
        };
    }

    /// Average visible instances per draw command.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn instances_per_command(&self) -> f32 {
        if self.draw_commands > 0 {
            self.visible_instances as f32 / self.draw_commands as f32
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_frame_keeps_count() {
        let mut stats = RenderStats {
            frames_rendered: 3,
            draw_commands: 5,
            visible_instances: 20,
            profiles_skipped: 1,
            fill_jobs: 9,
        };
        assert!((stats.instances_per_command() - 4.0).abs() < f32::EPSILON);
        stats.begin_frame();
        assert_eq!(stats.frames_rendered, 3);
        assert_eq!(stats.draw_commands, 0);
        assert_eq!(stats.instances_per_command(), 0.0);
    }
}
