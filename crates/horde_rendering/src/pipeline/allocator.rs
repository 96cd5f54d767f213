//! Draw-command memory allocator.

use crate::instancing::{DrawCommand, DrawCommandOutput, DrawRange, ALL_LAYERS};

use super::plan::FrameDrawPlan;

/// Allocates output arrays of exactly the planned sizes.
///
/// A single draw range covers every command and renders into all layers. A
/// plan with no commands yields no range.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn allocate_draw_output(plan: &FrameDrawPlan) -> DrawCommandOutput {
    let draw_ranges = if plan.total_commands > 0 {
        vec![DrawRange {
            draw_command_begin: 0,
            draw_command_count: plan.total_commands as u32,
            rendering_layer_mask: ALL_LAYERS,
        }]
    } else {
        Vec::new()
    };
    DrawCommandOutput {
        draw_commands: vec![DrawCommand::default(); plan.total_commands],
        draw_ranges,
        visible_instances: vec![0; plan.total_visible],
        visible_written: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_sizes() {
        let output = allocate_draw_output(&FrameDrawPlan::new(7, 40));
        assert_eq!(output.draw_commands.len(), 7);
        assert_eq!(output.visible_instances.len(), 40);
        assert_eq!(
            output.draw_ranges,
            vec![DrawRange {
                draw_command_begin: 0,
                draw_command_count: 7,
                rendering_layer_mask: ALL_LAYERS,
            }]
        );
    }

    #[test]
    fn test_empty_plan() {
        let output = allocate_draw_output(&FrameDrawPlan::default());
        assert!(output.is_empty());
        assert!(output.draw_ranges.is_empty());
    }
}
