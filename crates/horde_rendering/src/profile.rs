//! Shared render profiles and animation tables.
//!
//! Built once from [`RenderConfig`](crate::config::RenderConfig) and never
//! mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// One sprite animation frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationFrame {
    /// Atlas rectangle (`x, y, w, h`).
    pub uv: [f32; 4],
    /// Offset from the entity origin.
    #[serde(default)]
    pub position_offset: [f32; 2],
    /// Per-frame scale factor (`x, y`).
    #[serde(default = "unit_scale")]
    pub scale: [f32; 2],
}

const fn unit_scale() -> [f32; 2] {
    [1.0, 1.0]
}

/// Ordered, non-empty frame sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationTable {
    frames: Vec<AnimationFrame>,
}

impl AnimationTable {
    /// Wraps a frame list.
    ///
    /// # Errors
    ///
    /// [`RenderError::EmptyAnimationTable`] for an empty list.
    pub fn new(name: &str, frames: Vec<AnimationFrame>) -> RenderResult<Self> {
        if frames.is_empty() {
            return Err(RenderError::EmptyAnimationTable(name.to_owned()));
        }
        Ok(Self { frames })
    }

    /// Frame `index`, clamped to the last frame.
    #[inline]
    #[must_use]
    pub fn frame(&self, index: u32) -> &AnimationFrame {
        let last = self.frames.len() - 1;
        &self.frames[(index as usize).min(last)]
    }

    /// Number of frames.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn len(&self) -> u32 {
        self.frames.len() as u32
    }

    /// Always `false`; tables are validated non-empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Static visual parameters shared by every creep of one kind.
#[derive(Clone, Debug, PartialEq)]
pub struct SharedRenderProfile {
    /// Creep kind this profile renders.
    pub kind: u32,
    /// Base sprite scale.
    pub scale: f32,
    /// Tint applied by gameplay while dying.
    pub death_color: [f32; 4],
    /// Vertical offset of the health bar above the creep.
    pub hp_bar_offset: f32,
    /// Health bar width.
    pub hp_bar_width: f32,
    /// Seconds per run frame.
    pub time_between_run_frames: f32,
    /// Seconds per death frame.
    pub time_between_die_frames: f32,
    /// Run cycle.
    pub run: AnimationTable,
    /// Death sequence.
    pub death: AnimationTable,
}

impl SharedRenderProfile {
    /// Frames in the run cycle.
    #[inline]
    #[must_use]
    pub fn run_frames(&self) -> u32 {
        self.run.len()
    }

    /// Frames in the death sequence.
    #[inline]
    #[must_use]
    pub fn die_frames(&self) -> u32 {
        self.death.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(u: f32) -> AnimationFrame {
        AnimationFrame {
            uv: [u, 0.0, 0.1, 0.1],
            position_offset: [0.0, 0.0],
            scale: [1.0, 1.0],
        }
    }

    #[test]
    fn test_frame_lookup_clamps() {
        let table = AnimationTable::new("run", vec![frame(0.0), frame(0.1), frame(0.2)]).unwrap();
        assert_eq!(table.frame(1).uv[0], 0.1);
        assert_eq!(table.frame(99).uv[0], 0.2);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(matches!(
            AnimationTable::new("death", Vec::new()),
            Err(RenderError::EmptyAnimationTable(name)) if name == "death"
        ));
    }
}
