//! Per-instance fill kernels.
//!
//! Every kernel is a pure function from one entity's components to an
//! instance record, plus a `fill_*` loop that writes those records through an
//! [`InstanceWriter`](crate::instancing::InstanceWriter). Kernels never see
//! the buffer layout; the writer resolves attribute offsets.

pub mod debuff;
pub mod health_bar;
pub mod math;
pub mod sprite;
pub mod vfx;

use horde_core::{Animation, Creep, Fear, Movable, Position, Stun};

pub use debuff::{
    debuff_visibility, fill_debuffs, DebuffStyle, DebuffStyles, DebuffVisibility, DebuffWriters,
};
pub use health_bar::{fill_health_bars, health_bar_instance, HealthBarInstance, HEALTH_BAR_HEIGHT};
pub use math::InstanceTransform;
pub use sprite::{fill_sprites, sprite_instance, SpriteInstance};
pub use vfx::{fill_vfx, vfx_instance, VfxAtlas, VfxFrame, VfxInstance, VfxRange};

/// Aligned component arrays of one profile's visible creeps.
#[derive(Clone, Debug, Default)]
pub struct CreepSnapshot {
    /// Positions.
    pub positions: Vec<Position>,
    /// Animation state.
    pub animations: Vec<Animation>,
    /// Movement flags.
    pub movables: Vec<Movable>,
    /// Stun timers.
    pub stuns: Vec<Stun>,
    /// Fear timers.
    pub fears: Vec<Fear>,
}

impl CreepSnapshot {
    /// Number of creeps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` if there are no creeps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Aligned component arrays of one profile's health bar candidates.
#[derive(Clone, Debug, Default)]
pub struct HealthBarSnapshot {
    /// Positions.
    pub positions: Vec<Position>,
    /// Hit points.
    pub creeps: Vec<Creep>,
}

impl HealthBarSnapshot {
    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` if there are no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::profile::{AnimationFrame, AnimationTable, SharedRenderProfile};

    fn frames(count: usize, v: f32, scale: [f32; 2]) -> Vec<AnimationFrame> {
        (0..count)
            .map(|i| AnimationFrame {
                uv: [i as f32 * 0.1, v, 0.1, 0.1],
                position_offset: [0.0, 0.0],
                scale,
            })
            .collect()
    }

    pub(crate) fn test_profile(kind: u32) -> SharedRenderProfile {
        SharedRenderProfile {
            kind,
            scale: 1.5,
            death_color: [0.5, 0.5, 0.5, 1.0],
            hp_bar_offset: 0.6,
            hp_bar_width: 0.8,
            time_between_run_frames: 0.1,
            time_between_die_frames: 0.08,
            run: AnimationTable::new("run", frames(4, 0.0, [1.0, 1.2])).unwrap(),
            death: AnimationTable::new("death", frames(3, 0.5, [0.9, 0.9])).unwrap(),
        }
    }
}
