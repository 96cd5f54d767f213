//! Status-effect overlay kernel (stun, warning, fear).

use glam::Vec3;
use horde_core::{flag, Animation, Fear, Movable, Position, Stun};
use serde::{Deserialize, Serialize};

use super::math::{trs, InstanceTransform};
use super::CreepSnapshot;
use crate::instancing::InstanceWriter;
use crate::profile::SharedRenderProfile;

/// Placement of one overlay kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebuffStyle {
    /// Quad scale.
    pub scale: [f32; 3],
    /// Added to the profile's health bar offset.
    pub vertical_offset: f32,
}

impl DebuffStyle {
    fn transform(&self, position: &Position, hp_bar_offset: f32) -> InstanceTransform {
        let translation = Vec3::new(
            position.position[0],
            position.position[1] + hp_bar_offset + self.vertical_offset,
            0.0,
        );
        InstanceTransform::from_matrix(&trs(translation, 0.0, Vec3::from(self.scale)))
    }
}

/// Styles of the three overlays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebuffStyles {
    /// Stun icon.
    pub stun: DebuffStyle,
    /// "Not heading in" warning.
    pub warning: DebuffStyle,
    /// Fear icon.
    pub fear: DebuffStyle,
}

impl Default for DebuffStyles {
    fn default() -> Self {
        Self {
            stun: DebuffStyle {
                scale: [0.6, 0.519, 1.0],
                vertical_offset: 0.3,
            },
            warning: DebuffStyle {
                scale: [0.6, 0.5538, 1.0],
                vertical_offset: 0.4,
            },
            fear: DebuffStyle {
                scale: [0.474, 0.5, 1.0],
                vertical_offset: 0.3,
            },
        }
    }
}

/// Which overlays a creep shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebuffVisibility {
    /// Stun icon shown.
    pub stun: bool,
    /// Warning shown.
    pub warning: bool,
    /// Fear icon shown.
    pub fear: bool,
}

/// Decides overlay visibility. A stun hides the warning; dying creeps show nothing.
#[must_use]
pub fn debuff_visibility(
    animation: &Animation,
    movable: &Movable,
    stun: &Stun,
    fear: &Fear,
) -> DebuffVisibility {
    if animation.is_dying() {
        return DebuffVisibility::default();
    }
    let stunned = stun.time > 0.0;
    DebuffVisibility {
        stun: stunned,
        warning: !stunned && !flag(movable.going_in),
        fear: fear.time > 0.0,
    }
}

/// The three overlay writers of one instance range, split in lockstep.
pub struct DebuffWriters<'a> {
    /// Stun buffer writer.
    pub stun: InstanceWriter<'a>,
    /// Warning buffer writer.
    pub warning: InstanceWriter<'a>,
    /// Fear buffer writer.
    pub fear: InstanceWriter<'a>,
}

impl<'a> DebuffWriters<'a> {
    /// Splits all three writers at `mid`.
    #[must_use]
    pub fn split_at(self, mid: usize) -> (Self, Self) {
        let (stun_l, stun_r) = self.stun.split_at(mid);
        let (warning_l, warning_r) = self.warning.split_at(mid);
        let (fear_l, fear_r) = self.fear.split_at(mid);
        (
            Self {
                stun: stun_l,
                warning: warning_l,
                fear: fear_l,
            },
            Self {
                stun: stun_r,
                warning: warning_r,
                fear: fear_r,
            },
        )
    }

    /// Splits into consecutive groups of at most `size` instances.
    #[must_use]
    pub fn chunks(self, size: usize) -> Vec<Self> {
        let stun = self.stun.chunks(size);
        let warning = self.warning.chunks(size);
        let fear = self.fear.chunks(size);
        stun.into_iter()
            .zip(warning)
            .zip(fear)
            .map(|((stun, warning), fear)| Self {
                stun,
                warning,
                fear,
            })
            .collect()
    }
}

/// Fills the overlays of one profile's creeps, which start at `start` in the
/// shared overlay buffers. Every mask bit in range is written.
pub fn fill_debuffs(
    writers: &mut DebuffWriters<'_>,
    start: usize,
    snapshot: &CreepSnapshot,
    profile: &SharedRenderProfile,
    styles: &DebuffStyles,
) {
    let offset = profile.hp_bar_offset;
    for index in writers.stun.range() {
        let local = index - start;
        let position = &snapshot.positions[local];
        let shown = debuff_visibility(
            &snapshot.animations[local],
            &snapshot.movables[local],
            &snapshot.stuns[local],
            &snapshot.fears[local],
        );

        writers.stun.set_visible(index, shown.stun);
        if shown.stun {
            styles.stun.transform(position, offset).write(&mut writers.stun, index);
        }
        writers.warning.set_visible(index, shown.warning);
        if shown.warning {
            styles.warning.transform(position, offset).write(&mut writers.warning, index);
        }
        writers.fear.set_visible(index, shown.fear);
        if shown.fear {
            styles.fear.transform(position, offset).write(&mut writers.fear, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::math::unpack;
    use horde_core::AnimationState;

    fn dying() -> Animation {
        Animation {
            state: AnimationState::Death as u32,
            ..Animation::default()
        }
    }

    #[test]
    fn test_death_hides_everything() {
        let shown = debuff_visibility(
            &dying(),
            &Movable { going_in: 0 },
            &Stun { time: 2.0 },
            &Fear { time: 2.0 },
        );
        assert_eq!(shown, DebuffVisibility::default());
    }

    #[test]
    fn test_stun_suppresses_warning() {
        let shown = debuff_visibility(
            &Animation::default(),
            &Movable { going_in: 0 },
            &Stun { time: 0.5 },
            &Fear { time: 0.0 },
        );
        assert!(shown.stun);
        assert!(!shown.warning);
        assert!(!shown.fear);
    }

    #[test]
    fn test_warning_when_not_going_in() {
        let animation = Animation::default();
        let idle = Stun { time: 0.0 };
        let fear = Fear { time: 1.0 };
        let shown = debuff_visibility(&animation, &Movable { going_in: 0 }, &idle, &fear);
        assert!(shown.warning && shown.fear && !shown.stun);

        let shown = debuff_visibility(&animation, &Movable { going_in: 1 }, &idle, &fear);
        assert!(!shown.warning);
    }

    #[test]
    fn test_style_offsets_from_health_bar() {
        let styles = DebuffStyles::default();
        let position = Position::new([1.0, 1.0], [0.0, 1.0]);
        let m = unpack(&styles.warning.transform(&position, 0.5).object_to_world);
        assert!((m.w_axis.y - 1.9).abs() < 1e-6);
        assert!((m.y_axis.y - 0.5538).abs() < 1e-6);
    }
}
