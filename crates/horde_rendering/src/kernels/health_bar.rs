//! Health bar kernel.

use glam::Vec3;
use horde_core::{flag, Creep, Position};

use super::math::{trs, InstanceTransform};
use crate::instancing::{AttributeKind, InstanceWriter};
use crate::profile::SharedRenderProfile;

/// Fixed bar thickness.
pub const HEALTH_BAR_HEIGHT: f32 = 0.07;

/// Transform and fill fraction of one visible bar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HealthBarInstance {
    /// Transform pair.
    pub transform: InstanceTransform,
    /// `hp / max_hp`.
    pub health: f32,
}

/// Bar of one creep, or `None` at full health or once escaped.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn health_bar_instance(
    position: &Position,
    creep: &Creep,
    profile: &SharedRenderProfile,
) -> Option<HealthBarInstance> {
    if creep.hp == creep.max_hp || flag(creep.escaped) {
        return None;
    }
    let translation = Vec3::new(
        position.position[0],
        position.position[1] + profile.hp_bar_offset,
        0.0,
    );
    let scale = Vec3::new(profile.hp_bar_width, HEALTH_BAR_HEIGHT, 1.0);
    Some(HealthBarInstance {
        transform: InstanceTransform::from_matrix(&trs(translation, 0.0, scale)),
        health: creep.hp / creep.max_hp,
    })
}

/// Fills `writer`, whose range starts at `start` within the shared bar buffer.
///
/// Snapshot index `i` maps to buffer index `start + i`.
pub fn fill_health_bars(
    writer: &mut InstanceWriter<'_>,
    start: usize,
    positions: &[Position],
    creeps: &[Creep],
    profile: &SharedRenderProfile,
) {
    for index in writer.range() {
        let local = index - start;
        match health_bar_instance(&positions[local], &creeps[local], profile) {
            Some(bar) => {
                writer.set_visible(index, true);
                bar.transform.write(writer, index);
                writer.write_scalar(AttributeKind::Health, index, bar.health);
            }
            None => writer.set_visible(index, false),
        }
    }
}
