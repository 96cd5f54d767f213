//! Creep sprite kernel.

use glam::{Vec2, Vec3};
use horde_core::{flag, Animation, Position};

use super::math::{frame_scale, signed_angle, trs, InstanceTransform, REFERENCE_AXIS};
use crate::instancing::{AttributeKind, InstanceWriter};
use crate::profile::SharedRenderProfile;

/// Everything written for one creep sprite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteInstance {
    /// Transform pair.
    pub transform: InstanceTransform,
    /// Tint.
    pub color: [f32; 4],
    /// Atlas rectangle of the current frame.
    pub uv: [f32; 4],
    /// Damage flash value.
    pub blink: f32,
    /// 1.0 when outlined.
    pub outline: f32,
}

/// Builds the sprite of one creep.
///
/// Dying creeps use the death table and no rotation; everyone else faces
/// their animation direction.
#[must_use]
pub fn sprite_instance(
    position: &Position,
    animation: &Animation,
    profile: &SharedRenderProfile,
) -> SpriteInstance {
    let (frame, angle) = if animation.is_dying() {
        (profile.death.frame(animation.frame_number), 0.0)
    } else {
        let direction = Vec2::from(animation.direction);
        (
            profile.run.frame(animation.frame_number),
            signed_angle(REFERENCE_AXIS, direction),
        )
    };

    let translation = Vec3::new(position.position[0], position.position[1], 0.0);
    let matrix = trs(translation, angle, frame_scale(profile.scale, frame.scale));

    SpriteInstance {
        transform: InstanceTransform::from_matrix(&matrix),
        color: animation.color,
        uv: frame.uv,
        blink: if flag(animation.damage_taken) {
            0.0
        } else {
            animation.damage_timer
        },
        outline: if flag(animation.outline) { 1.0 } else { 0.0 },
    }
}

/// Fills every instance of `writer` from the aligned creep snapshot.
pub fn fill_sprites(
    writer: &mut InstanceWriter<'_>,
    positions: &[Position],
    animations: &[Animation],
    profile: &SharedRenderProfile,
) {
    for index in writer.range() {
        let sprite = sprite_instance(&positions[index], &animations[index], profile);
        sprite.transform.write(writer, index);
        writer.write_vec4(AttributeKind::Color, index, sprite.color);
        writer.write_vec4(AttributeKind::UvRect, index, sprite.uv);
        writer.write_scalar(AttributeKind::Blink, index, sprite.blink);
        writer.write_scalar(AttributeKind::Outline, index, sprite.outline);
    }
}
