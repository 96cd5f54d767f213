//! Muzzle flash and impact kernels.
//!
//! Both read one shared frame list per atlas. Each weapon kind owns two
//! contiguous frame ranges, the plain one at `weapon` and the enhanced one at
//! `weapon + weapon_kinds`.

use glam::{Vec2, Vec3};
use horde_core::{flag, VfxEvent};
use serde::{Deserialize, Serialize};

use super::math::{frame_scale, signed_angle, trs, InstanceTransform, REFERENCE_AXIS};
use crate::error::{RenderError, RenderResult};
use crate::instancing::{AttributeKind, InstanceWriter};

/// One VFX animation frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VfxFrame {
    /// Atlas rectangle.
    pub uv: [f32; 4],
    /// Offset along (direction, perpendicular), before the scale modifier.
    #[serde(default)]
    pub position_offset: [f32; 2],
    /// Per-frame quad scale.
    #[serde(default = "unit_scale")]
    pub scale: [f32; 2],
    /// Uniform scale applied to offset and quad.
    #[serde(default = "unit_modifier")]
    pub scale_modifier: f32,
}

const fn unit_scale() -> [f32; 2] {
    [1.0, 1.0]
}

const fn unit_modifier() -> f32 {
    1.0
}

/// A contiguous run of frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VfxRange {
    /// First frame.
    pub start: u32,
    /// Number of frames.
    pub len: u32,
}

/// Frames and per-weapon ranges of one VFX family.
#[derive(Clone, Debug, PartialEq)]
pub struct VfxAtlas {
    frames: Vec<VfxFrame>,
    ranges: Vec<VfxRange>,
    weapon_kinds: u32,
}

impl VfxAtlas {
    /// Validates and wraps an atlas.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`] unless there are exactly two non-empty
    /// ranges per weapon kind, all inside the frame list.
    pub fn new(
        name: &str,
        frames: Vec<VfxFrame>,
        ranges: Vec<VfxRange>,
        weapon_kinds: u32,
    ) -> RenderResult<Self> {
        if weapon_kinds == 0 || ranges.len() != 2 * weapon_kinds as usize {
            return Err(RenderError::InvalidConfig(format!(
                "{name}: expected {} ranges for {weapon_kinds} weapon kinds, got {}",
                2 * weapon_kinds,
                ranges.len()
            )));
        }
        for (i, range) in ranges.iter().enumerate() {
            let end = range.start as usize + range.len as usize;
            if range.len == 0 || end > frames.len() {
                return Err(RenderError::InvalidConfig(format!(
                    "{name}: range {i} ({}..{end}) outside {} frames",
                    range.start,
                    frames.len()
                )));
            }
        }
        Ok(Self {
            frames,
            ranges,
            weapon_kinds,
        })
    }

    /// Frame shown for `event`. Out-of-range weapons wrap, frames clamp.
    #[must_use]
    pub fn frame_for(&self, event: &VfxEvent) -> &VfxFrame {
        let weapon = event.weapon % self.weapon_kinds;
        let slot = weapon + if flag(event.enhanced) { self.weapon_kinds } else { 0 };
        let range = self.ranges[slot as usize];
        let frame = range.start + event.current_frame.min(range.len - 1);
        &self.frames[frame as usize]
    }

    /// Number of weapon kinds.
    #[must_use]
    pub const fn weapon_kinds(&self) -> u32 {
        self.weapon_kinds
    }
}

/// Transform and UV of one effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VfxInstance {
    /// Transform pair.
    pub transform: InstanceTransform,
    /// Atlas rectangle.
    pub uv: [f32; 4],
}

/// Builds one effect. With `area_scaled` a non-zero `aoe_scale` enlarges the
/// quad (impacts); the placement offset is never area-scaled.
#[must_use]
pub fn vfx_instance(event: &VfxEvent, atlas: &VfxAtlas, area_scaled: bool) -> VfxInstance {
    let frame = atlas.frame_for(event);
    let direction = Vec2::from(event.direction);
    let side = direction.perp();
    let offset = Vec2::from(frame.position_offset) * frame.scale_modifier;
    let position = Vec2::from(event.position) + offset.x * direction + offset.y * side;

    let mut modifier = frame.scale_modifier;
    if area_scaled && event.aoe_scale != 0.0 {
        modifier *= event.aoe_scale;
    }

    let matrix = trs(
        position.extend(0.0),
        signed_angle(REFERENCE_AXIS, side),
        frame_scale(modifier, frame.scale),
    );
    VfxInstance {
        transform: InstanceTransform::from_matrix(&matrix),
        uv: frame.uv,
    }
}

/// Fills every instance of `writer`.
pub fn fill_vfx(
    writer: &mut InstanceWriter<'_>,
    events: &[VfxEvent],
    atlas: &VfxAtlas,
    area_scaled: bool,
) {
    for index in writer.range() {
        let vfx = vfx_instance(&events[index], atlas, area_scaled);
        vfx.transform.write(writer, index);
        writer.write_vec4(AttributeKind::UvRect, index, vfx.uv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::math::unpack;

    fn frame(u: f32, offset: [f32; 2], modifier: f32) -> VfxFrame {
        VfxFrame {
            uv: [u, 0.0, 0.25, 0.25],
            position_offset: offset,
            scale: [2.0, 1.0],
            scale_modifier: modifier,
        }
    }

    fn atlas() -> VfxAtlas {
        let frames = vec![
            frame(0.0, [1.0, 0.0], 1.0),
            frame(0.25, [1.0, 0.0], 1.0),
            frame(0.5, [0.0, 1.0], 2.0),
            frame(0.75, [0.0, 0.0], 1.0),
        ];
        let ranges = vec![
            VfxRange { start: 0, len: 2 },
            VfxRange { start: 2, len: 1 },
            VfxRange { start: 3, len: 1 },
            VfxRange { start: 3, len: 1 },
        ];
        VfxAtlas::new("muzzle", frames, ranges, 2).unwrap()
    }

    fn event(weapon: u32, enhanced: u32, current_frame: u32) -> VfxEvent {
        VfxEvent {
            position: [10.0, 0.0],
            direction: [1.0, 0.0],
            weapon,
            enhanced,
            current_frame,
            aoe_scale: 0.0,
        }
    }

    #[test]
    fn test_frame_lookup() {
        let atlas = atlas();
        assert_eq!(atlas.frame_for(&event(0, 0, 1)).uv[0], 0.25);
        assert_eq!(atlas.frame_for(&event(0, 0, 9)).uv[0], 0.25);
        assert_eq!(atlas.frame_for(&event(1, 0, 0)).uv[0], 0.5);
        assert_eq!(atlas.frame_for(&event(0, 1, 0)).uv[0], 0.75);
    }

    #[test]
    fn test_offset_follows_direction() {
        let atlas = atlas();
        let vfx = vfx_instance(&event(0, 0, 0), &atlas, false);
        let m = unpack(&vfx.transform.object_to_world);
        assert!((m.w_axis.x - 11.0).abs() < 1e-5);
        assert!(m.w_axis.y.abs() < 1e-5);

        // perpendicular offset, doubled by the modifier
        let vfx = vfx_instance(&event(1, 0, 0), &atlas, false);
        let m = unpack(&vfx.transform.object_to_world);
        assert!((m.w_axis.x - 10.0).abs() < 1e-5);
        assert!((m.w_axis.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_quad_faces_perpendicular() {
        let atlas = atlas();
        let vfx = vfx_instance(&event(0, 0, 0), &atlas, false);
        let m = unpack(&vfx.transform.object_to_world);
        let up = m.transform_vector3(Vec3::Y).normalize();
        assert!((up - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_area_scale_only_for_impacts() {
        let atlas = atlas();
        let mut impact = event(0, 0, 0);
        impact.aoe_scale = 3.0;

        let plain = unpack(&vfx_instance(&impact, &atlas, false).transform.object_to_world);
        let scaled = unpack(&vfx_instance(&impact, &atlas, true).transform.object_to_world);
        assert!((plain.z_axis.z - 1.0).abs() < 1e-5);
        assert!((scaled.z_axis.z - 3.0).abs() < 1e-5);
        assert!((scaled.w_axis.x - plain.w_axis.x).abs() < 1e-5);

        impact.aoe_scale = 0.0;
        let zero = unpack(&vfx_instance(&impact, &atlas, true).transform.object_to_world);
        assert!((zero.z_axis.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_atlas_validation() {
        let frames = vec![frame(0.0, [0.0, 0.0], 1.0)];
        let bad_count = VfxAtlas::new("impact", frames.clone(), vec![VfxRange { start: 0, len: 1 }], 1);
        assert!(matches!(bad_count, Err(RenderError::InvalidConfig(_))));

        let out_of_bounds = VfxAtlas::new(
            "impact",
            frames,
            vec![VfxRange { start: 0, len: 1 }, VfxRange { start: 0, len: 2 }],
            1,
        );
        assert!(matches!(out_of_bounds, Err(RenderError::InvalidConfig(_))));
    }
}
