//! Transform math shared by the fill kernels.
//!
//! Matrices are built with `glam` and packed as four columns of `xyz`
//! (12 floats), the layout shaders read for `ObjectToWorld`/`WorldToObject`.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use crate::instancing::{AttributeKind, InstanceWriter};

/// Axis every sprite faces at zero rotation.
pub const REFERENCE_AXIS: Vec2 = Vec2::Y;

/// Signed angle in radians rotating `from` onto `to`, positive counter-clockwise.
#[inline]
#[must_use]
pub fn signed_angle(from: Vec2, to: Vec2) -> f32 {
    from.perp_dot(to).atan2(from.dot(to))
}

/// Scale vector `(s * fs.x, s * fs.y, s)`.
#[inline]
#[must_use]
pub fn frame_scale(scale: f32, frame: [f32; 2]) -> Vec3 {
    Vec3::new(scale * frame[0], scale * frame[1], scale)
}

/// Translation, rotation about Z, then scale.
#[inline]
#[must_use]
pub fn trs(translation: Vec3, angle: f32, scale: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, Quat::from_rotation_z(angle), translation)
}

/// Drops the projective row of an affine matrix.
#[inline]
#[must_use]
pub fn pack(matrix: &Mat4) -> [f32; 12] {
    let c = matrix.to_cols_array();
    [
        c[0], c[1], c[2], c[4], c[5], c[6], c[8], c[9], c[10], c[12], c[13], c[14],
    ]
}

/// Restores an affine matrix from its packed form.
#[inline]
#[must_use]
pub fn unpack(packed: &[f32; 12]) -> Mat4 {
    let p = packed;
    Mat4::from_cols(
        Vec4::new(p[0], p[1], p[2], 0.0),
        Vec4::new(p[3], p[4], p[5], 0.0),
        Vec4::new(p[6], p[7], p[8], 0.0),
        Vec4::new(p[9], p[10], p[11], 1.0),
    )
}

/// Forward and inverse transform of one instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstanceTransform {
    /// Packed object-to-world matrix.
    pub object_to_world: [f32; 12],
    /// Packed world-to-object matrix (general inverse).
    pub world_to_object: [f32; 12],
}

impl InstanceTransform {
    /// Packs `matrix` and its general 4x4 inverse.
    #[must_use]
    pub fn from_matrix(matrix: &Mat4) -> Self {
        Self {
            object_to_world: pack(matrix),
            world_to_object: pack(&matrix.inverse()),
        }
    }

    /// Writes both matrices for `index`.
    #[inline]
    pub fn write(&self, writer: &mut InstanceWriter<'_>, index: usize) {
        writer.write_matrix(AttributeKind::ObjectToWorld, index, &self.object_to_world);
        writer.write_matrix(AttributeKind::WorldToObject, index, &self.world_to_object);
    }
}
