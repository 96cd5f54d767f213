//! # Component System
//!
//! Components are pure data containers with no behavior.
//! They must be `Pod` so columns can be bulk-copied into render snapshots.
//!
//! Flags are stored as `u32` (0 / 1) instead of `bool` so every component
//! stays free of padding and invalid bit patterns.

use bytemuck::{Pod, Zeroable};

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Copy` + `Pod`: bitwise copyable, no heap data
/// - `Default`: columns are pre-filled at world creation
/// - `Send + Sync`: snapshots are read from fill jobs on the worker pool
pub trait Component: Copy + Pod + Zeroable + Default + Send + Sync + 'static {
    /// Unique identifier for this component type (0-63).
    ///
    /// Used as the bit index in the entity component mask.
    const ID: u8;
}

/// Converts a flag field to `bool`.
#[inline]
#[must_use]
pub const fn flag(value: u32) -> bool {
    value != 0
}

/// World-space placement of a creep, plus its facing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Position {
    /// Position on the map plane.
    pub position: [f32; 2],
    /// Normalized movement direction.
    pub direction: [f32; 2],
}

impl Component for Position {
    const ID: u8 = 0;
}

impl Position {
    /// Creates a new position.
    #[inline]
    #[must_use]
    pub const fn new(position: [f32; 2], direction: [f32; 2]) -> Self {
        Self {
            position,
            direction,
        }
    }
}

/// Animation states a creep sprite can be in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AnimationState {
    /// Walking along the path.
    Run = 0,
    /// Playing the death animation.
    Death = 1,
}

impl AnimationState {
    /// Decodes a raw state value. Unknown values read as `Run`.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Death,
            _ => Self::Run,
        }
    }
}

/// Per-creep animation record, attached when a creep is promoted to
/// render-eligible.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Animation {
    /// Sprite tint (RGBA).
    pub color: [f32; 4],
    /// Facing used for the sprite rotation.
    pub direction: [f32; 2],
    /// Time accumulated on the current frame.
    pub animation_timer: f32,
    /// Remaining damage flash time.
    pub damage_timer: f32,
    /// Current frame index within the active table.
    pub frame_number: u32,
    /// Raw [`AnimationState`].
    pub state: u32,
    /// 1 while the creep is flashing from a fresh hit.
    pub damage_taken: u32,
    /// 1 when the sprite is drawn with an outline.
    pub outline: u32,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            color: [1.0; 4],
            direction: [0.0, 1.0],
            animation_timer: 0.0,
            damage_timer: 0.0,
            frame_number: 0,
            state: AnimationState::Run as u32,
            damage_taken: 0,
            outline: 0,
        }
    }
}

impl Component for Animation {
    const ID: u8 = 1;
}

impl Animation {
    /// Decoded animation state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> AnimationState {
        AnimationState::from_raw(self.state)
    }

    /// Returns `true` while the death animation plays.
    #[inline]
    #[must_use]
    pub const fn is_dying(&self) -> bool {
        matches!(self.state(), AnimationState::Death)
    }
}

/// Gameplay stats the renderer reads for health bars and profile lookup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Creep {
    /// Current hit points.
    pub hp: f32,
    /// Maximum hit points.
    pub max_hp: f32,
    /// Creep species; selects the shared render profile.
    pub kind: u32,
    /// Wave this creep was spawned in (0-based).
    pub wave_number: u32,
    /// 1 once the creep has left the map.
    pub escaped: u32,
}

impl Component for Creep {
    const ID: u8 = 2;
}

/// Movement state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Movable {
    /// 1 once the creep is committed to entering the base.
    pub going_in: u32,
}

impl Component for Movable {
    const ID: u8 = 3;
}

/// Stun debuff timer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Stun {
    /// Seconds left; active while positive.
    pub time: f32,
}

impl Component for Stun {
    const ID: u8 = 4;
}

/// Fear debuff timer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Fear {
    /// Seconds left; active while positive.
    pub time: f32,
}

impl Component for Fear {
    const ID: u8 = 5;
}

/// Marks a creep still playing its spawn sequence. Spawning creeps are not drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Spawning {
    /// Seconds until the creep becomes active.
    pub remaining: f32,
}

impl Component for Spawning {
    const ID: u8 = 6;
}

/// Shared payload of muzzle flashes and impacts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct VfxEvent {
    /// Spawn point.
    pub position: [f32; 2],
    /// Facing of the weapon or projectile.
    pub direction: [f32; 2],
    /// Weapon kind (0-based).
    pub weapon: u32,
    /// 1 for the enhanced variant of the weapon.
    pub enhanced: u32,
    /// Frame within the weapon's animation range.
    pub current_frame: u32,
    /// Area-of-effect multiplier; 0 means none.
    pub aoe_scale: f32,
}

/// A muzzle flash being played.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct MuzzleEvent {
    /// Event payload.
    pub event: VfxEvent,
}

impl Component for MuzzleEvent {
    const ID: u8 = 7;
}

/// A projectile impact being played.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ImpactEvent {
    /// Event payload.
    pub event: VfxEvent,
}

impl Component for ImpactEvent {
    const ID: u8 = 8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_sizes() {
        assert_eq!(std::mem::size_of::<Position>(), 16);
        assert_eq!(std::mem::size_of::<Animation>(), 48);
        assert_eq!(std::mem::size_of::<Creep>(), 20);
        assert_eq!(std::mem::size_of::<VfxEvent>(), 32);
    }

    #[test]
    fn test_animation_state_decoding() {
        let mut anim = Animation::default();
        assert!(!anim.is_dying());
        anim.state = AnimationState::Death as u32;
        assert!(anim.is_dying());
        assert_eq!(AnimationState::from_raw(42), AnimationState::Run);
    }

    #[test]
    fn test_component_ids_unique() {
        let ids = [
            Position::ID,
            Animation::ID,
            Creep::ID,
            Movable::ID,
            Stun::ID,
            Fear::ID,
            Spawning::ID,
            MuzzleEvent::ID,
            ImpactEvent::ID,
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
