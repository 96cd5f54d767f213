//! # Entity Management
//!
//! Entities are lightweight identifiers plus a slot record holding the
//! component bitmask and the shared render-profile partition.

/// Identifier of a shared render profile partition (one per creep kind).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProfileId(pub u32);

/// Unique identifier for an entity.
///
/// Lower 32 bits index the component columns, upper 32 bits hold the
/// generation used to reject stale ids after a slot is reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Null/invalid entity ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Packs an index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Column index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Slot generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns `true` for [`EntityId::NULL`].
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

/// One entity slot.
#[derive(Clone, Copy, Debug)]
pub struct Entity {
    /// Current id of the slot.
    pub id: EntityId,
    /// Bitmask of attached components (bit = [`Component::ID`](super::Component::ID)).
    pub component_mask: u64,
    /// Shared render profile, once the entity has been promoted.
    pub profile: Option<ProfileId>,
    /// Whether this slot is occupied.
    pub alive: bool,
}

impl Entity {
    /// Creates a live entity with no components.
    #[inline]
    #[must_use]
    pub const fn new(id: EntityId) -> Self {
        Self {
            id,
            component_mask: 0,
            profile: None,
            alive: true,
        }
    }

    /// Creates a dead slot.
    #[inline]
    #[must_use]
    pub const fn dead() -> Self {
        Self {
            id: EntityId::NULL,
            component_mask: 0,
            profile: None,
            alive: false,
        }
    }

    /// Checks if the entity carries a component.
    #[inline]
    #[must_use]
    pub const fn has_component(&self, component_id: u8) -> bool {
        (self.component_mask & (1 << component_id)) != 0
    }

    /// Sets a component bit.
    #[inline]
    pub fn add_component(&mut self, component_id: u8) {
        self.component_mask |= 1 << component_id;
    }

    /// Clears a component bit.
    #[inline]
    pub fn remove_component(&mut self, component_id: u8) {
        self.component_mask &= !(1 << component_id);
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::dead()
    }
}
