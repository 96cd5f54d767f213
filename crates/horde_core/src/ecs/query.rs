//! # Queries
//!
//! A [`Query`] is an immutable filter value: required components, excluded
//! components and an optional shared-profile partition. Narrowing a query to
//! one profile produces a new value, so there is no filter state to reset.

use super::component::Component;
use super::entity::{Entity, ProfileId};

/// Component filter over world entities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Query {
    all: u64,
    none: u64,
    profile: Option<ProfileId>,
}

impl Query {
    /// Matches every alive entity.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            all: 0,
            none: 0,
            profile: None,
        }
    }

    /// Requires component `C`.
    #[inline]
    #[must_use]
    pub const fn with<C: Component>(mut self) -> Self {
        self.all |= 1 << C::ID;
        self
    }

    /// Excludes entities carrying component `C`.
    #[inline]
    #[must_use]
    pub const fn without<C: Component>(mut self) -> Self {
        self.none |= 1 << C::ID;
        self
    }

    /// Restricts the query to one shared render profile.
    #[inline]
    #[must_use]
    pub const fn with_profile(mut self, profile: ProfileId) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Profile partition, if any.
    #[inline]
    #[must_use]
    pub const fn profile(&self) -> Option<ProfileId> {
        self.profile
    }

    /// Returns `true` when `C` is required by this query.
    #[inline]
    #[must_use]
    pub const fn requires<C: Component>(&self) -> bool {
        self.all & (1 << C::ID) != 0
    }

    /// Tests one entity slot.
    #[inline]
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        if !entity.alive {
            return false;
        }
        if entity.component_mask & self.all != self.all {
            return false;
        }
        if entity.component_mask & self.none != 0 {
            return false;
        }
        match self.profile {
            Some(profile) => entity.profile == Some(profile),
            None => true,
        }
    }
}
