//! Entity store seams consumed by the renderer.

use horde_core::{Animation, Creep, Position, ProfileId, Query, StoredComponent};

/// Read access to filtered entity state.
///
/// Results of `count` and `fetch` for the same query must agree, and `fetch`
/// must return components in one stable order for every `C`, so arrays
/// fetched separately stay aligned per entity.
pub trait EntitySource {
    /// Number of entities matching `query`.
    fn count(&self, query: &Query) -> usize;

    /// Snapshot of `C` for every entity matching `query`.
    fn fetch<C: StoredComponent>(&self, query: &Query) -> Vec<C>;

    /// Shared profiles currently in use. Order and repeats are not significant.
    fn shared_profiles(&self) -> Vec<ProfileId>;
}

/// Render state to attach to a newly spawned creep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Promotion {
    /// Shared render profile partition.
    pub profile: ProfileId,
    /// Initial animation state.
    pub animation: Animation,
}

/// Write access used to promote spawned creeps into renderable ones.
pub trait EntityPromoter {
    /// Calls `f` for every entity matching `query` and applies the promotions
    /// it returns. Returns how many entities were promoted.
    fn for_each_new_entity<F>(&mut self, query: &Query, f: F) -> usize
    where
        F: FnMut(&Position, &Creep) -> Option<Promotion>;
}
