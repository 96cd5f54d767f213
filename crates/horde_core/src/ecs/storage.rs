//! # Component Storage
//!
//! One dense, pre-allocated column per component type, indexed by entity slot.

use super::component::Component;

/// Dense column of one component type.
///
/// Every slot exists from creation; whether an entity actually carries the
/// component is decided by its mask, not by the column.
pub struct ComponentStorage<C: Component> {
    data: Box<[C]>,
}

impl<C: Component> ComponentStorage<C> {
    /// Creates a column with `capacity` default slots.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        Self {
            data: vec![C::default(); capacity].into_boxed_slice(),
        }
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Reads a slot.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&C> {
        self.data.get(index)
    }

    /// Mutable access to a slot.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut C> {
        self.data.get_mut(index)
    }

    /// Overwrites a slot. Returns `false` when out of bounds.
    #[inline]
    pub fn set(&mut self, index: usize, component: C) -> bool {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = component;
            true
        } else {
            false
        }
    }

    /// Resets a slot to the default value.
    #[inline]
    pub fn reset(&mut self, index: usize) {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = C::default();
        }
    }

    /// Copies the given slots, in order, into a fresh snapshot.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    #[must_use]
    pub fn gather(&self, indices: &[u32]) -> Vec<C> {
        indices.iter().map(|&i| self.data[i as usize]).collect()
    }

    /// Whole column.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[C] {
        &self.data
    }
}
