//! # ECS World
//!
//! The central container for creeps, their overlays and VFX events.
//! All columns are pre-allocated at creation time.

use super::component::{
    Animation, Component, Creep, Fear, ImpactEvent, Movable, MuzzleEvent, Position, Spawning,
    Stun,
};
use super::entity::{Entity, EntityId, ProfileId};
use super::query::Query;
use super::storage::ComponentStorage;

/// A component type that has a column in [`World`].
pub trait StoredComponent: Component {
    /// The column holding this component.
    fn column(world: &World) -> &ComponentStorage<Self>;
    /// Mutable column.
    fn column_mut(world: &mut World) -> &mut ComponentStorage<Self>;
}

macro_rules! stored_component {
    ($ty:ty, $field:ident) => {
        impl StoredComponent for $ty {
            #[inline]
            fn column(world: &World) -> &ComponentStorage<Self> {
                &world.$field
            }
            #[inline]
            fn column_mut(world: &mut World) -> &mut ComponentStorage<Self> {
                &mut world.$field
            }
        }
    };
}

/// The ECS World.
///
/// Query results are always produced in ascending slot order, so component
/// snapshots fetched with the same query line up index for index.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new(10_000);
/// let id = world.spawn();
/// world.insert(id, Position::new([0.0, 0.0], [0.0, 1.0]));
/// let positions: Vec<Position> = world.fetch(&Query::new().with::<Position>());
/// ```
pub struct World {
    entities: Box<[Entity]>,
    free_indices: Vec<u32>,
    alive_count: usize,

    positions: ComponentStorage<Position>,
    animations: ComponentStorage<Animation>,
    creeps: ComponentStorage<Creep>,
    movables: ComponentStorage<Movable>,
    stuns: ComponentStorage<Stun>,
    fears: ComponentStorage<Fear>,
    spawning: ComponentStorage<Spawning>,
    muzzles: ComponentStorage<MuzzleEvent>,
    impacts: ComponentStorage<ImpactEvent>,
}

stored_component!(Position, positions);
stored_component!(Animation, animations);
stored_component!(Creep, creeps);
stored_component!(Movable, movables);
stored_component!(Stun, stuns);
stored_component!(Fear, fears);
stored_component!(Spawning, spawning);
stored_component!(MuzzleEvent, muzzles);
stored_component!(ImpactEvent, impacts);

impl World {
    /// Creates a world with a fixed entity capacity.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or exceeds `u32::MAX`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(
            capacity <= u32::MAX as usize,
            "Capacity cannot exceed u32::MAX"
        );

        Self {
            entities: vec![Entity::dead(); capacity].into_boxed_slice(),
            free_indices: (0..capacity as u32).rev().collect(),
            alive_count: 0,
            positions: ComponentStorage::new(capacity),
            animations: ComponentStorage::new(capacity),
            creeps: ComponentStorage::new(capacity),
            movables: ComponentStorage::new(capacity),
            stuns: ComponentStorage::new(capacity),
            fears: ComponentStorage::new(capacity),
            spawning: ComponentStorage::new(capacity),
            muzzles: ComponentStorage::new(capacity),
            impacts: ComponentStorage::new(capacity),
        }
    }

    /// Maximum number of entities.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entities.len()
    }

    /// Number of alive entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Spawns an empty entity.
    ///
    /// Returns `EntityId::NULL` when the world is full.
    pub fn spawn(&mut self) -> EntityId {
        let Some(index) = self.free_indices.pop() else {
            return EntityId::NULL;
        };

        let entity = &mut self.entities[index as usize];
        let generation = entity.id.generation().wrapping_add(1);
        let id = EntityId::new(index, generation);
        *entity = Entity::new(id);
        self.alive_count += 1;
        id
    }

    /// Frees an entity slot. Returns `false` for dead or stale ids.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let idx = id.index() as usize;
        let entity = &mut self.entities[idx];
        entity.alive = false;
        entity.component_mask = 0;
        entity.profile = None;
        self.alive_count -= 1;
        self.free_indices.push(id.index());

        self.positions.reset(idx);
        self.animations.reset(idx);
        self.creeps.reset(idx);
        self.movables.reset(idx);
        self.stuns.reset(idx);
        self.fears.reset(idx);
        self.spawning.reset(idx);
        self.muzzles.reset(idx);
        self.impacts.reset(idx);
        true
    }

    /// Checks that `id` refers to a live entity of the current generation.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        if id.is_null() {
            return false;
        }
        self.entities
            .get(id.index() as usize)
            .is_some_and(|e| e.alive && e.id.generation() == id.generation())
    }

    /// Slot record of a live entity.
    #[inline]
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        if !self.is_alive(id) {
            return None;
        }
        Some(&self.entities[id.index() as usize])
    }

    /// Attaches (or overwrites) a component. Returns `false` for dead ids.
    pub fn insert<C: StoredComponent>(&mut self, id: EntityId, component: C) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let idx = id.index() as usize;
        C::column_mut(self).set(idx, component);
        self.entities[idx].add_component(C::ID);
        true
    }

    /// Detaches a component. Returns `false` if it was not attached.
    pub fn remove<C: StoredComponent>(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let idx = id.index() as usize;
        if !self.entities[idx].has_component(C::ID) {
            return false;
        }
        self.entities[idx].remove_component(C::ID);
        C::column_mut(self).reset(idx);
        true
    }

    /// Reads a component of a live entity.
    #[must_use]
    pub fn get<C: StoredComponent>(&self, id: EntityId) -> Option<&C> {
        let entity = self.entity(id)?;
        if !entity.has_component(C::ID) {
            return None;
        }
        C::column(self).get(id.index() as usize)
    }

    /// Mutable access to a component of a live entity.
    pub fn get_mut<C: StoredComponent>(&mut self, id: EntityId) -> Option<&mut C> {
        if !self.entity(id)?.has_component(C::ID) {
            return None;
        }
        C::column_mut(self).get_mut(id.index() as usize)
    }

    /// Assigns the shared render profile partition.
    pub fn set_profile(&mut self, id: EntityId, profile: ProfileId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.entities[id.index() as usize].profile = Some(profile);
        true
    }

    /// Number of entities matching a query.
    #[must_use]
    pub fn count(&self, query: &Query) -> usize {
        self.entities.iter().filter(|e| query.matches(e)).count()
    }

    /// Ids of matching entities, in slot order.
    #[must_use]
    pub fn matching(&self, query: &Query) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|e| query.matches(e))
            .map(|e| e.id)
            .collect()
    }

    /// Snapshot of component `C` for every matching entity, in slot order.
    ///
    /// Entities that match but do not carry `C` contribute a default value,
    /// so callers should include `C` in the query.
    #[must_use]
    pub fn fetch<C: StoredComponent>(&self, query: &Query) -> Vec<C> {
        let indices: Vec<u32> = self
            .entities
            .iter()
            .filter(|e| query.matches(e))
            .map(|e| e.id.index())
            .collect();
        C::column(self).gather(&indices)
    }

    /// Distinct profiles assigned to live entities, ascending.
    #[must_use]
    pub fn profiles(&self) -> Vec<ProfileId> {
        let mut profiles: Vec<ProfileId> = self
            .entities
            .iter()
            .filter(|e| e.alive)
            .filter_map(|e| e.profile)
            .collect();
        profiles.sort_unstable();
        profiles.dedup();
        profiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_creep(world: &mut World, kind: u32, x: f32) -> EntityId {
        let id = world.spawn();
        world.insert(id, Position::new([x, 0.0], [0.0, 1.0]));
        world.insert(
            id,
            Creep {
                hp: 10.0,
                max_hp: 10.0,
                kind,
                ..Creep::default()
            },
        );
        id
    }

    #[test]
    fn test_spawn_despawn_reuses_slot() {
        let mut world = World::new(4);
        let a = world.spawn();
        assert!(world.is_alive(a));
        assert!(world.despawn(a));
        assert!(!world.is_alive(a));
        assert!(!world.despawn(a));

        let b = world.spawn();
        assert_eq!(b.index(), a.index());
        assert_ne!(b.generation(), a.generation());
        assert_eq!(world.alive_count(), 1);
    }

    #[test]
    fn test_capacity_limit() {
        let mut world = World::new(2);
        assert!(!world.spawn().is_null());
        assert!(!world.spawn().is_null());
        assert!(world.spawn().is_null());
    }

    #[test]
    fn test_fetch_aligned_across_components() {
        let mut world = World::new(16);
        for i in 0..5 {
            spawn_creep(&mut world, i % 2, i as f32);
        }
        let q = Query::new().with::<Position>().with::<Creep>();
        let positions: Vec<Position> = world.fetch(&q);
        let creeps: Vec<Creep> = world.fetch(&q);
        assert_eq!(positions.len(), 5);
        assert_eq!(creeps.len(), 5);
        for (i, (p, c)) in positions.iter().zip(&creeps).enumerate() {
            assert_eq!(p.position[0], i as f32);
            assert_eq!(c.kind, (i as u32) % 2);
        }
    }

    #[test]
    fn test_profile_scoped_count() {
        let mut world = World::new(16);
        let ids: Vec<EntityId> = (0..6).map(|i| spawn_creep(&mut world, 0, i as f32)).collect();
        for (i, id) in ids.iter().enumerate() {
            world.set_profile(*id, ProfileId(if i < 4 { 3 } else { 1 }));
        }
        let q = Query::new().with::<Creep>();
        assert_eq!(world.count(&q), 6);
        assert_eq!(world.count(&q.with_profile(ProfileId(3))), 4);
        assert_eq!(world.count(&q.with_profile(ProfileId(1))), 2);
        assert_eq!(world.profiles(), vec![ProfileId(1), ProfileId(3)]);
    }

    #[test]
    fn test_remove_and_get() {
        let mut world = World::new(4);
        let id = spawn_creep(&mut world, 0, 0.0);
        world.insert(id, Stun { time: 2.0 });
        assert_eq!(world.get::<Stun>(id), Some(&Stun { time: 2.0 }));
        world.get_mut::<Stun>(id).unwrap().time = 0.5;
        assert_eq!(world.get::<Stun>(id).unwrap().time, 0.5);
        assert!(world.remove::<Stun>(id));
        assert!(world.get::<Stun>(id).is_none());
        assert!(!world.remove::<Stun>(id));
    }
}
