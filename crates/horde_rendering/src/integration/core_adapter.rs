//! [`EntitySource`] and [`EntityPromoter`] for `horde_core::World`.
//!
//! ```rust,ignore
//! use horde_core::World;
//! use horde_rendering::{BatchRenderSystem, ViewKind};
//!
//! let mut world = World::new(100_000);
//! system.promote_new_creeps(&mut world, total_waves);
//! let output = system.perform_culling(ViewKind::Camera, &world)?;
//! ```

use horde_core::{Animation, Creep, Position, ProfileId, Query, StoredComponent, World};

use super::source::{EntityPromoter, EntitySource, Promotion};

impl EntitySource for World {
    fn count(&self, query: &Query) -> usize {
        World::count(self, query)
    }

    fn fetch<C: StoredComponent>(&self, query: &Query) -> Vec<C> {
        World::fetch(self, query)
    }

    fn shared_profiles(&self) -> Vec<ProfileId> {
        self.profiles()
    }
}

impl EntityPromoter for World {
    fn for_each_new_entity<F>(&mut self, query: &Query, mut f: F) -> usize
    where
        F: FnMut(&Position, &Creep) -> Option<Promotion>,
    {
        let mut promoted = 0;
        for id in self.matching(query) {
            let (Some(position), Some(creep)) = (self.get::<Position>(id), self.get::<Creep>(id)) else {
                continue;
            };
            if let Some(promotion) = f(position, creep) {
                self.insert::<Animation>(id, promotion.animation);
                self.set_profile(id, promotion.profile);
                promoted += 1;
            }
        }
        promoted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_creeps() -> World {
        let mut world = World::new(16);
        for kind in [2, 1, 2] {
            let id = world.spawn();
            world.insert(id, Position::new([0.0, 0.0], [1.0, 0.0]));
            world.insert(
                id,
                Creep {
                    kind,
                    ..Creep::default()
                },
            );
        }
        world
    }

    #[test]
    fn test_promotion_attaches_profile_and_animation() {
        let mut world = world_with_creeps();
        let query = Query::new().with::<Creep>().without::<Animation>();

        let promoted = world.for_each_new_entity(&query, |position, creep| {
            (creep.kind == 2).then(|| Promotion {
                profile: ProfileId(creep.kind),
                animation: Animation {
                    direction: position.direction,
                    ..Animation::default()
                },
            })
        });

        assert_eq!(promoted, 2);
        assert_eq!(EntitySource::shared_profiles(&world), vec![ProfileId(2)]);
        assert_eq!(EntitySource::count(&world, &query), 1);
        let animated = Query::new().with::<Animation>().with_profile(ProfileId(2));
        let animations: Vec<Animation> = EntitySource::fetch(&world, &animated);
        assert!(animations.iter().all(|a| a.direction == [1.0, 0.0]));
    }
}
