//! # HORDE Core
//!
//! Entity store backing the HORDE renderer:
//! - Creeps with position, animation, stats and debuff timers
//! - Muzzle-flash and impact events
//! - Shared render-profile partitions (one per creep kind)
//!
//! ## Rules
//!
//! 1. **Fixed capacity** - all columns are allocated up front
//! 2. **Plain data** - every component is `Pod`
//! 3. **Stable order** - query results follow slot order
//!
//! ## Example
//!
//! ```rust,ignore
//! use horde_core::{Creep, Position, Query, World};
//!
//! let mut world = World::new(10_000);
//! let creep = world.spawn();
//! world.insert(creep, Position::new([0.0, 0.0], [0.0, 1.0]));
//! let alive = world.count(&Query::new().with::<Creep>());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod ecs;

pub use ecs::{
    flag, Animation, AnimationState, Component, ComponentStorage, Creep, Entity, EntityId, Fear,
    ImpactEvent, Movable, MuzzleEvent, Position, ProfileId, Query, Spawning, StoredComponent,
    Stun, VfxEvent, World,
};
