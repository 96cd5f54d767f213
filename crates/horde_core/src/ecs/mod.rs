//! # Entity Component System
//!
//! A fixed-capacity column store.
//!
//! ## Design
//!
//! - All columns are pre-allocated at world creation
//! - Entity ids are slot indices with generation counters
//! - Queries are bitmask filters plus an optional shared-profile partition
//! - Snapshots come out in slot order, so columns fetched with one query align

mod component;
mod entity;
mod query;
mod storage;
mod world;

pub use component::{
    flag, Animation, AnimationState, Component, Creep, Fear, ImpactEvent, Movable, MuzzleEvent,
    Position, Spawning, Stun, VfxEvent,
};
pub use entity::{Entity, EntityId, ProfileId};
pub use query::Query;
pub use storage::ComponentStorage;
pub use world::{StoredComponent, World};
