//! # Entity Store Integration
//!
//! ```text
//! horde_core::World ──► EntitySource ──► perform_culling (read only)
//!         ▲
//!         └──────────── EntityPromoter ◄── promote_new_creeps
//! ```
//!
//! The renderer only reads entity state during culling. Promotion is the one
//! write: it attaches a profile and an initial animation to spawned creeps.

mod core_adapter;
mod source;

pub use source::{EntityPromoter, EntitySource, Promotion};
