//! # HORDE Rendering
//!
//! Batched instanced renderer for large creep hordes:
//! - Tens of thousands of animated sprites in a handful of draw commands
//! - Health bars, status overlays and weapon effects in shared batches
//! - Triple-buffered instance memory, filled in parallel
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     PER-FRAME PIPELINE                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  EntitySource ─► counts ─► FrameDrawPlan ─► DrawCommandOutput │
//! │        │                                                      │
//! │        └─► snapshots ─► fill kernels (rayon) ─► WriteLease    │
//! │                                                   │           │
//! │                      draw commands ◄── emit ◄─────┤           │
//! │                      RenderBackend ◄── unlock ◄───┘           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! - Nothing is locked before every capacity check has passed
//! - Each batch is locked exactly once per frame and unlocked exactly once
//! - Fill jobs own disjoint instance ranges; no job waits on another

#![deny(missing_docs)]
// Instance writers share one staging buffer across fill jobs.
#![allow(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod backend;
pub mod config;
pub mod error;
pub mod instancing;
pub mod integration;
pub mod kernels;
pub mod pipeline;
pub mod profile;

pub use backend::{
    HeadlessBackend, HeadlessProbe, MaterialHandle, MeshHandle, RenderBackend, WgpuBackend,
};
pub use config::RenderConfig;
pub use error::{RenderError, RenderResult};
pub use instancing::{
    compute_layout, BatchDescriptor, BatchDescriptorDesc, BatchKind, DrawCommand,
    DrawCommandOutput, DrawRange, InstanceLayout, WriteLease,
};
pub use integration::{EntityPromoter, EntitySource, Promotion};
pub use pipeline::{allocate_draw_output, BatchRenderSystem, FrameDrawPlan, RenderStats, ViewKind};
pub use profile::{AnimationFrame, AnimationTable, SharedRenderProfile};
