//! Frame pipeline.
//!
//! [`BatchRenderSystem`] runs one culling call per camera frame: it plans the
//! output ([`FrameDrawPlan`]), allocates it ([`allocate_draw_output`]), locks
//! every batch, fans the fill kernels out over rayon ([`FillJobs`]) and emits
//! draw commands once all jobs have joined.

mod allocator;
mod fill;
mod plan;
mod stats;
mod system;

pub use allocator::allocate_draw_output;
pub use fill::{FillJob, FillJobs};
pub use plan::FrameDrawPlan;
pub use stats::RenderStats;
pub use system::{BatchRenderSystem, ViewKind};
