//! Parallel fill stage.
//!
//! Writers handed out by the frame's leases are chunked into [`FillJob`]s and
//! run on the rayon pool. Every job owns a disjoint instance range, so jobs
//! never coordinate; [`FillJobs::run`] returns only after all of them finish.

use horde_core::VfxEvent;
use rayon::prelude::*;

use crate::instancing::InstanceWriter;
use crate::kernels::{
    fill_debuffs, fill_health_bars, fill_sprites, fill_vfx, CreepSnapshot, DebuffStyles,
    DebuffWriters, HealthBarSnapshot, VfxAtlas,
};
use crate::profile::SharedRenderProfile;

/// One unit of parallel fill work.
pub enum FillJob<'a> {
    /// Creep sprites of one profile.
    Sprite {
        /// Instance range to fill.
        writer: InstanceWriter<'a>,
        /// Source components.
        snapshot: &'a CreepSnapshot,
        /// Profile of the creeps.
        profile: &'a SharedRenderProfile,
    },
    /// Health bars of one profile inside the shared bar buffer.
    HealthBar {
        /// Instance range to fill.
        writer: InstanceWriter<'a>,
        /// Buffer index of the profile's first bar.
        start: usize,
        /// Source components.
        snapshot: &'a HealthBarSnapshot,
        /// Profile of the creeps.
        profile: &'a SharedRenderProfile,
    },
    /// The three overlays of one profile inside the shared overlay buffers.
    Debuff {
        /// Instance ranges to fill.
        writers: DebuffWriters<'a>,
        /// Buffer index of the profile's first creep.
        start: usize,
        /// Source components.
        snapshot: &'a CreepSnapshot,
        /// Profile of the creeps.
        profile: &'a SharedRenderProfile,
        /// Overlay placement.
        styles: &'a DebuffStyles,
    },
    /// Muzzle flashes or impacts.
    Vfx {
        /// Instance range to fill.
        writer: InstanceWriter<'a>,
        /// Source events.
        events: &'a [VfxEvent],
        /// Frame atlas.
        atlas: &'a VfxAtlas,
        /// Apply the event's area scale.
        area_scaled: bool,
    },
}

impl FillJob<'_> {
    /// Runs the kernel over the job's range.
    pub fn run(self) {
        match self {
            Self::Sprite {
                mut writer,
                snapshot,
                profile,
            } => fill_sprites(&mut writer, &snapshot.positions, &snapshot.animations, profile),
            Self::HealthBar {
                mut writer,
                start,
                snapshot,
                profile,
            } => fill_health_bars(&mut writer, start, &snapshot.positions, &snapshot.creeps, profile),
            Self::Debuff {
                mut writers,
                start,
                snapshot,
                profile,
                styles,
            } => fill_debuffs(&mut writers, start, snapshot, profile, styles),
            Self::Vfx {
                mut writer,
                events,
                atlas,
                area_scaled,
            } => fill_vfx(&mut writer, events, atlas, area_scaled),
        }
    }
}

/// Collects chunked fill jobs for one frame.
pub struct FillJobs<'a> {
    chunk_size: usize,
    jobs: Vec<FillJob<'a>>,
}

impl<'a> FillJobs<'a> {
    /// Creates an empty job list splitting work into `chunk_size` instances.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "fill chunk size must be non-zero");
        Self {
            chunk_size,
            jobs: Vec::new(),
        }
    }

    /// Queues sprite jobs covering `writer`.
    pub fn sprites(
        &mut self,
        writer: InstanceWriter<'a>,
        snapshot: &'a CreepSnapshot,
        profile: &'a SharedRenderProfile,
    ) {
        for writer in writer.chunks(self.chunk_size) {
            self.jobs.push(FillJob::Sprite {
                writer,
                snapshot,
                profile,
            });
        }
    }

    /// Queues health bar jobs covering `writer`, whose range starts at `start`.
    pub fn health_bars(
        &mut self,
        writer: InstanceWriter<'a>,
        start: usize,
        snapshot: &'a HealthBarSnapshot,
        profile: &'a SharedRenderProfile,
    ) {
        for writer in writer.chunks(self.chunk_size) {
            self.jobs.push(FillJob::HealthBar {
                writer,
                start,
                snapshot,
                profile,
            });
        }
    }

    /// Queues overlay jobs covering `writers`, whose ranges start at `start`.
    pub fn debuffs(
        &mut self,
        writers: DebuffWriters<'a>,
        start: usize,
        snapshot: &'a CreepSnapshot,
        profile: &'a SharedRenderProfile,
        styles: &'a DebuffStyles,
    ) {
        for writers in writers.chunks(self.chunk_size) {
            self.jobs.push(FillJob::Debuff {
                writers,
                start,
                snapshot,
                profile,
                styles,
            });
        }
    }

    /// Queues VFX jobs covering `writer`.
    pub fn vfx(
        &mut self,
        writer: InstanceWriter<'a>,
        events: &'a [VfxEvent],
        atlas: &'a VfxAtlas,
        area_scaled: bool,
    ) {
        for writer in writer.chunks(self.chunk_size) {
            self.jobs.push(FillJob::Vfx {
                writer,
                events,
                atlas,
                area_scaled,
            });
        }
    }

    /// Jobs queued so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Runs every job on the rayon pool and waits for all of them.
    pub fn run(self) {
        self.jobs.into_par_iter().for_each(FillJob::run);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HeadlessBackend, MaterialHandle, MeshHandle};
    use crate::instancing::{AttributeKind, BatchDescriptor, BatchDescriptorDesc, BatchKind};
    use crate::kernels::tests::test_profile;
    use horde_core::{Animation, Position};

    #[test]
    fn test_parallel_fill_matches_sequential() {
        let mut backend = HeadlessBackend::raw();
        let mut descriptor = BatchDescriptor::new(
            &mut backend,
            BatchDescriptorDesc {
                label: "sprites".into(),
                kind: BatchKind::Sprite,
                material: MaterialHandle(1),
                mesh: MeshHandle(1),
                sorting_priority: 0,
                max_instances: 500,
            },
        )
        .unwrap();
        let profile = test_profile(3);
        let count = 300;
        let snapshot = CreepSnapshot {
            positions: (0..count)
                .map(|i| Position::new([i as f32, 0.0], [0.0, 1.0]))
                .collect(),
            animations: vec![Animation::default(); count],
            ..CreepSnapshot::default()
        };
        let addressing = *descriptor.addressing();

        let mut lease = descriptor.lock_for_write(count, false).unwrap();
        let mut jobs = FillJobs::new(64);
        jobs.sprites(lease.writer(), &snapshot, &profile);
        assert_eq!(jobs.len(), 5);
        jobs.run();
        lease.unlock(&mut backend).unwrap();

        let probe = backend.probe();
        let state = probe.state();
        let uploaded = state.buffer(descriptor.buffer(0)).unwrap();
        for i in [0, 63, 64, 299] {
            let word = addressing.word_of(AttributeKind::ObjectToWorld, i).unwrap();
            assert_eq!(uploaded[word + 9], i as f32);
        }
    }
}
