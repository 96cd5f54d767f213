//! Per-frame orchestrator.
//!
//! ```text
//! gather ─► plan ─► allocate ─► lock ─► fill (rayon) ─► emit ─► unlock
//! ```
//!
//! Counts and snapshots are taken before anything is locked, so a frame that
//! fails its capacity checks never touches a ring slot. Emission order is
//! fixed: creep sprites by profile, then health bars, warning, stun, fear,
//! muzzle flashes and impacts.

use horde_core::{
    Animation, Creep, Fear, ImpactEvent, Movable, MuzzleEvent, Position, ProfileId, Query,
    Spawning, Stun, VfxEvent,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::backend::{MaterialHandle, MeshHandle, RenderBackend};
use crate::config::RenderConfig;
use crate::error::RenderResult;
use crate::instancing::{
    BatchDescriptor, BatchDescriptorDesc, BatchKind, DrawCommandOutput, WriteLease,
};
use crate::integration::{EntityPromoter, EntitySource, Promotion};
use crate::kernels::{CreepSnapshot, DebuffStyles, DebuffWriters, HealthBarSnapshot, VfxAtlas};
use crate::profile::SharedRenderProfile;

use super::allocator::allocate_draw_output;
use super::fill::FillJobs;
use super::plan::FrameDrawPlan;
use super::stats::RenderStats;

/// Renderable creeps: animated, not spawning, with every debuff timer.
const CREEP_QUERY: Query = Query::new()
    .with::<Position>()
    .with::<Animation>()
    .with::<Creep>()
    .with::<Movable>()
    .with::<Stun>()
    .with::<Fear>()
    .without::<Spawning>();

/// Health bar candidates.
const HEALTH_BAR_QUERY: Query = Query::new().with::<Position>().with::<Creep>();

/// Spawned creeps that have no render state yet.
const NEW_CREEP_QUERY: Query = Query::new()
    .with::<Position>()
    .with::<Creep>()
    .with::<Movable>()
    .with::<Stun>()
    .with::<Fear>()
    .without::<Animation>();

const MUZZLE_QUERY: Query = Query::new().with::<MuzzleEvent>();
const IMPACT_QUERY: Query = Query::new().with::<ImpactEvent>();

/// Every this many waves the creeps are outlined.
const OUTLINE_WAVE_PERIOD: u32 = 5;

/// Kind of view a culling call is made for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewKind {
    /// Main camera. The only view that produces draw commands.
    Camera,
    /// Shadow-casting light.
    Shadow,
    /// Reflection or light probe.
    LightProbe,
}

struct CreepBatch {
    profile: SharedRenderProfile,
    descriptor: BatchDescriptor,
}

/// Snapshots of one resolved profile.
struct ProfileFrame {
    batch: usize,
    creeps: CreepSnapshot,
    bars: HealthBarSnapshot,
}

struct CreepLease<'f> {
    profile: &'f SharedRenderProfile,
    frame: &'f ProfileFrame,
    lease: WriteLease<'f>,
}

/// Batched renderer for creeps, their overlays and weapon effects.
pub struct BatchRenderSystem<B: RenderBackend> {
    backend: B,
    creeps: Vec<CreepBatch>,
    health_bar: BatchDescriptor,
    warning: BatchDescriptor,
    stun: BatchDescriptor,
    fear: BatchDescriptor,
    muzzle: BatchDescriptor,
    impact: BatchDescriptor,
    muzzle_atlas: VfxAtlas,
    impact_atlas: VfxAtlas,
    styles: DebuffStyles,
    fill_chunk_size: usize,
    rng: ChaCha8Rng,
    stats: RenderStats,
}

impl<B: RenderBackend> BatchRenderSystem<B> {
    /// Builds every descriptor and profile. Later entries for an already
    /// configured creep kind are ignored.
    ///
    /// # Errors
    ///
    /// Any configuration, layout or backend error.
    pub fn new(mut backend: B, config: RenderConfig) -> RenderResult<Self> {
        config.validate()?;
        let mesh = MeshHandle(config.quad_mesh);
        let max_instances = config.max_instances;
        let mut build = |label: String, kind: BatchKind, material: u32, sorting_priority: i32| {
            BatchDescriptor::new(
                &mut backend,
                BatchDescriptorDesc {
                    label,
                    kind,
                    material: MaterialHandle(material),
                    mesh,
                    sorting_priority,
                    max_instances,
                },
            )
        };

        let mut creeps: Vec<CreepBatch> = Vec::with_capacity(config.creeps.len());
        for creep in &config.creeps {
            if creeps.iter().any(|b| b.profile.kind == creep.kind) {
                tracing::warn!(kind = creep.kind, "duplicate creep render profile ignored");
                continue;
            }
            creeps.push(CreepBatch {
                profile: creep.profile()?,
                descriptor: build(
                    format!("creep-{}", creep.kind),
                    BatchKind::Sprite,
                    creep.material,
                    creep.sorting_priority,
                )?,
            });
        }
        creeps.sort_by_key(|b| b.profile.kind);

        let health_bar = build(
            "health-bar".into(),
            BatchKind::HealthBar,
            config.health_bar.material,
            config.health_bar.sorting_priority,
        )?;
        let warning = build(
            "warning".into(),
            BatchKind::Overlay,
            config.warning.material,
            config.warning.sorting_priority,
        )?;
        let stun = build(
            "stun".into(),
            BatchKind::Overlay,
            config.stun.material,
            config.stun.sorting_priority,
        )?;
        let fear = build(
            "fear".into(),
            BatchKind::Overlay,
            config.fear.material,
            config.fear.sorting_priority,
        )?;
        let muzzle = build(
            "muzzle".into(),
            BatchKind::Vfx,
            config.muzzle.material,
            config.muzzle.sorting_priority,
        )?;
        let impact = build(
            "impact".into(),
            BatchKind::Vfx,
            config.impact.material,
            config.impact.sorting_priority,
        )?;

        tracing::info!(
            creep_kinds = creeps.len(),
            max_instances,
            target = ?backend.buffer_target(),
            "batch render system initialized"
        );

        Ok(Self {
            creeps,
            health_bar,
            warning,
            stun,
            fear,
            muzzle,
            impact,
            muzzle_atlas: config.muzzle.atlas("muzzle")?,
            impact_atlas: config.impact.atlas("impact")?,
            styles: config.debuff_styles(),
            fill_chunk_size: config.fill_chunk_size,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            stats: RenderStats::default(),
            backend,
        })
    }

    /// Builds this frame's draw commands and uploads instance data.
    ///
    /// Non-camera views and frames with nothing to draw return an empty
    /// output without locking anything.
    ///
    /// # Errors
    ///
    /// [`RenderError::CapacityExceeded`](crate::RenderError::CapacityExceeded)
    /// before any lock, [`RenderError::DrawPlanOverflow`](crate::RenderError::DrawPlanOverflow)
    /// during emission, or a backend upload error.
    #[allow(clippy::too_many_lines, clippy::cast_possible_truncation)]
    pub fn perform_culling<S: EntitySource>(
        &mut self,
        view: ViewKind,
        source: &S,
    ) -> RenderResult<DrawCommandOutput> {
        if view != ViewKind::Camera {
            return Ok(DrawCommandOutput::empty());
        }
        self.stats.begin_frame();

        let total_creeps = source.count(&CREEP_QUERY);
        let muzzle_count = source.count(&MUZZLE_QUERY);
        let impact_count = source.count(&IMPACT_QUERY);
        if (total_creeps == 0 || self.creeps.is_empty()) && muzzle_count == 0 && impact_count == 0 {
            return Ok(DrawCommandOutput::empty());
        }

        // Gather
        // Lock order follows batch order, which follows ascending kind.
        let mut profiles = source.shared_profiles();
        profiles.sort_unstable();
        profiles.dedup();
        let mut frames = Vec::with_capacity(profiles.len());
        for profile in profiles {
            let Ok(batch) = self.creeps.binary_search_by_key(&profile.0, |b| b.profile.kind) else {
                tracing::warn!(profile = profile.0, "no batch descriptor for profile; skipped");
                self.stats.profiles_skipped += 1;
                continue;
            };
            frames.push(gather_profile(source, profile, batch));
        }
        let muzzle_events: Vec<VfxEvent> = source
            .fetch::<MuzzleEvent>(&MUZZLE_QUERY)
            .into_iter()
            .map(|m| m.event)
            .collect();
        let impact_events: Vec<VfxEvent> = source
            .fetch::<ImpactEvent>(&IMPACT_QUERY)
            .into_iter()
            .map(|i| i.event)
            .collect();

        // Plan
        let resolved: usize = frames.iter().map(|f| f.creeps.len()).sum();
        let bars: usize = frames.iter().map(|f| f.bars.len()).sum();
        let mut commands = 0;
        for frame in &frames {
            let descriptor = &self.creeps[frame.batch].descriptor;
            descriptor.check_capacity(frame.creeps.len())?;
            commands += descriptor.commands_needed(frame.creeps.len());
        }
        for (descriptor, count) in [
            (&self.health_bar, bars),
            (&self.warning, resolved),
            (&self.stun, resolved),
            (&self.fear, resolved),
            (&self.muzzle, muzzle_events.len()),
            (&self.impact, impact_events.len()),
        ] {
            descriptor.check_capacity(count)?;
            commands += descriptor.commands_needed(count);
        }
        // sprite + (warning or stun) + fear per creep
        let visible = 3 * resolved + bars + muzzle_events.len() + impact_events.len();

        // Allocate
        let mut plan = FrameDrawPlan::new(commands, visible);
        let mut output = allocate_draw_output(&plan);

        // Lock
        let Self {
            backend,
            creeps,
            health_bar,
            warning,
            stun,
            fear,
            muzzle,
            impact,
            muzzle_atlas,
            impact_atlas,
            styles,
            fill_chunk_size,
            stats,
            ..
        } = self;

        let mut creep_leases = Vec::with_capacity(frames.len());
        let mut pending = frames.iter().peekable();
        for (index, batch) in creeps.iter_mut().enumerate() {
            let Some(frame) = pending.next_if(|f| f.batch == index) else {
                continue;
            };
            let CreepBatch {
                profile,
                descriptor,
            } = batch;
            creep_leases.push(CreepLease {
                profile,
                frame,
                lease: descriptor.lock_for_write(frame.creeps.len(), false)?,
            });
        }
        let mut bar_lease = health_bar.lock_for_write(bars, true)?;
        let mut warning_lease = warning.lock_for_write(resolved, true)?;
        let mut stun_lease = stun.lock_for_write(resolved, true)?;
        let mut fear_lease = fear.lock_for_write(resolved, true)?;
        let mut muzzle_lease = muzzle.lock_for_write(muzzle_events.len(), false)?;
        let mut impact_lease = impact.lock_for_write(impact_events.len(), false)?;

        // Fill
        {
            let mut jobs = FillJobs::new(*fill_chunk_size);
            let mut bar_rest = bar_lease.writer();
            let mut debuff_rest = DebuffWriters {
                stun: stun_lease.writer(),
                warning: warning_lease.writer(),
                fear: fear_lease.writer(),
            };
            let mut bar_start = 0;
            let mut creep_start = 0;

            for entry in &mut creep_leases {
                let frame = entry.frame;
                jobs.sprites(entry.lease.writer(), &frame.creeps, entry.profile);

                let bar_end = bar_start + frame.bars.len();
                let (bar_writer, rest) = bar_rest.split_at(bar_end);
                bar_rest = rest;
                jobs.health_bars(bar_writer, bar_start, &frame.bars, entry.profile);
                bar_start = bar_end;

                let creep_end = creep_start + frame.creeps.len();
                let (debuff_writers, rest) = debuff_rest.split_at(creep_end);
                debuff_rest = rest;
                jobs.debuffs(debuff_writers, creep_start, &frame.creeps, entry.profile, styles);
                creep_start = creep_end;
            }

            jobs.vfx(muzzle_lease.writer(), &muzzle_events, muzzle_atlas, false);
            jobs.vfx(impact_lease.writer(), &impact_events, impact_atlas, true);
            stats.fill_jobs = jobs.len() as u32;
            jobs.run();
        }

        // Emit
        for entry in &creep_leases {
            entry.lease.emit_draw_commands(&mut output, &mut plan)?;
        }
        for lease in [
            &bar_lease,
            &warning_lease,
            &stun_lease,
            &fear_lease,
            &muzzle_lease,
            &impact_lease,
        ] {
            lease.emit_draw_commands(&mut output, &mut plan)?;
        }
        debug_assert!(
            plan.is_complete(),
            "planned {} commands, emitted {}",
            plan.total_commands,
            plan.command_cursor
        );

        // Unlock
        let mut unlocked = Ok(());
        let leases = creep_leases.into_iter().map(|entry| entry.lease).chain([
            bar_lease,
            warning_lease,
            stun_lease,
            fear_lease,
            muzzle_lease,
            impact_lease,
        ]);
        for lease in leases {
            let result = lease.unlock(backend);
            if unlocked.is_ok() {
                unlocked = result;
            }
        }
        unlocked?;

        stats.frames_rendered += 1;
        stats.draw_commands = plan.command_cursor as u32;
        stats.visible_instances = plan.visible_cursor as u32;
        tracing::debug!(
            commands = plan.command_cursor,
            visible = plan.visible_cursor,
            skipped = stats.profiles_skipped,
            jobs = stats.fill_jobs,
            "frame culled"
        );
        Ok(output)
    }

    /// Attaches a render profile and initial animation to every spawned
    /// creep that has none yet. Returns how many were promoted.
    ///
    /// Creeps of unknown kinds are logged and left untouched.
    pub fn promote_new_creeps<P: EntityPromoter>(&mut self, store: &mut P, total_waves: u32) -> usize {
        let Self { creeps, rng, .. } = self;
        store.for_each_new_entity(&NEW_CREEP_QUERY, |position, creep| {
            let Ok(batch) = creeps.binary_search_by_key(&creep.kind, |b| b.profile.kind) else {
                tracing::warn!(kind = creep.kind, "no render profile for creep kind");
                return None;
            };
            let wave = creep.wave_number + 1;
            Some(Promotion {
                profile: ProfileId(creep.kind),
                animation: Animation {
                    direction: position.direction,
                    frame_number: rng.gen_range(0..creeps[batch].profile.run_frames()),
                    outline: u32::from(wave % OUTLINE_WAVE_PERIOD == 0 || wave == total_waves),
                    ..Animation::default()
                },
            })
        })
    }

    /// Releases every batch and buffer and hands the backend back.
    pub fn release(self) -> B {
        let Self {
            mut backend,
            creeps,
            health_bar,
            warning,
            stun,
            fear,
            muzzle,
            impact,
            ..
        } = self;
        for batch in creeps {
            batch.descriptor.release(&mut backend);
        }
        for descriptor in [health_bar, warning, stun, fear, muzzle, impact] {
            descriptor.release(&mut backend);
        }
        tracing::info!("batch render system released");
        backend
    }

    /// Counters of the last frame.
    #[must_use]
    pub const fn stats(&self) -> RenderStats {
        self.stats
    }

    /// The backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Creep kinds with a descriptor, ascending.
    #[must_use]
    pub fn creep_kinds(&self) -> Vec<u32> {
        self.creeps.iter().map(|b| b.profile.kind).collect()
    }

    /// Sprite descriptor of a creep kind.
    #[must_use]
    pub fn creep_descriptor(&self, kind: u32) -> Option<&BatchDescriptor> {
        self.creeps
            .iter()
            .find(|b| b.profile.kind == kind)
            .map(|b| &b.descriptor)
    }

    /// Health bar descriptor.
    #[must_use]
    pub const fn health_bar_descriptor(&self) -> &BatchDescriptor {
        &self.health_bar
    }
}

fn gather_profile<S: EntitySource>(source: &S, profile: ProfileId, batch: usize) -> ProfileFrame {
    let creeps = CREEP_QUERY.with_profile(profile);
    let bars = HEALTH_BAR_QUERY.with_profile(profile);
    ProfileFrame {
        batch,
        creeps: CreepSnapshot {
            positions: source.fetch(&creeps),
            animations: source.fetch(&creeps),
            movables: source.fetch(&creeps),
            stuns: source.fetch(&creeps),
            fears: source.fetch(&creeps),
        },
        bars: HealthBarSnapshot {
            positions: source.fetch(&bars),
            creeps: source.fetch(&bars),
        },
    }
}
