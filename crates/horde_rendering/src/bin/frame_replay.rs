//! # Frame Replay
//!
//! Drives the batched renderer against a synthetic horde on the headless
//! backend and prints what each frame would submit.

use std::time::Instant;

use horde_core::{
    Creep, Fear, ImpactEvent, Movable, MuzzleEvent, Position, Stun, VfxEvent, World,
};
use horde_rendering::{BatchRenderSystem, HeadlessBackend, RenderConfig, ViewKind};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const SAMPLE_CONFIG: &str = include_str!("../../assets/render_config.toml");
const TOTAL_WAVES: u32 = 20;

fn arg_value(args: &[String], name: &str) -> Option<usize> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn populate(world: &mut World, creeps: usize, kinds: &[u32], rng: &mut ChaCha8Rng) {
    for i in 0..creeps {
        let id = world.spawn();
        if id.is_null() {
            break;
        }
        let angle: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
        world.insert(
            id,
            Position::new(
                [rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0)],
                [angle.cos(), angle.sin()],
            ),
        );
        let max_hp = 10.0;
        world.insert(
            id,
            Creep {
                hp: if i % 3 == 0 { max_hp * 0.5 } else { max_hp },
                max_hp,
                kind: kinds[i % kinds.len()],
                wave_number: (i % TOTAL_WAVES as usize) as u32,
                escaped: 0,
            },
        );
        world.insert(id, Movable { going_in: u32::from(i % 7 != 0) });
        world.insert(id, Stun { time: if i % 11 == 0 { 1.0 } else { 0.0 } });
        world.insert(id, Fear { time: if i % 13 == 0 { 1.0 } else { 0.0 } });
    }
}

fn spawn_effects(world: &mut World, count: usize, weapon_kinds: u32, rng: &mut ChaCha8Rng) {
    for i in 0..count {
        let id = world.spawn();
        if id.is_null() {
            break;
        }
        let event = VfxEvent {
            position: [rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0)],
            direction: [0.0, 1.0],
            weapon: rng.gen_range(0..weapon_kinds),
            enhanced: u32::from(rng.gen_bool(0.25)),
            current_frame: rng.gen_range(0..3),
            aoe_scale: if i % 4 == 0 { 1.5 } else { 0.0 },
        };
        if i % 2 == 0 {
            world.insert(id, MuzzleEvent { event });
        } else {
            world.insert(id, ImpactEvent { event });
        }
    }
}

fn main() {
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         HORDE FRAME REPLAY                                       ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help") {
        println!("Usage: frame_replay [config.toml] [--creeps N] [--effects N] [--frames N] [--constant BYTES]");
        return;
    }

    let config = match args.get(1).filter(|a| !a.starts_with("--")) {
        Some(path) => RenderConfig::load(path),
        None => RenderConfig::from_toml_str(SAMPLE_CONFIG),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            println!("Error: {e}");
            return;
        }
    };

    let creeps = arg_value(&args, "--creeps").unwrap_or(2_500).min(config.max_instances);
    let effects = arg_value(&args, "--effects").unwrap_or(64).min(config.max_instances);
    let frames = arg_value(&args, "--frames").unwrap_or(3);
    let backend = match arg_value(&args, "--constant") {
        Some(bytes) => HeadlessBackend::constant(bytes),
        None => HeadlessBackend::raw(),
    };
    let probe = backend.probe();

    let kinds: Vec<u32> = config.creeps.iter().map(|c| c.kind).collect();
    let weapon_kinds = config.muzzle.weapon_kinds.min(config.impact.weapon_kinds);
    let mut system = match BatchRenderSystem::new(backend, config) {
        Ok(system) => system,
        Err(e) => {
            println!("Error: {e}");
            return;
        }
    };

    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut world = World::new((creeps + effects).max(1));
    populate(&mut world, creeps, &kinds, &mut rng);
    spawn_effects(&mut world, effects, weapon_kinds, &mut rng);
    let promoted = system.promote_new_creeps(&mut world, TOTAL_WAVES);

    println!("┌─ SETUP ───────────────────────────────────────────────────────┐");
    println!("│ Creep kinds:        {kinds:?}");
    println!("│ Creeps promoted:    {promoted}");
    println!("│ Effects:            {effects}");
    println!("│ Backend buffers:    {}", probe.state().live_buffers());
    println!("│ Backend batches:    {}", probe.state().live_batches());
    println!("└───────────────────────────────────────────────────────────────┘");
    println!();

    for frame in 0..frames {
        let start = Instant::now();
        let output = match system.perform_culling(ViewKind::Camera, &world) {
            Ok(output) => output,
            Err(e) => {
                println!("Frame {frame}: aborted: {e}");
                return;
            }
        };
        let elapsed = start.elapsed();
        let stats = system.stats();
        println!(
            "Frame {frame}: {} commands, {} visible ({} allocated), {} jobs, {:.3} ms",
            stats.draw_commands,
            stats.visible_instances,
            output.visible_instances.len(),
            stats.fill_jobs,
            elapsed.as_secs_f64() * 1000.0
        );
    }

    let backend = system.release();
    drop(backend);
    let state = probe.state();
    println!();
    println!("Uploads:            {} calls, {} words", state.upload_calls, state.words_uploaded);
    println!("Released:           {} buffers, {} batches still live", state.live_buffers(), state.live_batches());
}
