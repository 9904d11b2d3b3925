// basalt_sandbox: headless scene exercising the world runtime

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::Context as _;
use basalt_world::{
    Component, ComponentMode, DependencyKey, Handle, Mobility, TickEnv, TickFunctionDescriptor,
    TickPhase, TransformRule, World, WorldInterface,
};
use glam::Vec3;

/// Rotates its owner around Y at a fixed angular speed.
struct Spinner {
    speed: f32,
}

impl Component for Spinner {
    fn tick_descriptors() -> Vec<TickFunctionDescriptor> {
        vec![TickFunctionDescriptor::new(TickPhase::FixedUpdate)]
    }

    fn on_init(&mut self, owner: Handle) {
        log::info!("spinner attached to {owner}");
    }

    fn fixed_update(&mut self, owner: Handle, env: &mut TickEnv<'_>) {
        let Some(local) = env.local_transform(owner) else {
            return;
        };
        let rotation =
            glam::Quat::from_rotation_y(self.speed * env.ctx.delta) * local.rotation;
        env.commands.set_local_rotation(owner, rotation);
    }
}

/// Moves its owner along X and despawns it once it drifts too far.
struct Drifter {
    velocity: Vec3,
    limit: f32,
}

impl Component for Drifter {
    fn tick_descriptors() -> Vec<TickFunctionDescriptor> {
        // After the spinners, so a drifter parented under one sees the
        // frame's final orientation.
        vec![TickFunctionDescriptor::new(TickPhase::FixedUpdate)
            .with_prerequisite(DependencyKey::Component(
                basalt_world::component_type_id::<Spinner>(),
            ))]
    }

    fn fixed_update(&mut self, owner: Handle, env: &mut TickEnv<'_>) {
        let Some(local) = env.local_transform(owner) else {
            return;
        };
        let next = local.position + self.velocity * env.ctx.delta;
        if next.length() > self.limit {
            log::info!("drifter {owner} out of bounds, despawning");
            env.commands.destroy_object(owner);
        } else {
            env.commands.set_local_position(owner, next);
        }
    }
}

/// Counts fixed steps; installed as a world interface.
struct StepCounter {
    steps: Arc<AtomicU32>,
}

impl WorldInterface for StepCounter {
    fn on_install(&mut self, world: &mut World) {
        let steps = self.steps.clone();
        world.add_tick_function(
            TickFunctionDescriptor::new(TickPhase::FixedUpdate).run_when_paused(true),
            DependencyKey::Interface(basalt_world::interface_type_id::<StepCounter>()),
            Box::new(move |_, _| {
                steps.fetch_add(1, Ordering::Relaxed);
            }),
        );
    }
}

fn setup_logger() -> anyhow::Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply()
        .context("failed to initialize logger")
}

fn main() -> anyhow::Result<()> {
    setup_logger()?;

    let mut world = World::new();
    let steps = Arc::new(AtomicU32::new(0));
    world.install_interface(StepCounter {
        steps: steps.clone(),
    });

    // Static scenery root with a dynamic hub spinning above it.
    let ground = world.create_object("ground", Mobility::Static, None);
    world.set_local_scale(ground, Vec3::new(50.0, 1.0, 50.0));

    let hub = world.create_object("hub", Mobility::Dynamic, None);
    world.set_local_position(hub, Vec3::new(0.0, 2.0, 0.0));
    world.create_component(hub, ComponentMode::Dynamic, Spinner { speed: 1.5 });

    // Satellites orbit by riding the hub's rotation.
    for i in 0..4 {
        let name = format!("satellite-{i}");
        let sat = world.create_object(&name, Mobility::Dynamic, Some(hub));
        world.set_local_position(sat, Vec3::new(3.0 + i as f32, 0.0, 0.0));
    }

    // A free drifter that reparents itself under the hub mid-run.
    let drifter = world.create_object("drifter", Mobility::Dynamic, None);
    world.set_local_position(drifter, Vec3::new(-10.0, 2.0, 0.0));
    world.create_component(
        drifter,
        ComponentMode::Dynamic,
        Drifter {
            velocity: Vec3::new(4.0, 0.0, 0.0),
            limit: 30.0,
        },
    );

    let started = std::time::Instant::now();
    let dt = world.fixed_timestep();
    for frame in 0..600u32 {
        world.frame(dt);

        if frame == 200 {
            log::info!("adopting the drifter under the hub");
            world.set_parent(drifter, Some(hub), TransformRule::KeepWorld);
        }
        if frame == 300 {
            world.queue_pause(true);
        }
        if frame == 360 {
            world.queue_pause(false);
        }
        if frame % 120 == 0 {
            for sat in world.children(hub) {
                if let Some(p) = world.world_position(sat) {
                    log::debug!("frame {frame}: {} at {p}", world.get(sat).map_or("?", |o| o.name()));
                }
            }
        }
    }

    log::info!(
        "done: {} frames ({} fixed steps) in {:.1} ms wall time, {} objects alive",
        world.frame_count(),
        steps.load(Ordering::Relaxed),
        started.elapsed().as_secs_f64() * 1000.0,
        world.object_count()
    );
    Ok(())
}
