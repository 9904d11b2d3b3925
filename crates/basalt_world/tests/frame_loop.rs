//! Frame-loop behavior through the public API only.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use basalt_world::{
    Component, ComponentMode, Handle, Mobility, TickEnv, TickFunctionDescriptor, TickPhase,
    TransformRule, World,
};
use glam::Vec3;

#[derive(Default, Clone)]
struct Lifecycle {
    inits: Arc<AtomicU32>,
    fixed: Arc<AtomicU32>,
    post: Arc<AtomicU32>,
}

impl Component for Lifecycle {
    fn tick_descriptors() -> Vec<TickFunctionDescriptor> {
        vec![
            TickFunctionDescriptor::new(TickPhase::FixedUpdate),
            TickFunctionDescriptor::new(TickPhase::PostTransform),
        ]
    }

    fn on_init(&mut self, _owner: Handle) {
        self.inits.fetch_add(1, Ordering::Relaxed);
    }

    fn fixed_update(&mut self, owner: Handle, env: &mut TickEnv<'_>) {
        self.fixed.fetch_add(1, Ordering::Relaxed);
        let p = env
            .local_transform(owner)
            .map(|t| t.position)
            .unwrap_or_default();
        env.commands.set_local_position(owner, p + Vec3::Y);
    }

    fn post_transform(&mut self, owner: Handle, env: &mut TickEnv<'_>) {
        // The transform pass has already run for this step, so the world
        // position reflects the command applied after FixedUpdate.
        let fixed = self.fixed.load(Ordering::Relaxed);
        let world_y = env.world_position(owner).map(|p| p.y).unwrap_or(0.0);
        assert!((world_y - fixed as f32).abs() < 1e-4);
        self.post.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn fixed_steps_accumulate_across_uneven_frames() {
    let mut world = World::with_fixed_timestep(0.02);
    let probe = Lifecycle::default();
    let obj = world.create_object("obj", Mobility::Dynamic, None);
    world.create_component(obj, ComponentMode::Dynamic, probe.clone());

    // 0.05 s = two whole steps with 0.01 s left over.
    world.frame(0.05);
    assert_eq!(probe.inits.load(Ordering::Relaxed), 1);
    assert_eq!(probe.fixed.load(Ordering::Relaxed), 2);
    assert_eq!(probe.post.load(Ordering::Relaxed), 2);
    assert_eq!(world.step_count(), 2);

    // The leftover 0.01 s plus another 0.01 s completes a third step.
    world.frame(0.01);
    assert_eq!(probe.fixed.load(Ordering::Relaxed), 3);
    assert_eq!(world.step_count(), 3);
    assert_eq!(world.frame_count(), 2);
}

#[test]
fn tiny_frames_run_update_but_no_step() {
    let mut world = World::with_fixed_timestep(0.02);
    let probe = Lifecycle::default();
    let obj = world.create_object("obj", Mobility::Dynamic, None);
    world.create_component(obj, ComponentMode::Dynamic, probe.clone());

    world.frame(0.005);
    // No fixed step happened, so deferred init has not run yet either.
    assert_eq!(world.step_count(), 0);
    assert_eq!(probe.inits.load(Ordering::Relaxed), 0);

    world.frame(0.02);
    assert_eq!(world.step_count(), 1);
    assert_eq!(probe.inits.load(Ordering::Relaxed), 1);
}

#[test]
fn reparent_through_the_public_surface() {
    let mut world = World::new();
    let hub = world.create_object("hub", Mobility::Dynamic, None);
    let sat = world.create_object("sat", Mobility::Dynamic, None);
    world.set_local_position(hub, Vec3::new(2.0, 0.0, 0.0));
    world.set_local_position(sat, Vec3::new(5.0, 0.0, 0.0));

    world.set_parent(sat, Some(hub), TransformRule::KeepWorld);
    world.frame(basalt_world::DEFAULT_FIXED_TIMESTEP);

    let pos = world.world_position(sat).unwrap();
    assert!((pos - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-4);
    assert_eq!(world.children(hub), vec![sat]);
    assert_eq!(world.find_object("sat"), Some(sat));
}
