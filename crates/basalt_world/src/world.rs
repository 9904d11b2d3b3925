//! The world: top-level owner of all runtime state.
//!
//! One `World` composes the object pool, the transform graph, every
//! per-type component store, the five ticking groups, the typed event
//! tables and the interface singletons, and runs the fixed-step frame
//! loop.  Everything is mutated from the single simulation thread through
//! explicit `&mut World` context passing; there are no module-level
//! globals, so multiple worlds can coexist in one process.
//!
//! Destruction is two-phase everywhere: `destroy_*` marks (and cascades)
//! synchronously, and the physical free happens at the single GC point
//! inside each fixed step.  Marked objects and components stay resolvable
//! and iterable until then.

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

use basalt_core::{Handle, StepTimer, Transform};
use glam::{Affine3A, Quat, Vec3};

use crate::component::{Component, ComponentKey, ComponentMode};
use crate::env::{TickCommands, TickEnv, WorldCommand};
use crate::events::EventBus;
use crate::object::{Mobility, Object, TransformRule};
use crate::pool::ObjectPool;
use crate::registry::{component_type_id, interface_type_id, ComponentTypeId, InterfaceTypeId};
use crate::store::{AnyComponentStore, ComponentStore};
use crate::tick::{
    DependencyKey, TickCallback, TickContext, TickFunctionDescriptor, TickPhase, TickingGroup,
};
use crate::transform_graph::{TransformGraph, TransformNode};

/// Default simulation step: 60 Hz.
pub const DEFAULT_FIXED_TIMESTEP: f32 = 1.0 / 60.0;

static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(0);

/// Identifies a world instance within this process; used in log lines to
/// tell multiple worlds apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldId(u32);

impl std::fmt::Display for WorldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

/// A per-world singleton service (rendering system, audio mixer, ...).
///
/// Interfaces live in their own type-id space, separate from components.
/// `on_install` runs exactly once, with the installing world as context —
/// the place to register tick functions via
/// [`World::add_tick_function`].
pub trait WorldInterface: 'static {
    fn on_install(&mut self, _world: &mut World) {}
}

struct PendingTick {
    descriptor: TickFunctionDescriptor,
    owner: DependencyKey,
    callback: TickCallback,
}

pub struct World {
    id: WorldId,

    objects: ObjectPool,
    transforms: TransformGraph,
    stores: HashMap<ComponentTypeId, Box<dyn AnyComponentStore>>,
    interfaces: HashMap<InterfaceTypeId, Box<dyn Any>>,
    events: EventBus,

    groups: [TickingGroup; 5],
    pending_ticks: Vec<PendingTick>,
    pending_init: VecDeque<ComponentKey>,
    dead_components: Vec<ComponentKey>,
    dead_objects: Vec<Handle>,
    commands: TickCommands,

    timer: StepTimer,
    pause_requests: Vec<bool>,
    paused: bool,
    /// Double-buffered simulation state selector, flipped at the start of
    /// every fixed step.
    state_index: usize,
    elapsed: f64,
    frame: u64,
    step: u64,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self::with_fixed_timestep(DEFAULT_FIXED_TIMESTEP)
    }

    pub fn with_fixed_timestep(fixed_dt: f32) -> Self {
        Self {
            id: WorldId(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed)),
            objects: ObjectPool::new(),
            transforms: TransformGraph::new(),
            stores: HashMap::new(),
            interfaces: HashMap::new(),
            events: EventBus::new(),
            groups: [
                TickingGroup::new(TickPhase::Update),
                TickingGroup::new(TickPhase::FixedUpdate),
                TickingGroup::new(TickPhase::PhysicsUpdate),
                TickingGroup::new(TickPhase::PostTransform),
                TickingGroup::new(TickPhase::LateUpdate),
            ],
            pending_ticks: Vec::new(),
            pending_init: VecDeque::new(),
            dead_components: Vec::new(),
            dead_objects: Vec::new(),
            commands: TickCommands::default(),
            timer: StepTimer::new(fixed_dt),
            pause_requests: Vec::new(),
            paused: false,
            state_index: 0,
            elapsed: 0.0,
            frame: 0,
            step: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> WorldId {
        self.id
    }

    #[inline]
    pub fn fixed_timestep(&self) -> f32 {
        self.timer.fixed_dt()
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn state_index(&self) -> usize {
        self.state_index
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    #[inline]
    pub fn step_count(&self) -> u64 {
        self.step
    }

    // ─── Objects & hierarchy ───────────────────────────────────────────────

    /// Create an object, optionally under a parent.  A Static request under
    /// a Dynamic parent is upgraded — descendants of a dynamic object are
    /// always dynamic.  Returns `Handle::NONE` if the pool is exhausted or
    /// the parent does not resolve... the parent case logs a warning and
    /// creates the object as a root instead.
    pub fn create_object(
        &mut self,
        name: &str,
        mobility: Mobility,
        parent: Option<Handle>,
    ) -> Handle {
        let parent_info = match parent {
            Some(p) => match self.objects.get(p) {
                Some(po) if !po.destroyed => Some((p, po.depth, po.mobility, po.node)),
                _ => {
                    log::warn!(
                        "{}: create_object('{name}'): parent {p} is not alive; creating as root",
                        self.id
                    );
                    None
                }
            },
            None => None,
        };

        let mobility = match parent_info {
            Some((_, _, Mobility::Dynamic, _)) if mobility == Mobility::Static => {
                log::debug!("{}: '{name}' forced dynamic by its parent", self.id);
                Mobility::Dynamic
            }
            _ => mobility,
        };
        let depth = parent_info.map(|(_, d, _, _)| d + 1).unwrap_or(0);

        let handle = self.objects.create(name, mobility);
        if handle.is_none() {
            return handle;
        }

        let node = TransformNode::new(
            handle,
            parent_info.map(|(_, _, _, n)| n),
            Transform::IDENTITY,
        );
        let node_ref = self.transforms.insert(mobility, depth, node);
        if let Some(obj) = self.objects.get_mut(handle) {
            obj.depth = depth;
            obj.node = node_ref;
        }
        if let Some((p, _, _, _)) = parent_info {
            self.link_last_child(p, handle);
        }
        self.transforms.refresh(node_ref);
        handle
    }

    /// Resolve a handle.  Marked-for-destruction objects still resolve
    /// until the GC point.
    pub fn get(&self, handle: Handle) -> Option<&Object> {
        self.objects.get(handle)
    }

    /// Iterate every live object, marked-for-destruction ones included.
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Linear-scan lookup by name; first match wins.
    pub fn find_object(&self, name: &str) -> Option<Handle> {
        self.objects
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.handle)
    }

    /// Child handles in attach order.
    pub fn children(&self, parent: Handle) -> Vec<Handle> {
        let mut out = Vec::new();
        let Some(obj) = self.objects.get(parent) else {
            return out;
        };
        let mut c = obj.first_child;
        while c.is_some() {
            out.push(c);
            c = self
                .objects
                .get(c)
                .map(|o| o.next_sibling)
                .unwrap_or(Handle::NONE);
        }
        out
    }

    /// Mark an object and its entire subtree for destruction.  Children
    /// are cascaded first, then each attached component is deinitialized
    /// and queued, then the object itself.  Physical removal happens at
    /// the next GC point.
    pub fn destroy_object(&mut self, handle: Handle) {
        match self.objects.get(handle) {
            Some(obj) if !obj.destroyed => {}
            _ => return,
        }
        let subtree = self.collect_subtree(handle);
        // Reverse of the top-down walk: descendants are queued before
        // their ancestors.
        for h in subtree.into_iter().rev() {
            let keys = match self.objects.get_mut(h) {
                Some(obj) if !obj.destroyed => {
                    obj.destroyed = true;
                    obj.components.clone()
                }
                _ => continue,
            };
            for key in keys {
                self.destroy_component(key);
            }
            self.dead_objects.push(h);
        }
    }

    /// Re-link `child` under `new_parent` (or make it a root).
    ///
    /// `KeepRelative` keeps the local transform and lets the world
    /// transform follow the new ancestry; `KeepWorld` back-solves the
    /// local position/rotation so world placement is preserved.
    /// Reparenting to itself or to one of its descendants is refused with
    /// a warning.
    pub fn set_parent(&mut self, child: Handle, new_parent: Option<Handle>, rule: TransformRule) {
        let Some(cobj) = self.objects.get(child) else {
            log::warn!("{}: set_parent: child {child} does not resolve", self.id);
            return;
        };
        if cobj.destroyed {
            log::warn!("{}: set_parent: child {child} is destroyed", self.id);
            return;
        }
        let child_node = cobj.node;
        let child_was_static = cobj.mobility == Mobility::Static;

        if let Some(p) = new_parent {
            if p == child {
                debug_assert!(false, "set_parent: object cannot be its own parent");
                log::warn!("{}: set_parent: {child} cannot be its own parent", self.id);
                return;
            }
            let Some(pobj) = self.objects.get(p) else {
                log::warn!("{}: set_parent: parent {p} does not resolve", self.id);
                return;
            };
            if pobj.destroyed {
                log::warn!("{}: set_parent: parent {p} is destroyed", self.id);
                return;
            }
            // Walk up from the new parent: finding `child` means the new
            // parent is inside the child's subtree.
            let mut cur = pobj.parent;
            while cur.is_some() {
                if cur == child {
                    log::warn!(
                        "{}: set_parent: {p} is a descendant of {child}; refused",
                        self.id
                    );
                    return;
                }
                cur = self
                    .objects
                    .get(cur)
                    .map(|o| o.parent)
                    .unwrap_or(Handle::NONE);
            }
        }

        // Cache the world placement before any relinking.
        let captured = self.transforms.world_of(child_node);

        self.unlink_sibling(child);
        let (new_depth, parent_dynamic, parent_node) = match new_parent {
            Some(p) => {
                self.link_last_child(p, child);
                match self.objects.get(p) {
                    Some(po) => (po.depth + 1, po.is_dynamic(), Some(po.node)),
                    None => (0, false, None),
                }
            }
            None => (0, false, None),
        };

        let promote = parent_dynamic && child_was_static;
        if promote {
            log::debug!(
                "{}: set_parent promotes {child} to dynamic (new parent is dynamic)",
                self.id
            );
        }

        // Walk the subtree top-down: new depth, partition relocation,
        // parent-ref patching.
        let subtree = self.collect_subtree(child);
        for &h in &subtree {
            let (parent_ref, depth) = if h == child {
                (parent_node, new_depth)
            } else {
                let ph = self
                    .objects
                    .get(h)
                    .map(|o| o.parent)
                    .unwrap_or(Handle::NONE);
                match self.objects.get(ph) {
                    Some(po) => (Some(po.node), po.depth + 1),
                    None => (None, 0),
                }
            };
            let Some(obj) = self.objects.get_mut(h) else {
                continue;
            };
            obj.depth = depth;
            if promote {
                obj.mobility = Mobility::Dynamic;
            }
            let mobility = obj.mobility;
            let old_ref = obj.node;
            if let Some(nr) = self.transforms.relocate(old_ref, mobility, depth) {
                obj.node = nr;
            }
            let node_ref = obj.node;
            if let Some(node) = self.transforms.get_mut(node_ref) {
                node.parent = parent_ref;
            }
        }

        if rule == TransformRule::KeepWorld {
            if let Some((world, _)) = captured {
                let child_ref = self
                    .objects
                    .get(child)
                    .map(|o| o.node)
                    .unwrap_or(child_node);
                let parent_world = parent_node.and_then(|p| self.transforms.world_of(p));
                if let Some(node) = self.transforms.get_mut(child_ref) {
                    node.world.position = world.position;
                    node.world.rotation = world.rotation;
                    match parent_world {
                        Some((pt, pm)) => {
                            node.local.position = pm.inverse().transform_point3(world.position);
                            node.local.rotation =
                                (pt.rotation.inverse() * world.rotation).normalize();
                        }
                        None => {
                            node.local.position = world.position;
                            node.local.rotation = world.rotation;
                        }
                    }
                }
            }
        }

        // One top-down refresh so static nodes get their one-time
        // recompute and getters are fresh immediately.
        for &h in &subtree {
            if let Some(obj) = self.objects.get(h) {
                self.transforms.refresh(obj.node);
            }
        }
    }

    /// Change an object's mobility class.
    ///
    /// Promotion to Dynamic always succeeds and forces the whole subtree
    /// dynamic.  Demotion to Static is refused — with a warning, state
    /// intact — while the parent is Dynamic or any attached component is
    /// Dynamic-mode; on success only the object itself is demoted.
    /// Returns whether the requested mobility is in effect afterwards.
    pub fn set_dynamic(&mut self, object: Handle, dynamic: bool) -> bool {
        let Some(obj) = self.objects.get(object) else {
            log::warn!("{}: set_dynamic: {object} does not resolve", self.id);
            return false;
        };
        if obj.destroyed {
            return false;
        }
        if obj.is_dynamic() == dynamic {
            return true;
        }

        if dynamic {
            let subtree = self.collect_subtree(object);
            for &h in &subtree {
                let parent_ref = if h == object {
                    None // own parent did not relocate
                } else {
                    let ph = self
                        .objects
                        .get(h)
                        .map(|o| o.parent)
                        .unwrap_or(Handle::NONE);
                    self.objects.get(ph).map(|po| po.node)
                };
                let Some(obj) = self.objects.get_mut(h) else {
                    continue;
                };
                obj.mobility = Mobility::Dynamic;
                let depth = obj.depth;
                let old_ref = obj.node;
                if let Some(nr) = self.transforms.relocate(old_ref, Mobility::Dynamic, depth) {
                    obj.node = nr;
                }
                let node_ref = obj.node;
                if let Some(pref) = parent_ref {
                    if let Some(node) = self.transforms.get_mut(node_ref) {
                        node.parent = Some(pref);
                    }
                }
            }
            true
        } else {
            let parent = obj.parent;
            if parent.is_some() && self.objects.get(parent).is_some_and(|p| p.is_dynamic()) {
                log::warn!(
                    "{}: set_dynamic(false) refused for '{}': parent is dynamic",
                    self.id,
                    obj.name
                );
                return false;
            }
            let keys = obj.components.clone();
            for key in &keys {
                let is_dynamic_component = self
                    .stores
                    .get(&key.type_id)
                    .and_then(|s| s.mode_of(key.handle))
                    == Some(ComponentMode::Dynamic);
                if is_dynamic_component {
                    log::warn!(
                        "{}: set_dynamic(false) refused for {object}: dynamic component attached",
                        self.id
                    );
                    return false;
                }
            }

            let Some(obj) = self.objects.get_mut(object) else {
                return false;
            };
            obj.mobility = Mobility::Static;
            let depth = obj.depth;
            let old_ref = obj.node;
            if let Some(nr) = self.transforms.relocate(old_ref, Mobility::Static, depth) {
                obj.node = nr;
            }
            let node_ref = obj.node;
            // Direct children point at the relocated node.
            for c in self.children(object) {
                if let Some(cn) = self.objects.get(c).map(|o| o.node) {
                    if let Some(node) = self.transforms.get_mut(cn) {
                        node.parent = Some(node_ref);
                    }
                }
            }
            // Static transforms are computed once, here.
            self.transforms.refresh(node_ref);
            true
        }
    }

    // ─── Components ────────────────────────────────────────────────────────

    /// Ensure the store for `T` exists and its tick functions are queued
    /// for registration.  Idempotent; called automatically by
    /// [`World::create_component`].
    pub fn register_component<T: Component>(&mut self) -> ComponentTypeId {
        let tid = component_type_id::<T>();
        if !self.stores.contains_key(&tid) {
            self.stores
                .insert(tid, Box::new(ComponentStore::<T>::new(tid)));
            for descriptor in T::tick_descriptors() {
                let phase = descriptor.phase;
                self.pending_ticks.push(PendingTick {
                    descriptor,
                    owner: DependencyKey::Component(tid),
                    callback: Box::new(move |world, ctx| {
                        world.run_component_phase(tid, phase, ctx);
                    }),
                });
            }
            log::debug!("{}: registered component type {}", self.id, T::type_name());
        }
        tid
    }

    /// Attach a component to `owner`.  Fails — warning, `NONE` key — if
    /// the owner is destroyed or does not resolve in this world.  The
    /// begin-lifecycle hook runs later, at the deferred initialization
    /// point of the next fixed step.  Attaching a Dynamic-mode component
    /// to a Static object promotes the object first.
    pub fn create_component<T: Component>(
        &mut self,
        owner: Handle,
        mode: ComponentMode,
        component: T,
    ) -> ComponentKey {
        let tid = self.register_component::<T>();
        let owner_state = self.objects.get(owner).map(|o| (o.destroyed, o.mobility));
        match owner_state {
            None => {
                log::warn!(
                    "{}: create_component({}) refused: owner {owner} does not resolve here",
                    self.id,
                    T::type_name()
                );
                return ComponentKey::none(tid);
            }
            Some((true, _)) => {
                log::warn!(
                    "{}: create_component({}) refused: owner {owner} is destroyed",
                    self.id,
                    T::type_name()
                );
                return ComponentKey::none(tid);
            }
            Some((false, Mobility::Static)) if mode == ComponentMode::Dynamic => {
                log::debug!(
                    "{}: dynamic component {} promotes {owner} to dynamic",
                    self.id,
                    T::type_name()
                );
                self.set_dynamic(owner, true);
            }
            _ => {}
        }

        let handle = match self.store_mut::<T>() {
            Some(store) => store.create(owner, mode, component),
            None => Handle::NONE,
        };
        if handle.is_none() {
            return ComponentKey::none(tid);
        }
        let key = ComponentKey {
            type_id: tid,
            handle,
        };
        if let Some(obj) = self.objects.get_mut(owner) {
            obj.components.push(key);
        }
        self.pending_init.push_back(key);
        key
    }

    /// Typed access to a component.  Marked-for-destruction components
    /// still resolve until the GC point.
    pub fn component<T: Component>(&self, key: ComponentKey) -> Option<&T> {
        self.store::<T>()?.get(key.handle)
    }

    pub fn component_mut<T: Component>(&mut self, key: ComponentKey) -> Option<&mut T> {
        self.store_mut::<T>()?.get_mut(key.handle)
    }

    /// Iterate every component of type `T`, marked-for-destruction entries
    /// included.
    pub fn components<T: Component>(&self) -> impl Iterator<Item = (ComponentKey, &T)> {
        let tid = component_type_id::<T>();
        self.store::<T>()
            .into_iter()
            .flat_map(move |s| s.iter().map(move |(h, v)| (ComponentKey { type_id: tid, handle: h }, v)))
    }

    pub fn component_is_initialized(&self, key: ComponentKey) -> bool {
        self.stores
            .get(&key.type_id)
            .is_some_and(|s| s.is_initialized(key.handle))
    }

    pub fn component_owner(&self, key: ComponentKey) -> Option<Handle> {
        self.stores.get(&key.type_id)?.owner_of(key.handle)
    }

    /// Deinitialize now, free later: the component is marked for
    /// destruction and stays reachable through its owner's key list until
    /// the next GC point.  Duplicate calls are no-ops.
    pub fn destroy_component(&mut self, key: ComponentKey) {
        let Some(store) = self.stores.get_mut(&key.type_id) else {
            return;
        };
        store.deinitialize(key.handle, &mut self.events);
        if store.mark_destroyed(key.handle) {
            self.dead_components.push(key);
        }
    }

    fn store<T: Component>(&self) -> Option<&ComponentStore<T>> {
        self.stores
            .get(&component_type_id::<T>())?
            .as_any()
            .downcast_ref()
    }

    fn store_mut<T: Component>(&mut self) -> Option<&mut ComponentStore<T>> {
        self.stores
            .get_mut(&component_type_id::<T>())?
            .as_any_mut()
            .downcast_mut()
    }

    // ─── Tick functions ────────────────────────────────────────────────────

    /// Queue a tick function for its descriptor's group.  Registrations
    /// are flushed into the groups at the start of the next fixed step.
    pub fn add_tick_function(
        &mut self,
        descriptor: TickFunctionDescriptor,
        owner: DependencyKey,
        callback: TickCallback,
    ) {
        self.pending_ticks.push(PendingTick {
            descriptor,
            owner,
            callback,
        });
    }

    fn flush_pending_ticks(&mut self) {
        for pending in self.pending_ticks.drain(..) {
            let index = pending.descriptor.phase.index();
            self.groups[index].add_function(pending.descriptor, pending.owner, pending.callback);
        }
    }

    fn run_component_phase(&mut self, tid: ComponentTypeId, phase: TickPhase, ctx: &TickContext) {
        let Some(store) = self.stores.get_mut(&tid) else {
            return;
        };
        let mut env = TickEnv {
            ctx,
            commands: &mut self.commands,
            objects: &self.objects,
            transforms: &self.transforms,
        };
        store.run_phase(phase, &mut env);
    }

    fn dispatch_phase(&mut self, phase: TickPhase, ctx: &TickContext) {
        // The group is detached for the duration of its dispatch so
        // callbacks get the full `&mut World`.  New registrations made by
        // callbacks land in `pending_ticks`, never directly in a group, so
        // putting the group back cannot clobber anything.
        let index = phase.index();
        let mut group = std::mem::take(&mut self.groups[index]);
        group.dispatch(self, ctx);
        self.groups[index] = group;
    }

    fn make_context(&self, delta: f32, interpolation: f32) -> TickContext {
        TickContext {
            delta,
            fixed_delta: self.timer.fixed_dt(),
            elapsed: self.elapsed,
            interpolation,
            paused: self.paused,
            frame: self.frame,
            step: self.step,
        }
    }

    fn apply_commands(&mut self) {
        // Commands may themselves enqueue commands (e.g. a SetParent from
        // a hook triggering a promotion); those run at the next sync point.
        for command in self.commands.take_queue() {
            match command {
                WorldCommand::SetLocalPosition { object, position } => {
                    self.set_local_position(object, position);
                }
                WorldCommand::SetLocalRotation { object, rotation } => {
                    self.set_local_rotation(object, rotation);
                }
                WorldCommand::SetLocalScale { object, scale } => {
                    self.set_local_scale(object, scale);
                }
                WorldCommand::SetParent {
                    child,
                    parent,
                    rule,
                } => self.set_parent(child, parent, rule),
                WorldCommand::SetDynamic { object, dynamic } => {
                    self.set_dynamic(object, dynamic);
                }
                WorldCommand::DestroyObject { object } => self.destroy_object(object),
                WorldCommand::DestroyComponent { key } => self.destroy_component(key),
                WorldCommand::SetPaused(paused) => self.queue_pause(paused),
            }
        }
    }

    // ─── Frame loop ────────────────────────────────────────────────────────

    /// Advance the world by one render frame.
    ///
    /// Order per the scheduling contract: pause commands → `Update` →
    /// per fixed step (flip state buffer, flush tick registrations, flush
    /// deferred initializations, `FixedUpdate`, `PhysicsUpdate`, GC point,
    /// transform pass, `PostTransform`) → `LateUpdate` with the leftover
    /// interpolation factor.
    pub fn frame(&mut self, dt: f32) {
        self.frame += 1;
        self.elapsed += dt as f64;
        for paused in self.pause_requests.drain(..) {
            self.paused = paused;
        }

        let ctx = self.make_context(dt, 0.0);
        self.dispatch_phase(TickPhase::Update, &ctx);
        self.apply_commands();

        self.timer.advance(dt);
        while self.timer.consume() {
            self.step += 1;
            self.state_index ^= 1;
            self.flush_pending_ticks();
            self.flush_pending_init();

            let step_ctx = self.make_context(self.timer.fixed_dt(), 0.0);
            self.dispatch_phase(TickPhase::FixedUpdate, &step_ctx);
            self.apply_commands();
            self.dispatch_phase(TickPhase::PhysicsUpdate, &step_ctx);
            self.apply_commands();

            self.collect_garbage();
            self.transforms.update_dynamic();

            self.dispatch_phase(TickPhase::PostTransform, &step_ctx);
            self.apply_commands();
        }

        let late_ctx = self.make_context(dt, self.timer.alpha());
        self.dispatch_phase(TickPhase::LateUpdate, &late_ctx);
        self.apply_commands();
    }

    /// Request a pause state change; applied at the start of the next
    /// frame.  While paused, only tick functions flagged `run_when_paused`
    /// execute — the frame structure (GC, transform pass) still runs.
    pub fn queue_pause(&mut self, paused: bool) {
        self.pause_requests.push(paused);
    }

    fn flush_pending_init(&mut self) {
        // FIFO: components initialize in creation order.
        while let Some(key) = self.pending_init.pop_front() {
            if let Some(store) = self.stores.get_mut(&key.type_id) {
                store.initialize(key.handle, &mut self.events);
            }
        }
    }

    /// The GC point: physically free everything marked since the last
    /// step.  Components first (their owners must still resolve so key
    /// lists can be patched), then objects bottom-up.
    fn collect_garbage(&mut self) {
        let dead_components = std::mem::take(&mut self.dead_components);
        for key in dead_components {
            let Some(store) = self.stores.get_mut(&key.type_id) else {
                continue;
            };
            let owner = store.owner_of(key.handle);
            store.free(key.handle);
            if let Some(owner) = owner {
                if let Some(obj) = self.objects.get_mut(owner) {
                    obj.components.retain(|k| *k != key);
                }
            }
        }

        let dead_objects = std::mem::take(&mut self.dead_objects);
        for handle in dead_objects {
            let Some(obj) = self.objects.get(handle) else {
                continue;
            };
            let node = obj.node;
            self.unlink_sibling(handle);
            self.transforms.remove(node);
            self.objects.free(handle);
        }
    }

    // ─── Transforms ────────────────────────────────────────────────────────

    /// Recompute the Dynamic partition, level by level.  Runs inside every
    /// fixed step; exposed for tools and tests.
    pub fn update_world_transforms(&mut self) {
        self.transforms.update_dynamic();
    }

    pub fn local_transform(&self, object: Handle) -> Option<Transform> {
        let node = self.objects.get(object)?.node;
        Some(self.transforms.get(node)?.local)
    }

    pub fn world_transform(&self, object: Handle) -> Option<Transform> {
        let node = self.objects.get(object)?.node;
        Some(self.transforms.get(node)?.world)
    }

    pub fn world_position(&self, object: Handle) -> Option<Vec3> {
        self.world_transform(object).map(|t| t.position)
    }

    pub fn world_rotation(&self, object: Handle) -> Option<Quat> {
        self.world_transform(object).map(|t| t.rotation)
    }

    pub fn world_matrix(&self, object: Handle) -> Option<Affine3A> {
        let node = self.objects.get(object)?.node;
        Some(self.transforms.get(node)?.world_matrix)
    }

    pub fn set_local_position(&mut self, object: Handle, position: Vec3) {
        self.with_node(object, |node| node.local.position = position);
    }

    pub fn set_local_rotation(&mut self, object: Handle, rotation: Quat) {
        self.with_node(object, |node| node.local.rotation = rotation.normalize());
    }

    pub fn set_local_scale(&mut self, object: Handle, scale: Vec3) {
        self.with_node(object, |node| node.local.scale = scale);
    }

    pub fn set_local_transform(&mut self, object: Handle, local: Transform) {
        self.with_node(object, |node| node.local = local);
    }

    /// Interpret the local position in world space (skip the parent).
    pub fn set_absolute_position(&mut self, object: Handle, absolute: bool) {
        self.with_node(object, |node| node.absolute_position = absolute);
    }

    pub fn set_absolute_rotation(&mut self, object: Handle, absolute: bool) {
        self.with_node(object, |node| node.absolute_rotation = absolute);
    }

    pub fn set_absolute_scale(&mut self, object: Handle, absolute: bool) {
        self.with_node(object, |node| node.absolute_scale = absolute);
    }

    /// Lock world position/rotation: the transform pass re-derives the
    /// local values instead of overwriting the world ones.  Used by
    /// physics-driven components.
    pub fn set_keep_world(&mut self, object: Handle, keep: bool) {
        self.with_node(object, |node| node.keep_world = keep);
    }

    /// Apply `f` to the object's node, then refresh the subtree once so
    /// static descendants (computed-once by contract) see the change.
    fn with_node(&mut self, object: Handle, f: impl FnOnce(&mut TransformNode)) {
        let Some(node_ref) = self.objects.get(object).map(|o| o.node) else {
            return;
        };
        let Some(node) = self.transforms.get_mut(node_ref) else {
            return;
        };
        f(node);
        for h in self.collect_subtree(object) {
            if let Some(obj) = self.objects.get(h) {
                self.transforms.refresh(obj.node);
            }
        }
    }

    // ─── Events & notifications ────────────────────────────────────────────

    /// Deliver `event` to every component subscribed to its type, in
    /// subscription order.
    pub fn emit<E: 'static>(&mut self, event: &E) {
        let subscribers = self.events.subscribers(TypeId::of::<E>()).to_vec();
        for key in subscribers {
            if let Some(store) = self.stores.get_mut(&key.type_id) {
                store.deliver_event(key.handle, event);
            }
        }
    }

    /// Forward a physics contact to one component.  Entry point for
    /// external collision backends.
    pub fn notify_contact(&mut self, key: ComponentKey, other: Handle) {
        if let Some(store) = self.stores.get_mut(&key.type_id) {
            store.notify_contact(key.handle, other);
        }
    }

    pub fn notify_overlap(&mut self, key: ComponentKey, other: Handle) {
        if let Some(store) = self.stores.get_mut(&key.type_id) {
            store.notify_overlap(key.handle, other);
        }
    }

    /// Run every component's debug-draw hook.
    pub fn draw_debug(&mut self) {
        let ctx = self.make_context(0.0, 0.0);
        let env = TickEnv {
            ctx: &ctx,
            commands: &mut self.commands,
            objects: &self.objects,
            transforms: &self.transforms,
        };
        for store in self.stores.values() {
            store.draw_debug(&env);
        }
    }

    // ─── Interfaces ────────────────────────────────────────────────────────

    /// Install a singleton service.  Exactly once per world: a duplicate
    /// install is refused with a warning.  `on_install` runs before the
    /// interface becomes reachable.
    pub fn install_interface<I: WorldInterface>(&mut self, mut interface: I) -> bool {
        let iid = interface_type_id::<I>();
        if self.interfaces.contains_key(&iid) {
            log::warn!(
                "{}: interface {} already installed",
                self.id,
                std::any::type_name::<I>()
            );
            return false;
        }
        interface.on_install(self);
        self.interfaces.insert(iid, Box::new(interface));
        true
    }

    pub fn interface<I: WorldInterface>(&self) -> Option<&I> {
        self.interfaces
            .get(&interface_type_id::<I>())?
            .downcast_ref()
    }

    pub fn interface_mut<I: WorldInterface>(&mut self) -> Option<&mut I> {
        self.interfaces
            .get_mut(&interface_type_id::<I>())?
            .downcast_mut()
    }

    // ─── Internal hierarchy plumbing ───────────────────────────────────────

    /// Top-down DFS over an object and its descendants.
    fn collect_subtree(&self, root: Handle) -> Vec<Handle> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(h) = stack.pop() {
            let Some(obj) = self.objects.get(h) else {
                continue;
            };
            out.push(h);
            let mut c = obj.first_child;
            while c.is_some() {
                stack.push(c);
                c = self
                    .objects
                    .get(c)
                    .map(|o| o.next_sibling)
                    .unwrap_or(Handle::NONE);
            }
        }
        out
    }

    fn unlink_sibling(&mut self, child: Handle) {
        let Some(obj) = self.objects.get(child) else {
            return;
        };
        let (parent, prev, next) = (obj.parent, obj.prev_sibling, obj.next_sibling);

        if let Some(p) = self.objects.get_mut(prev) {
            p.next_sibling = next;
        }
        if let Some(n) = self.objects.get_mut(next) {
            n.prev_sibling = prev;
        }
        if let Some(po) = self.objects.get_mut(parent) {
            if po.first_child == child {
                po.first_child = next;
            }
            if po.last_child == child {
                po.last_child = prev;
            }
        }
        if let Some(obj) = self.objects.get_mut(child) {
            obj.parent = Handle::NONE;
            obj.prev_sibling = Handle::NONE;
            obj.next_sibling = Handle::NONE;
        }
    }

    /// Append `child` as `parent`'s last child.
    fn link_last_child(&mut self, parent: Handle, child: Handle) {
        let Some(last) = self.objects.get(parent).map(|p| p.last_child) else {
            return;
        };
        if let Some(l) = self.objects.get_mut(last) {
            l.next_sibling = child;
        }
        if let Some(po) = self.objects.get_mut(parent) {
            if last.is_none() {
                po.first_child = child;
            }
            po.last_child = child;
        }
        if let Some(co) = self.objects.get_mut(child) {
            co.parent = parent;
            co.prev_sibling = last;
            co.next_sibling = Handle::NONE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::StoragePolicy;
    use std::any::TypeId;
    use std::sync::atomic::AtomicU32;
    use std::sync::{Arc, Mutex};

    const DT: f32 = DEFAULT_FIXED_TIMESTEP;

    // ── hierarchy & transforms ─────────────────────────────────────────────

    #[test]
    fn world_transforms_compose_down_the_chain() {
        let mut w = World::new();
        let root = w.create_object("root", Mobility::Dynamic, None);
        let a = w.create_object("a", Mobility::Dynamic, Some(root));
        let b = w.create_object("b", Mobility::Dynamic, Some(a));

        w.set_local_position(root, Vec3::X);
        w.set_local_position(a, Vec3::X);
        w.set_local_position(b, Vec3::X);

        // Setters refresh the subtree immediately...
        assert!((w.world_position(b).unwrap() - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5);

        // ...and the per-step pass agrees.
        w.frame(DT);
        assert!((w.world_position(b).unwrap() - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn static_child_of_dynamic_parent_is_forced_dynamic() {
        let mut w = World::new();
        let p = w.create_object("p", Mobility::Dynamic, None);
        let c = w.create_object("c", Mobility::Static, Some(p));
        assert!(w.get(c).unwrap().is_dynamic());
    }

    #[test]
    fn reparent_keep_world_preserves_placement() {
        let mut w = World::new();
        let parent = w.create_object("parent", Mobility::Dynamic, None);
        let child = w.create_object("child", Mobility::Dynamic, None);
        w.set_local_position(parent, Vec3::new(2.0, 0.0, 0.0));
        w.set_local_position(child, Vec3::new(5.0, 0.0, 0.0));

        w.set_parent(child, Some(parent), TransformRule::KeepWorld);

        assert_eq!(w.get(child).unwrap().parent(), parent);
        assert_eq!(w.get(child).unwrap().depth(), 1);
        let world = w.world_position(child).unwrap();
        let local = w.local_transform(child).unwrap().position;
        assert!((world - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-5);
        assert!((local - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn reparent_keep_relative_moves_with_new_ancestry() {
        let mut w = World::new();
        let parent = w.create_object("parent", Mobility::Dynamic, None);
        let child = w.create_object("child", Mobility::Dynamic, None);
        w.set_local_position(parent, Vec3::new(2.0, 0.0, 0.0));
        w.set_local_position(child, Vec3::new(5.0, 0.0, 0.0));

        w.set_parent(child, Some(parent), TransformRule::KeepRelative);

        assert!((w.world_position(child).unwrap() - Vec3::new(7.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn reparent_to_own_descendant_is_refused() {
        let mut w = World::new();
        let a = w.create_object("a", Mobility::Dynamic, None);
        let b = w.create_object("b", Mobility::Dynamic, Some(a));
        let c = w.create_object("c", Mobility::Dynamic, Some(b));

        w.set_parent(a, Some(c), TransformRule::KeepRelative);

        // Unchanged: a is still a root, c still hangs under b.
        assert!(w.get(a).unwrap().parent().is_none());
        assert_eq!(w.get(c).unwrap().parent(), b);
    }

    #[test]
    fn promotion_cascades_demotion_does_not() {
        let mut w = World::new();
        let p = w.create_object("p", Mobility::Static, None);
        let c = w.create_object("c", Mobility::Static, Some(p));

        assert!(w.set_dynamic(p, true));
        assert!(w.get(p).unwrap().is_dynamic());
        assert!(w.get(c).unwrap().is_dynamic());

        // Demoting the child is refused while its parent is dynamic.
        assert!(!w.set_dynamic(c, false));
        assert!(w.get(c).unwrap().is_dynamic());

        // Demoting the root only demotes the root.
        assert!(w.set_dynamic(p, false));
        assert_eq!(w.get(p).unwrap().mobility(), Mobility::Static);
        assert!(w.get(c).unwrap().is_dynamic());
    }

    // ── components & lifecycle ─────────────────────────────────────────────

    #[derive(Default, Clone)]
    struct Probe {
        inits: Arc<AtomicU32>,
        deinits: Arc<AtomicU32>,
        steps: Arc<AtomicU32>,
    }

    impl Component for Probe {
        fn tick_descriptors() -> Vec<TickFunctionDescriptor> {
            vec![TickFunctionDescriptor::new(TickPhase::FixedUpdate)]
        }
        fn on_init(&mut self, _owner: Handle) {
            self.inits.fetch_add(1, Ordering::Relaxed);
        }
        fn on_deinit(&mut self) {
            self.deinits.fetch_add(1, Ordering::Relaxed);
        }
        fn fixed_update(&mut self, _owner: Handle, _env: &mut TickEnv<'_>) {
            self.steps.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn component_init_is_deferred_to_the_fixed_step() {
        let mut w = World::new();
        let probe = Probe::default();
        let obj = w.create_object("obj", Mobility::Dynamic, None);
        let key = w.create_component(obj, ComponentMode::Dynamic, probe.clone());

        assert!(key.is_some());
        assert!(!w.component_is_initialized(key));
        assert_eq!(probe.inits.load(Ordering::Relaxed), 0);

        w.frame(DT);
        assert!(w.component_is_initialized(key));
        assert_eq!(probe.inits.load(Ordering::Relaxed), 1);
        assert_eq!(probe.steps.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn destroyed_component_lingers_until_gc() {
        let mut w = World::new();
        let probe = Probe::default();
        let obj = w.create_object("obj", Mobility::Dynamic, None);
        let key = w.create_component(obj, ComponentMode::Dynamic, probe.clone());
        w.frame(DT);

        w.destroy_component(key);
        // Deinitialized immediately, freed later.
        assert_eq!(probe.deinits.load(Ordering::Relaxed), 1);
        assert!(w.component::<Probe>(key).is_some());
        assert!(!w.component_is_initialized(key));
        assert_eq!(w.get(obj).unwrap().component_keys().len(), 1);

        w.destroy_component(key); // duplicate mark is a no-op
        assert_eq!(probe.deinits.load(Ordering::Relaxed), 1);
        assert_eq!(w.components::<Probe>().count(), 1);

        w.frame(DT);
        assert!(w.component::<Probe>(key).is_none());
        assert!(w.get(obj).unwrap().component_keys().is_empty());
        assert_eq!(w.components::<Probe>().count(), 0);
    }

    #[test]
    fn dynamic_component_promotes_static_owner() {
        let mut w = World::new();
        let obj = w.create_object("obj", Mobility::Static, None);
        w.create_component(obj, ComponentMode::Dynamic, Probe::default());
        assert!(w.get(obj).unwrap().is_dynamic());
        // And now the owner cannot be demoted back.
        assert!(!w.set_dynamic(obj, false));
    }

    #[test]
    fn create_component_on_destroyed_owner_is_refused() {
        let mut w = World::new();
        let obj = w.create_object("obj", Mobility::Dynamic, None);
        w.destroy_object(obj);
        let key = w.create_component(obj, ComponentMode::Static, Probe::default());
        assert!(key.is_none());
    }

    #[derive(Default, Clone)]
    struct Bumper {
        contacts: Arc<AtomicU32>,
        overlaps: Arc<AtomicU32>,
        draws: Arc<AtomicU32>,
    }

    impl Component for Bumper {
        fn on_contact(&mut self, _owner: Handle, _other: Handle) {
            self.contacts.fetch_add(1, Ordering::Relaxed);
        }
        fn on_overlap(&mut self, _owner: Handle, _other: Handle) {
            self.overlaps.fetch_add(1, Ordering::Relaxed);
        }
        fn draw_debug(&self, _owner: Handle, _env: &TickEnv<'_>) {
            self.draws.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[derive(Default, Clone)]
    struct Gizmo {
        draws: Arc<AtomicU32>,
    }

    impl Component for Gizmo {
        fn draw_debug(&self, _owner: Handle, _env: &TickEnv<'_>) {
            self.draws.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn notifications_and_debug_draw_respect_the_lifecycle() {
        let mut w = World::new();
        let bumper = Bumper::default();
        let gizmo = Gizmo::default();
        let obj = w.create_object("obj", Mobility::Dynamic, None);
        let other = w.create_object("other", Mobility::Dynamic, None);
        let key = w.create_component(obj, ComponentMode::Dynamic, bumper.clone());
        w.create_component(other, ComponentMode::Dynamic, gizmo.clone());

        // Before the deferred init point nothing is delivered.
        w.notify_contact(key, other);
        w.draw_debug();
        assert_eq!(bumper.contacts.load(Ordering::Relaxed), 0);
        assert_eq!(bumper.draws.load(Ordering::Relaxed), 0);

        w.frame(DT);
        w.notify_contact(key, other);
        w.notify_overlap(key, other);
        w.draw_debug();
        assert_eq!(bumper.contacts.load(Ordering::Relaxed), 1);
        assert_eq!(bumper.overlaps.load(Ordering::Relaxed), 1);
        assert_eq!(bumper.draws.load(Ordering::Relaxed), 1);
        // The debug pass visits every store, not just one type.
        assert_eq!(gizmo.draws.load(Ordering::Relaxed), 1);

        // Marked-for-destruction components are suppressed even though
        // they linger in the store until the GC point.
        w.destroy_component(key);
        w.notify_contact(key, other);
        w.notify_overlap(key, other);
        w.draw_debug();
        assert_eq!(bumper.contacts.load(Ordering::Relaxed), 1);
        assert_eq!(bumper.overlaps.load(Ordering::Relaxed), 1);
        assert_eq!(bumper.draws.load(Ordering::Relaxed), 1);
        assert_eq!(gizmo.draws.load(Ordering::Relaxed), 2);
    }

    // ── destruction & handle recycling ─────────────────────────────────────

    #[test]
    fn destroy_object_cascades_and_handles_go_stale() {
        let mut w = World::new();
        let probe = Probe::default();
        let parent = w.create_object("parent", Mobility::Dynamic, None);
        let child = w.create_object("child", Mobility::Dynamic, Some(parent));
        w.create_component(child, ComponentMode::Dynamic, probe.clone());
        w.frame(DT);

        w.destroy_object(parent);
        // Marked, still resolvable, component already deinitialized.
        assert!(w.get(parent).unwrap().is_destroyed());
        assert!(w.get(child).unwrap().is_destroyed());
        assert_eq!(probe.deinits.load(Ordering::Relaxed), 1);

        w.frame(DT);
        assert!(w.get(parent).is_none());
        assert!(w.get(child).is_none());
        assert_eq!(w.object_count(), 0);
    }

    #[test]
    fn recycled_slot_does_not_alias_old_handle() {
        let mut w = World::new();
        let a = w.create_object("a", Mobility::Static, None);
        w.destroy_object(a);
        w.frame(DT);

        let b = w.create_object("b", Mobility::Static, None);
        assert_eq!(b.index(), a.index());
        assert_ne!(a, b);
        assert!(w.get(a).is_none());
        assert_eq!(w.get(b).unwrap().name(), "b");
    }

    // ── tick ordering across component types ──────────────────────────────

    type OrderLog = Arc<Mutex<Vec<&'static str>>>;

    struct StageX(OrderLog);
    struct StageY(OrderLog);
    struct StageZ(OrderLog);

    impl Component for StageX {
        fn tick_descriptors() -> Vec<TickFunctionDescriptor> {
            vec![TickFunctionDescriptor::new(TickPhase::FixedUpdate)]
        }
        fn fixed_update(&mut self, _owner: Handle, _env: &mut TickEnv<'_>) {
            self.0.lock().unwrap().push("x");
        }
    }

    impl Component for StageY {
        fn tick_descriptors() -> Vec<TickFunctionDescriptor> {
            vec![TickFunctionDescriptor::new(TickPhase::FixedUpdate)
                .with_prerequisite(DependencyKey::Component(component_type_id::<StageX>()))]
        }
        fn fixed_update(&mut self, _owner: Handle, _env: &mut TickEnv<'_>) {
            self.0.lock().unwrap().push("y");
        }
    }

    impl Component for StageZ {
        fn tick_descriptors() -> Vec<TickFunctionDescriptor> {
            vec![TickFunctionDescriptor::new(TickPhase::FixedUpdate)
                .with_prerequisite(DependencyKey::Component(component_type_id::<StageY>()))]
        }
        fn fixed_update(&mut self, _owner: Handle, _env: &mut TickEnv<'_>) {
            self.0.lock().unwrap().push("z");
        }
    }

    #[test]
    fn dependencies_beat_registration_order() {
        let mut w = World::new();
        let log: OrderLog = Arc::new(Mutex::new(Vec::new()));
        let obj = w.create_object("obj", Mobility::Dynamic, None);
        // Registered Z first on purpose.
        w.create_component(obj, ComponentMode::Dynamic, StageZ(log.clone()));
        w.create_component(obj, ComponentMode::Dynamic, StageX(log.clone()));
        w.create_component(obj, ComponentMode::Dynamic, StageY(log.clone()));

        w.frame(DT);
        assert_eq!(*log.lock().unwrap(), vec!["x", "y", "z"]);
    }

    // ── deferred commands from hooks ───────────────────────────────────────

    struct Mover;
    impl Component for Mover {
        fn tick_descriptors() -> Vec<TickFunctionDescriptor> {
            vec![TickFunctionDescriptor::new(TickPhase::FixedUpdate)]
        }
        fn fixed_update(&mut self, owner: Handle, env: &mut TickEnv<'_>) {
            let p = env.local_transform(owner).map(|t| t.position).unwrap_or_default();
            env.commands.set_local_position(owner, p + Vec3::X);
        }
    }

    #[test]
    fn hook_commands_apply_at_the_sync_point() {
        let mut w = World::new();
        let obj = w.create_object("obj", Mobility::Dynamic, None);
        w.create_component(obj, ComponentMode::Dynamic, Mover);

        w.frame(DT);
        assert!((w.world_position(obj).unwrap() - Vec3::X).length() < 1e-5);
        w.frame(DT);
        assert!((w.world_position(obj).unwrap() - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }

    // ── pause ──────────────────────────────────────────────────────────────

    #[derive(Default, Clone)]
    struct Clocked {
        steps: Arc<AtomicU32>,
    }
    impl Component for Clocked {
        fn storage_policy() -> StoragePolicy {
            StoragePolicy::StableSlots
        }
        fn tick_descriptors() -> Vec<TickFunctionDescriptor> {
            vec![TickFunctionDescriptor::new(TickPhase::FixedUpdate).run_when_paused(true)]
        }
        fn fixed_update(&mut self, _owner: Handle, _env: &mut TickEnv<'_>) {
            self.steps.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn pause_skips_unflagged_functions_only() {
        let mut w = World::new();
        let normal = Probe::default();
        let clocked = Clocked::default();
        let obj = w.create_object("obj", Mobility::Dynamic, None);
        w.create_component(obj, ComponentMode::Dynamic, normal.clone());
        w.create_component(obj, ComponentMode::Dynamic, clocked.clone());
        w.frame(DT);
        assert_eq!(normal.steps.load(Ordering::Relaxed), 1);
        assert_eq!(clocked.steps.load(Ordering::Relaxed), 1);

        w.queue_pause(true);
        assert!(!w.is_paused()); // applied at the next frame boundary
        w.frame(DT);
        assert!(w.is_paused());
        assert_eq!(normal.steps.load(Ordering::Relaxed), 1);
        assert_eq!(clocked.steps.load(Ordering::Relaxed), 2);

        w.queue_pause(false);
        w.frame(DT);
        assert_eq!(normal.steps.load(Ordering::Relaxed), 2);
    }

    // ── events ─────────────────────────────────────────────────────────────

    struct Damage(u32);

    #[derive(Default, Clone)]
    struct Health {
        taken: Arc<AtomicU32>,
    }
    impl Component for Health {
        fn subscriptions() -> Vec<TypeId> {
            vec![TypeId::of::<Damage>()]
        }
        fn on_event(&mut self, event: &dyn Any) {
            if let Some(d) = event.downcast_ref::<Damage>() {
                self.taken.fetch_add(d.0, Ordering::Relaxed);
            }
        }
    }

    #[test]
    fn events_reach_initialized_subscribers_only() {
        let mut w = World::new();
        let health = Health::default();
        let obj = w.create_object("obj", Mobility::Dynamic, None);
        let key = w.create_component(obj, ComponentMode::Static, health.clone());

        // Not initialized yet: no delivery.
        w.emit(&Damage(5));
        assert_eq!(health.taken.load(Ordering::Relaxed), 0);

        w.frame(DT);
        w.emit(&Damage(5));
        assert_eq!(health.taken.load(Ordering::Relaxed), 5);

        // Destruction unsubscribes immediately.
        w.destroy_component(key);
        w.emit(&Damage(7));
        assert_eq!(health.taken.load(Ordering::Relaxed), 5);
    }

    // ── interfaces ─────────────────────────────────────────────────────────

    struct Metronome {
        beats: Arc<AtomicU32>,
    }

    impl WorldInterface for Metronome {
        fn on_install(&mut self, world: &mut World) {
            let beats = self.beats.clone();
            world.add_tick_function(
                TickFunctionDescriptor::new(TickPhase::FixedUpdate),
                DependencyKey::Interface(interface_type_id::<Metronome>()),
                Box::new(move |_, _| {
                    beats.fetch_add(1, Ordering::Relaxed);
                }),
            );
        }
    }

    #[test]
    fn interface_installs_once_and_ticks() {
        let mut w = World::new();
        let beats = Arc::new(AtomicU32::new(0));
        assert!(w.install_interface(Metronome {
            beats: beats.clone(),
        }));
        assert!(!w.install_interface(Metronome {
            beats: Arc::new(AtomicU32::new(0)),
        }));
        assert!(w.interface::<Metronome>().is_some());

        w.frame(DT);
        w.frame(DT);
        assert_eq!(beats.load(Ordering::Relaxed), 2);
    }
}

