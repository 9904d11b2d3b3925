//! Per-type pooled component storage.
//!
//! Each component type gets one `ComponentStore<T>`: a dense entry array
//! for iteration plus a sparse slot table that maps generation-tagged
//! handles to dense positions.  Under the default `Compact` policy a freed
//! entry is filled by moving the last live entry down; the sparse table of
//! the moved entry is re-pointed in the same operation, so its handle — and
//! every `ComponentKey` holding it — stays valid.  `StableSlots` types
//! never move; their freed entries become reusable holes instead.

use std::any::Any;

use basalt_core::handle::{next_generation, MAX_SLOTS};
use basalt_core::Handle;

use crate::component::{Component, ComponentKey, ComponentMode, StoragePolicy};
use crate::env::TickEnv;
use crate::events::EventBus;
use crate::registry::ComponentTypeId;
use crate::tick::TickPhase;

const NO_DENSE: u32 = u32::MAX;

#[derive(Clone, Copy, Default)]
struct Slot {
    generation: u32,
    /// Dense position, or `NO_DENSE` while the slot is free.
    dense: u32,
}

struct Entry<T> {
    value: T,
    handle: Handle,
    owner: Handle,
    mode: ComponentMode,
    initialized: bool,
    /// Marked for destruction; stays in storage (and in the owner's key
    /// list) until the GC point frees it.
    destroyed: bool,
}

/// Pooled storage and lifecycle orchestration for one component type.
pub struct ComponentStore<T: Component> {
    type_id: ComponentTypeId,
    policy: StoragePolicy,
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    entries: Vec<Option<Entry<T>>>,
    /// Reusable holes in `entries`; only populated under `StableSlots`.
    free_entries: Vec<u32>,
    live: usize,
}

impl<T: Component> ComponentStore<T> {
    pub fn new(type_id: ComponentTypeId) -> Self {
        Self {
            type_id,
            policy: T::storage_policy(),
            slots: Vec::new(),
            free_slots: Vec::new(),
            entries: Vec::new(),
            free_entries: Vec::new(),
            live: 0,
        }
    }

    fn resolve(&self, handle: Handle) -> Option<usize> {
        if handle.is_none() {
            return None;
        }
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.dense == NO_DENSE || slot.generation != handle.generation() {
            return None;
        }
        Some(slot.dense as usize)
    }

    fn entry(&self, handle: Handle) -> Option<&Entry<T>> {
        let dense = self.resolve(handle)?;
        let entry = self.entries.get(dense)?.as_ref()?;
        debug_assert_eq!(entry.handle, handle);
        Some(entry)
    }

    fn entry_mut(&mut self, handle: Handle) -> Option<&mut Entry<T>> {
        let dense = self.resolve(handle)?;
        self.entries.get_mut(dense)?.as_mut()
    }

    /// Allocate a slot and stamp handle/owner/mode.  The lifecycle begin
    /// hook is NOT called here; the world queues the component for
    /// deferred initialization.
    pub fn create(&mut self, owner: Handle, mode: ComponentMode, value: T) -> Handle {
        let index = match self.free_slots.pop() {
            Some(i) => i,
            None => {
                if self.slots.len() as u32 >= MAX_SLOTS {
                    log::error!(
                        "component pool for {} exhausted; create refused",
                        T::type_name()
                    );
                    return Handle::NONE;
                }
                self.slots.push(Slot {
                    generation: 0,
                    dense: NO_DENSE,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let handle = Handle::new(index, self.slots[index as usize].generation);
        let entry = Entry {
            value,
            handle,
            owner,
            mode,
            initialized: false,
            destroyed: false,
        };
        let dense = match self.free_entries.pop() {
            Some(hole) => {
                self.entries[hole as usize] = Some(entry);
                hole
            }
            None => {
                self.entries.push(Some(entry));
                (self.entries.len() - 1) as u32
            }
        };
        self.slots[index as usize].dense = dense;
        self.live += 1;
        handle
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.entry(handle).map(|e| &e.value)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.entry_mut(handle).map(|e| &mut e.value)
    }

    /// Iterate live components (marked-for-destruction entries included).
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.entries
            .iter()
            .flatten()
            .map(|e| (e.handle, &e.value))
    }

    fn key(&self, handle: Handle) -> ComponentKey {
        ComponentKey {
            type_id: self.type_id,
            handle,
        }
    }

    /// Run the begin-lifecycle hook and subscribe declared events.
    /// Idempotent: a second call is a no-op.  Returns whether the hook ran.
    pub fn initialize(&mut self, handle: Handle, events: &mut EventBus) -> bool {
        let type_id = self.type_id;
        let Some(entry) = self.entry_mut(handle) else {
            return false;
        };
        if entry.initialized || entry.destroyed {
            return false;
        }
        let owner = entry.owner;
        entry.value.on_init(owner);
        entry.initialized = true;
        let key = ComponentKey { type_id, handle };
        for event in T::subscriptions() {
            events.subscribe(event, key);
        }
        true
    }

    /// Unsubscribe events and run the end-lifecycle hook.  No-op if the
    /// component is not initialized.
    pub fn deinitialize(&mut self, handle: Handle, events: &mut EventBus) {
        let key = self.key(handle);
        let Some(entry) = self.entry_mut(handle) else {
            return;
        };
        if !entry.initialized {
            return;
        }
        entry.initialized = false;
        entry.value.on_deinit();
        for event in T::subscriptions() {
            events.unsubscribe(event, key);
        }
    }

    /// Mark for destruction.  Returns false if already marked (or gone),
    /// which keeps the world's pending-deletion queue duplicate-free.
    pub fn mark_destroyed(&mut self, handle: Handle) -> bool {
        match self.entry_mut(handle) {
            Some(entry) if !entry.destroyed => {
                entry.destroyed = true;
                true
            }
            _ => false,
        }
    }

    /// Physically remove an entry (GC point only).  Under `Compact` the
    /// last entry moves into the hole and its sparse slot is re-pointed;
    /// the moved component's handle does not change.
    pub fn free(&mut self, handle: Handle) {
        let Some(dense) = self.resolve(handle) else {
            return;
        };
        let slot = &mut self.slots[handle.index() as usize];
        slot.dense = NO_DENSE;
        slot.generation = next_generation(slot.generation);
        self.free_slots.push(handle.index());
        self.live -= 1;

        match self.policy {
            StoragePolicy::Compact => {
                self.entries.swap_remove(dense);
                if dense < self.entries.len() {
                    if let Some(moved) = self.entries[dense].as_ref() {
                        self.slots[moved.handle.index() as usize].dense = dense as u32;
                    }
                }
            }
            StoragePolicy::StableSlots => {
                self.entries[dense] = None;
                self.free_entries.push(dense as u32);
            }
        }
    }

    pub fn is_initialized(&self, handle: Handle) -> bool {
        self.entry(handle).is_some_and(|e| e.initialized)
    }

    pub fn is_destroyed(&self, handle: Handle) -> bool {
        self.entry(handle).is_some_and(|e| e.destroyed)
    }

    pub fn owner_of(&self, handle: Handle) -> Option<Handle> {
        self.entry(handle).map(|e| e.owner)
    }

    pub fn mode_of(&self, handle: Handle) -> Option<ComponentMode> {
        self.entry(handle).map(|e| e.mode)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

// ─── Type-erased access for the world ───────────────────────────────────────

/// Object-safe facade the world uses to drive stores of any type.
pub(crate) trait AnyComponentStore {
    fn component_type_id(&self) -> ComponentTypeId;
    fn type_name(&self) -> &'static str;

    fn initialize(&mut self, handle: Handle, events: &mut EventBus) -> bool;
    fn deinitialize(&mut self, handle: Handle, events: &mut EventBus);
    fn mark_destroyed(&mut self, handle: Handle) -> bool;
    fn free(&mut self, handle: Handle);

    fn contains(&self, handle: Handle) -> bool;
    fn is_initialized(&self, handle: Handle) -> bool;
    fn is_destroyed(&self, handle: Handle) -> bool;
    fn owner_of(&self, handle: Handle) -> Option<Handle>;
    fn mode_of(&self, handle: Handle) -> Option<ComponentMode>;
    fn live_count(&self) -> usize;

    fn run_phase(&mut self, phase: TickPhase, env: &mut TickEnv<'_>);
    fn draw_debug(&self, env: &TickEnv<'_>);
    fn deliver_event(&mut self, handle: Handle, event: &dyn Any);
    fn notify_contact(&mut self, handle: Handle, other: Handle);
    fn notify_overlap(&mut self, handle: Handle, other: Handle);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyComponentStore for ComponentStore<T> {
    fn component_type_id(&self) -> ComponentTypeId {
        self.type_id
    }

    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn initialize(&mut self, handle: Handle, events: &mut EventBus) -> bool {
        ComponentStore::initialize(self, handle, events)
    }

    fn deinitialize(&mut self, handle: Handle, events: &mut EventBus) {
        ComponentStore::deinitialize(self, handle, events)
    }

    fn mark_destroyed(&mut self, handle: Handle) -> bool {
        ComponentStore::mark_destroyed(self, handle)
    }

    fn free(&mut self, handle: Handle) {
        ComponentStore::free(self, handle)
    }

    fn contains(&self, handle: Handle) -> bool {
        self.resolve(handle).is_some()
    }

    fn is_initialized(&self, handle: Handle) -> bool {
        ComponentStore::is_initialized(self, handle)
    }

    fn is_destroyed(&self, handle: Handle) -> bool {
        ComponentStore::is_destroyed(self, handle)
    }

    fn owner_of(&self, handle: Handle) -> Option<Handle> {
        ComponentStore::owner_of(self, handle)
    }

    fn mode_of(&self, handle: Handle) -> Option<ComponentMode> {
        ComponentStore::mode_of(self, handle)
    }

    fn live_count(&self) -> usize {
        self.live
    }

    fn run_phase(&mut self, phase: TickPhase, env: &mut TickEnv<'_>) {
        for entry in self.entries.iter_mut().flatten() {
            if !entry.initialized || entry.destroyed {
                continue;
            }
            let owner = entry.owner;
            match phase {
                TickPhase::Update => entry.value.update(owner, env),
                TickPhase::FixedUpdate => entry.value.fixed_update(owner, env),
                TickPhase::PhysicsUpdate => entry.value.physics_update(owner, env),
                TickPhase::PostTransform => entry.value.post_transform(owner, env),
                TickPhase::LateUpdate => entry.value.late_update(owner, env),
            }
        }
    }

    fn draw_debug(&self, env: &TickEnv<'_>) {
        for entry in self.entries.iter().flatten() {
            if entry.initialized && !entry.destroyed {
                entry.value.draw_debug(entry.owner, env);
            }
        }
    }

    fn deliver_event(&mut self, handle: Handle, event: &dyn Any) {
        if let Some(entry) = self.entry_mut(handle) {
            if entry.initialized && !entry.destroyed {
                entry.value.on_event(event);
            }
        }
    }

    fn notify_contact(&mut self, handle: Handle, other: Handle) {
        if let Some(entry) = self.entry_mut(handle) {
            if entry.initialized && !entry.destroyed {
                let owner = entry.owner;
                entry.value.on_contact(owner, other);
            }
        }
    }

    fn notify_overlap(&mut self, handle: Handle, other: Handle) {
        if let Some(entry) = self.entry_mut(handle) {
            if entry.initialized && !entry.destroyed {
                let owner = entry.owner;
                entry.value.on_overlap(owner, other);
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
