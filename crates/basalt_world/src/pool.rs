//! Handle-indexed object pool.
//!
//! Slots are recycled through a free list; every recycle bumps the slot's
//! generation so stale handles resolve to `None` instead of aliasing the
//! new tenant.  Lookups never panic — callers must treat `None` as "gone".

use basalt_core::handle::{next_generation, MAX_SLOTS};
use basalt_core::Handle;

use crate::object::{Mobility, Object};

struct Slot {
    generation: u32,
    object: Option<Object>,
}

/// Pool of [`Object`]s addressed by generation-tagged handles.
#[derive(Default)]
pub struct ObjectPool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Default for Slot {
    fn default() -> Self {
        Slot {
            generation: 0,
            object: None,
        }
    }
}

impl ObjectPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a slot and construct an object in place.  Returns
    /// `Handle::NONE` (with an error log) if the index space is exhausted.
    pub fn create(&mut self, name: &str, mobility: Mobility) -> Handle {
        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                if self.slots.len() as u32 >= MAX_SLOTS {
                    log::error!("object pool exhausted ({MAX_SLOTS} slots); create refused");
                    return Handle::NONE;
                }
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let handle = Handle::new(index, slot.generation);
        slot.object = Some(Object::new(handle, name, mobility));
        self.live += 1;
        handle
    }

    /// Resolve a handle.  Stale or foreign handles return `None`.
    pub fn get(&self, handle: Handle) -> Option<&Object> {
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.object.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Object> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.object.as_mut()
    }

    /// Physically free a slot, bumping its generation.  Only the GC point
    /// calls this; destruction elsewhere is mark-only.
    pub fn free(&mut self, handle: Handle) -> Option<Object> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() || slot.object.is_none() {
            return None;
        }
        let object = slot.object.take();
        slot.generation = next_generation(slot.generation);
        self.free.push(handle.index());
        self.live -= 1;
        object
    }

    /// Number of occupied slots (marked-for-destruction objects included).
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate every occupied slot, including objects that are marked for
    /// destruction but not yet freed.
    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.slots.iter().filter_map(|s| s.object.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Object> {
        self.slots.iter_mut().filter_map(|s| s.object.as_mut())
    }
}
