//! Typed event dispatch tables.
//!
//! One table per event `TypeId`, each holding the component keys that
//! subscribed to it.  Subscription happens automatically around component
//! initialize/deinitialize; delivery goes through
//! [`crate::World::emit`].

use std::any::TypeId;
use std::collections::HashMap;

use crate::component::ComponentKey;

#[derive(Default)]
pub struct EventBus {
    tables: HashMap<TypeId, Vec<ComponentKey>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber.  Duplicate-safe: subscribing an already
    /// subscribed key is a no-op.
    pub fn subscribe(&mut self, event: TypeId, key: ComponentKey) {
        let table = self.tables.entry(event).or_default();
        if !table.contains(&key) {
            table.push(key);
        }
    }

    pub fn unsubscribe(&mut self, event: TypeId, key: ComponentKey) {
        if let Some(table) = self.tables.get_mut(&event) {
            table.retain(|k| *k != key);
        }
    }

    /// Current subscribers of an event type, in subscription order.
    pub fn subscribers(&self, event: TypeId) -> &[ComponentKey] {
        self.tables.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ComponentTypeId;
    use basalt_core::Handle;

    struct Ping;

    fn key(idx: u32) -> ComponentKey {
        ComponentKey {
            type_id: ComponentTypeId(0),
            handle: Handle::new(idx, 0),
        }
    }

    #[test]
    fn subscribe_is_duplicate_safe() {
        let mut bus = EventBus::new();
        let ev = TypeId::of::<Ping>();
        bus.subscribe(ev, key(1));
        bus.subscribe(ev, key(1));
        bus.subscribe(ev, key(2));
        assert_eq!(bus.subscribers(ev).len(), 2);
    }

    #[test]
    fn unsubscribe_removes_only_that_key() {
        let mut bus = EventBus::new();
        let ev = TypeId::of::<Ping>();
        bus.subscribe(ev, key(1));
        bus.subscribe(ev, key(2));
        bus.unsubscribe(ev, key(1));
        assert_eq!(bus.subscribers(ev), &[key(2)]);
    }
}
