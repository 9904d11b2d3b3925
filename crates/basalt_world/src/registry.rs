//! Process-wide type-id registries.
//!
//! Component types and interface types live in two separate id spaces.
//! Ids are handed out by a monotonically incrementing counter the first
//! time a type is seen, so they are stable within one process run but must
//! never be persisted.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;

/// Identifier of a component type, unique within this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub(crate) u32);

/// Identifier of an interface (per-world singleton service) type.
///
/// Deliberately a different type from [`ComponentTypeId`]: the two id
/// spaces overlap numerically and must never be compared across spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceTypeId(pub(crate) u32);

static COMPONENT_IDS: Lazy<Mutex<HashMap<TypeId, u32>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
static INTERFACE_IDS: Lazy<Mutex<HashMap<TypeId, u32>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn assign(map: &Mutex<HashMap<TypeId, u32>>, key: TypeId) -> u32 {
    let mut map = map.lock().unwrap_or_else(PoisonError::into_inner);
    let next = map.len() as u32;
    *map.entry(key).or_insert(next)
}

/// Id of component type `T`, assigning one on first use.
pub fn component_type_id<T: 'static>() -> ComponentTypeId {
    ComponentTypeId(assign(&COMPONENT_IDS, TypeId::of::<T>()))
}

/// Id of interface type `T`, assigning one on first use.
pub fn interface_type_id<T: 'static>() -> InterfaceTypeId {
    InterfaceTypeId(assign(&INTERFACE_IDS, TypeId::of::<T>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;

    #[test]
    fn ids_are_stable_and_distinct() {
        let a1 = component_type_id::<A>();
        let b = component_type_id::<B>();
        let a2 = component_type_id::<A>();
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
    }

    #[test]
    fn interface_space_is_independent() {
        // The same Rust type gets an id in each space; the ids are unrelated.
        let c = component_type_id::<A>();
        let i = interface_type_id::<A>();
        // Not comparable by type; just make sure both calls worked.
        assert_eq!(interface_type_id::<A>(), i);
        assert_eq!(component_type_id::<A>(), c);
    }
}
