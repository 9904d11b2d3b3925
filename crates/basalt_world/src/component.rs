//! The component boundary contract.
//!
//! A component is a typed behavior unit attached to exactly one object and
//! managed by one per-type store.  Implementers supply lifecycle hooks,
//! optional phase callbacks (declared through [`Component::tick_descriptors`])
//! and optional event subscriptions; the world drives everything else.

use std::any::{Any, TypeId};

use basalt_core::Handle;

use crate::env::TickEnv;
use crate::registry::ComponentTypeId;
use crate::tick::TickFunctionDescriptor;

/// Whether a component participates in per-step simulation.
///
/// Independent of the owner's overall mobility, but attaching a `Dynamic`
/// component to a Static object promotes the object to Dynamic first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentMode {
    Static,
    Dynamic,
}

/// Pool storage policy for a component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoragePolicy {
    /// Freed slots are filled by moving the last live entry (dense
    /// iteration, entries may relocate; handles stay valid).
    Compact,
    /// Freed slots become reusable holes; entries never relocate.
    StableSlots,
}

/// Reference to one component: its type id plus its handle in that type's
/// store.  Both halves are needed because each store is its own handle
/// space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentKey {
    pub type_id: ComponentTypeId,
    pub handle: Handle,
}

impl ComponentKey {
    pub(crate) fn none(type_id: ComponentTypeId) -> Self {
        Self {
            type_id,
            handle: Handle::NONE,
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.handle.is_none()
    }

    #[inline]
    pub fn is_some(&self) -> bool {
        self.handle.is_some()
    }
}

/// A typed behavior unit.
///
/// All hooks default to no-ops, so a minimal component is just
/// `impl Component for Marker {}`.  Phase hooks only run on components
/// that are initialized and not marked for destruction; they receive the
/// owner handle plus a [`TickEnv`] giving read access to the scene and a
/// deferred command buffer for structural mutation.
pub trait Component: 'static {
    /// Human-readable type name, used in logs.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Pool storage policy for this type.
    fn storage_policy() -> StoragePolicy {
        StoragePolicy::Compact
    }

    /// One descriptor per phase this type participates in.  Registered
    /// into the world's ticking groups when the type is first seen.
    fn tick_descriptors() -> Vec<TickFunctionDescriptor> {
        Vec::new()
    }

    /// Event types this component wants delivered to [`Component::on_event`].
    /// Subscribed on initialize, unsubscribed on deinitialize.
    fn subscriptions() -> Vec<TypeId> {
        Vec::new()
    }

    // ── Lifecycle ──────────────────────────────────────────────────────────

    /// Begin-lifecycle hook.  Invoked exactly once, at the deferred
    /// initialization point of the frame, never re-entrantly.
    fn on_init(&mut self, _owner: Handle) {}

    /// End-lifecycle hook.  Invoked exactly once, when the component is
    /// destroyed (synchronously) or its store deinitializes it.
    fn on_deinit(&mut self) {}

    // ── Phase callbacks ────────────────────────────────────────────────────

    fn update(&mut self, _owner: Handle, _env: &mut TickEnv<'_>) {}
    fn fixed_update(&mut self, _owner: Handle, _env: &mut TickEnv<'_>) {}
    fn physics_update(&mut self, _owner: Handle, _env: &mut TickEnv<'_>) {}
    fn post_transform(&mut self, _owner: Handle, _env: &mut TickEnv<'_>) {}
    fn late_update(&mut self, _owner: Handle, _env: &mut TickEnv<'_>) {}

    /// Debug visualization; read-only.
    fn draw_debug(&self, _owner: Handle, _env: &TickEnv<'_>) {}

    // ── Notifications ──────────────────────────────────────────────────────

    /// Physics contact notification, forwarded by an external collision
    /// backend through [`crate::World::notify_contact`].
    fn on_contact(&mut self, _owner: Handle, _other: Handle) {}

    /// Overlap (trigger) notification.
    fn on_overlap(&mut self, _owner: Handle, _other: Handle) {}

    /// Typed event delivery; `event` downcasts to one of the types listed
    /// in [`Component::subscriptions`].
    fn on_event(&mut self, _event: &dyn Any) {}
}
