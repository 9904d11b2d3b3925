//! Scene objects: hierarchy nodes that own components and a transform node.
//!
//! `Object` stores only links (handles) and bookkeeping; all mutation goes
//! through [`crate::World`], which keeps the sibling chains, depth levels
//! and the transform graph consistent.

use basalt_core::Handle;
use smallvec::SmallVec;

use crate::component::ComponentKey;
use crate::transform_graph::NodeRef;

/// Mobility class of an object.
///
/// Static transforms are computed once — at creation, reparenting or
/// demotion — and never re-touched by the per-step transform pass.
/// Dynamic transforms are recomputed every fixed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mobility {
    Static,
    Dynamic,
}

/// How `set_parent` treats the child's transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformRule {
    /// Local transform is kept; the world transform is recomputed from the
    /// new ancestry (the object may visually move).
    KeepRelative,
    /// Local position/rotation are back-solved from the cached world
    /// transform so the object does not visually move.
    KeepWorld,
}

/// A hierarchy node with a spatial transform and attached components.
///
/// Sibling links form an intrusive doubly-linked list threaded through the
/// pool; children are appended at the tail so iteration order is creation
/// order.
#[derive(Debug)]
pub struct Object {
    pub(crate) handle: Handle,
    pub(crate) name: String,
    pub(crate) mobility: Mobility,
    pub(crate) destroyed: bool,

    pub(crate) parent: Handle,
    pub(crate) first_child: Handle,
    pub(crate) last_child: Handle,
    pub(crate) next_sibling: Handle,
    pub(crate) prev_sibling: Handle,

    /// Distance from the root of the hierarchy (roots are level 0).
    pub(crate) depth: u16,
    /// Slot of the owned transform node in the level-partitioned storage.
    pub(crate) node: NodeRef,

    /// Attached components, in attach order.  Inline up to 8, spills to
    /// the heap beyond that.
    pub(crate) components: SmallVec<[ComponentKey; 8]>,
}

impl Object {
    pub(crate) fn new(handle: Handle, name: &str, mobility: Mobility) -> Self {
        Self {
            handle,
            name: name.to_owned(),
            mobility,
            destroyed: false,
            parent: Handle::NONE,
            first_child: Handle::NONE,
            last_child: Handle::NONE,
            next_sibling: Handle::NONE,
            prev_sibling: Handle::NONE,
            depth: 0,
            node: NodeRef::INVALID,
            components: SmallVec::new(),
        }
    }

    #[inline]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn mobility(&self) -> Mobility {
        self.mobility
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.mobility == Mobility::Dynamic
    }

    /// True once the object has been marked for destruction.  A marked
    /// object stays resolvable (and iterable) until the next GC point.
    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    #[inline]
    pub fn parent(&self) -> Handle {
        self.parent
    }

    #[inline]
    pub fn first_child(&self) -> Handle {
        self.first_child
    }

    #[inline]
    pub fn next_sibling(&self) -> Handle {
        self.next_sibling
    }

    #[inline]
    pub fn depth(&self) -> u16 {
        self.depth
    }

    #[inline]
    pub fn node_ref(&self) -> NodeRef {
        self.node
    }

    /// Attached component keys, in attach order.  Includes components that
    /// are marked for destruction but not yet freed.
    #[inline]
    pub fn component_keys(&self) -> &[ComponentKey] {
        &self.components
    }
}
