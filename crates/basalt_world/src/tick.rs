//! Tick phases and dependency-ordered dispatch.
//!
//! Each execution phase owns one [`TickingGroup`]: the set of per-type
//! callbacks registered for that phase plus their dependency-resolved
//! execution order.  The order is rebuilt lazily (any registration dirties
//! the group) by a depth-first topological sort over owner-type edges.
//! Prerequisites are matched by a linear scan over the function list —
//! groups are small and rebuilds rare, so correctness wins over speed.

use smallvec::SmallVec;
use thiserror::Error;

use crate::registry::{ComponentTypeId, InterfaceTypeId};
use crate::world::World;

/// Execution phase of a tick function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickPhase {
    /// Every render frame, before the fixed-step loop.
    Update,
    /// Once per fixed step.
    FixedUpdate,
    /// Once per fixed step, after `FixedUpdate`.
    PhysicsUpdate,
    /// Once per fixed step, after the transform pass.
    PostTransform,
    /// Once per render frame, after all fixed steps, with the
    /// interpolation factor available.
    LateUpdate,
}

impl TickPhase {
    pub const ALL: [TickPhase; 5] = [
        TickPhase::Update,
        TickPhase::FixedUpdate,
        TickPhase::PhysicsUpdate,
        TickPhase::PostTransform,
        TickPhase::LateUpdate,
    ];

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            TickPhase::Update => 0,
            TickPhase::FixedUpdate => 1,
            TickPhase::PhysicsUpdate => 2,
            TickPhase::PostTransform => 3,
            TickPhase::LateUpdate => 4,
        }
    }
}

/// Identifies the owner of a tick function — a component type or an
/// interface type.  The two id spaces are separate, hence the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKey {
    Component(ComponentTypeId),
    Interface(InterfaceTypeId),
}

/// Declares one tick function: its phase, pause behavior and the owner
/// types whose functions (in the same group) must run first.
#[derive(Debug, Clone)]
pub struct TickFunctionDescriptor {
    pub phase: TickPhase,
    /// Run even while the world is paused.
    pub run_when_paused: bool,
    pub prerequisites: SmallVec<[DependencyKey; 4]>,
}

impl TickFunctionDescriptor {
    pub fn new(phase: TickPhase) -> Self {
        Self {
            phase,
            run_when_paused: false,
            prerequisites: SmallVec::new(),
        }
    }

    pub fn with_prerequisite(mut self, key: DependencyKey) -> Self {
        self.prerequisites.push(key);
        self
    }

    pub fn run_when_paused(mut self, yes: bool) -> Self {
        self.run_when_paused = yes;
        self
    }
}

/// Timing and pause state handed to every tick callback.
#[derive(Debug, Clone, Copy)]
pub struct TickContext {
    /// Seconds covered by this dispatch: the render delta for
    /// `Update`/`LateUpdate`, the fixed step length otherwise.
    pub delta: f32,
    /// The world's fixed step length.
    pub fixed_delta: f32,
    /// Total simulated seconds.
    pub elapsed: f64,
    /// Leftover accumulator / fixed step, in `[0, 1)`.  Only meaningful
    /// during `LateUpdate`.
    pub interpolation: f32,
    pub paused: bool,
    /// Render frame counter.
    pub frame: u64,
    /// Fixed step counter.
    pub step: u64,
}

/// Callback invoked in dependency order.  The group is detached from the
/// world for the duration of its dispatch, so callbacks get the full
/// `&mut World`.
pub type TickCallback = Box<dyn FnMut(&mut World, &TickContext)>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TickOrderError {
    /// The prerequisite graph has a cycle; `participants` are the owners
    /// on the DFS stack when the back edge was found.
    #[error("tick dependency cycle between {participants:?}")]
    CycleDetected { participants: Vec<DependencyKey> },
}

struct TickEntry {
    descriptor: TickFunctionDescriptor,
    owner: DependencyKey,
    callback: TickCallback,
    /// Traversal stamp; equal to the group's current traversal id once the
    /// entry has been appended to the order.
    visited: u32,
    /// On the DFS stack right now — a revisit through this flag is a back
    /// edge, i.e. a cycle.
    in_progress: bool,
}

/// All tick functions of one phase plus their execution order.
///
/// State machine: Dirty → (rebuild) → Ordered → Dirty on any registration.
#[derive(Default)]
pub struct TickingGroup {
    phase_name: &'static str,
    entries: Vec<TickEntry>,
    order: Vec<usize>,
    dirty: bool,
    traversal: u32,
}

impl TickingGroup {
    pub fn new(phase: TickPhase) -> Self {
        Self {
            phase_name: match phase {
                TickPhase::Update => "Update",
                TickPhase::FixedUpdate => "FixedUpdate",
                TickPhase::PhysicsUpdate => "PhysicsUpdate",
                TickPhase::PostTransform => "PostTransform",
                TickPhase::LateUpdate => "LateUpdate",
            },
            entries: Vec::new(),
            order: Vec::new(),
            dirty: false,
            traversal: 0,
        }
    }

    /// Append a function and mark the group dirty.
    pub fn add_function(
        &mut self,
        descriptor: TickFunctionDescriptor,
        owner: DependencyKey,
        callback: TickCallback,
    ) {
        self.entries.push(TickEntry {
            descriptor,
            owner,
            callback,
            visited: 0,
            in_progress: false,
        });
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recompute the execution order.  Depth-first topological sort: a
    /// function is appended only after every function owned by one of its
    /// prerequisite types has been appended.
    ///
    /// Failure latches: the group comes out clean with an empty order, so
    /// the cycle is not re-discovered every dispatch.  The next
    /// registration dirties the group and retries.
    pub fn rebuild(&mut self) -> Result<(), TickOrderError> {
        self.dirty = false;
        self.traversal = self.traversal.wrapping_add(1);
        if self.traversal == 0 {
            // Stamp 0 means "never visited"; skip it after a wrap.
            self.traversal = 1;
            for e in &mut self.entries {
                e.visited = 0;
            }
        }
        self.order.clear();
        for e in &mut self.entries {
            e.in_progress = false;
        }
        for i in 0..self.entries.len() {
            if let Err(err) = Self::visit(&mut self.entries, &mut self.order, self.traversal, i) {
                self.order.clear();
                return Err(err);
            }
        }
        Ok(())
    }

    fn visit(
        entries: &mut [TickEntry],
        order: &mut Vec<usize>,
        stamp: u32,
        i: usize,
    ) -> Result<(), TickOrderError> {
        if entries[i].visited == stamp {
            return Ok(());
        }
        if entries[i].in_progress {
            let participants = entries
                .iter()
                .filter(|e| e.in_progress)
                .map(|e| e.owner)
                .collect();
            return Err(TickOrderError::CycleDetected { participants });
        }
        entries[i].in_progress = true;

        let prerequisites = entries[i].descriptor.prerequisites.clone();
        for key in prerequisites {
            let matches: SmallVec<[usize; 4]> = entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.owner == key)
                .map(|(j, _)| j)
                .collect();
            if matches.is_empty() {
                // Optional dependency: the prerequisite type registered no
                // function in this group.
                log::debug!(
                    "tick prerequisite {key:?} has no function in this group; skipped"
                );
            }
            for j in matches {
                if j == i {
                    continue;
                }
                Self::visit(entries, order, stamp, j)?;
            }
        }

        entries[i].in_progress = false;
        entries[i].visited = stamp;
        order.push(i);
        Ok(())
    }

    /// Rebuild if dirty, then invoke every callback in execution order.
    /// While paused, functions without `run_when_paused` are skipped.
    /// A dependency cycle is reported once and the group dispatches
    /// nothing until its function list changes.
    pub fn dispatch(&mut self, world: &mut World, ctx: &TickContext) {
        if self.dirty {
            if let Err(err) = self.rebuild() {
                log::error!("{} group not dispatched: {err}", self.phase_name);
                return;
            }
        }
        for k in 0..self.order.len() {
            let i = self.order[k];
            let entry = &mut self.entries[i];
            if ctx.paused && !entry.descriptor.run_when_paused {
                continue;
            }
            (entry.callback)(world, ctx);
        }
    }

    #[cfg(test)]
    fn order_of_owners(&self) -> Vec<DependencyKey> {
        self.order.iter().map(|&i| self.entries[i].owner).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ComponentTypeId;

    fn key(raw: u32) -> DependencyKey {
        DependencyKey::Component(ComponentTypeId(raw))
    }

    fn noop() -> TickCallback {
        Box::new(|_, _| {})
    }

    fn descriptor(prereqs: &[DependencyKey]) -> TickFunctionDescriptor {
        let mut d = TickFunctionDescriptor::new(TickPhase::FixedUpdate);
        for &p in prereqs {
            d = d.with_prerequisite(p);
        }
        d
    }

    #[test]
    fn registration_order_does_not_beat_dependencies() {
        // Z depends on Y, Y on X; registered Z, X, Y — must order X, Y, Z.
        let (x, y, z) = (key(100), key(101), key(102));
        let mut g = TickingGroup::new(TickPhase::FixedUpdate);
        g.add_function(descriptor(&[y]), z, noop());
        g.add_function(descriptor(&[]), x, noop());
        g.add_function(descriptor(&[x]), y, noop());

        g.rebuild().unwrap();
        assert_eq!(g.order_of_owners(), vec![x, y, z]);
    }

    #[test]
    fn cycle_is_detected_not_recursed() {
        let (a, b) = (key(200), key(201));
        let mut g = TickingGroup::new(TickPhase::Update);
        g.add_function(descriptor(&[b]), a, noop());
        g.add_function(descriptor(&[a]), b, noop());

        let err = g.rebuild().unwrap_err();
        let TickOrderError::CycleDetected { participants } = err;
        assert!(participants.contains(&a) || participants.contains(&b));
    }

    #[test]
    fn failed_rebuild_latches_until_registration() {
        let (a, b) = (key(500), key(501));
        let mut g = TickingGroup::new(TickPhase::Update);
        g.add_function(descriptor(&[b]), a, noop());
        g.add_function(descriptor(&[a]), b, noop());

        assert!(g.rebuild().is_err());
        // The group is clean with an empty order: dispatch runs nothing
        // and does not re-sort until the function list changes.
        assert!(!g.dirty);
        assert!(g.order.is_empty());

        g.add_function(descriptor(&[]), key(502), noop());
        assert!(g.dirty);
    }

    #[test]
    fn missing_prerequisite_is_optional() {
        let a = key(300);
        let ghost = key(999);
        let mut g = TickingGroup::new(TickPhase::Update);
        g.add_function(descriptor(&[ghost]), a, noop());

        g.rebuild().unwrap();
        assert_eq!(g.order_of_owners(), vec![a]);
    }

    #[test]
    fn rebuild_visits_each_entry_once() {
        // Diamond: D depends on B and C, both depend on A.  A must appear
        // exactly once.
        let (a, b, c, d) = (key(400), key(401), key(402), key(403));
        let mut g = TickingGroup::new(TickPhase::Update);
        g.add_function(descriptor(&[b, c]), d, noop());
        g.add_function(descriptor(&[a]), b, noop());
        g.add_function(descriptor(&[a]), c, noop());
        g.add_function(descriptor(&[]), a, noop());

        g.rebuild().unwrap();
        let order = g.order_of_owners();
        assert_eq!(order.len(), 4);
        assert_eq!(order.iter().filter(|&&k| k == a).count(), 1);
        assert_eq!(order.last(), Some(&d));
    }
}
