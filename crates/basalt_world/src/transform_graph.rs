//! Level-partitioned transform storage and the world-transform pass.
//!
//! Nodes are stored in per-level slot arrays, split into a Static and a
//! Dynamic partition.  The per-step pass touches only the Dynamic
//! partition and walks levels in strictly increasing order, so a node's
//! parent (which always lives at a lower level) is guaranteed to be up to
//! date before the node itself is recomputed.  Static nodes are refreshed
//! exactly once, at creation / reparent / demotion, through
//! [`TransformGraph::refresh`].
//!
//! Slots within a level are stable; a node only relocates when its owner's
//! depth or mobility class changes, and the caller (the world's hierarchy
//! code) patches the parent refs of affected children while it walks the
//! subtree anyway.

use basalt_core::Transform;
use glam::Affine3A;

use basalt_core::Handle;

use crate::object::Mobility;

/// Location of a transform node: partition × level × slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef {
    pub(crate) mobility: Mobility,
    pub(crate) level: u16,
    pub(crate) slot: u32,
}

impl NodeRef {
    /// Placeholder used while an object is being wired up.
    pub(crate) const INVALID: NodeRef = NodeRef {
        mobility: Mobility::Static,
        level: 0,
        slot: u32::MAX,
    };

    #[inline]
    pub fn mobility(self) -> Mobility {
        self.mobility
    }

    #[inline]
    pub fn level(self) -> u16 {
        self.level
    }
}

/// One transform record, exclusively owned by its object.
#[derive(Debug, Clone)]
pub struct TransformNode {
    /// Owning object.
    pub owner: Handle,
    /// Parent node, `None` for roots.  Always resolvable while the owner
    /// is live; patched whenever the parent relocates.
    pub parent: Option<NodeRef>,

    pub local: Transform,
    pub world: Transform,
    /// Cached 3×4 world matrix, refreshed together with `world`.
    pub world_matrix: Affine3A,

    /// Local position is interpreted in world space (parent ignored).
    pub absolute_position: bool,
    /// Local rotation is interpreted in world space.
    pub absolute_rotation: bool,
    /// Scale is not multiplied by the parent's.
    pub absolute_scale: bool,
    /// Lock world position/rotation and re-derive the local values from
    /// them instead — used while reparenting or physics-driven motion must
    /// preserve world placement.
    pub keep_world: bool,
}

impl TransformNode {
    pub fn new(owner: Handle, parent: Option<NodeRef>, local: Transform) -> Self {
        Self {
            owner,
            parent,
            local,
            world: local,
            world_matrix: local.affine(),
            absolute_position: false,
            absolute_rotation: false,
            absolute_scale: false,
            keep_world: false,
        }
    }
}

#[derive(Default)]
struct Level {
    nodes: Vec<Option<TransformNode>>,
    free: Vec<u32>,
}

impl Level {
    fn insert(&mut self, node: TransformNode) -> u32 {
        if let Some(slot) = self.free.pop() {
            self.nodes[slot as usize] = Some(node);
            slot
        } else {
            self.nodes.push(Some(node));
            (self.nodes.len() - 1) as u32
        }
    }

    fn remove(&mut self, slot: u32) -> Option<TransformNode> {
        let taken = self.nodes.get_mut(slot as usize)?.take();
        if taken.is_some() {
            self.free.push(slot);
        }
        taken
    }
}

/// All transform nodes of one world, partitioned by mobility × depth.
#[derive(Default)]
pub struct TransformGraph {
    static_levels: Vec<Level>,
    dynamic_levels: Vec<Level>,
}

impl TransformGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn levels(&self, mobility: Mobility) -> &Vec<Level> {
        match mobility {
            Mobility::Static => &self.static_levels,
            Mobility::Dynamic => &self.dynamic_levels,
        }
    }

    fn levels_mut(&mut self, mobility: Mobility) -> &mut Vec<Level> {
        match mobility {
            Mobility::Static => &mut self.static_levels,
            Mobility::Dynamic => &mut self.dynamic_levels,
        }
    }

    /// Insert a node into the given partition and level.
    pub fn insert(&mut self, mobility: Mobility, level: u16, node: TransformNode) -> NodeRef {
        let levels = self.levels_mut(mobility);
        while levels.len() <= level as usize {
            levels.push(Level::default());
        }
        let slot = levels[level as usize].insert(node);
        NodeRef {
            mobility,
            level,
            slot,
        }
    }

    pub fn remove(&mut self, r: NodeRef) -> Option<TransformNode> {
        self.levels_mut(r.mobility)
            .get_mut(r.level as usize)?
            .remove(r.slot)
    }

    /// Move a node to a different partition/level, keeping its data.
    /// Children's parent refs are NOT touched here; the hierarchy code
    /// patches them while walking the subtree.
    pub fn relocate(&mut self, r: NodeRef, mobility: Mobility, level: u16) -> Option<NodeRef> {
        if r.mobility == mobility && r.level == level {
            return Some(r);
        }
        let node = self.remove(r)?;
        Some(self.insert(mobility, level, node))
    }

    pub fn get(&self, r: NodeRef) -> Option<&TransformNode> {
        self.levels(r.mobility)
            .get(r.level as usize)?
            .nodes
            .get(r.slot as usize)?
            .as_ref()
    }

    pub fn get_mut(&mut self, r: NodeRef) -> Option<&mut TransformNode> {
        self.levels_mut(r.mobility)
            .get_mut(r.level as usize)?
            .nodes
            .get_mut(r.slot as usize)?
            .as_mut()
    }

    /// Copy of a node's world transform and cached matrix.
    pub fn world_of(&self, r: NodeRef) -> Option<(Transform, Affine3A)> {
        self.get(r).map(|n| (n.world, n.world_matrix))
    }

    // ── Recomputation ──────────────────────────────────────────────────────

    /// Recompute one node's world transform from its parent's cached world
    /// transform.  Parents must already be up to date — true by
    /// construction for static nodes (refreshed top-down) and for the
    /// per-step pass (levels in increasing order).
    pub fn refresh(&mut self, r: NodeRef) {
        let Some(node) = self.get(r) else { return };
        let parent = node.parent;
        let parent_world = parent.and_then(|p| self.world_of(p));

        let Some(node) = self.get_mut(r) else { return };
        match parent_world {
            // Roots: world transform is the local transform, unconditionally.
            None => {
                node.world = node.local;
            }
            Some((pt, pm)) => {
                if node.keep_world {
                    // World position/rotation are retained; local values are
                    // re-derived so the placement survives the new ancestry.
                    node.local.position = pm.inverse().transform_point3(node.world.position);
                    node.local.rotation =
                        (pt.rotation.inverse() * node.world.rotation).normalize();
                    node.world.scale = if node.absolute_scale {
                        node.local.scale
                    } else {
                        pt.scale * node.local.scale
                    };
                } else {
                    node.world.position = if node.absolute_position {
                        node.local.position
                    } else {
                        pm.transform_point3(node.local.position)
                    };
                    node.world.rotation = if node.absolute_rotation {
                        node.local.rotation
                    } else {
                        (pt.rotation * node.local.rotation).normalize()
                    };
                    node.world.scale = if node.absolute_scale {
                        node.local.scale
                    } else {
                        pt.scale * node.local.scale
                    };
                }
            }
        }
        node.world_matrix = node.world.affine();
    }

    /// The per-step pass: recompute the whole Dynamic partition, level by
    /// level in increasing order.  The Static partition is never touched.
    pub fn update_dynamic(&mut self) {
        for level in 0..self.dynamic_levels.len() {
            for slot in 0..self.dynamic_levels[level].nodes.len() {
                if self.dynamic_levels[level].nodes[slot].is_none() {
                    continue;
                }
                self.refresh(NodeRef {
                    mobility: Mobility::Dynamic,
                    level: level as u16,
                    slot: slot as u32,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn node(owner_idx: u32, parent: Option<NodeRef>, pos: Vec3) -> TransformNode {
        TransformNode::new(
            Handle::new(owner_idx, 0),
            parent,
            Transform::from_position(pos),
        )
    }

    #[test]
    fn chain_propagates_level_by_level() {
        let mut g = TransformGraph::new();
        let root = g.insert(Mobility::Dynamic, 0, node(0, None, Vec3::ZERO));
        let a = g.insert(Mobility::Dynamic, 1, node(1, Some(root), Vec3::X));
        let b = g.insert(Mobility::Dynamic, 2, node(2, Some(a), Vec3::X));

        g.update_dynamic();

        let (bw, _) = g.world_of(b).unwrap();
        assert!((bw.position - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn absolute_position_ignores_parent() {
        let mut g = TransformGraph::new();
        let root = g.insert(Mobility::Dynamic, 0, node(0, None, Vec3::new(10.0, 0.0, 0.0)));
        let c = g.insert(Mobility::Dynamic, 1, node(1, Some(root), Vec3::Y));
        g.get_mut(c).unwrap().absolute_position = true;

        g.update_dynamic();

        let (cw, _) = g.world_of(c).unwrap();
        assert!((cw.position - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn keep_world_back_solves_local() {
        let mut g = TransformGraph::new();
        let p = g.insert(Mobility::Dynamic, 0, node(0, None, Vec3::new(2.0, 0.0, 0.0)));
        let a = g.insert(Mobility::Dynamic, 1, node(1, Some(p), Vec3::ZERO));
        {
            let n = g.get_mut(a).unwrap();
            n.world.position = Vec3::new(5.0, 0.0, 0.0);
            n.keep_world = true;
        }

        g.update_dynamic();

        let n = g.get(a).unwrap();
        assert!((n.world.position - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-5);
        assert!((n.local.position - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn relocate_keeps_node_data() {
        let mut g = TransformGraph::new();
        let r = g.insert(Mobility::Static, 3, node(0, None, Vec3::X));
        let r2 = g.relocate(r, Mobility::Dynamic, 1).unwrap();
        assert!(g.get(r).is_none());
        let n = g.get(r2).unwrap();
        assert!((n.local.position - Vec3::X).length() < 1e-6);
        assert_eq!(r2.mobility(), Mobility::Dynamic);
        assert_eq!(r2.level(), 1);
    }

    #[test]
    fn scale_is_hierarchical() {
        let mut g = TransformGraph::new();
        let mut root_node = node(0, None, Vec3::ZERO);
        root_node.local.scale = Vec3::splat(2.0);
        let root = g.insert(Mobility::Dynamic, 0, root_node);
        let c = g.insert(Mobility::Dynamic, 1, node(1, Some(root), Vec3::X));

        g.update_dynamic();

        let (cw, _) = g.world_of(c).unwrap();
        assert!((cw.scale - Vec3::splat(2.0)).length() < 1e-5);
        // Parent scale also affects the child's translated position.
        assert!((cw.position - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }
}
