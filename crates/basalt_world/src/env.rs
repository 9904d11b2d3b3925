//! Read access + deferred commands for component phase hooks.
//!
//! Phase hooks run while their store is borrowed out of the world, so they
//! cannot take `&mut World` directly.  Instead they receive a [`TickEnv`]:
//! read-only views of the object pool and transform graph, plus a
//! [`TickCommands`] buffer whose entries the world applies at the next
//! sync point (right after the group finishes dispatching).  Structural
//! changes therefore never race with iteration over the pools.

use basalt_core::{Handle, Transform};
use glam::{Affine3A, Quat, Vec3};

use crate::component::ComponentKey;
use crate::object::{Mobility, TransformRule};
use crate::pool::ObjectPool;
use crate::tick::TickContext;
use crate::transform_graph::TransformGraph;

/// One deferred structural mutation.
#[derive(Debug, Clone)]
pub enum WorldCommand {
    SetLocalPosition { object: Handle, position: Vec3 },
    SetLocalRotation { object: Handle, rotation: Quat },
    SetLocalScale { object: Handle, scale: Vec3 },
    SetParent {
        child: Handle,
        parent: Option<Handle>,
        rule: TransformRule,
    },
    SetDynamic { object: Handle, dynamic: bool },
    DestroyObject { object: Handle },
    DestroyComponent { key: ComponentKey },
    SetPaused(bool),
}

/// Buffer of deferred commands, applied in push order at the next sync
/// point.
#[derive(Default)]
pub struct TickCommands {
    queue: Vec<WorldCommand>,
}

impl TickCommands {
    pub fn push(&mut self, command: WorldCommand) {
        self.queue.push(command);
    }

    pub fn set_local_position(&mut self, object: Handle, position: Vec3) {
        self.push(WorldCommand::SetLocalPosition { object, position });
    }

    pub fn set_local_rotation(&mut self, object: Handle, rotation: Quat) {
        self.push(WorldCommand::SetLocalRotation { object, rotation });
    }

    pub fn set_local_scale(&mut self, object: Handle, scale: Vec3) {
        self.push(WorldCommand::SetLocalScale { object, scale });
    }

    pub fn set_parent(&mut self, child: Handle, parent: Option<Handle>, rule: TransformRule) {
        self.push(WorldCommand::SetParent { child, parent, rule });
    }

    pub fn set_dynamic(&mut self, object: Handle, dynamic: bool) {
        self.push(WorldCommand::SetDynamic { object, dynamic });
    }

    pub fn destroy_object(&mut self, object: Handle) {
        self.push(WorldCommand::DestroyObject { object });
    }

    pub fn destroy_component(&mut self, key: ComponentKey) {
        self.push(WorldCommand::DestroyComponent { key });
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.push(WorldCommand::SetPaused(paused));
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn take_queue(&mut self) -> Vec<WorldCommand> {
        std::mem::take(&mut self.queue)
    }
}

/// What a component phase hook sees of the world.
pub struct TickEnv<'a> {
    /// Timing and pause state for this dispatch.
    pub ctx: &'a TickContext,
    /// Deferred structural mutations.
    pub commands: &'a mut TickCommands,
    pub(crate) objects: &'a ObjectPool,
    pub(crate) transforms: &'a TransformGraph,
}

impl TickEnv<'_> {
    /// World-space position of an object, if it resolves.
    pub fn world_position(&self, object: Handle) -> Option<Vec3> {
        self.world_transform(object).map(|t| t.position)
    }

    pub fn world_rotation(&self, object: Handle) -> Option<Quat> {
        self.world_transform(object).map(|t| t.rotation)
    }

    pub fn world_scale(&self, object: Handle) -> Option<Vec3> {
        self.world_transform(object).map(|t| t.scale)
    }

    /// Cached 3×4 world matrix.
    pub fn world_matrix(&self, object: Handle) -> Option<Affine3A> {
        let node = self.objects.get(object)?.node_ref();
        Some(self.transforms.get(node)?.world_matrix)
    }

    pub fn world_transform(&self, object: Handle) -> Option<Transform> {
        let node = self.objects.get(object)?.node_ref();
        Some(self.transforms.get(node)?.world)
    }

    pub fn local_transform(&self, object: Handle) -> Option<Transform> {
        let node = self.objects.get(object)?.node_ref();
        Some(self.transforms.get(node)?.local)
    }

    pub fn parent(&self, object: Handle) -> Option<Handle> {
        let p = self.objects.get(object)?.parent();
        p.is_some().then_some(p)
    }

    pub fn mobility(&self, object: Handle) -> Option<Mobility> {
        Some(self.objects.get(object)?.mobility())
    }

    pub fn is_alive(&self, object: Handle) -> bool {
        self.objects
            .get(object)
            .is_some_and(|o| !o.is_destroyed())
    }
}
