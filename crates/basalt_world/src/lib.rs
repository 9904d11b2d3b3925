// basalt_world: objects, components, ticking and the world itself

pub mod component;
pub mod env;
pub mod events;
pub mod object;
pub mod pool;
pub mod registry;
pub mod store;
pub mod tick;
pub mod transform_graph;
pub mod world;

// re-export the surface most callers need so they can depend on
// basalt_world alone
pub use component::{Component, ComponentKey, ComponentMode, StoragePolicy};
pub use env::{TickCommands, TickEnv, WorldCommand};
pub use object::{Mobility, Object, TransformRule};
pub use registry::{component_type_id, interface_type_id, ComponentTypeId, InterfaceTypeId};
pub use tick::{
    DependencyKey, TickCallback, TickContext, TickFunctionDescriptor, TickOrderError, TickPhase,
};
pub use world::{World, WorldId, WorldInterface, DEFAULT_FIXED_TIMESTEP};

pub use basalt_core::{Handle, Transform};
