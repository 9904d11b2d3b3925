//! Shared primitives for the Basalt runtime: generation-tagged handles,
//! TRS transforms and fixed-step timing.
//!
//! This crate is intentionally small and dependency-light; everything that
//! knows about objects, components or scheduling lives in `basalt_world`.

pub mod handle;
pub mod time;
pub mod transform;

pub use handle::Handle;
pub use time::StepTimer;
pub use transform::Transform;
