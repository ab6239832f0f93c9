//! Scene entities and components
//!
//! Slab-backed scene context the visibility tests run against.

pub mod components;
pub mod registry;
pub mod world;

pub use components::{ComponentKind, SceneComponent, SpatialComponent, SpatialFlags};
pub use registry::SceneComponentLists;
pub use world::{SceneNode, SceneWorld, SpatialEntry};
pub use crate::foundation::collections::{ComponentHandle, Entity};
