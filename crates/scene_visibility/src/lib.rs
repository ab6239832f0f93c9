//! # Scene Visibility
//!
//! Per-frame visibility determination and spatial indexing for a real-time
//! renderer.
//!
//! ## Features
//!
//! - **Collision shapes**: spheres, boxes, oriented boxes, convex hulls,
//!   compounds and user-defined shapes, tested against frusta, spheres and boxes
//! - **Scene world**: slab-backed entities and components with per-kind lists
//! - **Visibility tests**: grouped, sorted results written into frame-arena storage
//! - **Fork-join light tests**: one shadow-caster test per visible light on a thread pool
//! - **Spatial index**: octree kept current by the scene update pass
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_visibility::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = VisibilityEngine::new(VisibilityConfig::default())?;
//!     let mut world = engine.create_world();
//!
//!     let crate_node = world.create_node("crate");
//!     world.add_component(crate_node, SpatialComponent::new(CollisionShape::sphere(Vec3::zeros(), 1.0)?));
//!     world.add_component(crate_node, RenderableComponent::new());
//!
//!     let eye = Vec3::new(0.0, 2.0, 10.0);
//!     let frustum = Frustum::perspective(eye, Vec3::zeros(), Vec3::y(), 1.0, 16.0 / 9.0, 0.1, 100.0);
//!     let camera = VisibilityView::camera(frustum, eye);
//!
//!     engine.begin_frame(&mut world);
//!     let frame = engine.run_frame(&world, &camera);
//!     println!("{} renderables visible", frame.camera.count(VisibilityGroup::Renderables));
//!     engine.end_frame(frame);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core modules
pub mod core;
pub mod config;

pub mod foundation;
pub mod collision;
pub mod ecs;
pub mod spatial;
pub mod visibility;

mod engine;

pub use engine::{EngineError, FrameVisibility, VisibilityEngine};

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        EngineError, FrameVisibility, VisibilityEngine,
        collision::{CollisionShape, Frustum, TestVolume, AABB},
        core::{Config, VisibilityConfig},
        ecs::{
            components::{LightFactory, RenderableComponent, SpatialComponent, SpatialFlags},
            Entity, SceneWorld,
        },
        foundation::math::{Transform, Vec3},
        visibility::{VisibilityGroup, VisibilityTest, VisibilityView},
    };
}
