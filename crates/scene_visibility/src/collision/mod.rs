//! Collision geometry used by the visibility tests
//!
//! # Module Organization
//!
//! - [`primitives`] - Planes and bounding volumes (sphere, AABB, OBB)
//! - [`shape`] - [`CollisionShape`], the closed set of shapes a spatial descriptor can carry
//! - [`frustum`] - Camera and light frusta
//! - [`volume`] - [`TestVolume`] and the volume-versus-shape dispatch
//!
//! All classification goes through `test_plane`: a shape is outside a
//! frustum as soon as it lies completely behind one of its planes.

pub mod primitives;
pub mod shape;
pub mod frustum;
pub mod volume;

// Re-export commonly used types
pub use primitives::{BoundingSphere, Plane, AABB, OBB};
pub use shape::{CollisionShape, CompoundShape, ConvexHull, CustomShape, ShapeError, MAX_SUB_SHAPES};
pub use frustum::Frustum;
pub use volume::TestVolume;
