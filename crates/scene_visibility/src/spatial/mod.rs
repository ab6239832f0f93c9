//! Spatial partitioning
//!
//! Broad-phase index over the bounding boxes of spatial components. The
//! scene world keeps it current from the update pass.

pub mod octree;

pub use octree::{Octree, OctreeConfig, OctreeEntity, OctreeNode};
