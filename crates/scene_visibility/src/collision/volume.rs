//! Test volumes and the volume-versus-shape dispatch table
//!
//! A visibility test intersects one [`TestVolume`] (camera frustum, spot
//! light frustum, point light sphere, or a box region) against many collision
//! shapes. Pairs without an exact routine fall back to the shape's bounding
//! box, which keeps every answer conservative.

use super::frustum::Frustum;
use super::primitives::{BoundingSphere, AABB};
use super::shape::CollisionShape;

/// Volume a visibility test is run against
#[derive(Debug, Clone, PartialEq)]
pub enum TestVolume {
    /// Camera or spot light frustum
    Frustum(Frustum),
    /// Point light range
    Sphere(BoundingSphere),
    /// Box region
    Aabb(AABB),
}

impl TestVolume {
    /// Volume is well formed (precondition of every visibility test)
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Frustum(frustum) => frustum.is_valid(),
            Self::Sphere(sphere) => sphere.is_valid(),
            Self::Aabb(aabb) => aabb.is_valid(),
        }
    }
    
    /// Volume against a bounding box
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        match self {
            Self::Frustum(frustum) => frustum.intersects_aabb(aabb),
            Self::Sphere(sphere) => aabb.intersects_sphere(sphere),
            Self::Aabb(volume) => volume.intersects(aabb),
        }
    }
    
    /// Volume against a precise shape
    pub fn intersects_shape(&self, shape: &CollisionShape) -> bool {
        match (self, shape) {
            (Self::Frustum(frustum), shape) => frustum.intersects_shape(shape),
            
            (_, CollisionShape::Compound(compound)) => {
                compound.children().iter().any(|child| self.intersects_shape(child))
            }
            
            (Self::Sphere(volume), CollisionShape::Sphere(sphere)) => volume.intersects(sphere),
            (Self::Sphere(volume), CollisionShape::Aabb(aabb)) => aabb.intersects_sphere(volume),
            (Self::Sphere(volume), CollisionShape::Obb(obb)) => obb.intersects_sphere(volume),
            
            (Self::Aabb(volume), CollisionShape::Sphere(sphere)) => volume.intersects_sphere(sphere),
            (Self::Aabb(volume), CollisionShape::Aabb(aabb)) => volume.intersects(aabb),
            
            (_, shape) => self.intersects_aabb(&shape.compute_aabb()),
        }
    }
}
