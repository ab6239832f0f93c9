//! View frustum used by camera and spot-light visibility tests

use crate::foundation::math::{Mat4, Point3, Vec3};
use super::primitives::{BoundingSphere, Plane, AABB};
use super::shape::CollisionShape;

/// Frustum for visibility culling
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six inward-facing planes (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Index of the near plane in [`Frustum::planes`]
    pub const NEAR: usize = 4;
    /// Index of the far plane in [`Frustum::planes`]
    pub const FAR: usize = 5;
    
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }
    
    /// Extract frustum planes from a view-projection matrix
    ///
    /// Gribb-Hartmann extraction for OpenGL-style clip space
    /// (`-w <= z <= w`), which is what `nalgebra`'s projections produce.
    pub fn from_matrix(vp_matrix: &Mat4) -> Self {
        let row = |i: usize| vp_matrix.row(i).into_owned();
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        let plane = |v: nalgebra::RowVector4<f32>| Plane::from_coefficients(v[0], v[1], v[2], v[3]);
        
        Self {
            planes: [
                plane(r3 + r0),
                plane(r3 - r0),
                plane(r3 + r1),
                plane(r3 - r1),
                plane(r3 + r2),
                plane(r3 - r2),
            ],
        }
    }
    
    /// Perspective frustum of a camera at `eye` looking at `target`
    pub fn perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_radians: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let view = Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up);
        let projection = Mat4::new_perspective(aspect, fov_y_radians, near, far);
        Self::from_matrix(&(projection * view))
    }
    
    /// Orthographic frustum, e.g. for directional shadow cascades
    pub fn orthographic(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let view = Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up);
        let projection = Mat4::new_orthographic(left, right, bottom, top, near, far);
        Self::from_matrix(&(projection * view))
    }
    
    /// All six planes are finite with unit normals
    pub fn is_valid(&self) -> bool {
        self.planes.iter().all(Plane::is_valid)
    }
    
    /// Check if a point is inside the frustum
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(point) >= 0.0)
    }
    
    /// Check if a sphere is inside or intersects the frustum
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes.iter().all(|plane| sphere.test_plane(plane) >= 0.0)
    }
    
    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        self.planes.iter().all(|plane| aabb.test_plane(plane) >= 0.0)
    }
    
    /// Check if any collision shape is inside or intersects the frustum.
    ///
    /// Conservative: a shape near a frustum corner can pass while being
    /// outside, never the other way around.
    pub fn intersects_shape(&self, shape: &CollisionShape) -> bool {
        self.planes.iter().all(|plane| shape.test_plane(plane) >= 0.0)
    }
}
