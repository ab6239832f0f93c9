//! Primitive bounding volumes and their plane classification
//!
//! Every primitive answers `test_plane`, which drives the frustum tests:
//! a positive result is the distance of the closest point when the volume is
//! fully in front of the plane, a negative result the (signed) distance of
//! the closest point when it is fully behind, and `0.0` when it straddles.

use crate::foundation::math::{utils, Mat3, Transform, Vec3};

/// Classify a signed distance interval against a plane
pub(crate) fn classify_interval(min_distance: f32, max_distance: f32) -> f32 {
    if min_distance > 0.0 {
        min_distance
    } else if max_distance < 0.0 {
        max_distance
    } else {
        0.0
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal: normal.normalize(), distance }
    }
    
    /// Create a plane through `point` facing `normal`
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self { normal, distance: -normal.dot(&point) }
    }
    
    /// Create a plane from raw `ax + by + cz + d` coefficients, normalizing them
    pub fn from_coefficients(a: f32, b: f32, c: f32, d: f32) -> Self {
        let normal = Vec3::new(a, b, c);
        let length = normal.magnitude();
        if length > 0.0 {
            Self { normal: normal / length, distance: d / length }
        } else {
            Self { normal, distance: d }
        }
    }
    
    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
    
    /// A plane is usable for tests when it is finite and has a unit normal
    pub fn is_valid(&self) -> bool {
        utils::is_finite(&self.normal)
            && self.distance.is_finite()
            && (self.normal.magnitude_squared() - 1.0).abs() < 1e-3
    }
}

/// A bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// The center position of the sphere
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Check if this sphere intersects with another
    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        let distance_squared = (self.center - other.center).magnitude_squared();
        let radius_sum = self.radius + other.radius;
        distance_squared <= radius_sum * radius_sum
    }
    
    /// Classify against a plane
    pub fn test_plane(&self, plane: &Plane) -> f32 {
        let distance = plane.distance_to_point(self.center);
        classify_interval(distance - self.radius, distance + self.radius)
    }
    
    /// Tight axis-aligned box around the sphere
    pub fn compute_aabb(&self) -> AABB {
        AABB::from_center_extents(self.center, Vec3::repeat(self.radius))
    }
    
    /// Finite center and a finite, non-negative radius
    pub fn is_valid(&self) -> bool {
        utils::is_finite(&self.center) && self.radius.is_finite() && self.radius >= 0.0
    }
}

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }
    
    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }
    
    /// Smallest box containing every point. `None` for an empty slice.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut aabb = Self::new(*first, *first);
        for point in rest {
            aabb.min = aabb.min.inf(point);
            aabb.max = aabb.max.sup(point);
        }
        Some(aabb)
    }
    
    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
    
    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
    
    /// Smallest box containing both boxes
    pub fn merged(&self, other: &AABB) -> AABB {
        AABB::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }
    
    /// Box grown by `margin` on every side
    pub fn expanded(&self, margin: f32) -> AABB {
        AABB::new(self.min - Vec3::repeat(margin), self.max + Vec3::repeat(margin))
    }
    
    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }
    
    /// Check if `other` lies completely inside this AABB
    pub fn contains_aabb(&self, other: &AABB) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }
    
    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }
    
    /// Squared distance from a point to the closest point of the box
    pub fn distance_squared_to_point(&self, point: Vec3) -> f32 {
        let closest = point.sup(&self.min).inf(&self.max);
        (closest - point).magnitude_squared()
    }
    
    /// Check if this AABB intersects a sphere
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.distance_squared_to_point(sphere.center) <= sphere.radius * sphere.radius
    }
    
    /// Classify against a plane
    pub fn test_plane(&self, plane: &Plane) -> f32 {
        let center = self.center();
        let radius = plane.normal.abs().dot(&self.extents());
        let distance = plane.distance_to_point(center);
        classify_interval(distance - radius, distance + radius)
    }
    
    /// Finite corners with `min <= max` on every axis
    pub fn is_valid(&self) -> bool {
        utils::is_finite(&self.min)
            && utils::is_finite(&self.max)
            && self.min.x <= self.max.x
            && self.min.y <= self.max.y
            && self.min.z <= self.max.z
    }
}

/// Oriented bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OBB {
    /// Center of the box
    pub center: Vec3,
    /// Orthonormal basis, columns are the box axes
    pub rotation: Mat3,
    /// Half-size along each box axis
    pub extents: Vec3,
}

impl OBB {
    /// Create an oriented box
    pub fn new(center: Vec3, rotation: Mat3, extents: Vec3) -> Self {
        Self { center, rotation, extents }
    }
    
    /// The eight corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let mut corners = [Vec3::zeros(); 8];
        for (index, corner) in corners.iter_mut().enumerate() {
            let sign = |bit: usize| if index & bit != 0 { 1.0 } else { -1.0 };
            let local = Vec3::new(
                self.extents.x * sign(1),
                self.extents.y * sign(2),
                self.extents.z * sign(4),
            );
            *corner = self.center + self.rotation * local;
        }
        corners
    }
    
    /// Classify against a plane
    pub fn test_plane(&self, plane: &Plane) -> f32 {
        let local_normal = self.rotation.transpose() * plane.normal;
        let radius = local_normal.abs().dot(&self.extents);
        let distance = plane.distance_to_point(self.center);
        classify_interval(distance - radius, distance + radius)
    }
    
    /// Tight axis-aligned box around the oriented box
    pub fn compute_aabb(&self) -> AABB {
        let half = self.rotation.abs() * self.extents;
        AABB::from_center_extents(self.center, half)
    }
    
    /// Check if this box intersects a sphere
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        let local = self.rotation.transpose() * (sphere.center - self.center);
        let clamped = local.sup(&-self.extents).inf(&self.extents);
        (local - clamped).magnitude_squared() <= sphere.radius * sphere.radius
    }
    
    /// Conservative box around this box after applying `transform`.
    ///
    /// Exact for uniform scale; with non-uniform scale the sheared result is
    /// enclosed along the rotated axes.
    pub fn transformed(&self, transform: &Transform) -> OBB {
        let rotation = transform.rotation.to_rotation_matrix().into_inner() * self.rotation;
        let linear = transform.linear_part();
        let half_axes = linear * self.rotation * Mat3::from_diagonal(&self.extents);
        let extents = Vec3::from_fn(|axis, _| {
            let direction = rotation.column(axis);
            (0..3).map(|i| direction.dot(&half_axes.column(i)).abs()).sum()
        });
        OBB::new(transform.transform_point(self.center), rotation, extents)
    }
    
    /// Finite values and non-negative extents
    pub fn is_valid(&self) -> bool {
        utils::is_finite(&self.center)
            && self.rotation.iter().all(|v| v.is_finite())
            && self.extents.iter().all(|e| e.is_finite() && *e >= 0.0)
    }
}
