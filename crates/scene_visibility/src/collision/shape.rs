//! Collision shapes attached to spatial descriptors
//!
//! [`CollisionShape`] is a closed set of shape kinds dispatched with `match`
//! on the hot visibility path. Shapes that do not fit the built-in kinds go
//! through [`CollisionShape::Custom`], which carries plain function pointers
//! for the two queries the visibility tests need.

use crate::foundation::math::{Quat, Transform, Vec3};
use super::primitives::{classify_interval, BoundingSphere, Plane, AABB, OBB};
use thiserror::Error;

/// Maximum number of sub-shapes a compound shape may hold
pub const MAX_SUB_SHAPES: usize = 15;

/// Errors raised while building a collision shape
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    /// Compound shape with more children than a visible-node record can index
    #[error("compound shape has {count} sub-shapes, at most {max} are supported")]
    TooManySubShapes {
        /// Requested number of children
        count: usize,
        /// Supported maximum
        max: usize,
    },
    
    /// Compound shape without children
    #[error("compound shape needs at least one sub-shape")]
    EmptyCompound,
    
    /// Convex hull without points
    #[error("convex hull needs at least one point")]
    EmptyHull,
    
    /// Negative or non-finite radius
    #[error("invalid sphere radius: {0}")]
    InvalidRadius(f32),
    
    /// Inverted or non-finite box
    #[error("invalid box bounds")]
    InvalidBounds,
}

/// Convex hull given by its points
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexHull {
    points: Vec<Vec3>,
}

impl ConvexHull {
    /// Hull points
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }
    
    fn test_plane(&self, plane: &Plane) -> f32 {
        let (min, max) = self.points.iter().fold((f32::MAX, f32::MIN), |(min, max), p| {
            let distance = plane.distance_to_point(*p);
            (min.min(distance), max.max(distance))
        });
        classify_interval(min, max)
    }
}

/// Children of a compound shape, at most [`MAX_SUB_SHAPES`] of them
///
/// Only [`CollisionShape::compound`] builds one, so every compound reaching
/// a visibility test has sub-shape indices that fit a visible-node record.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundShape {
    children: Vec<CollisionShape>,
}

impl CompoundShape {
    /// Sub-shapes in index order
    pub fn children(&self) -> &[CollisionShape] {
        &self.children
    }
    
    fn test_plane(&self, plane: &Plane) -> f32 {
        let mut closest_front = f32::MAX;
        let mut closest_behind = f32::MIN;
        let (mut front, mut behind) = (false, false);
        for child in &self.children {
            let result = child.test_plane(plane);
            if result > 0.0 {
                front = true;
                closest_front = closest_front.min(result);
            } else if result < 0.0 {
                behind = true;
                closest_behind = closest_behind.max(result);
            } else {
                return 0.0;
            }
        }
        match (front, behind) {
            (true, false) => closest_front,
            (false, true) => closest_behind,
            _ => 0.0,
        }
    }
}

/// User-defined shape with function-pointer hooks
///
/// `points` and `size` are the shape's parameters; transforms move the points
/// and scale `size` by the largest scale factor. Both hooks must honor the
/// usual contracts: `compute_aabb` returns a box containing the shape and
/// `test_plane` follows [`Plane`] classification (see [`super::primitives`]).
#[derive(Debug, Clone, PartialEq)]
pub struct CustomShape {
    /// Name for logs
    pub name: &'static str,
    /// Control points in the shape's space
    pub points: Vec<Vec3>,
    /// Scalar size parameter (e.g. a radius)
    pub size: f32,
    /// Bounding box hook
    pub compute_aabb: fn(&CustomShape) -> AABB,
    /// Plane classification hook
    pub test_plane: fn(&CustomShape, &Plane) -> f32,
}

/// Collision shape types
#[derive(Debug, Clone, PartialEq)]
pub enum CollisionShape {
    /// A sphere
    Sphere(BoundingSphere),
    /// An axis-aligned box
    Aabb(AABB),
    /// An oriented box
    Obb(OBB),
    /// A convex point cloud
    ConvexHull(ConvexHull),
    /// Several sub-shapes tested individually (e.g. multi-part renderables)
    Compound(CompoundShape),
    /// Shape with user-supplied hooks
    Custom(CustomShape),
}

impl CollisionShape {
    /// Sphere shape
    pub fn sphere(center: Vec3, radius: f32) -> Result<Self, ShapeError> {
        let sphere = BoundingSphere::new(center, radius);
        if !sphere.is_valid() {
            return Err(ShapeError::InvalidRadius(radius));
        }
        Ok(Self::Sphere(sphere))
    }
    
    /// Axis-aligned box shape
    pub fn aabb(min: Vec3, max: Vec3) -> Result<Self, ShapeError> {
        let aabb = AABB::new(min, max);
        if !aabb.is_valid() {
            return Err(ShapeError::InvalidBounds);
        }
        Ok(Self::Aabb(aabb))
    }
    
    /// Oriented box shape
    pub fn obb(center: Vec3, rotation: Quat, extents: Vec3) -> Result<Self, ShapeError> {
        let obb = OBB::new(center, rotation.to_rotation_matrix().into_inner(), extents);
        if !obb.is_valid() {
            return Err(ShapeError::InvalidBounds);
        }
        Ok(Self::Obb(obb))
    }
    
    /// Convex hull around the given points
    pub fn convex_hull(points: Vec<Vec3>) -> Result<Self, ShapeError> {
        if points.is_empty() {
            return Err(ShapeError::EmptyHull);
        }
        Ok(Self::ConvexHull(ConvexHull { points }))
    }
    
    /// Compound shape; child `i` becomes sub-shape index `i`
    pub fn compound(children: Vec<CollisionShape>) -> Result<Self, ShapeError> {
        if children.is_empty() {
            return Err(ShapeError::EmptyCompound);
        }
        if children.len() > MAX_SUB_SHAPES {
            return Err(ShapeError::TooManySubShapes {
                count: children.len(),
                max: MAX_SUB_SHAPES,
            });
        }
        Ok(Self::Compound(CompoundShape { children }))
    }
    
    /// True for the sphere kind, the one shape cheap enough to test exactly
    pub fn is_sphere(&self) -> bool {
        matches!(self, Self::Sphere(_))
    }
    
    /// The individually testable parts: compound children, or the shape itself
    pub fn sub_shapes(&self) -> &[CollisionShape] {
        match self {
            Self::Compound(compound) => compound.children(),
            _ => std::slice::from_ref(self),
        }
    }
    
    /// Conservative axis-aligned bounds of the shape
    pub fn compute_aabb(&self) -> AABB {
        match self {
            Self::Sphere(sphere) => sphere.compute_aabb(),
            Self::Aabb(aabb) => *aabb,
            Self::Obb(obb) => obb.compute_aabb(),
            Self::ConvexHull(hull) => AABB::from_points(&hull.points)
                .unwrap_or_else(|| AABB::new(Vec3::zeros(), Vec3::zeros())),
            Self::Compound(compound) => compound
                .children
                .iter()
                .map(CollisionShape::compute_aabb)
                .reduce(|a, b| a.merged(&b))
                .unwrap_or_else(|| AABB::new(Vec3::zeros(), Vec3::zeros())),
            Self::Custom(custom) => (custom.compute_aabb)(custom),
        }
    }
    
    /// Classify against a plane: `> 0` in front, `< 0` behind, `0` straddling
    pub fn test_plane(&self, plane: &Plane) -> f32 {
        match self {
            Self::Sphere(sphere) => sphere.test_plane(plane),
            Self::Aabb(aabb) => aabb.test_plane(plane),
            Self::Obb(obb) => obb.test_plane(plane),
            Self::ConvexHull(hull) => hull.test_plane(plane),
            Self::Compound(compound) => compound.test_plane(plane),
            Self::Custom(custom) => (custom.test_plane)(custom, plane),
        }
    }
    
    /// Reference point of the shape, used as the sorting origin
    pub fn center(&self) -> Vec3 {
        match self {
            Self::Sphere(sphere) => sphere.center,
            Self::Obb(obb) => obb.center,
            _ => self.compute_aabb().center(),
        }
    }
    
    /// The shape placed by `transform`. Radii scale by the largest scale factor,
    /// boxes become oriented boxes once rotated.
    pub fn transformed(&self, transform: &Transform) -> CollisionShape {
        match self {
            Self::Sphere(sphere) => Self::Sphere(BoundingSphere::new(
                transform.transform_point(sphere.center),
                sphere.radius * transform.max_scale(),
            )),
            Self::Aabb(aabb) if transform.rotation == Quat::identity() => {
                let center = transform.transform_point(aabb.center());
                let extents = aabb.extents().component_mul(&transform.scale.abs());
                Self::Aabb(AABB::from_center_extents(center, extents))
            }
            Self::Aabb(aabb) => {
                let obb = OBB::new(aabb.center(), crate::foundation::math::Mat3::identity(), aabb.extents());
                Self::Obb(obb.transformed(transform))
            }
            Self::Obb(obb) => Self::Obb(obb.transformed(transform)),
            Self::ConvexHull(hull) => Self::ConvexHull(ConvexHull {
                points: hull.points.iter().map(|p| transform.transform_point(*p)).collect(),
            }),
            Self::Compound(compound) => Self::Compound(CompoundShape {
                children: compound.children.iter().map(|c| c.transformed(transform)).collect(),
            }),
            Self::Custom(custom) => Self::Custom(CustomShape {
                points: custom.points.iter().map(|p| transform.transform_point(*p)).collect(),
                size: custom.size * transform.max_scale(),
                ..custom.clone()
            }),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::test_shapes::capsule;
    use approx::assert_relative_eq;
    
    /// Points on the surface of each shape; the bounding box must contain all of them
    fn extreme_points(shape: &CollisionShape) -> Vec<Vec3> {
        match shape {
            CollisionShape::Sphere(s) => {
                let mut points = Vec::new();
                for axis in [Vec3::x(), Vec3::y(), Vec3::z()] {
                    points.push(s.center + axis * s.radius);
                    points.push(s.center - axis * s.radius);
                }
                points
            }
            CollisionShape::Aabb(a) => vec![a.min, a.max],
            CollisionShape::Obb(o) => o.corners().to_vec(),
            CollisionShape::ConvexHull(h) => h.points().to_vec(),
            CollisionShape::Compound(c) => c.children().iter().flat_map(extreme_points).collect(),
            CollisionShape::Custom(c) => c
                .points
                .iter()
                .flat_map(|p| [p + Vec3::x() * c.size, p - Vec3::y() * c.size, p + Vec3::z() * c.size])
                .collect(),
        }
    }
    
    fn fixtures() -> Vec<CollisionShape> {
        vec![
            CollisionShape::sphere(Vec3::new(1.0, 0.0, 0.0), 2.0).unwrap(),
            CollisionShape::aabb(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0)).unwrap(),
            CollisionShape::obb(
                Vec3::new(0.0, 1.0, 0.0),
                Quat::from_axis_angle(&Vec3::x_axis(), 0.4),
                Vec3::new(1.0, 0.5, 2.0),
            )
            .unwrap(),
            CollisionShape::convex_hull(vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
            ])
            .unwrap(),
            CollisionShape::compound(vec![
                CollisionShape::sphere(Vec3::new(-3.0, 0.0, 0.0), 1.0).unwrap(),
                CollisionShape::aabb(Vec3::new(2.0, 2.0, 2.0), Vec3::new(3.0, 3.0, 3.0)).unwrap(),
            ])
            .unwrap(),
            capsule(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 0.5),
        ]
    }
    
    fn transforms() -> Vec<Transform> {
        vec![
            Transform::identity(),
            Transform::from_position(Vec3::new(10.0, -4.0, 2.5)),
            Transform::new(
                Vec3::new(-2.0, 3.0, 1.0),
                Quat::from_axis_angle(&Vec3::y_axis(), 1.1),
                Vec3::repeat(1.0),
            ),
            Transform::new(
                Vec3::new(0.5, 0.5, 0.5),
                Quat::from_euler_angles(0.3, -0.8, 1.7),
                Vec3::new(2.0, 0.5, 3.0),
            ),
        ]
    }
    
    #[test]
    fn test_bounding_box_contains_shape_under_transforms() {
        for shape in fixtures() {
            for transform in transforms() {
                let placed = shape.transformed(&transform);
                let aabb = placed.compute_aabb().expanded(1e-4);
                for point in extreme_points(&placed) {
                    assert!(
                        aabb.contains_point(point),
                        "{:?} escapes its bounds under {:?}",
                        point,
                        transform
                    );
                }
            }
        }
    }
    
    #[test]
    fn test_rotated_box_stays_conservative_under_nonuniform_scale() {
        let local = CollisionShape::aabb(Vec3::repeat(-1.0), Vec3::repeat(1.0)).unwrap();
        let transform = Transform::new(
            Vec3::zeros(),
            Quat::from_axis_angle(&Vec3::z_axis(), 0.785),
            Vec3::new(4.0, 1.0, 1.0),
        );
        let placed = local.transformed(&transform);
        let CollisionShape::Obb(obb) = &placed else {
            panic!("rotated box should become an oriented box");
        };
        
        // Every transformed local corner lies inside the resulting box
        let inverse_rotation = obb.rotation.transpose();
        for corner in OBB::new(Vec3::zeros(), crate::foundation::math::Mat3::identity(), Vec3::repeat(1.0)).corners() {
            let world = transform.transform_point(corner);
            let local = inverse_rotation * (world - obb.center);
            for axis in 0..3 {
                assert!(local[axis].abs() <= obb.extents[axis] + 1e-4);
            }
        }
    }
    
    #[test]
    fn test_compound_limits() {
        let child = CollisionShape::sphere(Vec3::zeros(), 1.0).unwrap();
        assert_eq!(CollisionShape::compound(Vec::new()), Err(ShapeError::EmptyCompound));
        assert_eq!(
            CollisionShape::compound(vec![child.clone(); MAX_SUB_SHAPES + 1]),
            Err(ShapeError::TooManySubShapes { count: MAX_SUB_SHAPES + 1, max: MAX_SUB_SHAPES })
        );
        assert!(CollisionShape::compound(vec![child; MAX_SUB_SHAPES]).is_ok());
    }
    
    #[test]
    fn test_invalid_primitives_are_rejected() {
        assert_eq!(CollisionShape::sphere(Vec3::zeros(), -1.0), Err(ShapeError::InvalidRadius(-1.0)));
        assert_eq!(
            CollisionShape::aabb(Vec3::repeat(1.0), Vec3::repeat(-1.0)),
            Err(ShapeError::InvalidBounds)
        );
        assert_eq!(CollisionShape::convex_hull(Vec::new()), Err(ShapeError::EmptyHull));
    }
    
    #[test]
    fn test_compound_plane_classification() {
        let plane = Plane::new(Vec3::x(), 0.0);
        let in_front = CollisionShape::compound(vec![
            CollisionShape::sphere(Vec3::new(3.0, 0.0, 0.0), 1.0).unwrap(),
            CollisionShape::sphere(Vec3::new(6.0, 0.0, 0.0), 1.0).unwrap(),
        ])
        .unwrap();
        let split = CollisionShape::compound(vec![
            CollisionShape::sphere(Vec3::new(3.0, 0.0, 0.0), 1.0).unwrap(),
            CollisionShape::sphere(Vec3::new(-6.0, 0.0, 0.0), 1.0).unwrap(),
        ])
        .unwrap();
        
        assert_relative_eq!(in_front.test_plane(&plane), 2.0);
        assert_eq!(split.test_plane(&plane), 0.0);
    }
    
    #[test]
    fn test_sub_shapes_of_simple_shape_is_itself() {
        let sphere = CollisionShape::sphere(Vec3::zeros(), 1.0).unwrap();
        assert_eq!(sphere.sub_shapes().len(), 1);
        assert_eq!(sphere.sub_shapes()[0], sphere);
    }
}
