//! Spatial component
//!
//! Gives an entity a place in space and makes it take part in visibility
//! tests. The component keeps a precise collision shape plus a cached
//! axis-aligned box (the fast bounding volume). The box is recomputed only
//! by the update pass and only when the component was marked for update.
//! [`SpatialComponent::set_transform`] and [`SpatialComponent::set_local_shape`]
//! mark it themselves; code that changes the shape any other way must call
//! [`SpatialComponent::mark_for_update`] or the box goes stale.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::collision::{CollisionShape, TestVolume, AABB};
use crate::foundation::collections::Entity;
use crate::foundation::math::{Transform, Vec3};

bitflags! {
    /// Spatial flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SpatialFlags: u8 {
        /// Seen by a camera test this frame
        const VISIBLE_CAMERA = 1 << 1;
        /// Seen by a light test this frame
        const VISIBLE_LIGHT = 1 << 2;
        /// Either of the two, set by the visibility tester
        const VISIBLE_ANY = Self::VISIBLE_CAMERA.bits() | Self::VISIBLE_LIGHT.bits();
        /// Contributes nothing when clipped by the near plane (e.g. lights
        /// that do not touch any surface); skipped by tests that do not
        /// require near-plane precision
        const FULLY_TRANSPARENT = 1 << 3;
        /// The shape changed since the bounding box was last computed
        const MARKED_FOR_UPDATE = 1 << 4;
    }
}

/// Which shape a visibility test uses for a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VisibilityShapePolicy {
    /// Spheres are tested exactly, everything else through its bounding box
    #[default]
    SpheresExact,
    /// Always the precise shape
    Exact,
    /// Always the bounding box
    BoundsOnly,
}

impl VisibilityShapePolicy {
    /// True when `shape` should be tested exactly under this policy
    pub fn uses_exact(self, shape: &CollisionShape) -> bool {
        match self {
            Self::SpheresExact => shape.is_sphere(),
            Self::Exact => true,
            Self::BoundsOnly => false,
        }
    }
    
    /// Test a shape that has no cached bounds (a compound child)
    pub fn test_shape(self, volume: &TestVolume, shape: &CollisionShape) -> bool {
        if self.uses_exact(shape) {
            volume.intersects_shape(shape)
        } else {
            volume.intersects_aabb(&shape.compute_aabb())
        }
    }
}

/// Shape selected for a visibility test
#[derive(Debug, Clone, Copy)]
pub enum VisibilityShape<'a> {
    /// The precise collision shape
    Exact(&'a CollisionShape),
    /// The cached bounding box
    Bounds(&'a AABB),
}

impl VisibilityShape<'_> {
    /// Intersect with a test volume
    pub fn intersects(&self, volume: &TestVolume) -> bool {
        match self {
            Self::Exact(shape) => volume.intersects_shape(shape),
            Self::Bounds(aabb) => volume.intersects_aabb(aabb),
        }
    }
}

/// Callback fired by the update pass when a descriptor's shape changed
pub type SpatialUpdateHook = Box<dyn FnMut(Entity, &AABB) + Send + Sync>;

/// Spatial descriptor of an entity
pub struct SpatialComponent {
    local_shape: CollisionShape,
    transform: Transform,
    shape: CollisionShape,
    aabb: AABB,
    flags: AtomicU8,
    update_hook: Option<SpatialUpdateHook>,
}

impl fmt::Debug for SpatialComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialComponent")
            .field("shape", &self.shape)
            .field("aabb", &self.aabb)
            .field("flags", &self.flags())
            .field("has_update_hook", &self.update_hook.is_some())
            .finish_non_exhaustive()
    }
}

impl SpatialComponent {
    /// Create a descriptor for a shape given in entity space.
    ///
    /// The component starts marked for update so the first update pass
    /// reports it and indexes it.
    pub fn new(local_shape: CollisionShape) -> Self {
        let shape = local_shape.clone();
        let aabb = shape.compute_aabb();
        Self {
            local_shape,
            transform: Transform::identity(),
            shape,
            aabb,
            flags: AtomicU8::new(SpatialFlags::MARKED_FOR_UPDATE.bits()),
            update_hook: None,
        }
    }
    
    /// Place the shape with `transform`
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.set_transform(transform);
        self.aabb = self.shape.compute_aabb();
        self
    }
    
    /// Enable additional flags (typically [`SpatialFlags::FULLY_TRANSPARENT`])
    pub fn with_flags(mut self, flags: SpatialFlags) -> Self {
        *self.flags.get_mut() |= flags.bits();
        self
    }
    
    /// Install the hook fired whenever an update changes the shape
    pub fn with_update_hook(mut self, hook: impl FnMut(Entity, &AABB) + Send + Sync + 'static) -> Self {
        self.update_hook = Some(Box::new(hook));
        self
    }
    
    /// Precise world-space shape for exact intersection tests
    pub fn collision_shape(&self) -> &CollisionShape {
        &self.shape
    }
    
    /// Shape in entity space
    pub fn local_shape(&self) -> &CollisionShape {
        &self.local_shape
    }
    
    /// Current placement
    pub fn transform(&self) -> &Transform {
        &self.transform
    }
    
    /// Cached world-space bounding box
    pub fn fast_bounding_volume(&self) -> &AABB {
        &self.aabb
    }
    
    /// Shape a visibility test should use under `policy`
    pub fn visibility_shape(&self, policy: VisibilityShapePolicy) -> VisibilityShape<'_> {
        if policy.uses_exact(&self.shape) {
            VisibilityShape::Exact(&self.shape)
        } else {
            VisibilityShape::Bounds(&self.aabb)
        }
    }
    
    /// Origin used for distance sorting
    pub fn origin(&self) -> Vec3 {
        self.shape.center()
    }
    
    /// Current flags
    pub fn flags(&self) -> SpatialFlags {
        SpatialFlags::from_bits_truncate(self.flags.load(Ordering::Relaxed))
    }
    
    /// Enable or disable [`SpatialFlags::FULLY_TRANSPARENT`]
    pub fn set_fully_transparent(&mut self, enabled: bool) {
        let flags = self.flags.get_mut();
        if enabled {
            *flags |= SpatialFlags::FULLY_TRANSPARENT.bits();
        } else {
            *flags &= !SpatialFlags::FULLY_TRANSPARENT.bits();
        }
    }
    
    /// Request a bounding box refresh on the next update pass
    pub fn mark_for_update(&mut self) {
        *self.flags.get_mut() |= SpatialFlags::MARKED_FOR_UPDATE.bits();
    }
    
    /// Move the shape; marks the component for update
    pub fn set_transform(&mut self, transform: Transform) {
        self.shape = self.local_shape.transformed(&transform);
        self.transform = transform;
        self.mark_for_update();
    }
    
    /// Replace the entity-space shape; marks the component for update
    pub fn set_local_shape(&mut self, local_shape: CollisionShape) {
        self.shape = local_shape.transformed(&self.transform);
        self.local_shape = local_shape;
        self.mark_for_update();
    }
    
    /// Record that a test saw this descriptor. Shared access only, so
    /// concurrent testers can tag the same descriptor.
    pub(crate) fn mark_visible(&self, flags: SpatialFlags) {
        self.flags.fetch_or((flags & SpatialFlags::VISIBLE_ANY).bits(), Ordering::Relaxed);
    }
    
    /// Per-frame reset of the visibility flags
    pub(crate) fn reset(&mut self) {
        *self.flags.get_mut() &= !SpatialFlags::VISIBLE_ANY.bits();
    }
    
    /// Recompute the bounding box if marked. Returns whether anything changed.
    pub(crate) fn update(&mut self) -> bool {
        let flags = self.flags.get_mut();
        if *flags & SpatialFlags::MARKED_FOR_UPDATE.bits() == 0 {
            return false;
        }
        *flags &= !SpatialFlags::MARKED_FOR_UPDATE.bits();
        self.aabb = self.shape.compute_aabb();
        true
    }
    
    /// Fire the update hook, if any
    pub(crate) fn on_updated(&mut self, entity: Entity) {
        if let Some(hook) = self.update_hook.as_mut() {
            hook(entity, &self.aabb);
        }
    }
}
