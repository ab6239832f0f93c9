//! Lighting components
//!
//! Lights are visibility candidates like any other entity and, when they
//! cast shadows, also define the volume of their own shadow-caster test.
//! Lens flares and reflection probes/proxies are plain markers carrying the
//! few parameters the renderer needs; their placement comes from the
//! entity's spatial component.
//!
//! A light's position and direction are given in its entity's space. Moving
//! the entity's spatial component moves the light with it: shadow views are
//! built from [`LightComponent::placed`] with that spatial's transform (see
//! `SceneWorld::placed_light`).

use crate::collision::{BoundingSphere, Frustum};
use crate::foundation::math::{Transform, Vec3};

/// Types of lights supported by the visibility system
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightType {
    /// Point light that radiates in all directions from a position
    Point,
    /// Spot light that creates a cone of light from a position
    Spot {
        /// Outer cone half-angle in radians
        outer_cone: f32,
    },
}

/// Light source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightComponent {
    /// The type of light
    pub light_type: LightType,
    /// Position in the owning entity's space
    pub position: Vec3,
    /// Direction for spot lights in the owning entity's space (normalized)
    pub direction: Vec3,
    /// Maximum distance the light reaches
    pub range: f32,
    /// Whether this light renders a shadow map
    pub cast_shadows: bool,
}

/// Near distance used for spot light shadow frusta
const SPOT_NEAR: f32 = 0.05;

impl LightComponent {
    /// The light moved by `transform`; the range scales with the largest
    /// scale factor
    pub fn placed(&self, transform: &Transform) -> Self {
        Self {
            position: transform.transform_point(self.position),
            direction: transform.rotation * self.direction,
            range: self.range * transform.max_scale(),
            ..*self
        }
    }
    
    /// Volume covered by the light, as a sphere for point lights
    pub fn influence_sphere(&self) -> BoundingSphere {
        BoundingSphere::new(self.position, self.range)
    }
    
    /// Shadow frustum for spot lights
    pub fn spot_frustum(&self) -> Option<Frustum> {
        let LightType::Spot { outer_cone } = self.light_type else {
            return None;
        };
        
        // Any up vector not parallel to the direction will do
        let up = if self.direction.y.abs() > 0.99 { Vec3::x() } else { Vec3::y() };
        Some(Frustum::perspective(
            self.position,
            self.position + self.direction,
            up,
            (outer_cone * 2.0).min(std::f32::consts::PI - 0.01),
            1.0,
            SPOT_NEAR,
            self.range.max(SPOT_NEAR * 2.0),
        ))
    }
}

/// Factory functions for creating light components
pub struct LightFactory;

impl LightFactory {
    /// Point light reaching `range` units from `position`
    pub fn point(position: Vec3, range: f32) -> LightComponent {
        LightComponent {
            light_type: LightType::Point,
            position,
            direction: Vec3::new(0.0, -1.0, 0.0), // Irrelevant for point lights
            range,
            cast_shadows: true,
        }
    }
    
    /// Spot light at `position` pointing along `direction`
    pub fn spot(position: Vec3, direction: Vec3, range: f32, outer_cone: f32) -> LightComponent {
        LightComponent {
            light_type: LightType::Spot { outer_cone },
            position,
            direction: direction.normalize(),
            range,
            cast_shadows: true,
        }
    }
}

/// Screen-space flare attached to a bright source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensFlareComponent {
    /// Flare brightness multiplier
    pub intensity: f32,
}

/// Captures the surrounding scene for reflections
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectionProbeComponent {
    /// Radius inside which the probe is used
    pub influence_radius: f32,
}

/// Geometry standing in for a probe when blending reflections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReflectionProxyComponent;
