//! Views a visibility test runs from

use bitflags::bitflags;

use crate::collision::{Frustum, TestVolume};
use crate::ecs::components::{LightComponent, LightType, SpatialFlags};
use crate::foundation::math::Vec3;
use super::results::VisibilityGroup;

bitflags! {
    /// What a visibility test collects
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VisibilityTest: u8 {
        /// Renderable entities
        const RENDERABLES = 1 << 0;
        /// Restrict renderables to shadow casters
        const ONLY_SHADOW_CASTERS = 1 << 1;
        /// Lights
        const LIGHTS = 1 << 2;
        /// Lens flares
        const FLARES = 1 << 3;
        /// Reflection probes
        const REFLECTION_PROBES = 1 << 4;
        /// Reflection proxies
        const REFLECTION_PROXIES = 1 << 5;
        /// What a camera needs
        const CAMERA = Self::RENDERABLES.bits()
            | Self::LIGHTS.bits()
            | Self::FLARES.bits()
            | Self::REFLECTION_PROBES.bits()
            | Self::REFLECTION_PROXIES.bits();
        /// What a shadow map needs
        const SHADOW_CASTERS = Self::RENDERABLES.bits() | Self::ONLY_SHADOW_CASTERS.bits();
    }
}

impl VisibilityTest {
    /// Whether entities of `group` are collected
    pub const fn wants(self, group: VisibilityGroup) -> bool {
        let flag = match group {
            VisibilityGroup::Renderables => Self::RENDERABLES,
            VisibilityGroup::Lights => Self::LIGHTS,
            VisibilityGroup::Flares => Self::FLARES,
            VisibilityGroup::ReflectionProbes => Self::REFLECTION_PROBES,
            VisibilityGroup::ReflectionProxies => Self::REFLECTION_PROXIES,
        };
        self.contains(flag)
    }
}

/// Who is looking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// Camera; visible descriptors get [`SpatialFlags::VISIBLE_CAMERA`]
    Camera,
    /// Light; visible descriptors get [`SpatialFlags::VISIBLE_LIGHT`]
    Light,
}

impl ViewKind {
    /// Flag set on descriptors this view sees
    pub const fn visible_flag(self) -> SpatialFlags {
        match self {
            Self::Camera => SpatialFlags::VISIBLE_CAMERA,
            Self::Light => SpatialFlags::VISIBLE_LIGHT,
        }
    }
}

/// Test volume plus the context of the test
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityView {
    /// Volume candidates are intersected with
    pub volume: TestVolume,
    /// Distances for sorting are measured from here
    pub origin: Vec3,
    /// Camera or light
    pub kind: ViewKind,
    /// Fully transparent descriptors are tested only when set
    pub near_plane_precision: bool,
}

impl VisibilityView {
    /// Camera view through `frustum` from `eye`
    pub fn camera(frustum: Frustum, eye: Vec3) -> Self {
        Self {
            volume: TestVolume::Frustum(frustum),
            origin: eye,
            kind: ViewKind::Camera,
            near_plane_precision: true,
        }
    }
    
    /// Light view over an arbitrary volume
    pub fn light(volume: TestVolume, origin: Vec3) -> Self {
        Self {
            volume,
            origin,
            kind: ViewKind::Light,
            near_plane_precision: false,
        }
    }
    
    /// Shadow view of a light: its range sphere for point lights, its cone
    /// frustum for spot lights
    pub fn for_light(light: &LightComponent) -> Self {
        let volume = match (light.light_type, light.spot_frustum()) {
            (LightType::Spot { .. }, Some(frustum)) => TestVolume::Frustum(frustum),
            _ => TestVolume::Sphere(light.influence_sphere()),
        };
        Self::light(volume, light.position)
    }
    
    /// Override the near-plane precision requirement
    pub fn with_near_plane_precision(mut self, enabled: bool) -> Self {
        self.near_plane_precision = enabled;
        self
    }
}
