//! Scene components
//!
//! Every component an entity can carry is one variant of [`SceneComponent`].
//! The closed set lets the registry keep one list per [`ComponentKind`] and
//! lets the visibility tester derive an entity's render category without
//! dynamic type lookups.

pub mod lighting;
pub mod renderable;
pub mod spatial;

pub use lighting::{
    LensFlareComponent, LightComponent, LightFactory, LightType, ReflectionProbeComponent,
    ReflectionProxyComponent,
};
pub use renderable::RenderableComponent;
pub use spatial::{
    SpatialComponent, SpatialFlags, SpatialUpdateHook, VisibilityShape, VisibilityShapePolicy,
};

use crate::visibility::VisibilityGroup;

/// Discriminant of [`SceneComponent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// [`SpatialComponent`]
    Spatial,
    /// [`RenderableComponent`]
    Renderable,
    /// [`LightComponent`]
    Light,
    /// [`LensFlareComponent`]
    LensFlare,
    /// [`ReflectionProbeComponent`]
    ReflectionProbe,
    /// [`ReflectionProxyComponent`]
    ReflectionProxy,
}

impl ComponentKind {
    /// Number of component kinds
    pub const COUNT: usize = 6;
    
    /// All kinds in declaration order
    pub const ALL: [ComponentKind; Self::COUNT] = [
        Self::Spatial,
        Self::Renderable,
        Self::Light,
        Self::LensFlare,
        Self::ReflectionProbe,
        Self::ReflectionProxy,
    ];
    
    /// Dense index for per-kind tables
    pub const fn index(self) -> usize {
        self as usize
    }
    
    /// Render category this component gives its entity, if any
    pub const fn visibility_group(self) -> Option<VisibilityGroup> {
        match self {
            Self::Spatial => None,
            Self::Renderable => Some(VisibilityGroup::Renderables),
            Self::Light => Some(VisibilityGroup::Lights),
            Self::LensFlare => Some(VisibilityGroup::Flares),
            Self::ReflectionProbe => Some(VisibilityGroup::ReflectionProbes),
            Self::ReflectionProxy => Some(VisibilityGroup::ReflectionProxies),
        }
    }
}

/// A component attached to a scene entity
#[derive(Debug)]
pub enum SceneComponent {
    /// Placement and shape
    Spatial(SpatialComponent),
    /// Drawable geometry
    Renderable(RenderableComponent),
    /// Light source
    Light(LightComponent),
    /// Lens flare
    LensFlare(LensFlareComponent),
    /// Reflection probe
    ReflectionProbe(ReflectionProbeComponent),
    /// Reflection proxy
    ReflectionProxy(ReflectionProxyComponent),
}

impl SceneComponent {
    /// Kind of this component
    pub const fn kind(&self) -> ComponentKind {
        match self {
            Self::Spatial(_) => ComponentKind::Spatial,
            Self::Renderable(_) => ComponentKind::Renderable,
            Self::Light(_) => ComponentKind::Light,
            Self::LensFlare(_) => ComponentKind::LensFlare,
            Self::ReflectionProbe(_) => ComponentKind::ReflectionProbe,
            Self::ReflectionProxy(_) => ComponentKind::ReflectionProxy,
        }
    }
    
    /// The spatial component, if this is one
    pub const fn as_spatial(&self) -> Option<&SpatialComponent> {
        match self {
            Self::Spatial(spatial) => Some(spatial),
            _ => None,
        }
    }
    
    /// Mutable access to the spatial component, if this is one
    pub fn as_spatial_mut(&mut self) -> Option<&mut SpatialComponent> {
        match self {
            Self::Spatial(spatial) => Some(spatial),
            _ => None,
        }
    }
    
    /// The light component, if this is one
    pub const fn as_light(&self) -> Option<&LightComponent> {
        match self {
            Self::Light(light) => Some(light),
            _ => None,
        }
    }
}

macro_rules! impl_from_component {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for SceneComponent {
                fn from(component: $ty) -> Self {
                    Self::$variant(component)
                }
            }
        )*
    };
}

impl_from_component!(
    Spatial(SpatialComponent),
    Renderable(RenderableComponent),
    Light(LightComponent),
    LensFlare(LensFlareComponent),
    ReflectionProbe(ReflectionProbeComponent),
    ReflectionProxy(ReflectionProxyComponent),
);
