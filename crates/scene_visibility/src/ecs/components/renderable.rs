//! Renderable component for entities that can be drawn
//!
//! Marks an entity as belonging to the renderables visibility group. The
//! mesh and material live with the renderer; visibility only needs to know
//! whether the entity takes part in shadow passes.

/// Component for entities that can be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderableComponent {
    /// Whether this object is drawn into shadow maps
    pub casts_shadow: bool,
    
    /// Rendering layer for sorting (higher values render later)
    pub render_layer: u8,
}

impl RenderableComponent {
    /// Create a new renderable component that casts shadows
    pub fn new() -> Self {
        Self {
            casts_shadow: true,
            render_layer: 0,
        }
    }
    
    /// Create a renderable that is skipped by shadow-caster tests
    pub fn without_shadow() -> Self {
        Self {
            casts_shadow: false,
            ..Self::new()
        }
    }
    
    /// Set the rendering layer
    pub fn with_layer(mut self, render_layer: u8) -> Self {
        self.render_layer = render_layer;
        self
    }
}

impl Default for RenderableComponent {
    fn default() -> Self {
        Self::new()
    }
}
