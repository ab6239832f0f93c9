//! Scene world
//!
//! Owns every scene entity and component in slab arenas with stable handles,
//! the per-kind component lists, the broad-phase spatial index and the
//! global frame timestamp.
//!
//! Per frame the owner calls [`SceneWorld::begin_frame`], then
//! [`SceneWorld::update`], then hands out `&SceneWorld` to the visibility
//! tests. The update pass needs `&mut self`, so no test can observe a
//! half-updated scene.

use log::{debug, trace};

use crate::collision::AABB;
use crate::foundation::collections::{ComponentHandle, Entity, SlotMap};
use crate::foundation::math::Vec3;
use crate::foundation::time::Timestamp;
use crate::spatial::{Octree, OctreeConfig};
use crate::visibility::VisibilityGroup;
use super::components::{ComponentKind, LightComponent, SceneComponent, SpatialComponent};
use super::registry::SceneComponentLists;

/// An entity of the scene
#[derive(Debug, Clone, Default)]
pub struct SceneNode {
    name: String,
    components: Vec<ComponentHandle>,
    spatial: Option<ComponentHandle>,
}

impl SceneNode {
    /// Debug name
    pub fn name(&self) -> &str {
        &self.name
    }
    
    /// Attached components in attachment order
    pub fn components(&self) -> &[ComponentHandle] {
        &self.components
    }
    
    /// Handle of the spatial component, if any
    pub fn spatial_handle(&self) -> Option<ComponentHandle> {
        self.spatial
    }
}

#[derive(Debug)]
struct ComponentSlot {
    owner: Entity,
    timestamp: Timestamp,
    component: SceneComponent,
}

/// Spatial component seen through the world, as visited by visibility tests
#[derive(Debug, Clone, Copy)]
pub struct SpatialEntry<'a> {
    /// Owning entity
    pub entity: Entity,
    /// Handle of the spatial component
    pub handle: ComponentHandle,
    /// The component
    pub spatial: &'a SpatialComponent,
    /// Frame at which its shape last changed
    pub timestamp: Timestamp,
}

/// Scene context: entities, components, lists and the frame timestamp
#[derive(Debug)]
pub struct SceneWorld {
    nodes: SlotMap<Entity, SceneNode>,
    components: SlotMap<ComponentHandle, ComponentSlot>,
    lists: SceneComponentLists,
    spatial_index: Octree,
    moved: Vec<(Entity, AABB)>,
    timestamp: Timestamp,
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneWorld {
    /// Create an empty world indexing a 2 km cube around the origin
    pub fn new() -> Self {
        let bounds = AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(1000.0));
        Self::with_spatial_index(Octree::new(bounds, OctreeConfig::default()))
    }
    
    /// Create an empty world with a preconfigured spatial index
    pub fn with_spatial_index(spatial_index: Octree) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            components: SlotMap::with_key(),
            lists: SceneComponentLists::new(),
            spatial_index,
            moved: Vec::new(),
            timestamp: 0,
        }
    }
    
    /// Create a new entity
    pub fn create_node(&mut self, name: impl Into<String>) -> Entity {
        self.nodes.insert(SceneNode {
            name: name.into(),
            ..SceneNode::default()
        })
    }
    
    /// Destroy an entity and every component it owns. Returns false if the
    /// entity does not exist.
    pub fn destroy_node(&mut self, entity: Entity) -> bool {
        let Some(node) = self.nodes.get(entity) else {
            return false;
        };
        for handle in node.components.clone() {
            self.remove_component(handle);
        }
        self.nodes.remove(entity);
        true
    }
    
    /// Attach a component to an entity.
    ///
    /// # Panics
    /// If the entity does not exist, or when attaching a second spatial
    /// component to the same entity.
    pub fn add_component(&mut self, entity: Entity, component: impl Into<SceneComponent>) -> ComponentHandle {
        let component = component.into();
        let kind = component.kind();
        let indexed_bounds = component.as_spatial().map(|spatial| *spatial.fast_bounding_volume());
        let Some(node) = self.nodes.get_mut(entity) else {
            panic!("cannot add a component to unknown entity {entity:?}");
        };
        assert!(
            kind != ComponentKind::Spatial || node.spatial.is_none(),
            "entity {entity:?} ('{}') already has a spatial component",
            node.name
        );
        
        let handle = self.components.insert(ComponentSlot {
            owner: entity,
            timestamp: 0,
            component,
        });
        node.components.push(handle);
        if kind == ComponentKind::Spatial {
            node.spatial = Some(handle);
        }
        if let Some(bounds) = indexed_bounds {
            self.spatial_index.update(entity, &bounds);
        }
        self.lists.insert(handle, kind);
        trace!("Added {kind:?} component {handle:?} to {entity:?}");
        handle
    }
    
    /// Detach and return a component
    pub fn remove_component(&mut self, handle: ComponentHandle) -> Option<SceneComponent> {
        let slot = self.components.remove(handle)?;
        self.lists.remove(handle);
        
        if let Some(node) = self.nodes.get_mut(slot.owner) {
            node.components.retain(|&h| h != handle);
            if node.spatial == Some(handle) {
                node.spatial = None;
                self.spatial_index.remove(slot.owner);
            }
        }
        trace!("Removed {:?} component {handle:?} from {:?}", slot.component.kind(), slot.owner);
        Some(slot.component)
    }
    
    /// Look up an entity
    pub fn node(&self, entity: Entity) -> Option<&SceneNode> {
        self.nodes.get(entity)
    }
    
    /// All entities
    pub fn nodes(&self) -> impl Iterator<Item = (Entity, &SceneNode)> {
        self.nodes.iter()
    }
    
    /// Number of entities
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
    
    /// Look up a component
    pub fn component(&self, handle: ComponentHandle) -> Option<&SceneComponent> {
        self.components.get(handle).map(|slot| &slot.component)
    }
    
    /// Mutable access to a component
    pub fn component_mut(&mut self, handle: ComponentHandle) -> Option<&mut SceneComponent> {
        self.components.get_mut(handle).map(|slot| &mut slot.component)
    }
    
    /// Entity owning a component
    pub fn component_owner(&self, handle: ComponentHandle) -> Option<Entity> {
        self.components.get(handle).map(|slot| slot.owner)
    }
    
    /// Frame at which a component was last updated with a change
    pub fn component_timestamp(&self, handle: ComponentHandle) -> Option<Timestamp> {
        self.components.get(handle).map(|slot| slot.timestamp)
    }
    
    /// First component of `kind` attached to `entity`
    pub fn find_component(&self, entity: Entity, kind: ComponentKind) -> Option<ComponentHandle> {
        self.nodes.get(entity)?.components.iter().copied().find(|&handle| {
            self.components.get(handle).is_some_and(|slot| slot.component.kind() == kind)
        })
    }
    
    /// Spatial component of an entity
    pub fn spatial(&self, entity: Entity) -> Option<&SpatialComponent> {
        let handle = self.nodes.get(entity)?.spatial?;
        self.components.get(handle)?.component.as_spatial()
    }
    
    /// Mutable spatial component of an entity
    pub fn spatial_mut(&mut self, entity: Entity) -> Option<&mut SpatialComponent> {
        let handle = self.nodes.get(entity)?.spatial?;
        self.components.get_mut(handle)?.component.as_spatial_mut()
    }
    
    /// Light component of an entity
    pub fn light(&self, entity: Entity) -> Option<&LightComponent> {
        let handle = self.find_component(entity, ComponentKind::Light)?;
        self.components.get(handle)?.component.as_light()
    }
    
    /// Light component of an entity placed by its spatial component's
    /// transform, as shadow views need it
    pub fn placed_light(&self, entity: Entity) -> Option<LightComponent> {
        let light = self.light(entity)?;
        Some(match self.spatial(entity) {
            Some(spatial) => light.placed(spatial.transform()),
            None => *light,
        })
    }
    
    /// Render category of an entity, derived from its components with
    /// priority renderable > light > lens flare > reflection probe >
    /// reflection proxy
    pub fn render_category(&self, entity: Entity) -> Option<VisibilityGroup> {
        self.nodes
            .get(entity)?
            .components
            .iter()
            .filter_map(|&handle| self.components.get(handle))
            .map(|slot| slot.component.kind())
            .filter(|kind| kind.visibility_group().is_some())
            .min_by_key(|kind| kind.index())
            .and_then(ComponentKind::visibility_group)
    }
    
    /// True if any renderable of the entity casts shadows
    pub fn casts_shadow(&self, entity: Entity) -> bool {
        self.nodes.get(entity).is_some_and(|node| {
            node.components.iter().any(|&handle| {
                matches!(
                    self.components.get(handle).map(|slot| &slot.component),
                    Some(SceneComponent::Renderable(renderable)) if renderable.casts_shadow
                )
            })
        })
    }
    
    /// Per-kind component lists
    pub fn component_lists(&self) -> &SceneComponentLists {
        &self.lists
    }
    
    /// Spatial components in registration order
    pub fn iter_spatials(&self) -> impl Iterator<Item = SpatialEntry<'_>> {
        self.lists.iter(ComponentKind::Spatial).filter_map(move |handle| {
            let slot = self.components.get(handle)?;
            Some(SpatialEntry {
                entity: slot.owner,
                handle,
                spatial: slot.component.as_spatial()?,
                timestamp: slot.timestamp,
            })
        })
    }
    
    /// Spatial component of an entity as visibility tests see it
    pub fn spatial_entry(&self, entity: Entity) -> Option<SpatialEntry<'_>> {
        let handle = self.nodes.get(entity)?.spatial?;
        let slot = self.components.get(handle)?;
        Some(SpatialEntry {
            entity,
            handle,
            spatial: slot.component.as_spatial()?,
            timestamp: slot.timestamp,
        })
    }
    
    /// Broad-phase index over spatial bounding boxes. Entries follow the
    /// boxes as of the last [`SceneWorld::update`].
    pub fn spatial_index(&self) -> &Octree {
        &self.spatial_index
    }
    
    /// Spatials whose shape changed in this frame's update pass, with the
    /// bounds they had before the change
    pub fn moved_this_frame(&self) -> &[(Entity, AABB)] {
        &self.moved
    }
    
    /// Current frame timestamp (0 before the first frame)
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
    
    /// Advance the frame timestamp and clear last frame's visibility flags
    pub fn begin_frame(&mut self) -> Timestamp {
        self.timestamp += 1;
        self.moved.clear();
        for handle in self.lists.iter(ComponentKind::Spatial) {
            if let Some(spatial) = self.components.get_mut(handle).and_then(|slot| slot.component.as_spatial_mut()) {
                spatial.reset();
            }
        }
        trace!("Scene frame {} started", self.timestamp);
        self.timestamp
    }
    
    /// Refresh bounding volumes marked for update, fire their hooks, re-index
    /// them and stamp them with the current frame. Returns how many changed.
    pub fn update(&mut self) -> usize {
        let mut changed = 0;
        for handle in self.lists.iter(ComponentKind::Spatial) {
            let Some(slot) = self.components.get_mut(handle) else {
                continue;
            };
            let owner = slot.owner;
            let Some(spatial) = slot.component.as_spatial_mut() else {
                continue;
            };
            
            let previous = *spatial.fast_bounding_volume();
            if spatial.update() {
                self.moved.push((owner, previous));
                spatial.on_updated(owner);
                self.spatial_index.update(owner, spatial.fast_bounding_volume());
                slot.timestamp = self.timestamp;
                changed += 1;
            }
        }
        
        if changed > 0 {
            debug!("Updated {changed} spatial component(s) at frame {}", self.timestamp);
        }
        changed
    }
}
