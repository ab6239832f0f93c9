//! Octree spatial index
//!
//! Divides the world into hierarchical regions for broad-phase queries over
//! spatial components. Each node subdivides into 8 octants when its entity
//! count exceeds a threshold. Entities are stored by the center of their
//! bounding box with the box's half-diagonal as radius; queries widen node
//! bounds by the largest radius seen so that entities straddling octant
//! borders are still found.
//!
//! Entities whose center lies outside the world bounds are kept in an
//! overflow map instead of being dropped, so queries stay complete. The
//! tree remembers where it stored every entity, so removal and lookup
//! descend a single path instead of searching the whole tree.

use log::warn;

use crate::collision::{BoundingSphere, AABB};
use crate::foundation::collections::{Entity, SecondaryMap};
use crate::foundation::math::Vec3;

/// Configuration for octree behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeConfig {
    /// Maximum entities per node before subdivision
    pub max_entities_per_node: usize,
    
    /// Maximum subdivision depth
    pub max_depth: u32,
    
    /// Minimum node half-size (prevents excessive subdivision)
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_entities_per_node: 8,
            max_depth: 8,
            min_node_size: 1.0,
        }
    }
}

/// Entity stored in the octree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeEntity {
    /// Owning entity
    pub id: Entity,
    /// Center of the entity's bounding box
    pub position: Vec3,
    /// Radius enclosing the bounding box
    pub radius: f32,
}

impl OctreeEntity {
    fn from_aabb(id: Entity, aabb: &AABB) -> Self {
        Self {
            id,
            position: aabb.center(),
            radius: aabb.extents().magnitude(),
        }
    }
    
    fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::new(self.position, self.radius)
    }
}

fn octant_of(center: Vec3, position: Vec3) -> usize {
    let x_bit = usize::from(position.x >= center.x);
    let y_bit = usize::from(position.y >= center.y);
    let z_bit = usize::from(position.z >= center.z);
    
    // Octant layout:
    // 0: -X, -Y, -Z    4: -X, -Y, +Z
    // 1: +X, -Y, -Z    5: +X, -Y, +Z
    // 2: -X, +Y, -Z    6: -X, +Y, +Z
    // 3: +X, +Y, -Z    7: +X, +Y, +Z
    (z_bit << 2) | (y_bit << 1) | x_bit
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// World-space bounds of this node
    pub bounds: AABB,
    
    /// Entities contained in this node (if leaf)
    pub entities: Vec<OctreeEntity>,
    
    /// Child nodes (8 octants), None if this is a leaf
    pub children: Option<Box<[OctreeNode; 8]>>,
    
    /// Depth in the tree (0 = root)
    pub depth: u32,
}

impl OctreeNode {
    /// Create a new leaf node
    pub fn new(bounds: AABB, depth: u32) -> Self {
        Self {
            bounds,
            entities: Vec::new(),
            children: None,
            depth,
        }
    }
    
    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
    
    fn subdivide(&mut self) {
        if self.children.is_some() {
            return;
        }
        
        let center = self.bounds.center();
        let quarter_extents = self.bounds.extents() * 0.5;
        let depth = self.depth + 1;
        
        let mut children: Box<[OctreeNode; 8]> = Box::new(std::array::from_fn(|octant| {
            let sign = |bit: usize| if octant & bit != 0 { 1.0 } else { -1.0 };
            let child_center = center
                + Vec3::new(
                    quarter_extents.x * sign(1),
                    quarter_extents.y * sign(2),
                    quarter_extents.z * sign(4),
                );
            OctreeNode::new(AABB::from_center_extents(child_center, quarter_extents), depth)
        }));
        
        for entity in std::mem::take(&mut self.entities) {
            children[octant_of(center, entity.position)].entities.push(entity);
        }
        self.children = Some(children);
    }
    
    /// Insert an entity; false if its center is outside this node
    pub fn insert(&mut self, entity: OctreeEntity, config: &OctreeConfig) -> bool {
        if !self.bounds.contains_point(entity.position) {
            return false;
        }
        
        if self.is_leaf() {
            let should_subdivide = self.entities.len() >= config.max_entities_per_node
                && self.depth < config.max_depth
                && self.bounds.extents().x > config.min_node_size;
            
            if !should_subdivide {
                self.entities.push(entity);
                return true;
            }
            self.subdivide();
        }
        
        let octant = octant_of(self.bounds.center(), entity.position);
        match self.children.as_mut() {
            Some(children) => children[octant].insert(entity, config),
            None => false,
        }
    }
    
    /// Leaf whose region holds `position`. Entities only live in leaves and
    /// are always filed by their stored position.
    fn leaf_for(&self, position: Vec3) -> &OctreeNode {
        let mut node = self;
        while let Some(children) = node.children.as_ref() {
            node = &children[octant_of(node.bounds.center(), position)];
        }
        node
    }
    
    /// Remove an entity stored at `position`
    pub fn remove_at(&mut self, entity_id: Entity, position: Vec3) -> bool {
        if let Some(children) = self.children.as_mut() {
            let octant = octant_of(self.bounds.center(), position);
            return children[octant].remove_at(entity_id, position);
        }
        
        match self.entities.iter().position(|e| e.id == entity_id) {
            Some(index) => {
                self.entities.swap_remove(index);
                true
            }
            None => false,
        }
    }
    
    /// Overwrite an entity's entry when `entity.position` files into the same
    /// leaf as `old_position`; false if it has to move
    fn relocate_in_place(&mut self, entity: OctreeEntity, old_position: Vec3) -> bool {
        if let Some(children) = self.children.as_mut() {
            let center = self.bounds.center();
            let octant = octant_of(center, old_position);
            if octant != octant_of(center, entity.position) {
                return false;
            }
            return children[octant].relocate_in_place(entity, old_position);
        }
        
        match self.entities.iter_mut().find(|e| e.id == entity.id) {
            Some(stored) => {
                *stored = entity;
                true
            }
            None => false,
        }
    }
    
    /// Visit entities whose sphere overlaps `region`. Node bounds are
    /// widened by `margin` before pruning.
    fn visit_sphere(&self, region: &BoundingSphere, margin: f32, visit: &mut impl FnMut(&OctreeEntity)) {
        if !self.bounds.expanded(margin).intersects_sphere(region) {
            return;
        }
        
        self.entities
            .iter()
            .filter(|entity| entity.bounding_sphere().intersects(region))
            .for_each(&mut *visit);
        
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.visit_sphere(region, margin, visit);
            }
        }
    }
    
    fn visit_aabb(&self, region: &AABB, margin: f32, visit: &mut impl FnMut(&OctreeEntity)) {
        if !self.bounds.expanded(margin).intersects(region) {
            return;
        }
        
        self.entities
            .iter()
            .filter(|entity| region.intersects_sphere(&entity.bounding_sphere()))
            .for_each(&mut *visit);
        
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.visit_aabb(region, margin, visit);
            }
        }
    }
    
    /// Get all leaf nodes
    pub fn get_all_leaves<'a>(&'a self, leaves: &mut Vec<&'a OctreeNode>) {
        match self.children.as_ref() {
            None => leaves.push(self),
            Some(children) => {
                for child in children.iter() {
                    child.get_all_leaves(leaves);
                }
            }
        }
    }
    
    /// Count total entities in this node and all children
    pub fn count_entities(&self) -> usize {
        self.entities.len()
            + self
                .children
                .as_ref()
                .map_or(0, |children| children.iter().map(OctreeNode::count_entities).sum())
    }
}

/// Octree spatial partitioning structure
#[derive(Debug, Clone)]
pub struct Octree {
    /// Root node containing the entire world space
    pub root: OctreeNode,
    
    /// Position each in-bounds entity was filed under
    locations: SecondaryMap<Entity, Vec3>,
    
    /// Entities centered outside the root bounds
    outside: SecondaryMap<Entity, OctreeEntity>,
    
    config: OctreeConfig,
    
    /// Largest radius inserted since the last clear. Never shrinks, which
    /// only makes pruning less tight.
    max_entity_radius: f32,
}

impl Octree {
    /// Create a new octree with given world bounds
    pub fn new(world_bounds: AABB, config: OctreeConfig) -> Self {
        Self {
            root: OctreeNode::new(world_bounds, 0),
            locations: SecondaryMap::new(),
            outside: SecondaryMap::new(),
            config,
            max_entity_radius: 0.0,
        }
    }
    
    /// World bounds covered by the tree
    pub fn bounds(&self) -> &AABB {
        &self.root.bounds
    }
    
    /// Insert an entity with an explicit position and radius, replacing any
    /// previous entry for it
    pub fn insert(&mut self, entity_id: Entity, position: Vec3, radius: f32) {
        self.remove(entity_id);
        self.insert_entity(OctreeEntity {
            id: entity_id,
            position,
            radius,
        });
    }
    
    fn insert_entity(&mut self, entity: OctreeEntity) {
        self.max_entity_radius = self.max_entity_radius.max(entity.radius);
        if self.root.insert(entity, &self.config) {
            self.locations.insert(entity.id, entity.position);
        } else {
            warn!(
                "Entity {:?} at {:?} lies outside the spatial index bounds",
                entity.id, entity.position
            );
            self.outside.insert(entity.id, entity);
        }
    }
    
    /// Re-index an entity after its bounding box changed
    pub fn update(&mut self, entity_id: Entity, aabb: &AABB) {
        let entity = OctreeEntity::from_aabb(entity_id, aabb);
        if let Some(&old_position) = self.locations.get(entity_id) {
            if self.root.bounds.contains_point(entity.position)
                && self.root.relocate_in_place(entity, old_position)
            {
                self.locations.insert(entity_id, entity.position);
                self.max_entity_radius = self.max_entity_radius.max(entity.radius);
                return;
            }
        }
        self.remove(entity_id);
        self.insert_entity(entity);
    }
    
    /// Remove an entity from the octree
    pub fn remove(&mut self, entity_id: Entity) -> bool {
        if self.outside.remove(entity_id).is_some() {
            return true;
        }
        match self.locations.remove(entity_id) {
            Some(position) => self.root.remove_at(entity_id, position),
            None => false,
        }
    }
    
    /// True if the entity is indexed
    pub fn contains(&self, entity_id: Entity) -> bool {
        self.locations.contains_key(entity_id) || self.outside.contains_key(entity_id)
    }
    
    /// Visit every entity whose bounding sphere overlaps `region`
    pub fn visit_sphere(&self, region: &BoundingSphere, mut visit: impl FnMut(&OctreeEntity)) {
        self.root.visit_sphere(region, self.max_entity_radius, &mut visit);
        self.outside
            .values()
            .filter(|entity| entity.bounding_sphere().intersects(region))
            .for_each(visit);
    }
    
    /// Visit every entity whose bounding sphere overlaps `region`
    pub fn visit_aabb(&self, region: &AABB, mut visit: impl FnMut(&OctreeEntity)) {
        self.root.visit_aabb(region, self.max_entity_radius, &mut visit);
        self.outside
            .values()
            .filter(|entity| region.intersects_sphere(&entity.bounding_sphere()))
            .for_each(visit);
    }
    
    /// Query all entities within a radius of a point
    pub fn query_radius(&self, center: Vec3, radius: f32) -> Vec<OctreeEntity> {
        let mut results = Vec::new();
        self.visit_sphere(&BoundingSphere::new(center, radius), |entity| results.push(*entity));
        results
    }
    
    /// Query all entities overlapping a box
    pub fn query_aabb(&self, region: &AABB) -> Vec<OctreeEntity> {
        let mut results = Vec::new();
        self.visit_aabb(region, |entity| results.push(*entity));
        results
    }
    
    /// Find an entity in the octree and return its data
    pub fn find_entity(&self, entity_id: Entity) -> Option<OctreeEntity> {
        if let Some(entity) = self.outside.get(entity_id) {
            return Some(*entity);
        }
        let position = *self.locations.get(entity_id)?;
        self.root.leaf_for(position).entities.iter().find(|e| e.id == entity_id).copied()
    }
    
    /// Get all leaf nodes
    pub fn get_all_leaves(&self) -> Vec<&OctreeNode> {
        let mut leaves = Vec::new();
        self.root.get_all_leaves(&mut leaves);
        leaves
    }
    
    /// Get total entity count
    pub fn entity_count(&self) -> usize {
        self.locations.len() + self.outside.len()
    }
    
    /// Clear the octree
    pub fn clear(&mut self) {
        self.root = OctreeNode::new(self.root.bounds, 0);
        self.locations.clear();
        self.outside.clear();
        self.max_entity_radius = 0.0;
    }
}
