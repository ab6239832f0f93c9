//! Visibility result containers
//!
//! A [`VisibilityTestResults`] holds the entities one test found visible,
//! split into five render groups. Its storage comes from a frame arena and
//! must go back there: call [`VisibilityTestResults::release`] (or merge the
//! container into another with [`VisibilityTestResults::combine_with`])
//! before it goes out of scope. Dropping a container that still owns arena
//! storage panics.

use serde::{Deserialize, Serialize};

use crate::foundation::memory::FrameArena;
use crate::foundation::time::Timestamp;
use super::node::VisibleNode;

/// Frame arena serving result groups
pub type NodeArena = FrameArena<VisibleNode>;

/// Render category of a visible entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisibilityGroup {
    /// Drawable geometry
    Renderables,
    /// Light sources
    Lights,
    /// Lens flares
    Flares,
    /// Reflection probes
    ReflectionProbes,
    /// Reflection proxies
    ReflectionProxies,
}

impl VisibilityGroup {
    /// Number of groups
    pub const COUNT: usize = 5;
    
    /// All groups in storage order
    pub const ALL: [VisibilityGroup; Self::COUNT] = [
        Self::Renderables,
        Self::Lights,
        Self::Flares,
        Self::ReflectionProbes,
        Self::ReflectionProxies,
    ];
    
    /// Dense index of the group
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Initial capacity of each group. Hints only; groups grow on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupReserve {
    /// Renderables
    pub renderables: usize,
    /// Lights
    pub lights: usize,
    /// Lens flares
    pub flares: usize,
    /// Reflection probes
    pub reflection_probes: usize,
    /// Reflection proxies
    pub reflection_proxies: usize,
}

impl GroupReserve {
    /// Capacity hint for one group
    pub const fn get(&self, group: VisibilityGroup) -> usize {
        match group {
            VisibilityGroup::Renderables => self.renderables,
            VisibilityGroup::Lights => self.lights,
            VisibilityGroup::Flares => self.flares,
            VisibilityGroup::ReflectionProbes => self.reflection_probes,
            VisibilityGroup::ReflectionProxies => self.reflection_proxies,
        }
    }
}

impl Default for GroupReserve {
    fn default() -> Self {
        Self {
            renderables: 64,
            lights: 16,
            flares: 4,
            reflection_probes: 4,
            reflection_proxies: 4,
        }
    }
}

/// Grouped output of one visibility test
#[derive(Debug)]
pub struct VisibilityTestResults {
    groups: [Vec<VisibleNode>; VisibilityGroup::COUNT],
    shape_update_timestamp: Timestamp,
    /// Storage still belongs to an arena
    armed: bool,
}

impl VisibilityTestResults {
    /// Create a container whose groups are allocated from `arena`
    pub fn create(arena: &mut NodeArena, reserve: &GroupReserve) -> Self {
        Self {
            groups: VisibilityGroup::ALL.map(|group| arena.allocate(reserve.get(group))),
            shape_update_timestamp: 0,
            armed: true,
        }
    }
    
    /// Append a node to `group`, growing through the arena when full
    pub fn move_back(&mut self, arena: &mut NodeArena, group: VisibilityGroup, node: VisibleNode) {
        let nodes = &mut self.groups[group.index()];
        if nodes.len() == nodes.capacity() {
            arena.grow(nodes, 1);
        }
        nodes.push(node);
    }
    
    /// Append every group of `others`, in the given order, to this
    /// container's groups. The shape-update timestamp becomes the maximum
    /// of all inputs. The consumed containers' storage is recycled.
    pub fn combine_with(
        &mut self,
        arena: &mut NodeArena,
        others: impl IntoIterator<Item = VisibilityTestResults>,
    ) {
        let others: Vec<_> = others.into_iter().collect();
        
        for group in VisibilityGroup::ALL {
            let additional: usize = others.iter().map(|other| other.count(group)).sum();
            arena.grow(&mut self.groups[group.index()], additional);
        }
        
        for other in others {
            for group in VisibilityGroup::ALL {
                self.groups[group.index()].extend_from_slice(other.nodes(group));
            }
            self.shape_update_timestamp = self.shape_update_timestamp.max(other.shape_update_timestamp);
            other.release(arena);
        }
    }
    
    /// Nodes of one group as a contiguous slice
    pub fn nodes(&self, group: VisibilityGroup) -> &[VisibleNode] {
        &self.groups[group.index()]
    }
    
    pub(crate) fn nodes_mut(&mut self, group: VisibilityGroup) -> &mut [VisibleNode] {
        &mut self.groups[group.index()]
    }
    
    /// Every node with its group, groups in storage order
    pub fn iter(&self) -> impl Iterator<Item = (VisibilityGroup, &VisibleNode)> {
        VisibilityGroup::ALL
            .into_iter()
            .flat_map(move |group| self.nodes(group).iter().map(move |node| (group, node)))
    }
    
    /// Number of nodes in one group
    pub fn count(&self, group: VisibilityGroup) -> usize {
        self.groups[group.index()].len()
    }
    
    /// Number of nodes over all groups
    pub fn total_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }
    
    /// No visible node at all
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Vec::is_empty)
    }
    
    /// Latest frame at which a tested shape changed
    pub fn shape_update_timestamp(&self) -> Timestamp {
        self.shape_update_timestamp
    }
    
    /// Override the shape-update timestamp
    pub fn set_shape_update_timestamp(&mut self, timestamp: Timestamp) {
        self.shape_update_timestamp = timestamp;
    }
    
    /// Return all storage to `arena`
    pub fn release(mut self, arena: &mut NodeArena) {
        for nodes in &mut self.groups {
            arena.recycle(std::mem::take(nodes));
        }
        self.armed = false;
    }
}

impl Drop for VisibilityTestResults {
    fn drop(&mut self) {
        if self.armed && !std::thread::panicking() {
            panic!("visibility results dropped without being released to their frame arena");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::{Entity, SlotMap};
    use crate::visibility::node::SubShapeSet;
    
    fn node(entity: Entity) -> VisibleNode {
        let mut sub_shapes = SubShapeSet::new();
        sub_shapes.push(0);
        VisibleNode {
            entity,
            sub_shapes,
            distance_squared: 0.0,
        }
    }
    
    fn entities(count: usize) -> Vec<Entity> {
        let mut slab: SlotMap<Entity, ()> = SlotMap::with_key();
        (0..count).map(|_| slab.insert(())).collect()
    }
    
    fn results_with(arena: &mut NodeArena, entities: &[Entity], timestamp: Timestamp) -> VisibilityTestResults {
        let mut results = VisibilityTestResults::create(arena, &GroupReserve::default());
        for &entity in entities {
            results.move_back(arena, VisibilityGroup::Renderables, node(entity));
        }
        results.set_shape_update_timestamp(timestamp);
        results
    }
    
    fn renderables(results: &VisibilityTestResults) -> Vec<Entity> {
        results.nodes(VisibilityGroup::Renderables).iter().map(|n| n.entity).collect()
    }
    
    #[test]
    fn test_move_back_grows_through_arena() {
        let mut arena = NodeArena::new();
        let reserve = GroupReserve {
            renderables: 1,
            ..GroupReserve::default()
        };
        let ids = entities(40);
        
        let mut results = VisibilityTestResults::create(&mut arena, &reserve);
        for &entity in &ids {
            results.move_back(&mut arena, VisibilityGroup::Renderables, node(entity));
        }
        
        assert_eq!(results.count(VisibilityGroup::Renderables), 40);
        assert_eq!(results.total_count(), 40);
        assert_eq!(renderables(&results), ids);
        assert!(arena.stats().growths >= 2);
        
        results.release(&mut arena);
        assert_eq!(arena.outstanding(), 0);
    }
    
    #[test]
    fn test_combine_preserves_order_and_takes_max_timestamp() {
        let mut arena = NodeArena::new();
        let ids = entities(3);
        
        let mut master = VisibilityTestResults::create(&mut arena, &GroupReserve::default());
        let first = results_with(&mut arena, &ids[..1], 4);
        let empty = results_with(&mut arena, &[], 9);
        let last = results_with(&mut arena, &ids[1..], 2);
        
        master.combine_with(&mut arena, [first, empty, last]);
        
        assert_eq!(renderables(&master), ids);
        assert_eq!(master.shape_update_timestamp(), 9);
        assert_eq!(arena.outstanding(), VisibilityGroup::COUNT);
        
        master.release(&mut arena);
        assert_eq!(arena.outstanding(), 0);
    }
    
    #[test]
    fn test_iter_visits_groups_in_order() {
        let mut arena = NodeArena::new();
        let ids = entities(2);
        let mut results = VisibilityTestResults::create(&mut arena, &GroupReserve::default());
        results.move_back(&mut arena, VisibilityGroup::Lights, node(ids[0]));
        results.move_back(&mut arena, VisibilityGroup::Renderables, node(ids[1]));
        
        let visited: Vec<_> = results.iter().map(|(group, n)| (group, n.entity)).collect();
        assert_eq!(
            visited,
            vec![(VisibilityGroup::Renderables, ids[1]), (VisibilityGroup::Lights, ids[0])]
        );
        assert!(!results.is_empty());
        results.release(&mut arena);
    }
    
    #[test]
    #[should_panic(expected = "without being released")]
    fn test_drop_without_release_panics() {
        let mut arena = NodeArena::new();
        let _results = VisibilityTestResults::create(&mut arena, &GroupReserve::default());
    }
}
