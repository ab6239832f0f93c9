//! Visibility test engine
//!
//! One [`VisibilityTester`] runs one test: it gathers the scene's spatial
//! components, keeps the candidates the request asks for, intersects them
//! with the view volume and writes the survivors into a fresh
//! [`VisibilityTestResults`]. Testers only need `&SceneWorld`, so any number
//! of them can run concurrently on one scene.
//!
//! Sphere and box volumes (light views) take their candidates from the
//! world's spatial index; frustum volumes walk every spatial component in
//! registration order.

use log::{debug, trace};

use crate::collision::TestVolume;
use crate::core::config::TesterConfig;
use crate::ecs::components::SpatialFlags;
use crate::ecs::{SceneWorld, SpatialEntry};
use crate::foundation::time::Timestamp;
use super::node::{SubShapeSet, VisibleNode};
use super::results::{NodeArena, VisibilityGroup, VisibilityTestResults};
use super::view::{VisibilityTest, VisibilityView};

/// Progress of a visibility test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    /// Not started
    Idle,
    /// Walking candidates
    Collecting,
    /// Sorting groups
    Finalizing,
    /// Results handed out
    Done,
}

#[derive(Debug, Default)]
struct Collected {
    tested: usize,
    shape_update_timestamp: Timestamp,
}

/// A single visibility test over a scene
#[derive(Debug)]
pub struct VisibilityTester<'a> {
    world: &'a SceneWorld,
    view: &'a VisibilityView,
    test: VisibilityTest,
    settings: &'a TesterConfig,
    state: TestState,
}

impl<'a> VisibilityTester<'a> {
    /// Prepare a test.
    ///
    /// # Panics
    /// If the view volume is malformed (non-finite values, zero plane
    /// normals, negative radius or inverted box).
    pub fn new(
        world: &'a SceneWorld,
        view: &'a VisibilityView,
        test: VisibilityTest,
        settings: &'a TesterConfig,
    ) -> Self {
        assert!(view.volume.is_valid(), "invalid visibility test volume: {:?}", view.volume);
        Self {
            world,
            view,
            test,
            settings,
            state: TestState::Idle,
        }
    }
    
    /// Current state
    pub fn state(&self) -> TestState {
        self.state
    }
    
    fn transition(&mut self, next: TestState) {
        trace!("Visibility test {:?} -> {:?}", self.state, next);
        self.state = next;
    }
    
    /// Run the test, allocating result storage from `arena`.
    ///
    /// # Panics
    /// If the tester already ran.
    pub fn run(&mut self, arena: &mut NodeArena) -> VisibilityTestResults {
        assert_eq!(self.state, TestState::Idle, "a visibility tester runs only once");
        self.transition(TestState::Collecting);
        
        let mut results = VisibilityTestResults::create(arena, &self.settings.reserve);
        let mut collected = Collected::default();
        
        let world = self.world;
        let mut visit = |entry: SpatialEntry<'_>| self.test_candidate(entry, arena, &mut results, &mut collected);
        match &self.view.volume {
            TestVolume::Sphere(region) => {
                world.spatial_index().visit_sphere(region, |indexed| {
                    if let Some(entry) = world.spatial_entry(indexed.id) {
                        visit(entry);
                    }
                });
                self.fold_departures(&mut collected);
            }
            TestVolume::Aabb(region) => {
                world.spatial_index().visit_aabb(region, |indexed| {
                    if let Some(entry) = world.spatial_entry(indexed.id) {
                        visit(entry);
                    }
                });
                self.fold_departures(&mut collected);
            }
            TestVolume::Frustum(_) => world.iter_spatials().for_each(visit),
        }
        
        self.transition(TestState::Finalizing);
        if self.settings.sort_front_to_back {
            for group in [VisibilityGroup::Renderables, VisibilityGroup::Lights] {
                results
                    .nodes_mut(group)
                    .sort_unstable_by(|a, b| a.distance_squared.total_cmp(&b.distance_squared));
            }
        }
        results.set_shape_update_timestamp(collected.shape_update_timestamp);
        
        self.transition(TestState::Done);
        debug!(
            "{:?} visibility test: {} tested, {} visible ({} renderables, {} lights)",
            self.view.kind,
            collected.tested,
            results.total_count(),
            results.count(VisibilityGroup::Renderables),
            results.count(VisibilityGroup::Lights),
        );
        results
    }
    
    fn test_candidate(
        &self,
        entry: SpatialEntry<'_>,
        arena: &mut NodeArena,
        results: &mut VisibilityTestResults,
        collected: &mut Collected,
    ) {
        let Some(group) = self.candidate_group(&entry) else {
            return;
        };
        
        collected.tested += 1;
        collected.shape_update_timestamp = collected.shape_update_timestamp.max(entry.timestamp);
        
        let Some(sub_shapes) = self.visible_sub_shapes(&entry) else {
            return;
        };
        
        let distance_squared = (entry.spatial.origin() - self.view.origin).norm_squared();
        results.move_back(
            arena,
            group,
            VisibleNode {
                entity: entry.entity,
                sub_shapes,
                distance_squared,
            },
        );
        entry.spatial.mark_visible(self.view.kind.visible_flag());
    }
    
    /// Shapes that left the volume this frame were not visited through the
    /// index but still changed what the view saw
    fn fold_departures(&self, collected: &mut Collected) {
        for (entity, previous) in self.world.moved_this_frame() {
            if !self.view.volume.intersects_aabb(previous) {
                continue;
            }
            let Some(entry) = self.world.spatial_entry(*entity) else {
                continue;
            };
            if self.candidate_group(&entry).is_some() {
                collected.shape_update_timestamp = collected.shape_update_timestamp.max(entry.timestamp);
            }
        }
    }
    
    /// Group the candidate belongs to, or `None` when the request skips it
    fn candidate_group(&self, entry: &SpatialEntry<'_>) -> Option<VisibilityGroup> {
        let group = self.world.render_category(entry.entity)?;
        if !self.test.wants(group) {
            return None;
        }
        
        if group == VisibilityGroup::Renderables
            && self.test.contains(VisibilityTest::ONLY_SHADOW_CASTERS)
            && !self.world.casts_shadow(entry.entity)
        {
            return None;
        }
        
        if entry.spatial.flags().contains(SpatialFlags::FULLY_TRANSPARENT) && !self.view.near_plane_precision {
            return None;
        }
        
        Some(group)
    }
    
    /// Indices of the sub-shapes inside the view volume, `None` if there are none
    fn visible_sub_shapes(&self, entry: &SpatialEntry<'_>) -> Option<SubShapeSet> {
        let policy = self.settings.shape_policy;
        let volume = &self.view.volume;
        
        if !entry.spatial.visibility_shape(policy).intersects(volume) {
            return None;
        }
        
        let mut sub_shapes = SubShapeSet::new();
        match entry.spatial.collision_shape().sub_shapes() {
            // A single shape is its own sub-shape and already passed
            [_] => sub_shapes.push(0),
            children => {
                for (index, child) in (0u8..).zip(children) {
                    if policy.test_shape(volume, child) {
                        sub_shapes.push(index);
                    }
                }
            }
        }
        
        (!sub_shapes.is_empty()).then_some(sub_shapes)
    }
}
