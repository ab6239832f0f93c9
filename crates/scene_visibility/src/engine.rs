//! Frame orchestration
//!
//! [`VisibilityEngine`] drives one frame of visibility work:
//!
//! 1. [`begin_frame`](VisibilityEngine::begin_frame) advances the scene
//!    timestamp, clears last frame's flags, checks that every result buffer
//!    came back to the arena and runs the scene update pass.
//! 2. [`run_frame`](VisibilityEngine::run_frame) tests the camera, then every
//!    visible shadow-casting light in parallel, and merges the light results.
//! 3. [`end_frame`](VisibilityEngine::end_frame) returns the renderer's
//!    results to the arena.

use log::{info, warn};

use crate::config::ConfigError;
use crate::core::config::VisibilityConfig;
use crate::ecs::{Entity, SceneWorld};
use crate::foundation::memory::ArenaStats;
use crate::foundation::time::{Stopwatch, Timestamp};
use crate::spatial::Octree;
use crate::visibility::{
    NodeArena, SchedulerError, VisibilityGroup, VisibilityJob, VisibilityScheduler,
    VisibilityTest, VisibilityTestResults, VisibilityTester, VisibilityView,
};

/// Engine errors
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),
    
    /// Scheduler could not start
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Everything the renderer needs from one frame
#[derive(Debug)]
pub struct FrameVisibility {
    /// What the camera sees
    pub camera: VisibilityTestResults,
    /// Shadow casters of all visible shadow-casting lights, light by light
    pub shadow_casters: VisibilityTestResults,
    /// Lights whose shadow casters were collected, in merge order
    pub shadow_lights: Vec<Entity>,
}

impl FrameVisibility {
    /// Return both containers to `arena`
    pub fn release(self, arena: &mut NodeArena) {
        self.camera.release(arena);
        self.shadow_casters.release(arena);
    }
}

/// Per-frame visibility driver
#[derive(Debug)]
pub struct VisibilityEngine {
    config: VisibilityConfig,
    arena: NodeArena,
    scheduler: VisibilityScheduler,
}

impl VisibilityEngine {
    /// Validate `config` and start the worker pool
    pub fn new(config: VisibilityConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let scheduler = VisibilityScheduler::new(&config.scheduler)?;
        let arena = NodeArena::with_prewarm(config.arena.prewarm_buffers, config.arena.prewarm_capacity);
        
        info!(
            "Visibility engine ready: {:?} shapes, {} worker thread(s)",
            config.tester.shape_policy,
            scheduler.thread_count()
        );
        Ok(Self {
            config,
            arena,
            scheduler,
        })
    }
    
    /// Empty scene with a spatial index laid out per the configuration
    pub fn create_world(&self) -> SceneWorld {
        let index = &self.config.spatial_index;
        SceneWorld::with_spatial_index(Octree::new(index.world_bounds(), index.octree_config()))
    }
    
    /// Active configuration
    pub fn config(&self) -> &VisibilityConfig {
        &self.config
    }
    
    /// Arena counters
    pub fn arena_stats(&self) -> ArenaStats {
        self.arena.stats()
    }
    
    /// Result buffers currently handed out
    pub fn outstanding_buffers(&self) -> usize {
        self.arena.outstanding()
    }
    
    /// Start a frame and run the scene update pass.
    ///
    /// # Panics
    /// If the previous frame's results were not passed to
    /// [`end_frame`](Self::end_frame).
    pub fn begin_frame(&mut self, world: &mut SceneWorld) -> Timestamp {
        let timestamp = world.begin_frame();
        self.arena.begin_frame(timestamp);
        world.update();
        timestamp
    }
    
    /// Run the camera test and the shadow tests of every visible
    /// shadow-casting light
    pub fn run_frame(&mut self, world: &SceneWorld, camera: &VisibilityView) -> FrameVisibility {
        let stopwatch = Stopwatch::start();
        let settings = &self.config.tester;
        
        let camera_results =
            VisibilityTester::new(world, camera, VisibilityTest::CAMERA, settings).run(&mut self.arena);
        
        let (shadow_lights, jobs): (Vec<_>, Vec<_>) = camera_results
            .nodes(VisibilityGroup::Lights)
            .iter()
            .filter_map(|node| {
                let light = world.placed_light(node.entity).filter(|light| light.cast_shadows)?;
                let job = VisibilityJob {
                    view: VisibilityView::for_light(&light),
                    test: VisibilityTest::SHADOW_CASTERS,
                };
                Some((node.entity, job))
            })
            .unzip();
        
        let per_light = self.scheduler.run(world, &jobs, settings, &mut self.arena);
        let mut shadow_casters = VisibilityTestResults::create(&mut self.arena, &settings.reserve);
        shadow_casters.combine_with(&mut self.arena, per_light);
        
        let elapsed_ms = stopwatch.elapsed_ms();
        if elapsed_ms > self.config.scheduler.frame_budget_ms {
            warn!(
                "Visibility for frame {} took {:.2} ms (budget {:.2} ms, {} shadow lights)",
                world.timestamp(),
                elapsed_ms,
                self.config.scheduler.frame_budget_ms,
                shadow_lights.len()
            );
        }
        
        FrameVisibility {
            camera: camera_results,
            shadow_casters,
            shadow_lights,
        }
    }
    
    /// Hand a frame's results back
    pub fn end_frame(&mut self, output: FrameVisibility) {
        output.release(&mut self.arena);
    }
}
