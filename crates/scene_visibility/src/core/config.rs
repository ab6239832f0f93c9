//! # Visibility Configuration
//!
//! Every tunable of the visibility subsystem in one serializable tree.
//!
//! ## Configuration Categories
//!
//! - **Tester**: shape policy, result capacity hints, sorting
//! - **Arena**: buffers prepared before the first frame
//! - **Scheduler**: fork-join parallelism and the frame time budget
//! - **Spatial index**: octree bounds and subdivision limits

use serde::{Deserialize, Serialize};

use crate::collision::AABB;
use crate::ecs::components::VisibilityShapePolicy;
use crate::foundation::math::Vec3;
use crate::spatial::OctreeConfig;
use crate::visibility::GroupReserve;

pub use crate::config::{Config, ConfigError, ConfigFormat};

/// # Tester Configuration
///
/// How a single visibility test treats its candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesterConfig {
    /// Which shape each descriptor is tested with
    pub shape_policy: VisibilityShapePolicy,
    /// Initial capacity of each result group
    pub reserve: GroupReserve,
    /// Sort renderables and lights nearest first
    pub sort_front_to_back: bool,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            shape_policy: VisibilityShapePolicy::default(),
            reserve: GroupReserve::default(),
            sort_front_to_back: true,
        }
    }
}

/// # Arena Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Buffers created up front
    pub prewarm_buffers: usize,
    /// Capacity of each prewarmed buffer
    pub prewarm_capacity: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            prewarm_buffers: 32,
            prewarm_capacity: 64,
        }
    }
}

/// # Scheduler Configuration
///
/// Per-light visibility tests run on a dedicated thread pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Run light tests in parallel
    pub parallel: bool,
    /// Worker threads, `None` lets the pool pick one per core
    pub threads: Option<usize>,
    /// Visibility time per frame above which a warning is logged
    pub frame_budget_ms: f32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            frame_budget_ms: 2.0,
        }
    }
}

/// # Spatial Index Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialIndexConfig {
    /// Minimum corner of the indexed world
    pub world_min: [f32; 3],
    /// Maximum corner of the indexed world
    pub world_max: [f32; 3],
    /// Maximum entities per node before subdivision
    pub max_entities_per_node: usize,
    /// Maximum subdivision depth
    pub max_depth: u32,
    /// Minimum node half-size
    pub min_node_size: f32,
}

impl SpatialIndexConfig {
    /// World bounds as a box
    pub fn world_bounds(&self) -> AABB {
        AABB::new(Vec3::from(self.world_min), Vec3::from(self.world_max))
    }
    
    /// Octree settings
    pub fn octree_config(&self) -> OctreeConfig {
        OctreeConfig {
            max_entities_per_node: self.max_entities_per_node,
            max_depth: self.max_depth,
            min_node_size: self.min_node_size,
        }
    }
}

impl Default for SpatialIndexConfig {
    fn default() -> Self {
        let octree = OctreeConfig::default();
        Self {
            world_min: [-1000.0; 3],
            world_max: [1000.0; 3],
            max_entities_per_node: octree.max_entities_per_node,
            max_depth: octree.max_depth,
            min_node_size: octree.min_node_size,
        }
    }
}

/// # Complete Visibility Configuration
///
/// Top-level configuration applications load and pass to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// `env_logger` filter used by binaries
    pub log_level: String,
    /// Tester settings
    pub tester: TesterConfig,
    /// Frame arena settings
    pub arena: ArenaConfig,
    /// Scheduler settings
    pub scheduler: SchedulerConfig,
    /// Spatial index settings
    pub spatial_index: SpatialIndexConfig,
}

impl VisibilityConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            tester: TesterConfig::default(),
            arena: ArenaConfig::default(),
            scheduler: SchedulerConfig::default(),
            spatial_index: SpatialIndexConfig::default(),
        }
    }
    
    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
    
    /// Set the visibility shape policy
    pub fn with_shape_policy(mut self, policy: VisibilityShapePolicy) -> Self {
        self.tester.shape_policy = policy;
        self
    }
    
    /// Enable or disable distance sorting
    pub fn with_sorting(mut self, enabled: bool) -> Self {
        self.tester.sort_front_to_back = enabled;
        self
    }
    
    /// Enable or disable parallel light tests
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.scheduler.parallel = enabled;
        self
    }
    
    /// Set the worker thread count
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.scheduler.threads = Some(threads);
        self
    }
    
    /// Set the frame budget in milliseconds
    pub fn with_frame_budget_ms(mut self, budget: f32) -> Self {
        self.scheduler.frame_budget_ms = budget;
        self
    }
    
    /// Set the spatial index bounds
    pub fn with_world_bounds(mut self, min: [f32; 3], max: [f32; 3]) -> Self {
        self.spatial_index.world_min = min;
        self.spatial_index.world_max = max;
        self
    }
    
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.threads == Some(0) {
            return Err(ConfigError::Invalid("scheduler.threads must be at least 1".to_string()));
        }
        
        if !(self.scheduler.frame_budget_ms.is_finite() && self.scheduler.frame_budget_ms > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "scheduler.frame_budget_ms must be positive, got {}",
                self.scheduler.frame_budget_ms
            )));
        }
        
        let index = &self.spatial_index;
        if !index.world_bounds().is_valid() {
            return Err(ConfigError::Invalid(format!(
                "spatial_index bounds are inverted or not finite: {:?} .. {:?}",
                index.world_min, index.world_max
            )));
        }
        
        if index.max_entities_per_node == 0 {
            return Err(ConfigError::Invalid(
                "spatial_index.max_entities_per_node must be at least 1".to_string(),
            ));
        }
        
        if !(index.min_node_size.is_finite() && index.min_node_size > 0.0) {
            return Err(ConfigError::Invalid(
                "spatial_index.min_node_size must be positive".to_string(),
            ));
        }
        
        Ok(())
    }
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for VisibilityConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    
    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("scene_visibility_{}_{name}", std::process::id()))
    }
    
    #[test]
    fn test_default_config_is_valid() {
        assert!(VisibilityConfig::default().validate().is_ok());
    }
    
    #[test]
    fn test_partial_toml_uses_defaults() {
        let path = temp_path("partial.toml");
        std::fs::write(
            &path,
            r#"
log_level = "debug"

[tester]
shape_policy = "BoundsOnly"

[scheduler]
parallel = false
frame_budget_ms = 4.5
"#,
        )
        .unwrap();
        
        let config = VisibilityConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.tester.shape_policy, VisibilityShapePolicy::BoundsOnly);
        assert!(config.tester.sort_front_to_back);
        assert!(!config.scheduler.parallel);
        assert_eq!(config.scheduler.frame_budget_ms, 4.5);
        assert_eq!(config.arena, ArenaConfig::default());
    }
    
    #[test]
    fn test_save_and_load_ron() {
        let path = temp_path("roundtrip.ron");
        let config = VisibilityConfig::new()
            .with_threads(3)
            .with_shape_policy(VisibilityShapePolicy::Exact);
        
        config.save_to_file(&path).unwrap();
        let loaded = VisibilityConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        
        assert_eq!(loaded, config);
    }
    
    #[test]
    fn test_toml_text_roundtrip() {
        let config = VisibilityConfig::new().with_sorting(false).with_world_bounds([-5.0; 3], [5.0; 3]);
        let text = config.to_string_with_format(ConfigFormat::Toml).unwrap();
        let parsed = VisibilityConfig::from_str_with_format(&text, ConfigFormat::Toml).unwrap();
        assert_eq!(parsed, config);
    }
    
    #[test]
    fn test_unsupported_extension() {
        let result = VisibilityConfig::default().save_to_file("visibility.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
    
    #[test]
    fn test_validation_failures() {
        let zero_threads = VisibilityConfig::new().with_threads(0);
        assert!(matches!(zero_threads.validate(), Err(ConfigError::Invalid(_))));
        
        let no_budget = VisibilityConfig::new().with_frame_budget_ms(0.0);
        assert!(matches!(no_budget.validate(), Err(ConfigError::Invalid(_))));
        
        let inverted = VisibilityConfig::new().with_world_bounds([10.0; 3], [-10.0; 3]);
        assert!(matches!(inverted.validate(), Err(ConfigError::Invalid(_))));
    }
}
