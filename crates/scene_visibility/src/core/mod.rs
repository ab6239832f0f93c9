//! # Core Module
//!
//! Shared configuration for the visibility subsystem. The
//! [`config::VisibilityConfig`] tree is what applications load from disk
//! and hand to [`crate::VisibilityEngine`].

pub mod config;

pub use config::{
    ArenaConfig, Config, ConfigError, ConfigFormat, SchedulerConfig, SpatialIndexConfig, TesterConfig,
    VisibilityConfig,
};
