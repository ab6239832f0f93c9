//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and transforms
//! - Handle types for slab-allocated scene data
//! - The per-frame node arena
//! - Frame timing
//! - Logging setup

pub mod math;
pub mod collections;
pub mod memory;
pub mod time;
pub mod logging;
