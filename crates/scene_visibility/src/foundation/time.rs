//! Frame timestamps and timing utilities

use std::time::{Duration, Instant};

/// Global frame counter value. Zero means "never".
pub type Timestamp = u64;

/// Measures the wall time of a single pass
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    /// Start measuring
    pub fn start() -> Self {
        Self { started: Instant::now() }
    }
    
    /// Time elapsed since `start`
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
    
    /// Elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> f32 {
        self.elapsed().as_secs_f32() * 1000.0
    }
}
