//! Fork-join scheduling of visibility tests
//!
//! Independent tests (typically one per shadow-casting light) run on a
//! dedicated rayon pool. Before the fork the frame arena is partitioned into
//! one slice per job so workers never share an allocator; after the join the
//! slices are absorbed back. Results come back in job order whatever the
//! thread interleaving was.

use log::{debug, trace};
use rayon::prelude::*;

use crate::core::config::{SchedulerConfig, TesterConfig};
use crate::ecs::SceneWorld;
use super::results::{NodeArena, VisibilityTestResults};
use super::tester::VisibilityTester;
use super::view::{VisibilityTest, VisibilityView};

/// Scheduler errors
#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    /// Zero worker threads requested
    #[error("scheduler thread count must be >= 1 when set")]
    InvalidThreadCount,
    
    /// The thread pool could not be created
    #[error("failed to build visibility thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// One visibility test to schedule
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityJob {
    /// Where the test looks from
    pub view: VisibilityView,
    /// What it collects
    pub test: VisibilityTest,
}

/// Runs batches of visibility tests
#[derive(Debug)]
pub struct VisibilityScheduler {
    pool: Option<rayon::ThreadPool>,
}

fn build_thread_pool(threads: Option<usize>) -> Result<rayon::ThreadPool, SchedulerError> {
    if threads == Some(0) {
        return Err(SchedulerError::InvalidThreadCount);
    }
    
    let mut builder = rayon::ThreadPoolBuilder::new()
        .thread_name(|index| format!("visibility-{index}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    Ok(builder.build()?)
}

impl VisibilityScheduler {
    /// Create a scheduler. No pool is built when parallelism is disabled.
    pub fn new(config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        let pool = if config.parallel {
            let pool = build_thread_pool(config.threads)?;
            debug!("Visibility thread pool started with {} threads", pool.current_num_threads());
            Some(pool)
        } else {
            if config.threads == Some(0) {
                return Err(SchedulerError::InvalidThreadCount);
            }
            None
        };
        Ok(Self { pool })
    }
    
    /// Scheduler that always runs on the calling thread
    pub fn sequential() -> Self {
        Self { pool: None }
    }
    
    /// Whether jobs may run on the pool
    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }
    
    /// Worker threads available to a batch
    pub fn thread_count(&self) -> usize {
        self.pool.as_ref().map_or(1, rayon::ThreadPool::current_num_threads)
    }
    
    /// Run every job against `world` and return their results in job order
    pub fn run(
        &self,
        world: &SceneWorld,
        jobs: &[VisibilityJob],
        settings: &TesterConfig,
        arena: &mut NodeArena,
    ) -> Vec<VisibilityTestResults> {
        let run_one = |job: &VisibilityJob, arena: &mut NodeArena| {
            VisibilityTester::new(world, &job.view, job.test, settings).run(arena)
        };
        
        let pool = match &self.pool {
            Some(pool) if jobs.len() > 1 => pool,
            _ => {
                trace!("Running {} visibility job(s) sequentially", jobs.len());
                return jobs.iter().map(|job| run_one(job, arena)).collect();
            }
        };
        
        trace!("Forking {} visibility jobs", jobs.len());
        let mut slices = arena.partition(jobs.len());
        let results = pool.install(|| {
            slices
                .par_iter_mut()
                .zip(jobs.par_iter())
                .map(|(slice, job)| run_one(job, slice))
                .collect::<Vec<_>>()
        });
        arena.absorb(slices);
        results
    }
}
