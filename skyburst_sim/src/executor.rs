//! Batch executors for the parallel `go()` mode.

use crate::error::UniverseError;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// A generic scatter/map/gather substrate for per-GRB jobs.
///
/// The driver hands the executor the number of queued jobs and a job
/// function indexed into its own parameter-server list (the scatter step
/// is the shared borrow); the executor maps the function across workers,
/// gathers the per-job results, reports progress, and surfaces the first
/// failure after the batch drains.
///
/// Worker jobs share no mutable state: each job builds, runs, persists
/// and drops its own GRB, and response-registry access is serialized per
/// detector inside the registry itself.
pub trait Executor: Send + Sync {
    /// Maps `job` over `0..n_jobs` across workers.
    fn run(
        &self,
        n_jobs: usize,
        job: &(dyn Fn(usize) -> Result<(), UniverseError> + Sync),
    ) -> Result<(), UniverseError>;
}

/// Executor backed by a rayon thread pool.
pub struct RayonExecutor {
    /// Worker count; `None` uses rayon's default (one per core)
    threads: Option<usize>,

    /// Log progress every this many completed jobs
    progress_every: usize,
}

impl RayonExecutor {
    /// Creates an executor with the default worker count.
    pub fn new() -> Self {
        Self {
            threads: None,
            progress_every: 10,
        }
    }

    /// Sets an explicit worker count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Sets the progress reporting interval.
    pub fn with_progress_every(mut self, every: usize) -> Self {
        self.progress_every = every.max(1);
        self
    }
}

impl Default for RayonExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for RayonExecutor {
    fn run(
        &self,
        n_jobs: usize,
        job: &(dyn Fn(usize) -> Result<(), UniverseError> + Sync),
    ) -> Result<(), UniverseError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads.unwrap_or(0))
            .build()
            .map_err(|e| UniverseError::Executor(e.to_string()))?;

        let completed = AtomicUsize::new(0);

        let results: Vec<Result<(), UniverseError>> = pool.install(|| {
            (0..n_jobs)
                .into_par_iter()
                .map(|i| {
                    let result = job(i);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % self.progress_every == 0 || done == n_jobs {
                        info!("completed {}/{} GRB jobs", done, n_jobs);
                    }
                    result
                })
                .collect()
        });

        // Gather: the whole batch drains before the first failure surfaces.
        results.into_iter().collect()
    }
}
