use crate::{EngineError, Result};
use std::time::Duration;

/// Settings consumed by [`GenerationEngine`](crate::GenerationEngine).
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Number of worker threads in the pool. Fixed, never derived from the workload.
    pub workers: usize,
    /// Frontier coordinates evaluated by one phase-1 task.
    pub chunk_size: usize,
    /// Population ids accepted by `set` are `0..populations_count`.
    pub populations_count: u32,
    /// How long `shutdown` waits for outstanding tasks before cancelling them.
    pub shutdown_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: Self::DEFAULT_WORKERS,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            populations_count: Self::DEFAULT_POPULATIONS_COUNT,
            shutdown_grace: Self::DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl EngineConfig {
    pub const DEFAULT_WORKERS: usize = 4;
    pub const DEFAULT_CHUNK_SIZE: usize = 256;
    pub const DEFAULT_POPULATIONS_COUNT: u32 = 1;
    pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_populations_count(mut self, populations_count: u32) -> Self {
        self.populations_count = populations_count;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(EngineError::InvalidConfig(
                "worker pool needs at least one worker".into(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(EngineError::InvalidConfig("chunk size must be positive".into()));
        }
        if self.populations_count == 0 {
            return Err(EngineError::InvalidConfig(
                "at least one population is required".into(),
            ));
        }
        Ok(())
    }
}
