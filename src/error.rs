use std::time::Duration;
use thiserror::Error;

/// All kinds of errors in this crate.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Coordinate falls outside `[0, width) x [0, height)`.
    #[error("coordinate ({x}, {y}) is outside the {width}x{height} grid")]
    InvalidCoordinate {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },

    /// Grid side must be positive.
    #[error("grid dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Population id is not below the configured populations count.
    #[error("population id {id} is out of range 0..{count}")]
    InvalidPopulation { id: u32, count: u32 },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] std::io::Error),

    /// A phase-1 task could not complete; the previous grid stays authoritative.
    #[error("generation {generation} aborted: {reason}")]
    ComputeFailure { generation: u64, reason: String },

    /// Worker pool did not quiesce in time; remaining tasks were cancelled.
    #[error("worker pool did not quiesce within {grace:?}, {outstanding} task(s) cancelled")]
    ShutdownTimeout { grace: Duration, outstanding: usize },
}

pub type Result<T> = std::result::Result<T, EngineError>;
