//! Concurrent two-phase generation engine.
//!
//! Phase 1 evaluates every frontier cell against one frozen snapshot on a
//! fixed-size worker pool. Phase 2 applies the results to a copy of the
//! snapshot and swaps it in as the committed grid. Readers only ever see
//! whole generations.

mod in_flight;
#[cfg(test)]
mod tests;

use crate::{
    cell, neighborhood, Cell, Coord, EngineConfig, EngineError, Grid, NiceInt, PopulationId,
    Result,
};
use in_flight::InFlight;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::runtime::{Handle, Runtime};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, trace, warn};

/// Where the engine is in its generation cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Computing = 1,
    Committing = 2,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Phase::Computing,
            2 => Phase::Committing,
            _ => Phase::Idle,
        }
    }
}

/// Summary of one committed generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationStats {
    /// Number of the generation that was just committed.
    pub generation: u64,
    /// Size of the candidate frontier that was evaluated.
    pub frontier: usize,
    /// Cells whose occupant changed.
    pub changed: usize,
    /// Occupied cells after the commit.
    pub population: usize,
    pub elapsed: Duration,
}

/// Resets the phase to idle however the cycle ends.
struct PhaseGuard<'a>(&'a AtomicU8);

impl PhaseGuard<'_> {
    fn enter(phase: &AtomicU8, value: Phase) -> PhaseGuard<'_> {
        phase.store(value as u8, Ordering::Release);
        PhaseGuard(phase)
    }

    fn set(&self, value: Phase) {
        self.0.store(value as u8, Ordering::Release);
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.0.store(Phase::Idle as u8, Ordering::Release);
    }
}

/// State reachable from the cycle task, which outlives the caller's future.
struct Shared {
    current: RwLock<Arc<Grid>>,
    /// Held for a whole generation cycle and by direct mutations.
    cycle: tokio::sync::Mutex<()>,
    phase: AtomicU8,
    generation: AtomicU64,
    last_stats: Mutex<Option<GenerationStats>>,
    in_flight: Arc<InFlight>,
    chunk_size: usize,
    handle: Handle,
}

impl Shared {
    fn snapshot(&self) -> Arc<Grid> {
        Arc::clone(&*self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// One full compute and commit cycle. Runs on the pool as its own task.
    async fn run_cycle<F>(&self, compute: F) -> Result<GenerationStats>
    where
        F: Fn(&Grid, Coord) -> Result<Cell> + Send + Sync + 'static,
    {
        let _cycle = self.cycle.lock().await;
        let timer = Instant::now();
        let generation = self.generation() + 1;
        let snapshot = self.snapshot();

        let phase = PhaseGuard::enter(&self.phase, Phase::Computing);
        let frontier = neighborhood::candidate_frontier(&snapshot)
            .into_iter()
            .collect::<Vec<_>>();
        let pending = match self
            .compute_phase(&snapshot, frontier.chunks(self.chunk_size), compute, generation)
            .await
        {
            Ok(pending) => pending,
            Err(err) => {
                warn!(generation, error = %err, "generation aborted");
                return Err(err);
            }
        };

        phase.set(Phase::Committing);
        let (next, changed) = match Self::commit(&snapshot, &pending) {
            Ok(committed) => committed,
            Err(err) => {
                let err = EngineError::ComputeFailure {
                    generation,
                    reason: err.to_string(),
                };
                warn!(generation, error = %err, "generation aborted");
                return Err(err);
            }
        };
        let stats = GenerationStats {
            generation,
            frontier: frontier.len(),
            changed,
            population: next.population(),
            elapsed: timer.elapsed(),
        };
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        self.generation.store(generation, Ordering::Release);
        *self.last_stats.lock().unwrap_or_else(PoisonError::into_inner) = Some(stats);
        drop(phase);

        debug!(
            generation,
            frontier = stats.frontier,
            changed,
            population = stats.population,
            elapsed = ?stats.elapsed,
            "generation committed"
        );
        Ok(stats)
    }

    /// Fan the frontier out over the pool and join every task.
    ///
    /// The first failure aborts the remaining tasks, but the join still
    /// drains the whole set, so no task outlives the cycle.
    async fn compute_phase<'a, F>(
        &self,
        snapshot: &Arc<Grid>,
        chunks: impl Iterator<Item = &'a [Coord]>,
        compute: F,
        generation: u64,
    ) -> Result<Vec<Cell>>
    where
        F: Fn(&Grid, Coord) -> Result<Cell> + Send + Sync + 'static,
    {
        let compute = Arc::new(compute);
        let mut tasks = JoinSet::new();
        for chunk in chunks {
            let chunk = chunk.to_vec();
            let snapshot = Arc::clone(snapshot);
            let compute = Arc::clone(&compute);
            let guard = self.in_flight.enter();
            tasks.spawn_on(
                async move {
                    let _guard = guard;
                    chunk
                        .into_iter()
                        .map(|coord| (*compute)(snapshot.as_ref(), coord))
                        .collect::<Result<Vec<_>>>()
                },
                &self.handle,
            );
        }

        let mut pending = Vec::new();
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            if failure.is_some() {
                continue;
            }
            match joined {
                Ok(Ok(cells)) => pending.extend(cells),
                Ok(Err(err)) => failure = Some(err.to_string()),
                Err(err) => failure = Some(join_failure(err)),
            }
            if failure.is_some() {
                tasks.abort_all();
            }
        }
        match failure {
            Some(reason) => Err(EngineError::ComputeFailure { generation, reason }),
            None => Ok(pending),
        }
    }

    /// Apply pending results to a copy of the snapshot.
    fn commit(snapshot: &Grid, pending: &[Cell]) -> Result<(Grid, usize)> {
        let mut next = snapshot.clone();
        let mut changed = 0;
        for cell in pending {
            if cell.is_changed() {
                let Coord { x, y } = cell.coord();
                next.set(x, y, cell.next_state())?;
                changed += 1;
            }
        }
        Ok((next, changed))
    }
}

/// Owns the committed grid and the worker pool that advances it.
pub struct GenerationEngine {
    config: EngineConfig,
    width: u32,
    height: u32,
    populations_count: AtomicU32,
    shared: Arc<Shared>,
    runtime: Option<Runtime>,
}

impl GenerationEngine {
    /// Start a worker pool of `config.workers` threads around `grid`.
    pub fn new(grid: Grid, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.workers)
            .thread_name("polylife-worker")
            .build()?;
        info!(
            workers = config.workers,
            width = grid.width(),
            height = grid.height(),
            population = grid.population(),
            "worker pool started"
        );
        Ok(Self {
            width: grid.width(),
            height: grid.height(),
            populations_count: AtomicU32::new(config.populations_count),
            shared: Arc::new(Shared {
                current: RwLock::new(Arc::new(grid)),
                cycle: tokio::sync::Mutex::new(()),
                phase: AtomicU8::new(Phase::Idle as u8),
                generation: AtomicU64::new(0),
                last_stats: Mutex::new(None),
                in_flight: Arc::default(),
                chunk_size: config.chunk_size,
                handle: runtime.handle().clone(),
            }),
            runtime: Some(runtime),
            config,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.shared.phase.load(Ordering::Acquire))
    }

    /// Number of generations committed since construction or the last `clear`.
    pub fn generation(&self) -> u64 {
        self.shared.generation()
    }

    pub fn populations_count(&self) -> u32 {
        self.populations_count.load(Ordering::Relaxed)
    }

    /// Changes the range of ids accepted by `set`. Cells already on the
    /// board keep their ids.
    pub fn set_populations_count(&self, count: u32) -> Result<()> {
        if count == 0 {
            return Err(EngineError::InvalidConfig(
                "at least one population is required".into(),
            ));
        }
        self.populations_count.store(count, Ordering::Relaxed);
        Ok(())
    }

    /// The last committed grid. Holding it never blocks the engine.
    pub fn snapshot(&self) -> Arc<Grid> {
        self.shared.snapshot()
    }

    pub fn get(&self, x: i64, y: i64) -> Result<Option<PopulationId>> {
        self.snapshot().get(x, y)
    }

    /// Occupied cells of one committed generation, in unspecified order.
    pub fn live_cells(&self) -> Vec<(Coord, PopulationId)> {
        self.snapshot().live_cells().collect()
    }

    /// Paint a single cell. Waits for an in-flight generation to commit
    /// first, so the change lands on a whole generation.
    ///
    /// Blocks the calling thread; do not call from inside an async task.
    pub fn set(&self, x: i64, y: i64, state: Option<PopulationId>) -> Result<()> {
        if let Some(id) = state {
            let count = self.populations_count();
            if id >= count {
                return Err(EngineError::InvalidPopulation { id, count });
            }
        }
        let _cycle = futures::executor::block_on(self.shared.cycle.lock());
        let mut current = self
            .shared
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut *current).set(x, y, state)?;
        trace!(x, y, ?state, "cell set");
        Ok(())
    }

    /// Empty the board and reset the generation counter.
    pub fn clear(&self) {
        let _cycle = futures::executor::block_on(self.shared.cycle.lock());
        let mut current = self
            .shared
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut *current).clear();
        self.shared.generation.store(0, Ordering::Release);
        *self
            .shared
            .last_stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Run one compute and commit cycle, blocking until it finishes.
    pub fn advance_generation(&self) -> Result<GenerationStats> {
        futures::executor::block_on(self.advance())
    }

    /// Run one compute and commit cycle.
    ///
    /// On failure nothing is committed and the previous grid stays current.
    /// Once polled, the cycle runs to completion on the pool: dropping the
    /// future only stops waiting for it, the generation is still committed.
    pub async fn advance(&self) -> Result<GenerationStats> {
        self.advance_with(cell::compute).await
    }

    /// Same as [`GenerationEngine::advance`] with a custom per-cell evaluation.
    pub(crate) async fn advance_with<F>(&self, compute: F) -> Result<GenerationStats>
    where
        F: Fn(&Grid, Coord) -> Result<Cell> + Send + Sync + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let guard = self.shared.in_flight.enter();
        let cycle = self.shared.handle.spawn(async move {
            let _guard = guard;
            shared.run_cycle(compute).await
        });
        match cycle.await {
            Ok(result) => result,
            Err(err) => Err(EngineError::ComputeFailure {
                generation: self.generation() + 1,
                reason: join_failure(err),
            }),
        }
    }

    /// Multiline report of the committed generation.
    pub fn statistics(&self) -> String {
        let snapshot = self.snapshot();
        let mut s = format!(
            "Generation: {}\nPopulation: {}\n",
            NiceInt::from(self.generation()),
            NiceInt::from(snapshot.population())
        );
        for (id, count) in snapshot.populations() {
            s += &format!("  population {}: {}\n", id, NiceInt::from(count));
        }
        s += &format!("Workers: {}\n", self.config.workers);
        let last_stats = *self
            .shared
            .last_stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(stats) = last_stats {
            s += &format!(
                "Last frontier: {}\nLast changed: {}\nLast update: {:?}\n",
                NiceInt::from(stats.frontier),
                NiceInt::from(stats.changed),
                stats.elapsed
            );
        }
        s
    }

    /// Stop the worker pool, waiting at most `config.shutdown_grace` for
    /// outstanding cycles and tasks before cancelling them.
    ///
    /// The committed grid is unaffected either way. Blocks the calling thread.
    pub fn shutdown(mut self) -> Result<()> {
        let grace = self.config.shutdown_grace;
        let started = Instant::now();
        let outstanding = self.shared.in_flight.wait_idle(grace);
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(grace.saturating_sub(started.elapsed()));
        }
        if outstanding > 0 {
            warn!(outstanding, ?grace, "worker pool did not quiesce, tasks cancelled");
            return Err(EngineError::ShutdownTimeout { grace, outstanding });
        }
        info!(generation = self.generation(), "worker pool stopped");
        Ok(())
    }
}

impl Drop for GenerationEngine {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

fn join_failure(err: JoinError) -> String {
    if !err.is_panic() {
        return "task was cancelled".to_string();
    }
    let payload = err.into_panic();
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    format!("task panicked: {}", message)
}
