use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Counts generation cycles and phase-1 tasks that have been dispatched
/// but not yet finished or dropped, so that shutdown can wait for them
/// with a deadline.
#[derive(Default)]
pub(super) struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers one task. The task is counted until the guard is dropped,
    /// which also happens when the task is aborted.
    pub(super) fn enter(self: &Arc<Self>) -> InFlightGuard {
        *self.lock() += 1;
        InFlightGuard(Arc::clone(self))
    }

    #[cfg(test)]
    pub(super) fn count(&self) -> usize {
        *self.lock()
    }

    /// Blocks until no task is in flight or `timeout` elapses.
    /// Returns the number of tasks still outstanding.
    pub(super) fn wait_idle(&self, timeout: Duration) -> usize {
        let guard = self.lock();
        let (guard, _) = self
            .idle
            .wait_timeout_while(guard, timeout, |count| *count > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

pub(super) struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut count = self.0.lock();
        *count -= 1;
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}
