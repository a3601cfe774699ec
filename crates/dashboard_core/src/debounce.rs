//! Trailing-edge debouncer on tokio timers.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::task::JoinHandle;

type Action<T> = Arc<dyn Fn(T) + Send + Sync>;

struct Pending {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Coalesces bursts of [`Debouncer::trigger`] calls into a single call of the
/// action, `delay` after the last trigger, carrying the last trigger's value.
///
/// Must be triggered from within a tokio runtime.
pub struct Debouncer<T> {
    delay: Duration,
    action: Action<T>,
    pending: Arc<Mutex<Pending>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration, action: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            delay,
            action: Arc::new(action),
            pending: Arc::new(Mutex::new(Pending {
                generation: 0,
                task: None,
            })),
        }
    }

    pub fn trigger(&self, value: T) {
        let mut pending = lock(&self.pending);
        pending.generation = pending.generation.wrapping_add(1);
        if let Some(task) = pending.task.take() {
            task.abort();
        }

        let generation = pending.generation;
        let delay = self.delay;
        let action = Arc::clone(&self.action);
        let shared = Arc::clone(&self.pending);
        pending.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut pending = lock(&shared);
                // A newer trigger or a cancel happened while this timer was waking up.
                if pending.generation != generation {
                    return;
                }
                pending.task = None;
            }
            action(value);
        }));
    }

    /// Drops any scheduled call. No-op when nothing is pending.
    pub fn cancel(&self) {
        let mut pending = lock(&self.pending);
        pending.generation = pending.generation.wrapping_add(1);
        if let Some(task) = pending.task.take() {
            task.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.pending).task.is_some()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let mut pending = lock(&self.pending);
        pending.generation = pending.generation.wrapping_add(1);
        if let Some(task) = pending.task.take() {
            task.abort();
        }
    }
}

fn lock(pending: &Mutex<Pending>) -> MutexGuard<'_, Pending> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/debounce_tests.rs"]
mod tests;
