//! Cancellable fixed-interval poll loop.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    task::{JoinHandle, JoinSet},
    time::MissedTickBehavior,
};
use tracing::{debug, warn};

/// Shortest period a loop will run at; `tokio::time::interval` rejects zero.
pub const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);

/// Owner of a running poll loop. Stopping (or dropping) the handle aborts the
/// loop and every tick still in flight.
pub struct PollHandle {
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!("poll loop stopped");
        }
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs `tick(seq)` right away and then once per `period`, with `seq`
/// counting up from 1. Ticks run as independent tasks, so a slow tick never
/// holds back the next one. A zero `period` is raised to [`MIN_POLL_PERIOD`].
pub fn spawn_poll_loop<F, Fut>(period: Duration, mut tick: F) -> PollHandle
where
    F: FnMut(u64) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if period.is_zero() {
        warn!(min_period = ?MIN_POLL_PERIOD, "zero poll period requested; clamping");
    }
    let period = period.max(MIN_POLL_PERIOD);
    let stopped = Arc::new(AtomicBool::new(false));
    let loop_stopped = Arc::clone(&stopped);
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight = JoinSet::new();
        let mut seq: u64 = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if loop_stopped.load(Ordering::SeqCst) {
                        break;
                    }
                    seq += 1;
                    in_flight.spawn(tick(seq));
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }
    });

    PollHandle { stopped, task }
}

#[cfg(test)]
#[path = "tests/poll_tests.rs"]
mod tests;
