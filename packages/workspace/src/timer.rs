//! Periodic and debounced background tasks.
//!
//! Every task is owned by a handle that aborts it on drop, and the
//! [`TimerService`] can abort everything it started at once.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Running background task; aborted when dropped
#[derive(Debug)]
#[must_use = "dropping a TimerHandle cancels its task"]
pub struct TimerHandle {
    handle: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimerService {
    tasks: Arc<Mutex<Vec<AbortHandle>>>,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `tick` every `period`, starting one period from now.
    /// Ticks that fall behind are delayed rather than bunched up.
    /// A zero period is treated as one millisecond.
    pub fn every<F, Fut>(&self, period: Duration, mut tick: F) -> TimerHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick().await;
            }
        });
        self.track(handle)
    }

    /// Debouncer whose calls fire `delay` after the last one
    pub fn debouncer(&self, delay: Duration) -> Debouncer {
        Debouncer {
            delay,
            pending: Arc::new(Mutex::new(None)),
            service: self.clone(),
        }
    }

    /// Abort every task started through this service
    pub fn shutdown(&self) {
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
    }

    fn track(&self, handle: JoinHandle<()>) -> TimerHandle {
        let mut tasks = lock(&self.tasks);
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle.abort_handle());
        TimerHandle { handle }
    }
}

/// Collapses bursts of calls into one, fired after a quiet period
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Arc<Mutex<Option<TimerHandle>>>,
    service: TimerService,
}

impl Debouncer {
    /// Schedule `f`, replacing whatever was scheduled before
    pub fn call<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let delay = self.delay;
        let handle = self.service.track(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        }));
        // The previous handle aborts its task on drop
        *lock(&self.pending) = Some(handle);
    }

    pub fn cancel(&self) {
        lock(&self.pending).take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_every_ticks_until_dropped() {
        let timers = TimerService::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let handle = timers.every(Duration::from_millis(100), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        drop(handle);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_still_ticks() {
        let timers = TimerService::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let _handle = timers.every(Duration::ZERO, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(count.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_fires_last_call_once() {
        let timers = TimerService::new();
        let debouncer = timers.debouncer(Duration::from_millis(16));
        let fired = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let fired = fired.clone();
            debouncer.call(move || fired.lock().unwrap().push(i));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(*fired.lock().unwrap(), vec![4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_aborts_everything() {
        let timers = TimerService::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let _handle = timers.every(Duration::from_millis(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        timers.shutdown();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
