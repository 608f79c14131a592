//! Concurrency limiter for minification tasks.
//!
//! Caps the number of tasks executing at once, independently of the pool
//! size. A limit of 0 means unbounded: this is the mode used when the worker
//! pool is disabled and tasks run inline.
//!
//! Admission is FIFO (Tokio's semaphore is fair); completion order is not
//! constrained.
//!
//! ```ignore
//! let limiter = ConcurrencyLimiter::new(2);
//! let output = limiter.schedule(async { run_task().await }).await;
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Semaphore-backed limiter with in-flight counters.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    /// `None` when unbounded
    semaphore: Option<Arc<Semaphore>>,

    /// Maximum permits (0 when unbounded)
    max_permits: usize,

    /// Current number of scheduled tasks past admission
    in_flight: AtomicUsize,

    /// Peak concurrent tasks observed
    peak_in_flight: AtomicUsize,
}

impl ConcurrencyLimiter {
    /// `max_concurrent == 0` builds an unbounded limiter.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: (max_concurrent > 0).then(|| Arc::new(Semaphore::new(max_concurrent))),
            max_permits: max_concurrent,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Waits for a slot, then drives `task` to completion.
    ///
    /// Every scheduled task resolves; the slot is released even if the
    /// caller drops the returned future.
    pub async fn schedule<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let _permit = match &self.semaphore {
            // The semaphore is never closed, so acquire only fails in theory;
            // run the task regardless rather than dropping it.
            Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
            None => None,
        };

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.update_peak(current);
        let _guard = InFlightGuard(&self.in_flight);

        task.await
    }

    fn update_peak(&self, current: usize) {
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
    }

    /// `None` when unbounded.
    pub fn max_concurrent(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|_| self.max_permits)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bound_is_respected() {
        let limiter = ConcurrencyLimiter::new(2);
        let tasks = (0..10).map(|i| {
            limiter.schedule(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                i
            })
        });

        let results = join_all(tasks).await;
        assert_eq!(results, (0..10).collect::<Vec<_>>());
        assert_eq!(limiter.peak_in_flight(), 2);
        assert_eq!(limiter.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unbounded_admits_everything() {
        let limiter = ConcurrencyLimiter::new(0);
        assert_eq!(limiter.max_concurrent(), None);

        let tasks = (0..8).map(|_| {
            limiter.schedule(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
            })
        });
        join_all(tasks).await;
        assert_eq!(limiter.peak_in_flight(), 8);
    }

    #[tokio::test]
    async fn test_admission_is_fifo() {
        let limiter = ConcurrencyLimiter::new(1);
        let order = Mutex::new(Vec::new());

        let tasks = (0..5).map(|i| {
            let order = &order;
            limiter.schedule(async move {
                order.lock().unwrap().push(i);
                tokio::task::yield_now().await;
            })
        });
        join_all(tasks).await;

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_max_concurrent_reports_capacity() {
        let limiter = ConcurrencyLimiter::new(3);
        assert_eq!(limiter.max_concurrent(), Some(3));
        limiter.schedule(async {}).await;
        assert_eq!(limiter.max_concurrent(), Some(3));
    }
}
