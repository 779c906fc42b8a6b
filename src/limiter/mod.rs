//! Per-domain request pacing
//!
//! The limiter is a scheduling wrapper only. Tasks submitted for the same
//! domain start in FIFO order and no closer together than the configured
//! interval; tasks for different domains never wait on each other. One worker
//! drains each active domain's queue and exits when the queue is empty.
//!
//! Retry and error interpretation live in the prober. A task's result,
//! including an `Err`, is handed back to whoever awaited that task.

use crate::state::DomainQueue;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A queued task: when called, spawns the real work and hands its handle back
type Job = Box<dyn FnOnce() + Send>;

/// Errors raised by the limiter itself, never by the wrapped task
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Task for {domain} was dropped before it started")]
    Dropped { domain: String },

    #[error("Task for {domain} panicked")]
    Panicked { domain: String },

    #[error("Task for {domain} was cancelled")]
    Cancelled { domain: String },
}

/// Paces task starts per domain key
///
/// Cloning is cheap; clones share the same queues.
#[derive(Clone)]
pub struct DomainRateLimiter {
    inner: Arc<Inner>,
}

struct Inner {
    min_interval: Duration,
    queues: Mutex<HashMap<String, DomainQueue<Job>>>,
}

impl DomainRateLimiter {
    /// Creates a limiter with the given minimum interval between starts
    pub fn new(min_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                min_interval,
                queues: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The minimum interval between task starts for one domain
    pub fn min_interval(&self) -> Duration {
        self.inner.min_interval
    }

    /// Runs `task` once the domain's pacing allows it
    ///
    /// # Arguments
    ///
    /// * `domain` - The domain key to pace against
    /// * `task` - Builds the future to run; called when the task is dispatched
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - Whatever the task produced, unchanged
    /// * `Err(RateLimitError)` - The task never ran to completion
    ///
    /// # Example
    ///
    /// ```no_run
    /// use link_vigil::limiter::DomainRateLimiter;
    /// use std::time::Duration;
    ///
    /// # async fn example() {
    /// let limiter = DomainRateLimiter::new(Duration::from_millis(500));
    /// let value = limiter.execute("example.com", || async { 42 }).await.unwrap();
    /// assert_eq!(value, 42);
    /// # }
    /// ```
    pub async fn execute<F, Fut, T>(&self, domain: &str, task: F) -> Result<T, RateLimitError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (handle_tx, handle_rx) = oneshot::channel::<JoinHandle<T>>();
        let job: Job = Box::new(move || {
            let handle = tokio::spawn(task());
            let _ = handle_tx.send(handle);
        });

        self.enqueue(domain, job);

        let handle = handle_rx.await.map_err(|_| RateLimitError::Dropped {
            domain: domain.to_string(),
        })?;

        handle.await.map_err(|e| {
            if e.is_panic() {
                RateLimitError::Panicked {
                    domain: domain.to_string(),
                }
            } else {
                RateLimitError::Cancelled {
                    domain: domain.to_string(),
                }
            }
        })
    }

    /// Number of domains currently tracked
    pub fn tracked_domains(&self) -> usize {
        self.inner.lock().len()
    }

    /// Number of tasks waiting for `domain`
    pub fn pending(&self, domain: &str) -> usize {
        self.inner.lock().get(domain).map_or(0, DomainQueue::len)
    }

    fn enqueue(&self, domain: &str, job: Job) {
        let mut queues = self.inner.lock();
        let now = Instant::now();
        let min_interval = self.inner.min_interval;
        queues.retain(|key, queue| key == domain || !queue.is_idle(min_interval, now));

        let queue = queues.entry(domain.to_string()).or_default();
        queue.push(job);

        if !queue.worker_active {
            queue.worker_active = true;
            tracing::trace!("Starting pacing worker for {}", domain);
            tokio::spawn(run_worker(self.inner.clone(), domain.to_string()));
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, DomainQueue<Job>>> {
        // Jobs never run under the lock, so a poisoned map is still consistent.
        self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Drains one domain's queue, sleeping between dispatches as needed
async fn run_worker(inner: Arc<Inner>, domain: String) {
    loop {
        let job = {
            let mut queues = inner.lock();
            let Some(queue) = queues.get_mut(&domain) else {
                return;
            };

            if queue.is_empty() {
                queue.worker_active = false;
                return;
            }

            let now = Instant::now();
            match queue.time_until_next_dispatch(inner.min_interval, now) {
                Some(wait) => Err(wait),
                None => Ok(queue.dispatch(now)),
            }
        };

        match job {
            Ok(Some(job)) => {
                tracing::trace!("Dispatching task for {}", domain);
                job();
            }
            Ok(None) => {}
            Err(wait) => {
                tracing::trace!("Pacing {} for {:?}", domain, wait);
                tokio::time::sleep(wait).await;
            }
        }
    }
}
