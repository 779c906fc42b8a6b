use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Tracks the pending work and pacing for a single domain
///
/// Items are dispatched in FIFO order, and no two dispatches for the same
/// domain are closer together than the limiter's minimum interval. The
/// interval is measured between dispatch *starts*.
#[derive(Debug)]
pub struct DomainQueue<T> {
    /// Work waiting to be dispatched, oldest first
    pending: VecDeque<T>,

    /// When the most recent item was dispatched
    pub last_dispatch: Option<Instant>,

    /// Whether a worker is currently draining this queue
    pub worker_active: bool,
}

impl<T> DomainQueue<T> {
    /// Creates an empty queue that has never dispatched
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            last_dispatch: None,
            worker_active: false,
        }
    }

    /// Appends an item to the back of the queue
    pub fn push(&mut self, item: T) {
        self.pending.push_back(item);
    }

    /// Removes the oldest item and records the dispatch time
    pub fn dispatch(&mut self, now: Instant) -> Option<T> {
        let item = self.pending.pop_front()?;
        self.last_dispatch = Some(now);
        Some(item)
    }

    /// Checks if the next item may be dispatched at `now`
    pub fn can_dispatch(&self, min_interval: Duration, now: Instant) -> bool {
        self.time_until_next_dispatch(min_interval, now).is_none()
    }

    /// Calculates the time until the next dispatch is allowed
    ///
    /// Returns None if a dispatch can happen now.
    pub fn time_until_next_dispatch(&self, min_interval: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_dispatch?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < min_interval {
            Some(min_interval - elapsed)
        } else {
            None
        }
    }

    /// Number of items waiting
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Checks if this queue can be dropped without losing pacing information
    ///
    /// A queue is idle once it has no pending work, no worker, and its last
    /// dispatch is at least `min_interval` in the past.
    pub fn is_idle(&self, min_interval: Duration, now: Instant) -> bool {
        self.pending.is_empty() && !self.worker_active && self.can_dispatch(min_interval, now)
    }
}

impl<T> Default for DomainQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
