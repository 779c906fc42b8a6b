/// Mutable state threaded through one probe's hops
///
/// Created fresh for every top-level URL and discarded when that URL's
/// resolution ends. Never shared between URLs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeState {
    /// HTTP redirects followed so far
    pub redirects_followed: u32,

    /// Meta-refresh hops followed so far (when counted separately)
    pub refreshes_followed: u32,

    /// Retries spent on the current hop
    pub retries_attempted: u32,
}

impl ProbeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an HTTP redirect and starts the next hop with a fresh retry budget
    pub fn record_redirect(&mut self) {
        self.redirects_followed += 1;
        self.retries_attempted = 0;
    }

    /// Records a meta-refresh hop
    ///
    /// With `count_as_redirect` the hop consumes the redirect budget;
    /// otherwise it is tracked against its own counter.
    pub fn record_refresh(&mut self, count_as_redirect: bool) {
        if count_as_redirect {
            self.redirects_followed += 1;
        } else {
            self.refreshes_followed += 1;
        }
        self.retries_attempted = 0;
    }

    /// Returns true if another retry is allowed under `max_retries`
    pub fn can_retry(&self, max_retries: u32) -> bool {
        self.retries_attempted < max_retries
    }

    /// Consumes one retry and returns the new retry count
    pub fn record_retry(&mut self) -> u32 {
        self.retries_attempted += 1;
        self.retries_attempted
    }

    /// Returns the hop count that broke `max_hops`, if any
    ///
    /// Both redirect and refresh counters share the same ceiling.
    pub fn exceeded(&self, max_hops: u32) -> Option<u32> {
        if self.redirects_followed > max_hops {
            Some(self.redirects_followed)
        } else if self.refreshes_followed > max_hops {
            Some(self.refreshes_followed)
        } else {
            None
        }
    }
}
