//! State tracked while probing
//!
//! # Components
//!
//! - `ProbeState`: per-URL hop counters for redirects, refreshes and retries
//! - `DomainQueue`: per-domain FIFO of pending work plus its pacing clock

mod domain_queue;
mod probe_state;

pub use domain_queue::DomainQueue;
pub use probe_state::ProbeState;
