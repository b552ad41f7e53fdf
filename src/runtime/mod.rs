//! Cooperative single-threaded scheduling primitives.
//!
//! Nothing here blocks: deferred work is expressed as tasks handed to a
//! `Scheduler`, which the host drives from its UI event loop.

mod rate_limit;
mod resize_hub;
mod virtual_scheduler;

pub use rate_limit::{RateLimitMode, RateLimiter};
pub use resize_hub::{ObserverId, ResizeHub};
pub use virtual_scheduler::VirtualScheduler;

use std::time::Duration;

/// Deferred unit of work.
pub type Task = Box<dyn FnOnce()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Host event-loop contract.
pub trait Scheduler {
    /// Monotonic time since the scheduler started.
    fn now(&self) -> Duration;

    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId;

    /// Cancels a pending timer. Unknown or already-fired ids are ignored.
    fn clear_timeout(&self, id: TimerId);

    /// Runs `task` once the host has committed layout for the current turn.
    fn after_layout_flush(&self, task: Task);
}
