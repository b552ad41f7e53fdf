use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Scheduler, TimerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitMode {
    /// Fire once after `interval` passes without a new call.
    #[default]
    Debounce,
    /// Fire at most once per `interval`; calls in between coalesce into one
    /// trailing call carrying the latest arguments.
    Throttle,
}

struct LimiterState<T> {
    timer: Option<TimerId>,
    pending: Option<T>,
    last_fire: Option<Duration>,
}

struct LimiterInner<T> {
    mode: RateLimitMode,
    interval: Duration,
    scheduler: Rc<dyn Scheduler>,
    target: Box<dyn Fn(T)>,
    state: RefCell<LimiterState<T>>,
}

/// Debounce / throttle wrapper around a callback, driven by a `Scheduler`.
pub struct RateLimiter<T: 'static> {
    inner: Rc<LimiterInner<T>>,
}

impl<T: 'static> RateLimiter<T> {
    pub fn new(
        mode: RateLimitMode,
        interval: Duration,
        scheduler: Rc<dyn Scheduler>,
        target: impl Fn(T) + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(LimiterInner {
                mode,
                interval,
                scheduler,
                target: Box::new(target),
                state: RefCell::new(LimiterState {
                    timer: None,
                    pending: None,
                    last_fire: None,
                }),
            }),
        }
    }

    #[must_use]
    pub fn mode(&self) -> RateLimitMode {
        self.inner.mode
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Returns `true` while a delayed call is scheduled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.state.borrow().timer.is_some()
    }

    pub fn call(&self, args: T) {
        match self.inner.mode {
            RateLimitMode::Debounce => self.call_debounced(args),
            RateLimitMode::Throttle => self.call_throttled(args),
        }
    }

    /// Drops any pending call and its timer.
    pub fn cancel(&self) {
        let timer = {
            let mut state = self.inner.state.borrow_mut();
            state.pending = None;
            state.timer.take()
        };
        if let Some(timer) = timer {
            self.inner.scheduler.clear_timeout(timer);
        }
    }

    fn call_debounced(&self, args: T) {
        let previous = {
            let mut state = self.inner.state.borrow_mut();
            state.pending = Some(args);
            state.timer.take()
        };
        if let Some(previous) = previous {
            self.inner.scheduler.clear_timeout(previous);
        }
        self.schedule_trailing(self.inner.interval);
    }

    fn call_throttled(&self, args: T) {
        let now = self.inner.scheduler.now();
        let wait = {
            let mut state = self.inner.state.borrow_mut();
            let elapsed = state.last_fire.map(|last| now.saturating_sub(last));
            match elapsed {
                Some(elapsed) if elapsed < self.inner.interval => {
                    state.pending = Some(args);
                    if state.timer.is_some() {
                        return;
                    }
                    self.inner.interval - elapsed
                }
                _ if state.timer.is_some() => {
                    state.pending = Some(args);
                    return;
                }
                _ => {
                    state.last_fire = Some(now);
                    drop(state);
                    (self.inner.target)(args);
                    return;
                }
            }
        };
        self.schedule_trailing(wait);
    }

    fn schedule_trailing(&self, delay: Duration) {
        let weak: Weak<LimiterInner<T>> = Rc::downgrade(&self.inner);
        let timer = self.inner.scheduler.set_timeout(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    fire_pending(&inner);
                }
            }),
        );
        self.inner.state.borrow_mut().timer = Some(timer);
    }
}

fn fire_pending<T>(inner: &LimiterInner<T>) {
    let args = {
        let mut state = inner.state.borrow_mut();
        state.timer = None;
        state.last_fire = Some(inner.scheduler.now());
        state.pending.take()
    };
    if let Some(args) = args {
        (inner.target)(args);
    }
}

impl<T: 'static> Drop for RateLimiter<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}
