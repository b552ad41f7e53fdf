use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use tracing::warn;

use super::{Scheduler, Task, TimerId};

const MAX_TASKS_PER_DRAIN: usize = 100_000;

#[derive(Default)]
struct VirtualState {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<(Duration, u64), Task>,
    deadlines: HashMap<u64, Duration>,
    layout_queue: VecDeque<Task>,
}

/// Deterministic scheduler driven by a virtual clock.
///
/// Layout-flush tasks run before any timer that is due in the same turn,
/// mirroring a browser committing layout before timer callbacks.
#[derive(Default)]
pub struct VirtualScheduler {
    state: RefCell<VirtualState>,
}

impl VirtualScheduler {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn pending_timer_count(&self) -> usize {
        self.state.borrow().timers.len()
    }

    #[must_use]
    pub fn pending_layout_count(&self) -> usize {
        self.state.borrow().layout_queue.len()
    }

    /// Runs every queued layout-flush task, including ones queued while flushing.
    pub fn flush_layout(&self) {
        for _ in 0..MAX_TASKS_PER_DRAIN {
            let task = self.state.borrow_mut().layout_queue.pop_front();
            match task {
                Some(task) => task(),
                None => return,
            }
        }
        warn!("layout queue did not drain; tasks keep re-queueing themselves");
    }

    /// Moves the clock forward by `delta`, running due timers in deadline order.
    pub fn advance(&self, delta: Duration) {
        let target = self.state.borrow().now + delta;
        for _ in 0..MAX_TASKS_PER_DRAIN {
            self.flush_layout();
            let Some(task) = self.pop_due_timer(Some(target)) else {
                self.state.borrow_mut().now = target;
                self.flush_layout();
                return;
            };
            task();
        }
        warn!("timer queue did not drain before the advance target");
    }

    pub fn advance_ms(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Runs layout tasks and timers until both queues are empty.
    pub fn run_until_idle(&self) {
        for _ in 0..MAX_TASKS_PER_DRAIN {
            self.flush_layout();
            match self.pop_due_timer(None) {
                Some(task) => task(),
                None => return,
            }
        }
        warn!("scheduler did not become idle");
    }

    fn pop_due_timer(&self, limit: Option<Duration>) -> Option<Task> {
        let mut state = self.state.borrow_mut();
        let (&(deadline, id), _) = state.timers.first_key_value()?;
        if limit.is_some_and(|limit| deadline > limit) {
            return None;
        }
        let task = state.timers.remove(&(deadline, id))?;
        state.deadlines.remove(&id);
        if deadline > state.now {
            state.now = deadline;
        }
        Some(task)
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> Duration {
        self.state.borrow().now
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        let deadline = state.now + delay;
        state.timers.insert((deadline, id), task);
        state.deadlines.insert(id, deadline);
        TimerId::new(id)
    }

    fn clear_timeout(&self, id: TimerId) {
        let mut state = self.state.borrow_mut();
        if let Some(deadline) = state.deadlines.remove(&id.raw()) {
            state.timers.remove(&(deadline, id.raw()));
        }
    }

    fn after_layout_flush(&self, task: Task) {
        self.state.borrow_mut().layout_queue.push_back(task);
    }
}
