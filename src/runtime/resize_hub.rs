use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::core::{ChartContainer, ContainerId, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObserveTarget {
    Element(ContainerId),
    Viewport,
}

struct Observer {
    target: ObserveTarget,
    callback: Rc<dyn Fn(Size)>,
}

#[derive(Default)]
struct HubState {
    active: bool,
    next_id: u64,
    observers: IndexMap<ObserverId, Observer>,
}

/// Box-size observation service shared by every chart owner of a host.
///
/// The host forwards native box-size notifications with `notify_box_size`
/// and global viewport resizes with `notify_viewport_resize`. When native
/// observation is unavailable, `observe` subscribes to the viewport signal
/// instead.
pub struct ResizeHub {
    native_observation: bool,
    state: RefCell<HubState>,
}

impl ResizeHub {
    /// Creates an initialized hub.
    #[must_use]
    pub fn new(native_observation: bool) -> Rc<Self> {
        let hub = Rc::new(Self {
            native_observation,
            state: RefCell::new(HubState::default()),
        });
        hub.init();
        hub
    }

    pub fn init(&self) {
        let mut state = self.state.borrow_mut();
        if !state.active {
            debug!(native = self.native_observation, "resize hub initialized");
            state.active = true;
        }
    }

    /// Drops every observer. `observe` refuses new subscriptions until `init`.
    pub fn teardown(&self) {
        let mut state = self.state.borrow_mut();
        if state.active {
            debug!(observers = state.observers.len(), "resize hub torn down");
        }
        state.active = false;
        state.observers.clear();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    #[must_use]
    pub fn supports_box_observation(&self) -> bool {
        self.native_observation
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.state.borrow().observers.len()
    }

    /// Subscribes `callback` to size changes of `container`.
    ///
    /// Native observation delivers one synchronous notification carrying the
    /// current size right after attaching, like a browser `ResizeObserver`.
    /// Returns `None` when the hub is torn down.
    pub fn observe(
        &self,
        container: &ChartContainer,
        callback: impl Fn(Size) + 'static,
    ) -> Option<ObserverId> {
        let callback: Rc<dyn Fn(Size)> = Rc::new(callback);
        let id = {
            let mut state = self.state.borrow_mut();
            if !state.active {
                return None;
            }
            state.next_id += 1;
            let id = ObserverId(state.next_id);
            let target = if self.native_observation {
                ObserveTarget::Element(container.id())
            } else {
                ObserveTarget::Viewport
            };
            state.observers.insert(
                id,
                Observer {
                    target,
                    callback: Rc::clone(&callback),
                },
            );
            id
        };
        trace!(?id, container = container.id().raw(), "observer attached");
        if self.native_observation {
            callback(container.size());
        }
        Some(id)
    }

    pub fn unobserve(&self, id: ObserverId) {
        if self.state.borrow_mut().observers.shift_remove(&id).is_some() {
            trace!(?id, "observer detached");
        }
    }

    /// Records the committed size of `container` and notifies its observers.
    pub fn notify_box_size(&self, container: &ChartContainer, size: Size) {
        container.set_size(size);
        if !self.native_observation {
            return;
        }
        self.dispatch(ObserveTarget::Element(container.id()), size);
    }

    /// Global viewport resize signal used when native observation is missing.
    pub fn notify_viewport_resize(&self, size: Size) {
        self.dispatch(ObserveTarget::Viewport, size);
    }

    fn dispatch(&self, target: ObserveTarget, size: Size) {
        let callbacks: Vec<Rc<dyn Fn(Size)>> = self
            .state
            .borrow()
            .observers
            .values()
            .filter(|observer| observer.target == target)
            .map(|observer| Rc::clone(&observer.callback))
            .collect();
        for callback in callbacks {
            callback(size);
        }
    }
}
