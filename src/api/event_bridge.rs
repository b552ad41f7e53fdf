use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::interaction::{ChartEvent, EventHandler, EventPayload};
use crate::render::InstanceHandle;

#[derive(Clone)]
struct Registration {
    id: u64,
    handler: EventHandler,
    /// Handler actually installed on the instance. Differs from `handler`
    /// only for `once` registrations, where it detaches itself first.
    mirror: EventHandler,
    once: bool,
}

type HandlerSet = SmallVec<[Registration; 2]>;

/// Event-name to ordered-handler-set registry mirrored onto the live instance.
///
/// Registrations outlive instances: `detach` removes the mirrored handlers
/// from the current instance but keeps the registry, so `attach` on a
/// replacement instance restores every subscription.
pub struct EventBridge {
    registry: RefCell<IndexMap<ChartEvent, HandlerSet>>,
    instance: RefCell<Option<InstanceHandle>>,
    next_id: Cell<u64>,
    self_ref: Weak<EventBridge>,
}

impl EventBridge {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|self_ref| Self {
            registry: RefCell::new(IndexMap::new()),
            instance: RefCell::new(None),
            next_id: Cell::new(0),
            self_ref: self_ref.clone(),
        })
    }

    /// Registers `handler`; a handler already registered for `event` is ignored.
    pub fn on(&self, event: impl Into<ChartEvent>, handler: EventHandler) {
        let event = event.into();
        self.insert(event, handler, false);
    }

    /// Registers `handler` to run at most once, then detach itself.
    pub fn once(&self, event: impl Into<ChartEvent>, handler: EventHandler) {
        let event = event.into();
        self.insert(event, handler, true);
    }

    /// Removes `handler`, or every handler for `event` when `None`.
    pub fn off(&self, event: impl Into<ChartEvent>, handler: Option<&EventHandler>) {
        let event = event.into();
        let removed: HandlerSet = {
            let mut registry = self.registry.borrow_mut();
            let Some(set) = registry.get_mut(&event) else {
                return;
            };
            let removed = match handler {
                Some(handler) => {
                    let (removed, kept): (HandlerSet, HandlerSet) = set
                        .drain(..)
                        .partition(|registration| registration.handler.ptr_eq(handler));
                    *set = kept;
                    removed
                }
                None => std::mem::take(set),
            };
            if set.is_empty() {
                registry.shift_remove(&event);
            }
            removed
        };
        self.unmirror(&event, &removed);
    }

    /// Local synchronous fan-out, independent of the engine's event loop.
    ///
    /// Handlers are snapshotted before the first call: removing one from
    /// inside another handler affects later emissions only.
    pub fn emit(&self, event: impl Into<ChartEvent>, payload: &EventPayload) {
        let event = event.into();
        let snapshot: HandlerSet = self
            .registry
            .borrow()
            .get(&event)
            .cloned()
            .unwrap_or_default();
        if snapshot.is_empty() {
            return;
        }

        let once_ids: SmallVec<[u64; 2]> = snapshot
            .iter()
            .filter(|registration| registration.once)
            .map(|registration| registration.id)
            .collect();
        for id in once_ids {
            self.remove_registration(&event, id);
        }

        trace!(%event, handlers = snapshot.len(), "emit");
        for registration in &snapshot {
            registration.handler.call(payload);
        }
    }

    pub fn register_events<I, E>(&self, events: I)
    where
        I: IntoIterator<Item = (E, EventHandler)>,
        E: Into<ChartEvent>,
    {
        for (event, handler) in events {
            self.on(event, handler);
        }
    }

    pub fn unregister_events<I, E>(&self, events: I)
    where
        I: IntoIterator<Item = (E, Option<EventHandler>)>,
        E: Into<ChartEvent>,
    {
        for (event, handler) in events {
            self.off(event, handler.as_ref());
        }
    }

    /// Removes every registration and its mirror on the live instance.
    pub fn clear_all_events(&self) {
        let registry = std::mem::take(&mut *self.registry.borrow_mut());
        for (event, set) in &registry {
            self.unmirror(event, set);
        }
    }

    /// Mirrors every registration onto `instance`, detaching from any previous one.
    pub fn attach(&self, instance: &InstanceHandle) {
        self.detach();
        let registry = self.registry.borrow().clone();
        for (event, set) in &registry {
            for registration in set {
                instance.on(event, registration.mirror.clone());
            }
        }
        *self.instance.borrow_mut() = Some(Rc::clone(instance));
    }

    /// Removes mirrored handlers from the current instance; keeps the registry.
    pub fn detach(&self) {
        let Some(instance) = self.instance.borrow_mut().take() else {
            return;
        };
        if instance.is_disposed() {
            return;
        }
        let registry = self.registry.borrow().clone();
        for (event, set) in &registry {
            for registration in set {
                instance.off(event, Some(&registration.mirror));
            }
        }
    }

    #[must_use]
    pub fn handler_count(&self, event: impl Into<ChartEvent>) -> usize {
        self.registry
            .borrow()
            .get(&event.into())
            .map_or(0, SmallVec::len)
    }

    #[must_use]
    pub fn event_names(&self) -> Vec<ChartEvent> {
        self.registry.borrow().keys().cloned().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.borrow().is_empty()
    }

    fn insert(&self, event: ChartEvent, handler: EventHandler, once: bool) {
        let id = self.next_id.get() + 1;
        let registration = {
            let mut registry = self.registry.borrow_mut();
            let set = registry.entry(event.clone()).or_default();
            if set.iter().any(|existing| existing.handler.ptr_eq(&handler)) {
                trace!(%event, "handler already registered");
                return;
            }
            self.next_id.set(id);
            let mirror = if once {
                self.once_mirror(event.clone(), id, handler.clone())
            } else {
                handler.clone()
            };
            let registration = Registration {
                id,
                handler,
                mirror,
                once,
            };
            set.push(registration.clone());
            registration
        };

        let instance = self.live_instance();
        if let Some(instance) = instance {
            instance.on(&event, registration.mirror);
        }
    }

    fn once_mirror(&self, event: ChartEvent, id: u64, handler: EventHandler) -> EventHandler {
        let bridge = self.self_ref.clone();
        EventHandler::new(move |payload| {
            if let Some(bridge) = bridge.upgrade() {
                bridge.remove_registration(&event, id);
            }
            handler.call(payload);
        })
    }

    fn remove_registration(&self, event: &ChartEvent, id: u64) {
        let removed = {
            let mut registry = self.registry.borrow_mut();
            let Some(set) = registry.get_mut(event) else {
                return;
            };
            let Some(position) = set.iter().position(|registration| registration.id == id) else {
                return;
            };
            let removed = set.remove(position);
            if set.is_empty() {
                registry.shift_remove(event);
            }
            removed
        };
        self.unmirror(event, std::slice::from_ref(&removed));
    }

    fn unmirror(&self, event: &ChartEvent, removed: &[Registration]) {
        if removed.is_empty() {
            return;
        }
        if let Some(instance) = self.live_instance() {
            for registration in removed {
                instance.off(event, Some(&registration.mirror));
            }
        }
    }

    fn live_instance(&self) -> Option<InstanceHandle> {
        self.instance
            .borrow()
            .as_ref()
            .filter(|instance| !instance.is_disposed())
            .cloned()
    }
}
