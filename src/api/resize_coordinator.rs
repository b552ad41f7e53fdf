use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::core::{ChartContainer, ResizeOptions};
use crate::runtime::{ObserverId, RateLimitMode, RateLimiter, ResizeHub, Scheduler};

use super::AutoresizeConfig;

/// Turns box-size notifications for one container into rate-limited resizes.
///
/// The first native notification after attaching is skipped: observers
/// report the current size synchronously on attach, before layout settles.
/// This is purely order based; the reported size is not compared with the
/// last known one.
///
/// Only the container's own notification carries an explicit size. Parent
/// and viewport notifications resize with default options so the engine
/// measures the container itself.
pub struct ResizeCoordinator {
    hub: Rc<ResizeHub>,
    limiter: Rc<RateLimiter<ResizeOptions>>,
    subscriptions: RefCell<SmallVec<[ObserverId; 2]>>,
    resizing: Rc<Cell<bool>>,
}

impl ResizeCoordinator {
    /// Observes `container` (and its parent when configured) through `hub`.
    ///
    /// `on_resize` receives the resize options of the last notification
    /// in each rate-limit window.
    pub fn attach(
        hub: &Rc<ResizeHub>,
        scheduler: Rc<dyn Scheduler>,
        container: &ChartContainer,
        config: AutoresizeConfig,
        resizing: Rc<Cell<bool>>,
        on_resize: impl Fn(ResizeOptions) + 'static,
    ) -> Self {
        let limiter = {
            let resizing = Rc::clone(&resizing);
            Rc::new(RateLimiter::new(
                config.mode,
                Duration::from_millis(config.interval_ms),
                scheduler,
                move |opts: ResizeOptions| {
                    resizing.set(false);
                    trace!(width = ?opts.width, height = ?opts.height, "resize fired");
                    on_resize(opts);
                },
            ))
        };

        let coordinator = Self {
            hub: Rc::clone(hub),
            limiter,
            subscriptions: RefCell::new(SmallVec::new()),
            resizing,
        };

        let mut targets: SmallVec<[&ChartContainer; 2]> = SmallVec::new();
        targets.push(container);
        if config.observe_parent {
            if let Some(parent) = container.parent() {
                targets.push(parent);
            }
        }
        for target in targets {
            coordinator.observe(target, container);
        }

        debug!(
            container = container.id().raw(),
            mode = ?config.mode,
            interval_ms = config.interval_ms,
            native = hub.supports_box_observation(),
            subscriptions = coordinator.subscriptions.borrow().len(),
            "autoresize attached"
        );
        coordinator
    }

    fn observe(&self, target: &ChartContainer, container: &ChartContainer) {
        let skip_first = Cell::new(self.hub.supports_box_observation());
        let limiter = Rc::downgrade(&self.limiter);
        let resizing = Rc::clone(&self.resizing);
        // Fallback observers hear the viewport, never the container box.
        let explicit = self.hub.supports_box_observation() && target == container;
        let subscription = self.hub.observe(target, move |reported| {
            if skip_first.replace(false) {
                trace!("skipping initial observer notification");
                return;
            }
            let Some(limiter) = limiter.upgrade() else {
                return;
            };
            resizing.set(true);
            limiter.call(if explicit {
                ResizeOptions::explicit(reported)
            } else {
                ResizeOptions::default()
            });
        });
        if let Some(id) = subscription {
            self.subscriptions.borrow_mut().push(id);
        }
    }

    #[must_use]
    pub fn mode(&self) -> RateLimitMode {
        self.limiter.mode()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.subscriptions.borrow().is_empty()
    }

    /// Unsubscribes and drops any pending resize. Idempotent.
    pub fn disconnect(&self) {
        self.limiter.cancel();
        self.resizing.set(false);
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        for id in &subscriptions {
            self.hub.unobserve(*id);
        }
        if !subscriptions.is_empty() {
            debug!(subscriptions = subscriptions.len(), "autoresize disconnected");
        }
    }
}

impl Drop for ResizeCoordinator {
    fn drop(&mut self) {
        self.disconnect();
    }
}
