use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::{
    ChartContainer, ChartOption, InitOptions, LoadingOptions, SetOptionOptions, Theme,
};
use crate::error::ChartResult;
use crate::render::{InstanceHandle, RenderEngine, RenderInstance};
use crate::runtime::{ResizeHub, Scheduler};

use super::theme_switch::ThemeSwitchState;
use super::validation::validate_autoresize_config;
use super::{AutoresizeConfig, ChartOwnerConfig, EventBridge, ResizeCoordinator};

type DisposeHook = Rc<dyn Fn(&dyn RenderInstance)>;

/// Layers writes deferred after `base` was captured on top of it.
pub(super) fn fold_pending(
    base: Option<ChartOption>,
    later: Option<ChartOption>,
) -> Option<ChartOption> {
    match (base, later) {
        (Some(base), Some(later)) => Some(base.merged_with(&later)),
        (base, later) => base.or(later),
    }
}

/// UI feedback flags readable by the owning component.
#[derive(Clone, Default)]
pub(super) struct StatusFlags {
    pub(super) animating: Rc<Cell<bool>>,
    pub(super) resizing: Rc<Cell<bool>>,
}

pub(super) struct OwnerState {
    pub(super) config: ChartOwnerConfig,
    pub(super) container: Option<ChartContainer>,
    pub(super) instance: Option<InstanceHandle>,
    pub(super) resize: Option<ResizeCoordinator>,
    /// Option written while no container was available; applied on creation.
    pub(super) pending_option: Option<ChartOption>,
    /// Accumulated result of every accepted write to the live instance.
    pub(super) last_applied: Option<ChartOption>,
    pub(super) loading: Option<LoadingOptions>,
    pub(super) on_dispose: Option<DisposeHook>,
    pub(super) theme_switch: ThemeSwitchState,
    pub(super) animation_generation: u64,
}

pub(super) struct OwnerInner {
    pub(super) engine: Rc<dyn RenderEngine>,
    pub(super) scheduler: Rc<dyn Scheduler>,
    pub(super) resize_hub: Rc<ResizeHub>,
    pub(super) events: Rc<EventBridge>,
    pub(super) flags: StatusFlags,
    pub(super) state: RefCell<OwnerState>,
}

/// Owner of a single render instance, driven by host lifecycle calls.
///
/// `ChartOwner` is a cheap-clone handle; coordinators keep a
/// [`WeakChartOwner`] so delayed callbacks never extend its lifetime.
/// No engine call is made while internal state is borrowed, so handlers
/// and hooks may call back into the owner.
#[derive(Clone)]
pub struct ChartOwner {
    pub(super) inner: Rc<OwnerInner>,
}

/// Non-owning handle used by scheduled callbacks.
#[derive(Clone)]
pub struct WeakChartOwner {
    inner: Weak<OwnerInner>,
}

impl WeakChartOwner {
    #[must_use]
    pub fn upgrade(&self) -> Option<ChartOwner> {
        self.inner.upgrade().map(|inner| ChartOwner { inner })
    }
}

impl ChartOwner {
    pub fn new(
        engine: Rc<dyn RenderEngine>,
        scheduler: Rc<dyn Scheduler>,
        resize_hub: Rc<ResizeHub>,
        config: ChartOwnerConfig,
    ) -> ChartResult<Self> {
        config.validate()?;
        Ok(Self {
            inner: Rc::new(OwnerInner {
                engine,
                scheduler,
                resize_hub,
                events: EventBridge::new(),
                flags: StatusFlags::default(),
                state: RefCell::new(OwnerState {
                    config,
                    container: None,
                    instance: None,
                    resize: None,
                    pending_option: None,
                    last_applied: None,
                    loading: None,
                    on_dispose: None,
                    theme_switch: ThemeSwitchState::default(),
                    animation_generation: 0,
                }),
            }),
        })
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakChartOwner {
        WeakChartOwner {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &Rc<dyn RenderEngine> {
        &self.inner.engine
    }

    #[must_use]
    pub fn scheduler(&self) -> &Rc<dyn Scheduler> {
        &self.inner.scheduler
    }

    #[must_use]
    pub fn events(&self) -> &EventBridge {
        &self.inner.events
    }

    #[must_use]
    pub fn config(&self) -> ChartOwnerConfig {
        self.inner.state.borrow().config.clone()
    }

    #[must_use]
    pub fn theme(&self) -> Option<Theme> {
        self.inner.state.borrow().config.theme.clone()
    }

    #[must_use]
    pub fn container(&self) -> Option<ChartContainer> {
        self.inner.state.borrow().container.clone()
    }

    /// Direct access to the live instance handle, if any.
    #[must_use]
    pub fn instance(&self) -> Option<InstanceHandle> {
        self.live_instance()
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live_instance().is_some()
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.inner.flags.animating.get()
    }

    #[must_use]
    pub fn is_resizing(&self) -> bool {
        self.inner.flags.resizing.get()
    }

    #[must_use]
    pub fn is_autoresize_connected(&self) -> bool {
        self.inner
            .state
            .borrow()
            .resize
            .as_ref()
            .is_some_and(ResizeCoordinator::is_connected)
    }

    /// Installs a hook invoked with the outgoing instance right before it is disposed.
    pub fn set_on_dispose(&self, hook: impl Fn(&dyn RenderInstance) + 'static) {
        self.inner.state.borrow_mut().on_dispose = Some(Rc::new(hook));
    }

    /// Creates a new instance, disposing the current one first.
    ///
    /// Without a container a live chart is left untouched. With nothing
    /// live, the parameters are recorded and creation happens on the next
    /// `mount`. Construction failures propagate.
    pub fn create(
        &self,
        container: Option<&ChartContainer>,
        theme: Option<Theme>,
        init_options: InitOptions,
    ) -> ChartResult<()> {
        let Some(container) = container else {
            if self.is_live() {
                debug!("create called without a container; live instance kept");
            } else {
                let mut state = self.inner.state.borrow_mut();
                state.config.theme = theme;
                state.config.init_options = init_options;
                debug!("no container available; instance creation deferred");
            }
            return Ok(());
        };
        {
            let mut state = self.inner.state.borrow_mut();
            state.config.theme = theme;
            state.config.init_options = init_options;
            state.container = Some(container.clone());
        }
        self.create_instance().map(|_| ())
    }

    /// Binds `container` and creates an instance when none is live.
    ///
    /// Also resumes a theme switch that was waiting for a container.
    pub fn mount(&self, container: &ChartContainer) -> ChartResult<()> {
        let rebinding = {
            let mut state = self.inner.state.borrow_mut();
            let rebinding = state
                .container
                .as_ref()
                .is_some_and(|current| current != container);
            state.container = Some(container.clone());
            rebinding
        };
        if self.theme_switch_awaiting_container() {
            return self.resume_theme_switch();
        }
        if rebinding || !self.is_live() {
            self.create_instance()?;
        }
        Ok(())
    }

    /// Unmount hook. Same as `dispose`.
    pub fn unmount(&self) {
        self.dispose();
    }

    /// Container loss: tears the instance down but keeps event registrations
    /// and the accepted option, so a later `mount` restores the chart.
    ///
    /// A theme switch in flight is abandoned; its snapshot becomes the
    /// option applied on the next `mount`.
    pub fn release_container(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.container = None;
            let captured = state.theme_switch.captured.take();
            state.theme_switch.reset();
            let carried = captured.or_else(|| state.last_applied.take());
            state.pending_option = fold_pending(carried, state.pending_option.take());
        }
        self.teardown_instance(false);
    }

    /// Full teardown. Idempotent and never fails.
    ///
    /// Disconnects autoresize, clears every event registration, runs the
    /// on-dispose hook, disposes the instance, releases the container and
    /// cancels queued animation frames and theme restores. Later writes are
    /// kept for the next `mount` or `create` and reach no engine.
    pub fn dispose(&self) {
        let had_instance = {
            let mut state = self.inner.state.borrow_mut();
            state.animation_generation += 1;
            state.theme_switch.reset();
            state.container = None;
            state.pending_option = None;
            state.last_applied = None;
            state.loading = None;
            state.instance.is_some()
        };
        self.inner.flags.animating.set(false);
        self.teardown_instance(true);
        if had_instance {
            debug!("chart owner disposed");
        }
    }

    #[must_use]
    pub fn group(&self) -> Option<String> {
        self.inner.state.borrow().config.group.clone()
    }

    /// Sets the cross-instance synchronization tag on the owner and the live instance.
    pub fn set_group(&self, group: Option<String>) {
        self.inner.state.borrow_mut().config.group = group.clone();
        if let Some(instance) = self.live_instance() {
            instance.set_group(group);
        }
    }

    /// Links every instance sharing this owner's group tag.
    pub fn connect_group(&self) -> bool {
        let Some(group) = self.group() else {
            return false;
        };
        self.inner.engine.connect(&group);
        true
    }

    pub fn disconnect_group(&self) -> bool {
        let Some(group) = self.group() else {
            return false;
        };
        self.inner.engine.disconnect(&group);
        true
    }

    pub fn register_theme(&self, name: &str, theme: Value) {
        self.inner.engine.register_theme(name, theme);
    }

    pub fn register_map(&self, name: &str, geo_data: Value) {
        self.inner.engine.register_map(name, geo_data);
    }

    /// Replaces the autoresize settings, re-attaching observation on the live instance.
    pub fn set_autoresize(&self, autoresize: AutoresizeConfig) -> ChartResult<()> {
        validate_autoresize_config(autoresize)?;
        let previous = {
            let mut state = self.inner.state.borrow_mut();
            state.config.autoresize = autoresize;
            state.resize.take()
        };
        if let Some(previous) = previous {
            previous.disconnect();
        }
        if self.is_live() {
            self.connect_autoresize();
        }
        Ok(())
    }

    pub(super) fn live_instance(&self) -> Option<InstanceHandle> {
        self.inner
            .state
            .borrow()
            .instance
            .as_ref()
            .filter(|instance| !instance.is_disposed())
            .cloned()
    }

    /// Disposes the current instance and builds a new one from stored settings.
    ///
    /// Returns `Ok(None)` when no container is bound.
    pub(super) fn create_instance(&self) -> ChartResult<Option<InstanceHandle>> {
        self.teardown_instance(false);

        let (container, theme, init_options, group) = {
            let state = self.inner.state.borrow();
            let Some(container) = state.container.clone() else {
                return Ok(None);
            };
            (
                container,
                state.config.theme.clone(),
                state.config.init_options.clone(),
                state.config.group.clone(),
            )
        };

        let instance = self
            .inner
            .engine
            .init(&container, theme.as_ref(), &init_options)
            .inspect_err(|err| warn!(error = %err, "chart instance creation failed"))?;
        if group.is_some() {
            instance.set_group(group);
        }
        self.inner.events.attach(&instance);

        let (pending, loading) = {
            let mut state = self.inner.state.borrow_mut();
            state.instance = Some(Rc::clone(&instance));
            state.last_applied = None;
            (state.pending_option.take(), state.loading.clone())
        };
        self.connect_autoresize();
        if let Some(loading) = loading {
            instance.show_loading(&loading);
        }
        debug!(
            container = container.id().raw(),
            theme = ?theme.as_ref().and_then(Theme::name),
            "chart instance created"
        );

        if let Some(pending) = pending {
            self.apply_option(&instance, &pending, SetOptionOptions::replace());
        }
        Ok(Some(instance))
    }

    /// Tears down the live instance.
    ///
    /// `clear_registrations = false` only detaches event mirrors so they can
    /// be re-attached to a replacement instance.
    pub(super) fn teardown_instance(&self, clear_registrations: bool) {
        let (instance, resize, hook) = {
            let mut state = self.inner.state.borrow_mut();
            (
                state.instance.take(),
                state.resize.take(),
                state.on_dispose.clone(),
            )
        };
        if let Some(resize) = resize {
            resize.disconnect();
        }
        if clear_registrations {
            self.inner.events.clear_all_events();
        }
        self.inner.events.detach();
        let Some(instance) = instance else {
            return;
        };
        if let Some(hook) = hook {
            hook(instance.as_ref());
        }
        if !instance.is_disposed() {
            instance.dispose();
        }
    }

    fn connect_autoresize(&self) {
        let (autoresize, container) = {
            let state = self.inner.state.borrow();
            (state.config.autoresize, state.container.clone())
        };
        let previous = self.inner.state.borrow_mut().resize.take();
        if let Some(previous) = previous {
            previous.disconnect();
        }
        let Some(container) = container else {
            return;
        };
        if !autoresize.enabled {
            return;
        }
        let owner = self.downgrade();
        let coordinator = ResizeCoordinator::attach(
            &self.inner.resize_hub,
            Rc::clone(&self.inner.scheduler),
            &container,
            autoresize,
            Rc::clone(&self.inner.flags.resizing),
            move |opts| {
                if let Some(owner) = owner.upgrade() {
                    owner.resize(Some(opts));
                }
            },
        );
        self.inner.state.borrow_mut().resize = Some(coordinator);
    }
}
