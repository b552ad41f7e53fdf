use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::core::{
    ChartContainer, ChartOption, DataUrlOptions, ImageKind, InitOptions, LoadingOptions,
    ResizeOptions, SetOptionOptions, Theme,
};
use crate::error::{ChartError, ChartResult};
use crate::interaction::{ChartEvent, EventHandler, EventPayload};

use super::{InstanceHandle, RenderEngine, RenderInstance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Every call that reached the engine, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Init {
        instance: InstanceId,
        theme: Option<Theme>,
        options: InitOptions,
    },
    SetOption {
        instance: InstanceId,
        option: ChartOption,
        opts: SetOptionOptions,
    },
    Resize {
        instance: InstanceId,
        opts: ResizeOptions,
    },
    Clear {
        instance: InstanceId,
    },
    Dispose {
        instance: InstanceId,
    },
    Query {
        instance: InstanceId,
        name: &'static str,
    },
    DispatchAction {
        instance: InstanceId,
        action: Value,
    },
    On {
        instance: InstanceId,
        event: ChartEvent,
    },
    Off {
        instance: InstanceId,
        event: ChartEvent,
    },
    SetGroup {
        instance: InstanceId,
        group: Option<String>,
    },
    ShowLoading {
        instance: InstanceId,
    },
    HideLoading {
        instance: InstanceId,
    },
    Connect(String),
    Disconnect(String),
}

impl EngineCall {
    #[must_use]
    pub fn instance(&self) -> Option<InstanceId> {
        match self {
            Self::Init { instance, .. }
            | Self::SetOption { instance, .. }
            | Self::Resize { instance, .. }
            | Self::Clear { instance }
            | Self::Dispose { instance }
            | Self::Query { instance, .. }
            | Self::DispatchAction { instance, .. }
            | Self::On { instance, .. }
            | Self::Off { instance, .. }
            | Self::SetGroup { instance, .. }
            | Self::ShowLoading { instance }
            | Self::HideLoading { instance } => Some(*instance),
            Self::Connect(_) | Self::Disconnect(_) => None,
        }
    }
}

#[derive(Default)]
struct EngineShared {
    calls: RefCell<Vec<EngineCall>>,
    reject_next_option: RefCell<Option<String>>,
}

impl EngineShared {
    fn record(&self, call: EngineCall) {
        trace!(?call, "memory engine call");
        self.calls.borrow_mut().push(call);
    }
}

/// Headless engine that keeps real merge semantics in memory.
///
/// Used by tests and by hosts that need the lifecycle layer without a
/// drawing backend. Every call is recorded in `calls()`; faults can be
/// injected with `fail_next_init` and `reject_next_option`.
#[derive(Default)]
pub struct MemoryEngine {
    shared: Rc<EngineShared>,
    next_id: Cell<u64>,
    instances: RefCell<Vec<Rc<MemoryInstance>>>,
    themes: RefCell<IndexMap<String, Value>>,
    maps: RefCell<IndexMap<String, Value>>,
    connected_groups: RefCell<Vec<String>>,
    fail_next_init: RefCell<Option<String>>,
}

impl MemoryEngine {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        self.shared.calls.borrow().clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.shared.calls.borrow().len()
    }

    #[must_use]
    pub fn resize_calls(&self) -> Vec<ResizeOptions> {
        self.shared
            .calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Resize { opts, .. } => Some(opts.clone()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn set_option_calls(&self) -> Vec<(ChartOption, SetOptionOptions)> {
        self.shared
            .calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                EngineCall::SetOption { option, opts, .. } => Some((option.clone(), *opts)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.shared.calls.borrow_mut().clear();
    }

    #[must_use]
    pub fn instances(&self) -> Vec<Rc<MemoryInstance>> {
        self.instances.borrow().clone()
    }

    #[must_use]
    pub fn last_instance(&self) -> Option<Rc<MemoryInstance>> {
        self.instances.borrow().last().cloned()
    }

    #[must_use]
    pub fn live_instance_count(&self) -> usize {
        self.instances
            .borrow()
            .iter()
            .filter(|instance| !instance.is_disposed())
            .count()
    }

    #[must_use]
    pub fn connected_groups(&self) -> Vec<String> {
        self.connected_groups.borrow().clone()
    }

    #[must_use]
    pub fn registered_theme(&self, name: &str) -> Option<Value> {
        self.themes.borrow().get(name).cloned()
    }

    #[must_use]
    pub fn registered_map(&self, name: &str) -> Option<Value> {
        self.maps.borrow().get(name).cloned()
    }

    /// Makes the next `init` call fail with `reason`.
    pub fn fail_next_init(&self, reason: impl Into<String>) {
        *self.fail_next_init.borrow_mut() = Some(reason.into());
    }

    /// Makes the next `set_option` call on any instance fail with `reason`.
    pub fn reject_next_option(&self, reason: impl Into<String>) {
        *self.shared.reject_next_option.borrow_mut() = Some(reason.into());
    }
}

impl RenderEngine for MemoryEngine {
    fn init(
        &self,
        container: &ChartContainer,
        theme: Option<&Theme>,
        options: &InitOptions,
    ) -> ChartResult<InstanceHandle> {
        if let Some(reason) = self.fail_next_init.borrow_mut().take() {
            return Err(ChartError::InstanceCreation(reason));
        }
        if let Some(Theme::Named(name)) = theme {
            if !is_builtin_theme(name) && !self.themes.borrow().contains_key(name) {
                trace!(theme = %name, "unknown theme name, falling back to default");
            }
        }

        let id = InstanceId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        let instance = Rc::new(MemoryInstance {
            id,
            shared: Rc::clone(&self.shared),
            container: container.clone(),
            theme: theme.cloned(),
            state: RefCell::new(InstanceState {
                width: options.width,
                height: options.height,
                ..InstanceState::default()
            }),
        });
        self.shared.record(EngineCall::Init {
            instance: id,
            theme: theme.cloned(),
            options: options.clone(),
        });
        self.instances.borrow_mut().push(Rc::clone(&instance));
        Ok(instance)
    }

    fn connect(&self, group: &str) {
        self.shared.record(EngineCall::Connect(group.to_owned()));
        let mut groups = self.connected_groups.borrow_mut();
        if !groups.iter().any(|existing| existing == group) {
            groups.push(group.to_owned());
        }
    }

    fn disconnect(&self, group: &str) {
        self.shared.record(EngineCall::Disconnect(group.to_owned()));
        self.connected_groups
            .borrow_mut()
            .retain(|existing| existing != group);
    }

    fn register_theme(&self, name: &str, theme: Value) {
        self.themes.borrow_mut().insert(name.to_owned(), theme);
    }

    fn register_map(&self, name: &str, geo_data: Value) {
        self.maps.borrow_mut().insert(name.to_owned(), geo_data);
    }
}

fn is_builtin_theme(name: &str) -> bool {
    matches!(name, "default" | "light" | "dark")
}

#[derive(Default)]
struct InstanceState {
    option: Option<ChartOption>,
    disposed: bool,
    width: Option<u32>,
    height: Option<u32>,
    group: Option<String>,
    loading: bool,
    handlers: IndexMap<ChartEvent, Vec<EventHandler>>,
}

pub struct MemoryInstance {
    id: InstanceId,
    shared: Rc<EngineShared>,
    container: ChartContainer,
    theme: Option<Theme>,
    state: RefCell<InstanceState>,
}

impl MemoryInstance {
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    #[must_use]
    pub fn theme(&self) -> Option<&Theme> {
        self.theme.as_ref()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    #[must_use]
    pub fn handler_count(&self, event: &ChartEvent) -> usize {
        self.state
            .borrow()
            .handlers
            .get(event)
            .map_or(0, Vec::len)
    }

    #[must_use]
    pub fn total_handler_count(&self) -> usize {
        self.state.borrow().handlers.values().map(Vec::len).sum()
    }

    /// Simulates the engine firing `event`, as a user interaction would.
    pub fn trigger(&self, event: &ChartEvent, payload: &EventPayload) {
        let snapshot = {
            let state = self.state.borrow();
            if state.disposed {
                return;
            }
            state.handlers.get(event).cloned().unwrap_or_default()
        };
        for handler in snapshot {
            handler.call(payload);
        }
    }

    fn record(&self, call: EngineCall) {
        self.shared.record(call);
    }

    fn query(&self, name: &'static str) {
        self.record(EngineCall::Query {
            instance: self.id,
            name,
        });
    }
}

fn validate_structure(option: &ChartOption) -> ChartResult<()> {
    match option.get("series") {
        None | Some(Value::Object(_)) => Ok(()),
        Some(Value::Array(items)) => {
            if items.iter().all(|item| item.is_object()) {
                Ok(())
            } else {
                Err(ChartError::OptionRejected(
                    "every series entry must be an object".to_owned(),
                ))
            }
        }
        Some(_) => Err(ChartError::OptionRejected(
            "series must be an object or an array of objects".to_owned(),
        )),
    }
}

fn pair(value: &Value) -> Option<(f64, f64)> {
    let items = value.as_array()?;
    match items.as_slice() {
        [x, y] => Some((x.as_f64()?, y.as_f64()?)),
        _ => None,
    }
}

impl RenderInstance for MemoryInstance {
    fn set_option(&self, option: &ChartOption, opts: SetOptionOptions) -> ChartResult<()> {
        self.record(EngineCall::SetOption {
            instance: self.id,
            option: option.clone(),
            opts,
        });
        if let Some(reason) = self.shared.reject_next_option.borrow_mut().take() {
            return Err(ChartError::OptionRejected(reason));
        }
        validate_structure(option)?;

        let mut state = self.state.borrow_mut();
        let next = match (&state.option, opts.merge) {
            (Some(current), true) => current.merged_with(option),
            _ => option.clone(),
        };
        state.option = Some(next);
        Ok(())
    }

    fn get_option(&self) -> Option<ChartOption> {
        self.query("get_option");
        self.state.borrow().option.clone()
    }

    fn resize(&self, opts: &ResizeOptions) {
        self.record(EngineCall::Resize {
            instance: self.id,
            opts: opts.clone(),
        });
        let mut state = self.state.borrow_mut();
        if opts.width.is_some() {
            state.width = opts.width;
        }
        if opts.height.is_some() {
            state.height = opts.height;
        }
    }

    fn clear(&self) {
        self.record(EngineCall::Clear { instance: self.id });
        self.state.borrow_mut().option = None;
    }

    fn dispose(&self) {
        let mut state = self.state.borrow_mut();
        if state.disposed {
            return;
        }
        self.shared.record(EngineCall::Dispose { instance: self.id });
        state.disposed = true;
        state.handlers.clear();
        state.option = None;
    }

    fn is_disposed(&self) -> bool {
        self.state.borrow().disposed
    }

    fn width(&self) -> u32 {
        self.query("width");
        self.state
            .borrow()
            .width
            .unwrap_or_else(|| self.container.size().width)
    }

    fn height(&self) -> u32 {
        self.query("height");
        self.state
            .borrow()
            .height
            .unwrap_or_else(|| self.container.size().height)
    }

    fn dom(&self) -> ChartContainer {
        self.query("dom");
        self.container.clone()
    }

    fn data_url(&self, opts: &DataUrlOptions) -> String {
        self.query("data_url");
        let mime = match opts.kind {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Svg => "image/svg+xml",
        };
        format!("data:{mime};base64,memory-{}", self.id.0)
    }

    fn connected_data_url(&self, opts: &DataUrlOptions) -> String {
        self.query("connected_data_url");
        let group = self.state.borrow().group.clone().unwrap_or_default();
        format!("{}#group={group}", self.data_url(opts))
    }

    fn convert_to_pixel(&self, _finder: &Value, value: &Value) -> Option<Value> {
        self.query("convert_to_pixel");
        pair(value).map(|(x, y)| Value::from(vec![x, y]))
    }

    fn convert_from_pixel(&self, _finder: &Value, value: &Value) -> Option<Value> {
        self.query("convert_from_pixel");
        pair(value).map(|(x, y)| Value::from(vec![x, y]))
    }

    fn contain_pixel(&self, _finder: &Value, value: &Value) -> bool {
        self.query("contain_pixel");
        let Some((x, y)) = pair(value) else {
            return false;
        };
        let size = self.container.size();
        x >= 0.0 && y >= 0.0 && x <= f64::from(size.width) && y <= f64::from(size.height)
    }

    fn dispatch_action(&self, action: &Value) {
        self.record(EngineCall::DispatchAction {
            instance: self.id,
            action: action.clone(),
        });
    }

    fn on(&self, event: &ChartEvent, handler: EventHandler) {
        self.record(EngineCall::On {
            instance: self.id,
            event: event.clone(),
        });
        self.state
            .borrow_mut()
            .handlers
            .entry(event.clone())
            .or_default()
            .push(handler);
    }

    fn off(&self, event: &ChartEvent, handler: Option<&EventHandler>) {
        self.record(EngineCall::Off {
            instance: self.id,
            event: event.clone(),
        });
        let mut state = self.state.borrow_mut();
        match handler {
            Some(handler) => {
                if let Some(handlers) = state.handlers.get_mut(event) {
                    handlers.retain(|existing| !existing.ptr_eq(handler));
                }
            }
            None => {
                state.handlers.shift_remove(event);
            }
        }
    }

    fn group(&self) -> Option<String> {
        self.query("group");
        self.state.borrow().group.clone()
    }

    fn set_group(&self, group: Option<String>) {
        self.record(EngineCall::SetGroup {
            instance: self.id,
            group: group.clone(),
        });
        self.state.borrow_mut().group = group;
    }

    fn show_loading(&self, _opts: &LoadingOptions) {
        self.record(EngineCall::ShowLoading { instance: self.id });
        self.state.borrow_mut().loading = true;
    }

    fn hide_loading(&self) {
        self.record(EngineCall::HideLoading { instance: self.id });
        self.state.borrow_mut().loading = false;
    }
}
