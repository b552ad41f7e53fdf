//! Contract of the external rendering engine.
//!
//! Rendering, layout and hit-testing live entirely behind these traits.
//! The lifecycle layer only drives construction, configuration writes,
//! resizing, queries and teardown of a single live handle.

mod memory_engine;

pub use memory_engine::{EngineCall, InstanceId, MemoryEngine, MemoryInstance};

use std::rc::Rc;

use serde_json::Value;

use crate::core::{
    ChartContainer, ChartOption, DataUrlOptions, InitOptions, LoadingOptions, ResizeOptions,
    SetOptionOptions, Theme,
};
use crate::error::ChartResult;
use crate::interaction::{ChartEvent, EventHandler};

/// Shared handle to a live engine instance.
pub type InstanceHandle = Rc<dyn RenderInstance>;

/// Module-level engine entry points.
pub trait RenderEngine {
    /// Constructs a new instance bound to `container`.
    fn init(
        &self,
        container: &ChartContainer,
        theme: Option<&Theme>,
        options: &InitOptions,
    ) -> ChartResult<InstanceHandle>;

    /// Links every instance tagged with `group` for synchronized pan/zoom.
    fn connect(&self, group: &str);

    fn disconnect(&self, group: &str);

    fn register_theme(&self, name: &str, theme: Value);

    fn register_map(&self, name: &str, geo_data: Value);
}

/// Stateful renderer handle.
///
/// Methods take `&self`: the handle is shared between the owner and the
/// engine's own event dispatch, so implementations use interior mutability.
pub trait RenderInstance {
    /// Applies `option`. Implementations must either apply it fully or leave
    /// the previous state untouched and return `ChartError::OptionRejected`.
    fn set_option(&self, option: &ChartOption, opts: SetOptionOptions) -> ChartResult<()>;
    fn get_option(&self) -> Option<ChartOption>;
    fn resize(&self, opts: &ResizeOptions);
    fn clear(&self);
    fn dispose(&self);
    fn is_disposed(&self) -> bool;

    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn dom(&self) -> ChartContainer;
    fn data_url(&self, opts: &DataUrlOptions) -> String;
    fn connected_data_url(&self, opts: &DataUrlOptions) -> String;

    fn convert_to_pixel(&self, finder: &Value, value: &Value) -> Option<Value>;
    fn convert_from_pixel(&self, finder: &Value, value: &Value) -> Option<Value>;
    fn contain_pixel(&self, finder: &Value, value: &Value) -> bool;
    fn dispatch_action(&self, action: &Value);

    fn on(&self, event: &ChartEvent, handler: EventHandler);
    /// Removes `handler`, or every handler for `event` when `None`.
    fn off(&self, event: &ChartEvent, handler: Option<&EventHandler>);

    fn group(&self) -> Option<String>;
    fn set_group(&self, group: Option<String>);

    fn show_loading(&self, opts: &LoadingOptions);
    fn hide_loading(&self);
}
