//! Instance lifecycle layer: the `ChartOwner` facade and its coordinators.

mod animation;
mod event_bridge;
mod host;
mod interpolation;
mod option_controller;
mod owner;
mod owner_config;
mod owner_queries;
mod resize_coordinator;
mod theme_switch;
mod validation;

pub use animation::{AnimationConfig, TRANSITION_FRAME_COUNT};
pub use event_bridge::EventBridge;
pub use host::{ChartHost, ChartProps};
pub use interpolation::{SNAP_THRESHOLD, ease_cubic_in_out, interpolate_option, interpolate_value};
pub use option_controller::ApplyOutcome;
pub use owner::{ChartOwner, WeakChartOwner};
pub use owner_config::{AutoresizeConfig, ChartOwnerConfig, DEFAULT_RESIZE_INTERVAL_MS};
pub use resize_coordinator::ResizeCoordinator;
pub use theme_switch::ThemeSwitchPhase;
