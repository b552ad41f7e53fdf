//! chart-host: reactive lifecycle manager for an imperative chart renderer.
//!
//! A declarative, frequently replaced configuration drives one stateful
//! engine instance embedded in a host UI surface. The crate owns that
//! instance across create, update, resize, theme switches and teardown,
//! keeping event subscriptions and size observers in lockstep with it.

pub mod api;
pub mod core;
pub mod error;
pub mod interaction;
pub mod render;
pub mod runtime;
pub mod telemetry;

pub use api::{ApplyOutcome, ChartHost, ChartOwner, ChartOwnerConfig};
pub use error::{ChartError, ChartResult};
