pub mod container;
pub mod option;
pub mod types;

pub use container::{ChartContainer, ContainerId};
pub use option::ChartOption;
pub use types::{
    DataUrlOptions, ImageKind, InitOptions, LoadingOptions, RendererKind, ResizeAnimation,
    ResizeOptions, SetOptionOptions, Size, Theme,
};
