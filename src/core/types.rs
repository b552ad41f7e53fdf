use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Committed box size of a container, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Visual theme fixed at instance construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Theme {
    Named(String),
    Inline(Value),
}

impl Theme {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Inline(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    #[default]
    Canvas,
    Svg,
}

/// Construction-time options forwarded to the engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitOptions {
    pub renderer: RendererKind,
    pub locale: Option<String>,
    pub device_pixel_ratio: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub use_dirty_rect: bool,
}

impl InitOptions {
    #[must_use]
    pub fn with_renderer(mut self, renderer: RendererKind) -> Self {
        self.renderer = renderer;
        self
    }

    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

/// Write semantics for `set_option`.
///
/// `merge = false` is the engine's `notMerge` full replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetOptionOptions {
    pub merge: bool,
    pub lazy: bool,
    pub silent: bool,
}

impl SetOptionOptions {
    #[must_use]
    pub fn merge() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn replace() -> Self {
        Self {
            merge: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn not_merge(self) -> bool {
        !self.merge
    }
}

impl Default for SetOptionOptions {
    fn default() -> Self {
        Self {
            merge: true,
            lazy: false,
            silent: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeAnimation {
    pub duration_ms: u32,
    pub easing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub silent: bool,
    pub animation: Option<ResizeAnimation>,
}

impl ResizeOptions {
    #[must_use]
    pub fn explicit(size: Size) -> Self {
        Self {
            width: Some(size.width),
            height: Some(size.height),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    #[default]
    Png,
    Jpeg,
    Svg,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataUrlOptions {
    pub kind: ImageKind,
    pub pixel_ratio: Option<f64>,
    pub background_color: Option<String>,
    pub excluded_components: Vec<String>,
}

/// Loading overlay parameters; `extra` carries engine-specific fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingOptions {
    pub text: Option<String>,
    pub color: Option<String>,
    pub extra: Option<Value>,
}
