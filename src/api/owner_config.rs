use serde::{Deserialize, Serialize};

use crate::core::{InitOptions, SetOptionOptions, Theme};
use crate::error::{ChartError, ChartResult};
use crate::runtime::RateLimitMode;

use super::AnimationConfig;
use super::validation::validate_owner_config;

pub const DEFAULT_RESIZE_INTERVAL_MS: u64 = 100;

/// Automatic resize behavior driven by box-size observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoresizeConfig {
    pub enabled: bool,
    pub mode: RateLimitMode,
    pub interval_ms: u64,
    /// Also observe the container's parent element.
    pub observe_parent: bool,
}

impl AutoresizeConfig {
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn throttled(interval_ms: u64) -> Self {
        Self {
            mode: RateLimitMode::Throttle,
            interval_ms,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn debounced(interval_ms: u64) -> Self {
        Self {
            mode: RateLimitMode::Debounce,
            interval_ms,
            ..Self::default()
        }
    }
}

impl Default for AutoresizeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: RateLimitMode::Debounce,
            interval_ms: DEFAULT_RESIZE_INTERVAL_MS,
            observe_parent: false,
        }
    }
}

/// Owner bootstrap configuration.
///
/// Serializable so hosts can persist chart setup next to their own state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOwnerConfig {
    pub theme: Option<Theme>,
    pub init_options: InitOptions,
    pub group: Option<String>,
    pub autoresize: AutoresizeConfig,
    pub animation: AnimationConfig,
    /// Write semantics used by the host binding for reactive option updates.
    pub update_options: SetOptionOptions,
}

impl ChartOwnerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    #[must_use]
    pub fn with_init_options(mut self, init_options: InitOptions) -> Self {
        self.init_options = init_options;
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn with_autoresize(mut self, autoresize: AutoresizeConfig) -> Self {
        self.autoresize = autoresize;
        self
    }

    #[must_use]
    pub fn with_animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }

    #[must_use]
    pub fn with_update_options(mut self, update_options: SetOptionOptions) -> Self {
        self.update_options = update_options;
        self
    }

    pub fn validate(&self) -> ChartResult<()> {
        validate_owner_config(self)
    }

    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| ChartError::InvalidConfig(format!("failed to parse owner config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            ChartError::InvalidConfig(format!("failed to serialize owner config: {e}"))
        })
    }
}
