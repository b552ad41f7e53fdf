use crate::error::{ChartError, ChartResult};

use super::{AnimationConfig, AutoresizeConfig, ChartOwnerConfig};

pub(super) fn validate_owner_config(config: &ChartOwnerConfig) -> ChartResult<()> {
    validate_autoresize_config(config.autoresize)?;
    validate_animation_config(&config.animation)?;

    if config.group.as_deref().is_some_and(str::is_empty) {
        return Err(ChartError::InvalidConfig(
            "group tag must not be empty".to_owned(),
        ));
    }
    if let Some(ratio) = config.init_options.device_pixel_ratio {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ChartError::InvalidConfig(
                "device pixel ratio must be finite and > 0".to_owned(),
            ));
        }
    }
    Ok(())
}

pub(super) fn validate_autoresize_config(config: AutoresizeConfig) -> ChartResult<()> {
    if config.enabled && config.interval_ms == 0 {
        return Err(ChartError::InvalidConfig(
            "autoresize interval must be > 0 ms".to_owned(),
        ));
    }
    Ok(())
}

pub(super) fn validate_animation_config(config: &AnimationConfig) -> ChartResult<()> {
    if config.easing.is_empty() || config.easing_update.is_empty() {
        return Err(ChartError::InvalidConfig(
            "animation easing identifiers must not be empty".to_owned(),
        ));
    }
    Ok(())
}
