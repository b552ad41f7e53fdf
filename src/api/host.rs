use tracing::debug;

use crate::core::{ChartContainer, ChartOption, InitOptions, LoadingOptions, Theme};
use crate::error::ChartResult;

use super::{AutoresizeConfig, ChartOwner};

/// Reactive inputs of a chart component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartProps {
    pub option: Option<ChartOption>,
    pub theme: Option<Theme>,
    pub init_options: InitOptions,
    pub group: Option<String>,
    pub autoresize: AutoresizeConfig,
    pub loading: bool,
    pub loading_options: LoadingOptions,
    /// Suppresses option writes driven by prop changes; the host calls
    /// `ChartOwner::set_option` itself.
    pub manual_update: bool,
}

impl ChartProps {
    #[must_use]
    pub fn with_option(mut self, option: ChartOption) -> Self {
        self.option = Some(option);
        self
    }

    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Explicit lifecycle binding between a host component and a `ChartOwner`.
///
/// The host calls `mount`, `update` and `unmount` from its own lifecycle
/// hooks; `update` diffs the new props against the previous ones and
/// issues only the owner calls the difference requires.
pub struct ChartHost {
    owner: ChartOwner,
    props: ChartProps,
    mounted: bool,
}

impl ChartHost {
    #[must_use]
    pub fn new(owner: ChartOwner) -> Self {
        Self {
            owner,
            props: ChartProps::default(),
            mounted: false,
        }
    }

    #[must_use]
    pub fn owner(&self) -> &ChartOwner {
        &self.owner
    }

    #[must_use]
    pub fn props(&self) -> &ChartProps {
        &self.props
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn mount(&mut self, container: &ChartContainer, props: ChartProps) -> ChartResult<()> {
        self.owner.set_group(props.group.clone());
        self.owner.set_autoresize(props.autoresize)?;
        if props.loading {
            self.owner.show_loading(props.loading_options.clone());
        }
        self.owner.create(
            Some(container),
            props.theme.clone(),
            props.init_options.clone(),
        )?;
        if let Some(option) = props.option.as_ref().filter(|_| !props.manual_update) {
            self.owner.replace_option(option)?;
        }
        self.props = props;
        self.mounted = true;
        debug!(container = container.id().raw(), "chart host mounted");
        Ok(())
    }

    pub fn update(&mut self, props: ChartProps) -> ChartResult<()> {
        if !self.mounted {
            self.props = props;
            return Ok(());
        }
        let previous = std::mem::replace(&mut self.props, props.clone());

        if previous.group != props.group {
            self.owner.set_group(props.group.clone());
        }
        if previous.autoresize != props.autoresize {
            self.owner.set_autoresize(props.autoresize)?;
        }
        if previous.init_options != props.init_options {
            self.reinitialize(&props)?;
        } else if previous.theme != props.theme {
            self.owner.set_theme(props.theme.clone())?;
        }
        if previous.option != props.option && !props.manual_update {
            if let Some(option) = props.option.as_ref() {
                let opts = self.owner.config().update_options;
                self.owner.set_option(option, opts)?;
            }
        }
        if previous.loading != props.loading || previous.loading_options != props.loading_options
        {
            if props.loading {
                self.owner.show_loading(props.loading_options.clone());
            } else {
                self.owner.hide_loading();
            }
        }
        Ok(())
    }

    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.owner.unmount();
        self.mounted = false;
        debug!("chart host unmounted");
    }

    /// Init options are construction-time only: rebuild with the current option.
    fn reinitialize(&mut self, props: &ChartProps) -> ChartResult<()> {
        let container = self.owner.container();
        let current = self.owner.get_option();
        self.owner
            .create(container.as_ref(), props.theme.clone(), props.init_options.clone())?;
        let restore = if props.manual_update {
            current
        } else {
            props.option.clone().or(current)
        };
        if let Some(option) = restore {
            self.owner.replace_option(&option)?;
        }
        Ok(())
    }
}

impl Drop for ChartHost {
    fn drop(&mut self) {
        self.unmount();
    }
}
