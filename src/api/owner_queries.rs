use serde_json::Value;

use crate::core::{ChartContainer, ChartOption, DataUrlOptions, LoadingOptions, ResizeOptions};

use super::ChartOwner;

// Guarded pass-throughs: each one is a silent no-op returning a neutral
// value when no live instance exists.
impl ChartOwner {
    pub fn resize(&self, opts: Option<ResizeOptions>) {
        if let Some(instance) = self.live_instance() {
            instance.resize(&opts.unwrap_or_default());
        }
    }

    pub fn clear(&self) {
        if let Some(instance) = self.live_instance() {
            instance.clear();
            self.inner.state.borrow_mut().last_applied = None;
        }
    }

    #[must_use]
    pub fn get_option(&self) -> Option<ChartOption> {
        self.live_instance()?.get_option()
    }

    #[must_use]
    pub fn width(&self) -> Option<u32> {
        Some(self.live_instance()?.width())
    }

    #[must_use]
    pub fn height(&self) -> Option<u32> {
        Some(self.live_instance()?.height())
    }

    #[must_use]
    pub fn dom(&self) -> Option<ChartContainer> {
        Some(self.live_instance()?.dom())
    }

    #[must_use]
    pub fn data_url(&self, opts: &DataUrlOptions) -> Option<String> {
        Some(self.live_instance()?.data_url(opts))
    }

    #[must_use]
    pub fn connected_data_url(&self, opts: &DataUrlOptions) -> Option<String> {
        Some(self.live_instance()?.connected_data_url(opts))
    }

    #[must_use]
    pub fn convert_to_pixel(&self, finder: &Value, value: &Value) -> Option<Value> {
        self.live_instance()?.convert_to_pixel(finder, value)
    }

    #[must_use]
    pub fn convert_from_pixel(&self, finder: &Value, value: &Value) -> Option<Value> {
        self.live_instance()?.convert_from_pixel(finder, value)
    }

    #[must_use]
    pub fn contain_pixel(&self, finder: &Value, value: &Value) -> bool {
        self.live_instance()
            .is_some_and(|instance| instance.contain_pixel(finder, value))
    }

    pub fn dispatch_action(&self, action: &Value) {
        if let Some(instance) = self.live_instance() {
            instance.dispatch_action(action);
        }
    }

    /// Shows the loading overlay; it is re-applied to recreated instances
    /// until `hide_loading`.
    pub fn show_loading(&self, opts: LoadingOptions) {
        self.inner.state.borrow_mut().loading = Some(opts.clone());
        if let Some(instance) = self.live_instance() {
            instance.show_loading(&opts);
        }
    }

    pub fn hide_loading(&self) {
        self.inner.state.borrow_mut().loading = None;
        if let Some(instance) = self.live_instance() {
            instance.hide_loading();
        }
    }
}
