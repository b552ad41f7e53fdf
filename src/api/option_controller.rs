use tracing::{debug, warn};

use crate::core::{ChartOption, SetOptionOptions};
use crate::error::{ChartError, ChartResult};
use crate::render::InstanceHandle;

use super::ChartOwner;

/// Result of a configuration write.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The live instance accepted the option.
    Applied,
    /// No live instance could take the write yet; it is kept and applied
    /// on creation or at the end of a theme switch.
    Deferred,
    /// The engine refused the option; the previous state is retained.
    Rejected(ChartError),
}

impl ApplyOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

fn coalesce(slot: &mut Option<ChartOption>, option: &ChartOption, opts: SetOptionOptions) {
    let next = match slot.take() {
        Some(current) if opts.merge => current.merged_with(option),
        _ => option.clone(),
    };
    *slot = Some(next);
}

impl ChartOwner {
    /// Writes `option` to the live instance.
    ///
    /// Creates the instance first when a container is bound but nothing is
    /// live; creation errors propagate. Engine rejections are logged and
    /// reported as `ApplyOutcome::Rejected` without touching the last good
    /// state.
    pub fn set_option(
        &self,
        option: &ChartOption,
        opts: SetOptionOptions,
    ) -> ChartResult<ApplyOutcome> {
        if self.theme_switch_in_flight() {
            let mut state = self.inner.state.borrow_mut();
            coalesce(&mut state.theme_switch.captured, option, opts);
            debug!("theme switch in flight; option coalesced into restore snapshot");
            return Ok(ApplyOutcome::Deferred);
        }

        let instance = match self.live_instance() {
            Some(instance) => instance,
            None => {
                let has_container = self.inner.state.borrow().container.is_some();
                if !has_container {
                    let mut state = self.inner.state.borrow_mut();
                    coalesce(&mut state.pending_option, option, opts);
                    debug!("no container available; option kept for first mount");
                    return Ok(ApplyOutcome::Deferred);
                }
                match self.create_instance()? {
                    Some(instance) => instance,
                    None => return Ok(ApplyOutcome::Deferred),
                }
            }
        };
        Ok(self.apply_option(&instance, option, opts))
    }

    /// Full-replace write (`merge = false`).
    pub fn replace_option(&self, option: &ChartOption) -> ChartResult<ApplyOutcome> {
        self.set_option(option, SetOptionOptions::replace())
    }

    pub(super) fn apply_option(
        &self,
        instance: &InstanceHandle,
        option: &ChartOption,
        opts: SetOptionOptions,
    ) -> ApplyOutcome {
        match instance.set_option(option, opts) {
            Ok(()) => {
                let mut state = self.inner.state.borrow_mut();
                coalesce(&mut state.last_applied, option, opts);
                ApplyOutcome::Applied
            }
            Err(err) => {
                warn!(error = %err, "chart option rejected; keeping last applied state");
                self.roll_back(instance);
                ApplyOutcome::Rejected(err)
            }
        }
    }

    /// Re-applies the last accepted state if the engine kept part of a rejected write.
    fn roll_back(&self, instance: &InstanceHandle) {
        let previous = self.inner.state.borrow().last_applied.clone();
        let current = instance.get_option();
        if current == previous {
            return;
        }
        let restored = match &previous {
            Some(previous) => instance.set_option(previous, SetOptionOptions::replace()),
            None => {
                instance.clear();
                Ok(())
            }
        };
        if let Err(err) = restored {
            warn!(error = %err, "failed to restore last applied option");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn coalesce_merges_or_replaces() {
        let first = ChartOption::from_value(json!({ "title": { "text": "A" } })).expect("object");
        let second =
            ChartOption::from_value(json!({ "legend": { "show": true } })).expect("object");

        let mut slot = None;
        coalesce(&mut slot, &first, SetOptionOptions::merge());
        coalesce(&mut slot, &second, SetOptionOptions::merge());
        let merged = slot.clone().expect("merged");
        assert_eq!(merged.pointer("/title/text"), Some(&json!("A")));
        assert_eq!(merged.pointer("/legend/show"), Some(&json!(true)));

        coalesce(&mut slot, &second, SetOptionOptions::replace());
        assert_eq!(slot, Some(second));
    }
}
