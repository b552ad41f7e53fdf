use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{ChartOption, SetOptionOptions, Theme};
use crate::error::ChartResult;

use super::ChartOwner;
use super::owner::fold_pending;

/// Phase of the theme-switch state machine.
///
/// `Stable -> Capturing -> Disposing -> Recreating -> Restoring -> Stable`.
/// `AwaitingContainer` parks the machine between `Disposing` and
/// `Recreating` while the container is detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThemeSwitchPhase {
    #[default]
    Stable,
    Capturing,
    Disposing,
    AwaitingContainer,
    Recreating,
    Restoring,
}

#[derive(Debug, Default)]
pub(super) struct ThemeSwitchState {
    pub(super) phase: ThemeSwitchPhase,
    /// Snapshot restored with a full replace once the new instance exists.
    /// Writes issued mid-switch are coalesced into it.
    pub(super) captured: Option<ChartOption>,
    pub(super) generation: u64,
}

impl ThemeSwitchState {
    pub(super) fn reset(&mut self) {
        self.phase = ThemeSwitchPhase::Stable;
        self.captured = None;
        self.generation += 1;
    }
}

impl ChartOwner {
    #[must_use]
    pub fn theme_switch_phase(&self) -> ThemeSwitchPhase {
        self.inner.state.borrow().theme_switch.phase
    }

    /// Changes the theme. The engine cannot restyle a live instance, so a
    /// live chart is captured, disposed, recreated with `theme` and restored.
    ///
    /// Restoring runs after the next layout flush, never synchronously.
    /// Construction failures propagate; the captured option is then kept
    /// for the next successful `mount`.
    pub fn set_theme(&self, theme: Option<Theme>) -> ChartResult<()> {
        let resuming_restore = {
            let mut state = self.inner.state.borrow_mut();
            if state.config.theme == theme {
                return Ok(());
            }
            state.config.theme = theme;
            state.theme_switch.phase == ThemeSwitchPhase::Restoring
        };
        let Some(instance) = self.live_instance() else {
            debug!("theme updated without a live instance; applied on next creation");
            return Ok(());
        };

        self.enter_phase(ThemeSwitchPhase::Capturing);
        // A restore still queued from a previous switch already holds the
        // authoritative snapshot; the new instance has not received it yet.
        if !resuming_restore {
            let captured = instance.get_option().filter(|option| !option.is_empty());
            self.inner.state.borrow_mut().theme_switch.captured = captured;
        }

        self.enter_phase(ThemeSwitchPhase::Disposing);
        self.teardown_instance(false);

        self.recreate_for_theme()
    }

    pub(super) fn theme_switch_in_flight(&self) -> bool {
        self.theme_switch_phase() != ThemeSwitchPhase::Stable
    }

    pub(super) fn theme_switch_awaiting_container(&self) -> bool {
        self.theme_switch_phase() == ThemeSwitchPhase::AwaitingContainer
    }

    /// Continues a switch parked in `AwaitingContainer`; called from `mount`.
    pub(super) fn resume_theme_switch(&self) -> ChartResult<()> {
        self.recreate_for_theme()
    }

    fn recreate_for_theme(&self) -> ChartResult<()> {
        let attached = self
            .inner
            .state
            .borrow()
            .container
            .as_ref()
            .is_some_and(|container| container.is_attached());
        if !attached {
            self.enter_phase(ThemeSwitchPhase::AwaitingContainer);
            return Ok(());
        }

        self.enter_phase(ThemeSwitchPhase::Recreating);
        match self.create_instance() {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.enter_phase(ThemeSwitchPhase::AwaitingContainer);
                return Ok(());
            }
            Err(err) => {
                let mut state = self.inner.state.borrow_mut();
                let captured = state.theme_switch.captured.take();
                state.theme_switch.reset();
                let pending = state.pending_option.take();
                state.pending_option = fold_pending(captured, pending);
                return Err(err);
            }
        }

        let generation = {
            let mut state = self.inner.state.borrow_mut();
            if state.theme_switch.captured.is_none() {
                state.theme_switch.phase = ThemeSwitchPhase::Stable;
                None
            } else {
                state.theme_switch.phase = ThemeSwitchPhase::Restoring;
                state.theme_switch.generation += 1;
                Some(state.theme_switch.generation)
            }
        };
        let Some(generation) = generation else {
            debug!("theme switch complete; nothing to restore");
            return Ok(());
        };
        debug!(phase = ?ThemeSwitchPhase::Restoring, "theme switch phase");

        let owner = self.downgrade();
        self.inner.scheduler.after_layout_flush(Box::new(move || {
            if let Some(owner) = owner.upgrade() {
                owner.restore_after_theme_switch(generation);
            }
        }));
        Ok(())
    }

    fn restore_after_theme_switch(&self, generation: u64) {
        let captured = {
            let mut state = self.inner.state.borrow_mut();
            let switch = &mut state.theme_switch;
            if switch.phase != ThemeSwitchPhase::Restoring || switch.generation != generation {
                return;
            }
            switch.phase = ThemeSwitchPhase::Stable;
            switch.captured.take()
        };
        let Some(captured) = captured else {
            return;
        };
        let Some(instance) = self.live_instance() else {
            let mut state = self.inner.state.borrow_mut();
            let pending = state.pending_option.take();
            state.pending_option = fold_pending(Some(captured), pending);
            debug!("no live instance to restore; configuration kept for next mount");
            return;
        };
        let outcome = self.apply_option(&instance, &captured, SetOptionOptions::replace());
        if outcome.is_applied() {
            debug!("theme switch complete; configuration restored");
        } else {
            warn!(?outcome, "theme switch restore was not applied");
        }
    }

    fn enter_phase(&self, phase: ThemeSwitchPhase) {
        self.inner.state.borrow_mut().theme_switch.phase = phase;
        debug!(?phase, "theme switch phase");
    }
}
