use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::core::{ChartOption, SetOptionOptions};
use crate::error::ChartResult;

use super::interpolation::{ease_cubic_in_out, interpolate_option};
use super::{ApplyOutcome, ChartOwner};

/// Frames stepped by a custom transition, regardless of its duration.
pub const TRANSITION_FRAME_COUNT: u32 = 60;

/// Timing parameters attached to configuration updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub enabled: bool,
    pub duration_ms: u32,
    pub easing: String,
    pub delay_ms: u32,
    pub duration_update_ms: u32,
    pub easing_update: String,
    pub delay_update_ms: u32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: 1000,
            easing: "cubicOut".to_owned(),
            delay_ms: 0,
            duration_update_ms: 300,
            easing_update: "cubicInOut".to_owned(),
            delay_update_ms: 0,
        }
    }
}

impl AnimationConfig {
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Returns `option` with the timing fields added next to the caller's
    /// own. Fields the caller already set are left alone.
    #[must_use]
    pub fn decorate(&self, option: &ChartOption) -> ChartOption {
        let fields = [
            ("animation", Value::from(self.enabled)),
            ("animationDuration", Value::from(self.duration_ms)),
            ("animationEasing", Value::from(self.easing.as_str())),
            ("animationDelay", Value::from(self.delay_ms)),
            ("animationDurationUpdate", Value::from(self.duration_update_ms)),
            ("animationEasingUpdate", Value::from(self.easing_update.as_str())),
            ("animationDelayUpdate", Value::from(self.delay_update_ms)),
        ];
        fields
            .into_iter()
            .fold(option.clone(), |decorated, (key, value)| {
                if decorated.get(key).is_some() {
                    decorated
                } else {
                    decorated.with_field(key, value)
                }
            })
    }

    /// How long the engine animates an update written with these settings.
    #[must_use]
    pub fn update_span(&self) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }
        Duration::from_millis(u64::from(self.delay_update_ms) + u64::from(self.duration_update_ms))
    }
}

impl ChartOwner {
    /// `set_option` with the owner's animation settings attached.
    pub fn set_option_animated(
        &self,
        option: &ChartOption,
        opts: SetOptionOptions,
    ) -> ChartResult<ApplyOutcome> {
        let animation = self.inner.state.borrow().config.animation.clone();
        let outcome = self.set_option(&animation.decorate(option), opts)?;
        let span = animation.update_span();
        if outcome.is_applied() && !span.is_zero() {
            let generation = self.begin_animation();
            let owner = self.downgrade();
            self.inner.scheduler.set_timeout(
                span,
                Box::new(move || {
                    if let Some(owner) = owner.upgrade() {
                        owner.end_animation(generation);
                    }
                }),
            );
        }
        Ok(outcome)
    }

    /// Runs a frame-stepped transition from `from` to `to` over `total`.
    ///
    /// Every frame is a full-replace write of the eased interpolation; the
    /// last frame writes `to` exactly. Frames stop quietly once the instance
    /// is gone, the owner is disposed or a newer animation starts.
    pub fn animate_transition(&self, from: &ChartOption, to: &ChartOption, total: Duration) {
        let generation = self.begin_animation();
        debug!(
            frames = TRANSITION_FRAME_COUNT,
            total_ms = total.as_millis(),
            "transition started"
        );
        let frame = TransitionFrame {
            from: from.clone(),
            to: to.clone(),
            interval: total / TRANSITION_FRAME_COUNT,
            generation,
        };
        frame.schedule(self, 1);
    }

    fn begin_animation(&self) -> u64 {
        let generation = {
            let mut state = self.inner.state.borrow_mut();
            state.animation_generation += 1;
            state.animation_generation
        };
        self.inner.flags.animating.set(true);
        generation
    }

    fn end_animation(&self, generation: u64) {
        if self.inner.state.borrow().animation_generation == generation {
            self.inner.flags.animating.set(false);
        }
    }
}

struct TransitionFrame {
    from: ChartOption,
    to: ChartOption,
    interval: Duration,
    generation: u64,
}

impl TransitionFrame {
    fn schedule(self, owner: &ChartOwner, index: u32) {
        let weak = owner.downgrade();
        owner.inner.scheduler.set_timeout(
            self.interval,
            Box::new(move || {
                if let Some(owner) = weak.upgrade() {
                    self.step(&owner, index);
                }
            }),
        );
    }

    fn step(self, owner: &ChartOwner, index: u32) {
        if owner.inner.state.borrow().animation_generation != self.generation {
            return;
        }
        let Some(instance) = owner.live_instance() else {
            trace!(frame = index, "transition aborted; no live instance");
            owner.end_animation(self.generation);
            return;
        };

        let last = index >= TRANSITION_FRAME_COUNT;
        let frame = if last {
            self.to.clone()
        } else {
            let t = f64::from(index) / f64::from(TRANSITION_FRAME_COUNT);
            interpolate_option(&self.from, &self.to, ease_cubic_in_out(t))
        };
        trace!(frame = index, "transition frame");
        owner.apply_option(&instance, &frame, SetOptionOptions::replace());

        if last {
            owner.end_animation(self.generation);
            debug!("transition finished");
        } else {
            self.schedule(owner, index + 1);
        }
    }
}
