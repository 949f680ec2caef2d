//! Brightness animation
//!
//! The engine ticks at a fixed rate and moves the light along the most
//! recently published [`AnimationTarget`]. Targets are replaced, never
//! queued.

use std::sync::Arc;
use std::time::Duration;

use kbd_light::{Light, MAX_PERCENT};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::DaemonError;

/// Where the brightness should go, and since when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationTarget {
    pub started_at: Instant,
    pub from: u8,
    pub to: u8,
}

impl AnimationTarget {
    pub fn new(started_at: Instant, from: u8, to: u8) -> Self {
        Self {
            started_at,
            from: from.min(MAX_PERCENT),
            to: to.min(MAX_PERCENT),
        }
    }

    /// Interpolated brightness at `now` for an animation lasting `duration`.
    ///
    /// Progress is capped at 1.0, so the result never passes `to`. The
    /// interpolated value is truncated toward zero, then clamped to 0..=100.
    pub fn value_at(&self, now: Instant, duration: Duration) -> u8 {
        let elapsed = now.saturating_duration_since(self.started_at);
        let progress = if duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / duration.as_secs_f64()).min(1.0)
        };

        let from = f64::from(self.from);
        let to = f64::from(self.to);
        let value = (from + (to - from) * progress).trunc();
        value.clamp(0.0, f64::from(MAX_PERCENT)) as u8
    }
}

pub struct AnimationEngine {
    light: Arc<dyn Light>,
    dim_duration: Duration,
    restore_duration: Duration,
    last_applied: u8,
}

impl AnimationEngine {
    /// `initial` is the brightness the light currently shows.
    pub fn new(
        light: Arc<dyn Light>,
        initial: u8,
        dim_duration: Duration,
        restore_duration: Duration,
    ) -> Self {
        Self {
            light,
            dim_duration,
            restore_duration,
            last_applied: initial.min(MAX_PERCENT),
        }
    }

    /// Last brightness successfully written by the engine
    pub fn last_applied(&self) -> u8 {
        self.last_applied
    }

    /// Advance one frame. Returns the value written, if any.
    ///
    /// A failed write is logged and retried on the next tick.
    pub fn tick(&mut self, target: Option<&AnimationTarget>, now: Instant) -> Option<u8> {
        let target = target?;
        if target.to == self.last_applied {
            return None;
        }

        let duration = if target.to < self.last_applied {
            self.dim_duration
        } else {
            self.restore_duration
        };

        let value = target.value_at(now, duration);
        if value == self.last_applied {
            return None;
        }

        match self.light.set_brightness(value) {
            Ok(()) => {
                debug!(
                    "Setting brightness from {} to {} -> {}",
                    self.last_applied, value, target.to
                );
                self.last_applied = value;
                Some(value)
            }
            Err(e) => {
                warn!("Failed to set brightness to {}: {}", value, e);
                None
            }
        }
    }

    /// Tick every `interval` until cancelled.
    pub async fn run(
        mut self,
        targets: watch::Receiver<Option<AnimationTarget>>,
        interval: Duration,
        token: CancellationToken,
    ) -> Result<(), DaemonError> {
        let mut frames = tokio::time::interval(interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                now = frames.tick() => {
                    let target = *targets.borrow();
                    self.tick(target.as_ref(), now);
                }
            }
        }
        Ok(())
    }
}
