//! Control loop: the single owner of idle state, baseline and animation target

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use kbd_light::Light;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::animation::AnimationTarget;
use super::IdleState;
use crate::error::DaemonError;

/// The brightness to come back to after idling and at shutdown.
///
/// Only ever holds values read back from the light, never animated
/// intermediates. Written by the control loop alone; the shutdown restore
/// reads it after the loop has stopped.
#[derive(Debug, Clone)]
pub struct Baseline(Arc<AtomicU8>);

impl Baseline {
    pub fn new(percent: u8) -> Self {
        Self(Arc::new(AtomicU8::new(percent)))
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self, percent: u8) {
        self.0.store(percent, Ordering::SeqCst);
    }
}

pub struct ControlLoop {
    light: Arc<dyn Light>,
    /// `None` until the first transition
    state: Option<IdleState>,
    baseline: Baseline,
    targets: watch::Sender<Option<AnimationTarget>>,
}

impl ControlLoop {
    /// Publishes a resting target at the current baseline.
    pub fn new(
        light: Arc<dyn Light>,
        baseline: Baseline,
        targets: watch::Sender<Option<AnimationTarget>>,
    ) -> Self {
        let initial = baseline.get();
        targets.send_replace(Some(AnimationTarget::new(Instant::now(), initial, initial)));
        Self {
            light,
            state: None,
            baseline,
            targets,
        }
    }

    pub fn state(&self) -> Option<IdleState> {
        self.state
    }

    pub fn baseline(&self) -> u8 {
        self.baseline.get()
    }

    /// Apply one transition request. Returns the newly published target.
    ///
    /// The first request is always accepted; after that a request for the
    /// current state is ignored. If the light cannot be read the request is
    /// not committed, so the next one retries.
    pub fn handle(&mut self, requested: IdleState) -> Option<AnimationTarget> {
        if self.state == Some(requested) {
            return None;
        }

        let current = match self.light.get_brightness() {
            Ok(b) => b,
            Err(e) => {
                warn!("Cannot read brightness, ignoring {:?} transition: {}", requested, e);
                return None;
            }
        };
        self.state = Some(requested);

        let now = Instant::now();
        let target = match requested {
            IdleState::Idle => {
                let baseline = self.baseline.get();
                if current != baseline {
                    info!("Updating target brightness: {} -> {}", baseline, current);
                    self.baseline.set(current);
                }
                AnimationTarget::new(now, current, 0)
            }
            IdleState::Active => AnimationTarget::new(now, current, self.baseline.get()),
        };

        info!(
            "User {}: brightness {} -> {}",
            requested, target.from, target.to
        );
        self.targets.send_replace(Some(target));
        Some(target)
    }

    /// Consume transition requests until cancelled or the detector stops.
    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<IdleState>,
        token: CancellationToken,
    ) -> Result<(), DaemonError> {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                request = requests.recv() => match request {
                    Some(requested) => {
                        self.handle(requested);
                    }
                    None => break,
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbd_light::MemoryLight;

    fn control(brightness: u8) -> (
        Arc<MemoryLight>,
        ControlLoop,
        watch::Receiver<Option<AnimationTarget>>,
    ) {
        let light = Arc::new(MemoryLight::new(brightness));
        let initial = light.brightness();
        let (tx, rx) = watch::channel(None);
        let control = ControlLoop::new(light.clone(), Baseline::new(initial), tx);
        (light, control, rx)
    }

    #[test]
    fn test_initial_target_rests_at_baseline() {
        let (_light, control, rx) = control(70);
        let target = rx.borrow().unwrap();
        assert_eq!((target.from, target.to), (70, 70));
        assert_eq!(control.state(), None);
    }

    #[test]
    fn test_first_transition_always_accepted() {
        let (_light, mut control, _rx) = control(70);
        let target = control.handle(IdleState::Active).unwrap();
        assert_eq!((target.from, target.to), (70, 70));
        assert_eq!(control.state(), Some(IdleState::Active));
    }

    #[test]
    fn test_self_transition_is_noop() {
        let (_light, mut control, mut rx) = control(70);
        control.handle(IdleState::Idle).unwrap();
        rx.mark_unchanged();

        assert_eq!(control.handle(IdleState::Idle), None);
        assert!(!rx.has_changed().unwrap());

        control.handle(IdleState::Active).unwrap();
        assert_eq!(control.handle(IdleState::Active), None);
    }

    #[test]
    fn test_round_trip_restores_pre_idle_baseline() {
        let (light, mut control, _rx) = control(80);
        let dim = control.handle(IdleState::Idle).unwrap();
        assert_eq!((dim.from, dim.to), (80, 0));

        // the engine got part of the way down
        light.set_brightness(35).unwrap();

        let up = control.handle(IdleState::Active).unwrap();
        assert_eq!((up.from, up.to), (35, 80));
        assert_eq!(control.baseline(), 80);
    }

    #[test]
    fn test_external_change_refreshes_baseline() {
        let (light, mut control, _rx) = control(80);
        control.handle(IdleState::Active);

        // another process turned the backlight down while the user was active
        light.set_external(50);

        let dim = control.handle(IdleState::Idle).unwrap();
        assert_eq!((dim.from, dim.to), (50, 0));
        assert_eq!(control.baseline(), 50);

        light.set_external(0);
        let up = control.handle(IdleState::Active).unwrap();
        assert_eq!((up.from, up.to), (0, 50));
    }

    #[test]
    fn test_unreadable_light_defers_transition() {
        let (light, mut control, _rx) = control(80);
        control.handle(IdleState::Active);

        light.fail_reads(true);
        assert_eq!(control.handle(IdleState::Idle), None);
        assert_eq!(control.state(), Some(IdleState::Active));

        light.fail_reads(false);
        assert!(control.handle(IdleState::Idle).is_some());
        assert_eq!(control.state(), Some(IdleState::Idle));
    }

    #[tokio::test]
    async fn test_run_until_requests_close() {
        let (_light, control, rx) = control(60);
        let (tx, requests) = mpsc::channel(4);
        tx.send(IdleState::Idle).await.unwrap();
        drop(tx);

        control.run(requests, CancellationToken::new()).await.unwrap();
        let target = rx.borrow().unwrap();
        assert_eq!((target.from, target.to), (60, 0));
    }
}
