//! The daemon's lifecycle group
//!
//! Data flow:
//! - input watchers → activity queue → [`IdleDetector`]
//! - idle detector → transition requests → [`ControlLoop`]
//! - control loop → published [`AnimationTarget`] → [`AnimationEngine`] → light
//!
//! All members share one cancellation token. When any member finishes, for
//! whatever reason, the token is cancelled and the others are joined. The
//! baseline brightness is then written back exactly once.

pub mod animation;
pub mod control;
pub mod idle;

pub use animation::{AnimationEngine, AnimationTarget};
pub use control::{Baseline, ControlLoop};
pub use idle::IdleDetector;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use kbd_light::Light;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::DaemonError;
use crate::input::{DeviceEnumerator, WatcherPool, ACTIVITY_QUEUE_CAPACITY};

/// Capacity of the transition queue between idle detector and control loop
const REQUEST_QUEUE_CAPACITY: usize = 16;

/// Whether the user is currently considered present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    Active,
    Idle,
}

impl fmt::Display for IdleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdleState::Active => write!(f, "active"),
            IdleState::Idle => write!(f, "idle"),
        }
    }
}

/// Timing parameters of a run
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    pub idle_timeout: Duration,
    pub dim_duration: Duration,
    pub restore_duration: Duration,
    pub rescan_interval: Duration,
    pub tick_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ServiceConfig {
    fn from(config: &Config) -> Self {
        Self {
            idle_timeout: config.idle_timeout,
            dim_duration: config.dim_duration,
            restore_duration: config.restore_duration,
            rescan_interval: config.rescan_interval,
            tick_interval: config.tick_interval,
        }
    }
}

/// Writes the baseline back to the light when dropped.
///
/// Lives for the whole of [`Daemon::run`], so the restore happens on every
/// exit path once all members have been joined.
struct RestoreGuard {
    light: Arc<dyn Light>,
    baseline: Baseline,
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        let brightness = self.baseline.get();
        info!("Restoring brightness to {}", brightness);
        if let Err(e) = self.light.set_brightness(brightness) {
            error!("Failed to restore brightness: {}", e);
        }
    }
}

type MemberResult = (&'static str, Result<(), DaemonError>);

fn spawn_member<F>(members: &mut JoinSet<MemberResult>, name: &'static str, fut: F)
where
    F: Future<Output = Result<(), DaemonError>> + Send + 'static,
{
    members.spawn(async move { (name, fut.await) });
}

/// Wait for SIGINT or SIGTERM, or for another member to stop the group.
async fn termination_signal(token: CancellationToken) -> Result<(), DaemonError> {
    let mut terminate = signal(SignalKind::terminate()).map_err(DaemonError::Signal)?;
    let mut interrupt = signal(SignalKind::interrupt()).map_err(DaemonError::Signal)?;

    tokio::select! {
        _ = token.cancelled() => {}
        _ = terminate.recv() => info!("Received 'terminated' signal, exiting..."),
        _ = interrupt.recv() => info!("Received 'interrupt' signal, exiting..."),
    }
    Ok(())
}

/// The keyboard backlight daemon
pub struct Daemon {
    config: ServiceConfig,
    light: Arc<dyn Light>,
    enumerator: Arc<dyn DeviceEnumerator>,
}

impl Daemon {
    pub fn new(
        config: ServiceConfig,
        light: Arc<dyn Light>,
        enumerator: Arc<dyn DeviceEnumerator>,
    ) -> Self {
        Self {
            config,
            light,
            enumerator,
        }
    }

    /// Run until a termination signal arrives or `token` is cancelled.
    ///
    /// Fails before starting anything if the initial brightness cannot be
    /// read or the input devices cannot be listed.
    pub async fn run(self, token: CancellationToken) -> Result<(), DaemonError> {
        let initial = self
            .light
            .get_brightness()
            .map_err(DaemonError::InitialBrightness)?;
        let candidates = self.enumerator.candidates().map_err(DaemonError::Enumerate)?;
        info!(
            "Initial brightness {}%, idle timeout {:?}",
            initial, self.config.idle_timeout
        );

        let baseline = Baseline::new(initial);
        let _restore = RestoreGuard {
            light: Arc::clone(&self.light),
            baseline: baseline.clone(),
        };

        let (activity_tx, activity_rx) = mpsc::channel(ACTIVITY_QUEUE_CAPACITY);
        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        let (target_tx, target_rx) = watch::channel(None);

        let mut pool = WatcherPool::new(
            Arc::clone(&self.enumerator),
            activity_tx,
            token.clone(),
        );
        if pool.scan(&candidates) == 0 {
            warn!("No input devices to watch yet, will rescan");
        }

        let detector = IdleDetector::new(self.config.idle_timeout);
        let control = ControlLoop::new(Arc::clone(&self.light), baseline, target_tx);
        let engine = AnimationEngine::new(
            Arc::clone(&self.light),
            initial,
            self.config.dim_duration,
            self.config.restore_duration,
        );

        let mut members = JoinSet::new();
        spawn_member(
            &mut members,
            "input-watchers",
            pool.run(self.config.rescan_interval),
        );
        spawn_member(
            &mut members,
            "idle-detector",
            detector.run(activity_rx, request_tx, token.clone()),
        );
        spawn_member(
            &mut members,
            "control-loop",
            control.run(request_rx, token.clone()),
        );
        spawn_member(
            &mut members,
            "animation",
            engine.run(target_rx, self.config.tick_interval, token.clone()),
        );
        spawn_member(&mut members, "signals", termination_signal(token.clone()));

        while let Some(joined) = members.join_next().await {
            match joined {
                Ok((name, Ok(()))) => debug!("{} stopped", name),
                Ok((name, Err(e))) => error!("{} failed: {}", name, e),
                Err(e) => error!("Task panicked or was aborted: {}", e),
            }
            token.cancel();
        }

        info!("Shutting down");
        Ok(())
    }
}
