//! Idle detection: a debounce timer fed by activity signals

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::IdleState;
use crate::error::DaemonError;
use crate::input::ActivitySignal;

/// Turns activity signals into `Active`/`Idle` transition requests.
///
/// Every signal requests `Active` and re-arms the timer. When the timer
/// expires it requests `Idle` once and stays disarmed until the next
/// signal. Requests are delivered in order and never dropped.
#[derive(Debug, Clone, Copy)]
pub struct IdleDetector {
    timeout: Duration,
}

impl IdleDetector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn run(
        self,
        mut activity: mpsc::Receiver<ActivitySignal>,
        requests: mpsc::Sender<IdleState>,
        token: CancellationToken,
    ) -> Result<(), DaemonError> {
        let timer = sleep(self.timeout);
        tokio::pin!(timer);
        let mut armed = true;

        loop {
            // activity is polled before the timer so a signal that races an
            // expiring timeout still re-arms it
            let request = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                signal = activity.recv() => match signal {
                    Some(ActivitySignal) => {
                        timer.as_mut().reset(Instant::now() + self.timeout);
                        armed = true;
                        IdleState::Active
                    }
                    None => break,
                },
                _ = &mut timer, if armed => {
                    armed = false;
                    debug!("No input for {:?}", self.timeout);
                    IdleState::Idle
                }
            };

            if requests.send(request).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}
