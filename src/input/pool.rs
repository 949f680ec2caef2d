//! Watcher pool: one reader per canonical device path

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::device::DeviceFile;
use super::enumerator::DeviceEnumerator;
use super::record::{InputEventRecord, RECORD_SIZE};
use super::ActivitySignal;
use crate::error::DaemonError;

/// Capacity of the activity queue between watchers and the idle detector.
///
/// Watchers never block on it: when it is full the new signal is coalesced
/// into the ones already queued.
pub const ACTIVITY_QUEUE_CAPACITY: usize = 64;

/// Why a watcher stopped
#[derive(Debug)]
pub enum WatchExit {
    Cancelled,
    /// Nobody consumes activity signals anymore
    QueueClosed,
    /// End of file or read error (device unplugged)
    Disconnected(Option<io::Error>),
}

/// Read records from `reader` until it fails, emitting one activity signal
/// per well-formed record.
///
/// A read shorter than [`RECORD_SIZE`] is a malformed record and is skipped.
pub async fn watch_reader<R>(
    mut reader: R,
    path: &Path,
    activity: &mpsc::Sender<ActivitySignal>,
    token: &CancellationToken,
) -> WatchExit
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; RECORD_SIZE];
    loop {
        let len = tokio::select! {
            biased;
            _ = token.cancelled() => return WatchExit::Cancelled,
            res = reader.read(&mut buf) => match res {
                Ok(0) => return WatchExit::Disconnected(None),
                Ok(len) => len,
                Err(e) => return WatchExit::Disconnected(Some(e)),
            },
        };

        if InputEventRecord::parse(&buf[..len]).is_none() {
            debug!("Skipping malformed {}-byte record from {}", len, path.display());
            continue;
        }

        match activity.try_send(ActivitySignal) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Closed(_)) => return WatchExit::QueueClosed,
        }
    }
}

/// Removes a path from the active set when its watcher ends, however it ends.
struct ActiveEntry {
    path: PathBuf,
    active: Arc<Mutex<HashSet<PathBuf>>>,
}

impl Drop for ActiveEntry {
    fn drop(&mut self) {
        self.active.lock().remove(&self.path);
    }
}

/// Maintains exactly one watcher per canonical input-device path.
///
/// Watchers are only removed when their read fails; a path that merely
/// disappears from the candidate list keeps its watcher while it stays
/// readable.
pub struct WatcherPool {
    enumerator: Arc<dyn DeviceEnumerator>,
    activity: mpsc::Sender<ActivitySignal>,
    active: Arc<Mutex<HashSet<PathBuf>>>,
    watchers: JoinSet<()>,
    token: CancellationToken,
}

impl WatcherPool {
    pub fn new(
        enumerator: Arc<dyn DeviceEnumerator>,
        activity: mpsc::Sender<ActivitySignal>,
        token: CancellationToken,
    ) -> Self {
        Self {
            enumerator,
            activity,
            active: Arc::new(Mutex::new(HashSet::new())),
            watchers: JoinSet::new(),
            token,
        }
    }

    /// Canonical paths that currently have a live watcher, sorted
    pub fn active_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.active.lock().iter().cloned().collect();
        paths.sort();
        paths
    }

    /// Start a watcher for every candidate whose canonical path is not being
    /// watched yet. Returns the number of watchers started.
    ///
    /// Must be called from within a tokio runtime.
    pub fn scan(&mut self, candidates: &[PathBuf]) -> usize {
        self.reap();

        let mut started = 0;
        for candidate in candidates {
            let path = match std::fs::canonicalize(candidate) {
                Ok(p) => p,
                Err(e) => {
                    debug!("Cannot resolve {}: {}", candidate.display(), e);
                    continue;
                }
            };

            if !self.active.lock().insert(path.clone()) {
                continue;
            }

            info!("Listening to: {}", path.display());
            let entry = ActiveEntry {
                path,
                active: Arc::clone(&self.active),
            };
            let activity = self.activity.clone();
            let token = self.token.clone();
            self.watchers.spawn(async move {
                watch_device(entry, activity, token).await;
            });
            started += 1;
        }
        started
    }

    /// Drop the handles of watchers that already finished
    fn reap(&mut self) {
        while self.watchers.try_join_next().is_some() {}
    }

    /// Rescan every `interval` until cancelled, then wait for all watchers.
    ///
    /// The first rescan happens one interval from now; run [`WatcherPool::scan`]
    /// beforehand for the initial set.
    pub async fn run(mut self, interval: Duration) -> Result<(), DaemonError> {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = ticker.tick() => match self.enumerator.candidates() {
                    Ok(candidates) => {
                        self.scan(&candidates);
                    }
                    Err(e) => warn!("Input device rescan failed: {}", e),
                },
            }
        }

        while self.watchers.join_next().await.is_some() {}
        debug!("All input watchers stopped");
        Ok(())
    }
}

async fn watch_device(
    entry: ActiveEntry,
    activity: mpsc::Sender<ActivitySignal>,
    token: CancellationToken,
) {
    let path = entry.path.as_path();
    let device = match DeviceFile::open(path) {
        Ok(device) => device,
        Err(e) => {
            warn!("Cannot open {}: {}", path.display(), e);
            return;
        }
    };

    match watch_reader(device, path, &activity, &token).await {
        WatchExit::Cancelled | WatchExit::QueueClosed => {}
        WatchExit::Disconnected(None) => info!("Device closed: {}", path.display()),
        WatchExit::Disconnected(Some(e)) => {
            info!("Stopped listening to {}: {}", path.display(), e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::enumerator::StaticEnumerator;
    use crate::input::record::encode;
    use tokio::io::AsyncWriteExt;

    fn queue() -> (mpsc::Sender<ActivitySignal>, mpsc::Receiver<ActivitySignal>) {
        mpsc::channel(ACTIVITY_QUEUE_CAPACITY)
    }

    fn drain(rx: &mut mpsc::Receiver<ActivitySignal>) -> usize {
        let mut n = 0;
        while rx.try_recv().is_ok() {
            n += 1;
        }
        n
    }

    #[tokio::test]
    async fn test_one_signal_per_record() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&encode(1, 0, 1, 30, 1));
        bytes.extend_from_slice(&encode(1, 10, 0, 0, 0));
        bytes.extend_from_slice(&encode(1, 20, 1, 30, 0));

        let (tx, mut rx) = queue();
        let token = CancellationToken::new();
        let exit = watch_reader(bytes.as_slice(), Path::new("test"), &tx, &token).await;

        assert!(matches!(exit, WatchExit::Disconnected(None)));
        assert_eq!(drain(&mut rx), 3);
    }

    #[tokio::test]
    async fn test_malformed_record_skipped() {
        let (mut writer, reader) = tokio::io::duplex(256);
        let (tx, mut rx) = queue();
        let token = CancellationToken::new();

        let watcher = tokio::spawn({
            let token = token.clone();
            async move { watch_reader(reader, Path::new("test"), &tx, &token).await }
        });

        writer.write_all(&encode(1, 0, 1, 30, 1)[..10]).await.unwrap();
        tokio::task::yield_now().await;
        writer.write_all(&encode(2, 0, 1, 30, 1)).await.unwrap();
        drop(writer);

        let exit = watcher.await.unwrap();
        assert!(matches!(exit, WatchExit::Disconnected(None)));
        assert_eq!(drain(&mut rx), 1);
    }

    #[tokio::test]
    async fn test_full_queue_coalesces() {
        let mut bytes = Vec::new();
        for i in 0..10 {
            bytes.extend_from_slice(&encode(i, 0, 1, 30, 1));
        }

        let (tx, mut rx) = mpsc::channel(2);
        let token = CancellationToken::new();
        let exit = watch_reader(bytes.as_slice(), Path::new("test"), &tx, &token).await;

        // the reader ran to the end instead of blocking on the full queue
        assert!(matches!(exit, WatchExit::Disconnected(None)));
        assert_eq!(drain(&mut rx), 2);
    }

    #[tokio::test]
    async fn test_closed_queue_stops_watcher() {
        let bytes = encode(1, 0, 1, 30, 1);
        let (tx, rx) = queue();
        drop(rx);
        let token = CancellationToken::new();
        let exit = watch_reader(&bytes[..], Path::new("test"), &tx, &token).await;
        assert!(matches!(exit, WatchExit::QueueClosed));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_read() {
        let (_writer, reader) = tokio::io::duplex(64);
        let (tx, _rx) = queue();
        let token = CancellationToken::new();

        let watcher = tokio::spawn({
            let token = token.clone();
            async move { watch_reader(reader, Path::new("test"), &tx, &token).await }
        });
        tokio::task::yield_now().await;
        token.cancel();

        let exit = tokio::time::timeout(Duration::from_secs(1), watcher)
            .await
            .expect("watcher did not stop")
            .unwrap();
        assert!(matches!(exit, WatchExit::Cancelled));
    }

    #[tokio::test]
    async fn test_scan_deduplicates_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("event3");
        std::fs::write(&device, "").unwrap();
        let by_id = dir.path().join("usb-Vendor_kbd-event-kbd");
        std::os::unix::fs::symlink(&device, &by_id).unwrap();

        let (tx, _rx) = queue();
        let candidates = vec![device.clone(), by_id, device.clone()];
        let mut pool = WatcherPool::new(
            Arc::new(StaticEnumerator(candidates.clone())),
            tx,
            CancellationToken::new(),
        );

        // no await between the two scans: the spawned watcher has not run yet
        assert_eq!(pool.scan(&candidates), 1);
        assert_eq!(pool.scan(&candidates), 0);
        assert_eq!(
            pool.active_paths(),
            vec![std::fs::canonicalize(&device).unwrap()]
        );
    }

    #[tokio::test]
    async fn test_failed_watcher_can_be_recreated() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file cannot be polled, so the watcher ends immediately
        let device = dir.path().join("event3");
        std::fs::write(&device, "").unwrap();

        let (tx, _rx) = queue();
        let candidates = vec![device];
        let mut pool = WatcherPool::new(
            Arc::new(StaticEnumerator(candidates.clone())),
            tx,
            CancellationToken::new(),
        );

        assert_eq!(pool.scan(&candidates), 1);
        while pool.watchers.join_next().await.is_some() {}
        assert!(pool.active_paths().is_empty());
        assert_eq!(pool.scan(&candidates), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_paths_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = queue();
        let candidates = vec![dir.path().join("gone")];
        let mut pool = WatcherPool::new(
            Arc::new(StaticEnumerator(candidates.clone())),
            tx,
            CancellationToken::new(),
        );
        assert_eq!(pool.scan(&candidates), 0);
    }
}
