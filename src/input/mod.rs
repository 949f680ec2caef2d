//! Input device watching
//!
//! Watchers read raw input-event records from device files and turn each one
//! into an [`ActivitySignal`]. The [`WatcherPool`] keeps one watcher per
//! canonical device path and rescans for hot-plugged keyboards.

pub mod device;
pub mod enumerator;
pub mod pool;
pub mod record;

pub use device::DeviceFile;
pub use enumerator::{DeviceEnumerator, InputDeviceEnumerator, StaticEnumerator};
pub use pool::{watch_reader, WatchExit, WatcherPool, ACTIVITY_QUEUE_CAPACITY};
pub use record::{InputEventRecord, RECORD_SIZE};

/// Evidence that the user touched an input device.
///
/// Carries nothing beyond its occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivitySignal;
