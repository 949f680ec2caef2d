//! Input device enumeration

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::config::Config;

/// Produces the current set of plausible input-device paths.
///
/// Called once at startup and again on every rescan. Paths need not be
/// canonical; the watcher pool resolves symlinks itself.
pub trait DeviceEnumerator: Send + Sync {
    fn candidates(&self) -> io::Result<Vec<PathBuf>>;
}

/// Configured device paths plus pattern matches from a device directory
/// (by default `/dev/input/by-id/*kbd*`).
#[derive(Debug, Clone)]
pub struct InputDeviceEnumerator {
    static_paths: Vec<PathBuf>,
    device_dir: PathBuf,
    pattern: String,
}

impl InputDeviceEnumerator {
    pub fn new(static_paths: Vec<PathBuf>, device_dir: PathBuf, pattern: String) -> Self {
        Self {
            static_paths,
            device_dir,
            pattern,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.input_event_devices.clone(),
            config.device_dir.clone(),
            config.device_pattern.clone(),
        )
    }

    /// Entries of the device directory whose name contains the pattern,
    /// sorted. A missing directory has no entries.
    fn discover(&self) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.device_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_name().to_string_lossy().contains(&self.pattern) {
                found.push(entry.path());
            }
        }
        found.sort();
        Ok(found)
    }
}

impl DeviceEnumerator for InputDeviceEnumerator {
    fn candidates(&self) -> io::Result<Vec<PathBuf>> {
        let mut paths = self.static_paths.clone();
        paths.extend(self.discover()?);
        Ok(paths)
    }
}

/// A fixed list of paths
#[derive(Debug, Clone, Default)]
pub struct StaticEnumerator(pub Vec<PathBuf>);

impl DeviceEnumerator for StaticEnumerator {
    fn candidates(&self) -> io::Result<Vec<PathBuf>> {
        Ok(self.0.clone())
    }
}
