//! Daemon configuration
//!
//! Loaded once from TOML at startup and immutable afterwards. Every key is
//! optional; durations accept `"500ms"`, `"6s"`, `"2m"`, `"1h"` or a bare
//! number of seconds.
//!
//! ```toml
//! backlight_path = "/sys/class/leds/asus::kbd_backlight"
//! input_event_devices = ["/dev/input/event3"]
//! idle_timeout = "6s"
//! dim_duration = "2s"
//! restore_duration = "500ms"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Base name of the configuration file
pub const CONFIG_FILE_NAME: &str = "keyboard-backlight-daemon.toml";

/// System-wide configuration directory
const SYSTEM_CONFIG_DIR: &str = "/etc/keyboard-backlight-daemon";

/// Upper bound for every configured duration
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 3600);

/// Errors from loading or validating the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which backlight driver to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// LED class device under `/sys/class/leds`
    #[default]
    Sysfs,
    /// Asus Aurora keyboard over USB HID
    Aurora,
}

/// Complete daemon configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LED class directory; auto-detected when absent
    pub backlight_path: Option<PathBuf>,
    pub backend: Backend,
    /// Input devices watched in addition to the discovered ones
    pub input_event_devices: Vec<PathBuf>,
    /// Directory scanned for keyboard input devices
    pub device_dir: PathBuf,
    /// File name fragment selecting devices in `device_dir`
    pub device_pattern: String,
    #[serde(deserialize_with = "deserialize_duration")]
    pub idle_timeout: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub dim_duration: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub restore_duration: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub rescan_interval: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub tick_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backlight_path: None,
            backend: Backend::default(),
            input_event_devices: Vec::new(),
            device_dir: PathBuf::from("/dev/input/by-id"),
            device_pattern: "kbd".to_string(),
            idle_timeout: Duration::from_secs(6),
            dim_duration: Duration::from_secs(2),
            restore_duration: Duration::from_millis(500),
            rescan_interval: Duration::from_secs(10),
            tick_interval: Duration::from_millis(100),
        }
    }
}

impl Config {
    /// Files searched, in order, when no explicit path is given
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".").join(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(CONFIG_FILE_NAME));
        }
        paths.push(PathBuf::from(SYSTEM_CONFIG_DIR).join(CONFIG_FILE_NAME));
        paths
    }

    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Otherwise the first existing file from
    /// [`Config::search_paths`] is used, falling back to defaults. Returns the
    /// file that was read, if any.
    pub fn load(path: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let found = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::search_paths().into_iter().find(|p| p.is_file()),
        };

        let config = match &found {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok((config, found))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject values the daemon cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("idle_timeout", self.idle_timeout, true),
            ("dim_duration", self.dim_duration, false),
            ("restore_duration", self.restore_duration, false),
            ("rescan_interval", self.rescan_interval, true),
            ("tick_interval", self.tick_interval, true),
        ];
        for (name, value, non_zero) in durations {
            if non_zero && value.is_zero() {
                return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
            }
            // timers are armed as `Instant::now() + value`
            if value > MAX_DURATION {
                return Err(ConfigError::Invalid(format!(
                    "{name} must not exceed {}h",
                    MAX_DURATION.as_secs() / 3600
                )));
            }
        }
        if self.device_pattern.is_empty() {
            return Err(ConfigError::Invalid(
                "device_pattern must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a duration like `"250ms"`, `"6s"`, `"2m"`, `"1h"` or `"10"` (seconds).
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits.parse().ok()?;
    match unit.trim() {
        "ms" => Some(Duration::from_millis(value)),
        "" | "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value.checked_mul(60)?)),
        "h" => Some(Duration::from_secs(value.checked_mul(3600)?)),
        _ => None,
    }
}

/// Accept either a duration string or a bare number of seconds.
fn deserialize_duration<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DurationRepr {
        Seconds(u64),
        Text(String),
    }

    match DurationRepr::deserialize(d)? {
        DurationRepr::Seconds(secs) => Ok(Duration::from_secs(secs)),
        DurationRepr::Text(text) => parse_duration(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration: \"{text}\""))),
    }
}
