//! LED class backlight (`/sys/class/leds/<name>/{brightness,max_brightness}`)

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Light, LightError, MAX_PERCENT};

const BRIGHTNESS_FILE: &str = "brightness";
const MAX_BRIGHTNESS_FILE: &str = "max_brightness";

/// Backlight driven through the kernel LED class attributes.
#[derive(Debug, Clone)]
pub struct SysfsLight {
    path: PathBuf,
    max_brightness: u32,
}

impl SysfsLight {
    /// Open an LED class directory and read its `max_brightness`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LightError> {
        let path = path.into();
        let max_brightness = read_int(&path.join(MAX_BRIGHTNESS_FILE))?;
        if max_brightness == 0 {
            return Err(LightError::InvalidMaxBrightness(path));
        }
        debug!(
            "Opened backlight {} (max_brightness {})",
            path.display(),
            max_brightness
        );
        Ok(Self {
            path,
            max_brightness,
        })
    }

    pub fn max_brightness(&self) -> u32 {
        self.max_brightness
    }

    fn raw_to_percent(&self, raw: u32) -> u8 {
        let pct = (f64::from(raw) * 100.0 / f64::from(self.max_brightness)).round();
        pct.min(f64::from(MAX_PERCENT)) as u8
    }

    fn percent_to_raw(&self, percent: u8) -> u32 {
        let pct = percent.min(MAX_PERCENT);
        (f64::from(pct) * f64::from(self.max_brightness) / 100.0).round() as u32
    }
}

impl Light for SysfsLight {
    fn get_brightness(&self) -> Result<u8, LightError> {
        let raw = read_int(&self.path.join(BRIGHTNESS_FILE))?;
        Ok(self.raw_to_percent(raw))
    }

    fn set_brightness(&self, percent: u8) -> Result<(), LightError> {
        let raw = self.percent_to_raw(percent);
        write_int(&self.path.join(BRIGHTNESS_FILE), raw)
    }
}

/// Read a single trimmed integer from an attribute file.
fn read_int(path: &Path) -> Result<u32, LightError> {
    let content = fs::read_to_string(path).map_err(|e| LightError::io(path, e))?;
    let text = content.trim();
    text.parse().map_err(|_| LightError::Parse {
        path: path.to_path_buf(),
        content: text.to_string(),
    })
}

/// Write an integer to an attribute file, following symlinks first.
fn write_int(path: &Path, value: u32) -> Result<(), LightError> {
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    fs::write(&target, value.to_string()).map_err(|e| LightError::io(target, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn led_dir(max: &str, current: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MAX_BRIGHTNESS_FILE), max).unwrap();
        fs::write(dir.path().join(BRIGHTNESS_FILE), current).unwrap();
        dir
    }

    #[test]
    fn test_reads_percentage() {
        let dir = led_dir("3\n", "3\n");
        let light = SysfsLight::open(dir.path()).unwrap();
        assert_eq!(light.max_brightness(), 3);
        assert_eq!(light.get_brightness().unwrap(), 100);

        fs::write(dir.path().join(BRIGHTNESS_FILE), "1").unwrap();
        assert_eq!(light.get_brightness().unwrap(), 33);
    }

    #[test]
    fn test_writes_scaled_value() {
        let dir = led_dir("255", "0");
        let light = SysfsLight::open(dir.path()).unwrap();
        light.set_brightness(50).unwrap();
        let raw = fs::read_to_string(dir.path().join(BRIGHTNESS_FILE)).unwrap();
        assert_eq!(raw, "128");
        assert_eq!(light.get_brightness().unwrap(), 50);

        light.set_brightness(200).unwrap();
        let raw = fs::read_to_string(dir.path().join(BRIGHTNESS_FILE)).unwrap();
        assert_eq!(raw, "255");
    }

    #[test]
    fn test_zero_max_brightness_rejected() {
        let dir = led_dir("0", "0");
        assert!(matches!(
            SysfsLight::open(dir.path()),
            Err(LightError::InvalidMaxBrightness(_))
        ));
    }

    #[test]
    fn test_garbage_content() {
        let dir = led_dir("3", "bright");
        let light = SysfsLight::open(dir.path()).unwrap();
        assert!(matches!(
            light.get_brightness(),
            Err(LightError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SysfsLight::open(dir.path().join("nope")),
            Err(LightError::Io { .. })
        ));
    }
}
