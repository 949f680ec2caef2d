//! Backlight selection from configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kbd_light::{detect_keyboard_backlight, Light, MemoryLight, SysfsLight, LEDS_PATH};
use tracing::info;

use crate::config::{Backend, Config};
use crate::error::DaemonError;

/// Brightness a dry run starts from
const DRY_RUN_BRIGHTNESS: u8 = 100;

/// The LED directory to drive: configured, or detected under `leds_dir`.
pub fn resolve_sysfs_path(config: &Config, leds_dir: &Path) -> Result<PathBuf, DaemonError> {
    if let Some(path) = &config.backlight_path {
        return Ok(path.clone());
    }
    let detected = detect_keyboard_backlight(leds_dir)?
        .ok_or_else(|| DaemonError::NoBacklight(leds_dir.display().to_string()))?;
    info!("Detected keyboard backlight: {}", detected.display());
    Ok(detected)
}

/// Open the light the configuration asks for.
///
/// With `dry_run` an in-memory light is used and nothing touches hardware.
pub fn open_light(config: &Config, dry_run: bool) -> Result<Arc<dyn Light>, DaemonError> {
    if dry_run {
        info!("Dry run: brightness changes are only logged");
        return Ok(Arc::new(MemoryLight::new(DRY_RUN_BRIGHTNESS).with_logging()));
    }

    match config.backend {
        Backend::Sysfs => {
            let path = resolve_sysfs_path(config, Path::new(LEDS_PATH))?;
            Ok(Arc::new(SysfsLight::open(path)?))
        }
        #[cfg(feature = "aurora")]
        Backend::Aurora => Ok(Arc::new(kbd_light::AuroraLight::open()?)),
        #[cfg(not(feature = "aurora"))]
        Backend::Aurora => Err(DaemonError::BackendUnavailable("aurora")),
    }
}
