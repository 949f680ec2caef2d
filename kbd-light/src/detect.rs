//! Keyboard backlight auto-detection

use std::fs;
use std::path::{Path, PathBuf};

use crate::LightError;

/// Default LED class directory
pub const LEDS_PATH: &str = "/sys/class/leds";

/// Name fragments identifying a keyboard backlight LED
const NAME_HINTS: &[&str] = &["kbd", "keyboard"];

/// Find the first LED (by name) under `leds_dir` that looks like a keyboard
/// backlight.
pub fn detect_keyboard_backlight(leds_dir: &Path) -> Result<Option<PathBuf>, LightError> {
    let entries = fs::read_dir(leds_dir).map_err(|e| LightError::io(leds_dir, e))?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| NAME_HINTS.iter().any(|hint| name.contains(hint)))
        .collect();
    names.sort();

    Ok(names.first().map(|name| {
        let path = leds_dir.join(name);
        std::path::absolute(&path).unwrap_or(path)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_kbd_led() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("input3::capslock")).unwrap();
        fs::create_dir(dir.path().join("tpacpi::kbd_backlight")).unwrap();
        fs::create_dir(dir.path().join("asus::kbd_backlight")).unwrap();

        let found = detect_keyboard_backlight(dir.path()).unwrap().unwrap();
        assert_eq!(found.file_name().unwrap(), "asus::kbd_backlight");
        assert!(found.is_absolute());
    }

    #[test]
    fn test_keyboard_hint() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("dell::keyboard")).unwrap();
        let found = detect_keyboard_backlight(dir.path()).unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("phy0-led")).unwrap();
        assert!(detect_keyboard_backlight(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_unreadable_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(detect_keyboard_backlight(&dir.path().join("missing")).is_err());
    }
}
