//! Keyboard backlight backends
//!
//! Every backend exposes the same percentage-based [`Light`] interface; the
//! scaling to a hardware range is the backend's business.
//!
//! - [`SysfsLight`]: LED class devices under `/sys/class/leds`
//! - [`AuroraLight`]: Asus Aurora keyboards over USB HID (feature `aurora`)
//! - [`MemoryLight`]: in-memory light for dry runs and tests

pub mod detect;
pub mod error;
pub mod memory;
pub mod sysfs;

#[cfg(feature = "aurora")]
pub mod aurora;

pub use detect::{detect_keyboard_backlight, LEDS_PATH};
pub use error::LightError;
pub use memory::MemoryLight;
pub use sysfs::SysfsLight;

#[cfg(feature = "aurora")]
pub use aurora::AuroraLight;

/// Highest brightness percentage
pub const MAX_PERCENT: u8 = 100;

/// A dimmable keyboard backlight.
///
/// Brightness is always an integer percentage in `0..=100`. Values above 100
/// passed to [`Light::set_brightness`] are clamped.
pub trait Light: Send + Sync {
    /// Current brightness as a percentage
    fn get_brightness(&self) -> Result<u8, LightError>;

    /// Set the brightness to a percentage
    fn set_brightness(&self, percent: u8) -> Result<(), LightError>;
}

impl<L: Light + ?Sized> Light for std::sync::Arc<L> {
    fn get_brightness(&self) -> Result<u8, LightError> {
        (**self).get_brightness()
    }

    fn set_brightness(&self, percent: u8) -> Result<(), LightError> {
        (**self).set_brightness(percent)
    }
}
