//! Daemon error types

use kbd_light::LightError;
use thiserror::Error;

/// Errors that stop the daemon
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("No keyboard backlight found under {0}")]
    NoBacklight(String),

    #[error("Backlight error: {0}")]
    Backlight(#[from] LightError),

    #[error("Cannot read initial brightness: {0}")]
    InitialBrightness(#[source] LightError),

    #[error("Cannot list input devices: {0}")]
    Enumerate(#[source] std::io::Error),

    #[error("Backend '{0}' is not compiled in (enable the '{0}' feature)")]
    BackendUnavailable(&'static str),

    #[error("Cannot install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}
