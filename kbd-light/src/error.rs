//! Backlight error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors from backlight operations
#[derive(Error, Debug)]
pub enum LightError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse \"{content}\" from {path} as an integer")]
    Parse { path: PathBuf, content: String },

    #[error("max_brightness of {0} is zero")]
    InvalidMaxBrightness(PathBuf),

    #[error("Backlight not found: {0}")]
    NotFound(String),

    // HID-specific
    #[cfg(feature = "aurora")]
    #[error("HID error: {0}")]
    Hid(String),

    #[error("Backlight unavailable: {0}")]
    Unavailable(String),
}

impl LightError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LightError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(feature = "aurora")]
impl From<hidapi::HidError> for LightError {
    fn from(e: hidapi::HidError) -> Self {
        LightError::Hid(e.to_string())
    }
}
