//! In-memory backlight

use parking_lot::Mutex;
use tracing::info;

use crate::{Light, LightError, MAX_PERCENT};

#[derive(Debug, Default)]
struct State {
    brightness: u8,
    writes: Vec<u8>,
    fail_reads: bool,
    fail_writes: bool,
}

/// A light that only remembers its brightness.
///
/// Used by `--dry-run` and as a test double. Every successful write is
/// recorded and can be inspected with [`MemoryLight::writes`].
#[derive(Debug, Default)]
pub struct MemoryLight {
    state: Mutex<State>,
    log_writes: bool,
}

impl MemoryLight {
    pub fn new(brightness: u8) -> Self {
        Self {
            state: Mutex::new(State {
                brightness: brightness.min(MAX_PERCENT),
                ..State::default()
            }),
            log_writes: false,
        }
    }

    /// Log every write at info level (dry-run mode)
    pub fn with_logging(mut self) -> Self {
        self.log_writes = true;
        self
    }

    /// Change the brightness without recording a write, as another process would.
    pub fn set_external(&self, brightness: u8) {
        self.state.lock().brightness = brightness.min(MAX_PERCENT);
    }

    pub fn brightness(&self) -> u8 {
        self.state.lock().brightness
    }

    /// All successfully written values, oldest first
    pub fn writes(&self) -> Vec<u8> {
        self.state.lock().writes.clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }
}

impl Light for MemoryLight {
    fn get_brightness(&self) -> Result<u8, LightError> {
        let state = self.state.lock();
        if state.fail_reads {
            return Err(LightError::Unavailable("read disabled".to_string()));
        }
        Ok(state.brightness)
    }

    fn set_brightness(&self, percent: u8) -> Result<(), LightError> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(LightError::Unavailable("write disabled".to_string()));
        }
        let percent = percent.min(MAX_PERCENT);
        state.brightness = percent;
        state.writes.push(percent);
        if self.log_writes {
            info!("[dry-run] brightness -> {}%", percent);
        }
        Ok(())
    }
}
