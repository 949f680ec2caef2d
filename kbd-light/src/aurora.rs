//! Asus Aurora keyboard backlight over USB HID
//!
//! The keyboard takes 17-byte output reports. A brightness change is sent as
//! initialize, brightness, set, apply. The device cannot report its current
//! level, so the last written value is cached.

use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use tracing::debug;

use crate::{Light, LightError, MAX_PERCENT};

/// Asus USB vendor ID
pub const ASUS_VENDOR_ID: u16 = 0x0b05;

/// Highest hardware brightness level
pub const MAX_LEVEL: u8 = 3;

const MESSAGE_LEN: usize = 17;

type Message = [u8; MESSAGE_LEN];

/// Message prefixes
mod msg {
    use super::{Message, MESSAGE_LEN};

    const fn pad<const N: usize>(prefix: [u8; N]) -> Message {
        let mut m = [0u8; MESSAGE_LEN];
        let mut i = 0;
        while i < N {
            m[i] = prefix[i];
            i += 1;
        }
        m
    }

    /// "ZASUS Tech.Inc." handshake
    pub const INITIALIZE: Message = pad([
        0x5a, 0x41, 0x53, 0x55, 0x53, 0x20, 0x54, 0x65, 0x63, 0x68, 0x2e, 0x49, 0x6e, 0x63, 0x2e,
        0x00,
    ]);
    pub const BRIGHTNESS: Message = pad([0x5a, 0xba, 0xc5, 0xc4]);
    pub const SET: Message = pad([0x5d, 0xb5]);
    pub const APPLY: Message = pad([0x5d, 0xb4]);
}

/// Map a percentage onto the `0..=MAX_LEVEL` hardware range.
pub fn percent_to_level(percent: u8) -> u8 {
    let pct = f64::from(percent.min(MAX_PERCENT));
    (pct * f64::from(MAX_LEVEL) / 100.0).round() as u8
}

fn brightness_message(level: u8) -> Message {
    let mut m = msg::BRIGHTNESS;
    m[4] = level;
    m
}

/// Aurora keyboard backlight
pub struct AuroraLight {
    api: Mutex<HidApi>,
    path: std::ffi::CString,
    last_percent: Mutex<Option<u8>>,
}

impl AuroraLight {
    /// Open the first Asus HID device (ordered by path).
    pub fn open() -> Result<Self, LightError> {
        let api = HidApi::new()?;
        let mut paths: Vec<_> = api
            .device_list()
            .filter(|d| d.vendor_id() == ASUS_VENDOR_ID)
            .map(|d| d.path().to_owned())
            .collect();
        paths.sort();

        let path = paths
            .into_iter()
            .next()
            .ok_or_else(|| LightError::NotFound(format!("no HID device {ASUS_VENDOR_ID:04x}")))?;
        debug!("Using Aurora HID device {:?}", path);

        Ok(Self {
            api: Mutex::new(api),
            path,
            last_percent: Mutex::new(None),
        })
    }

    fn send(&self, messages: &[Message]) -> Result<(), LightError> {
        let device: HidDevice = self.api.lock().open_path(&self.path)?;
        for m in messages {
            device.write(m)?;
        }
        Ok(())
    }
}

impl Light for AuroraLight {
    fn get_brightness(&self) -> Result<u8, LightError> {
        Ok(self.last_percent.lock().unwrap_or(MAX_PERCENT))
    }

    fn set_brightness(&self, percent: u8) -> Result<(), LightError> {
        let percent = percent.min(MAX_PERCENT);
        let level = percent_to_level(percent);
        self.send(&[
            msg::INITIALIZE,
            brightness_message(level),
            msg::SET,
            msg::APPLY,
        ])?;
        *self.last_percent.lock() = Some(percent);
        Ok(())
    }
}
