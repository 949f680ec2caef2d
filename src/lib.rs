// Keyboard backlight daemon - shared library
// Input watching, idle detection, brightness animation and supervision

pub mod backlight;
pub mod config;
pub mod error;
pub mod input;
pub mod service;

pub use config::{Backend, Config, ConfigError};
pub use error::DaemonError;
pub use input::{ActivitySignal, DeviceEnumerator, InputDeviceEnumerator, WatcherPool};
pub use service::{
    AnimationEngine, AnimationTarget, ControlLoop, Daemon, IdleDetector, IdleState, ServiceConfig,
};
