//! Core types and mute orchestration for micmute.
//!
//! Everything in this crate is platform-agnostic. Hardware access goes
//! through the [`AudioHardware`] and [`ScriptRunner`] traits, which the
//! `micmute-audio` crate implements for macOS.

mod config;
mod control;
mod device;
mod hardware;
mod legacy;
mod machine;
mod registry;
mod state;
mod stream;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::{Config, ConfigManager};
pub use control::DeviceMuteController;
pub use device::{DeviceId, InputDevice, InputStream, StreamId, TransportKind};
pub use hardware::{AudioHardware, Element, HardwareError, Property, ScriptRunner};
pub use legacy::LegacySystemVolume;
pub use machine::{MuteStateMachine, SequenceReport, ToggleOutcome};
pub use registry::DeviceRegistry;
pub use state::{MicState, MuteState, SavedVolume};
pub use stream::StreamActivator;

/// Application name
pub const APP_NAME: &str = "micmute";

/// Pretty application name for display
pub const APP_NAME_PRETTY: &str = "MicMute";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "MICMUTE_LOG";
