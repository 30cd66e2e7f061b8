// Re-export from sub-crates
pub use micmute_core::{
    APP_NAME, APP_NAME_PRETTY, Config, ConfigManager, DEFAULT_LOG_LEVEL, LOG_ENV, MicState,
    MuteStateMachine, ToggleOutcome,
};
#[cfg(target_os = "macos")]
pub use micmute_audio::{CoreAudioHardware, DeviceChangeWatcher};
pub use micmute_audio::Osascript;

// App-specific modules
mod color;
#[cfg(target_os = "macos")]
pub mod config_ext;
pub mod event;
pub mod icon;

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
