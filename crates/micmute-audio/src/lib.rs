//! macOS audio backends for micmute.
//!
//! [`CoreAudioHardware`] implements the property-level hardware seam on top of
//! the CoreAudio HAL, [`DeviceChangeWatcher`] forwards default input device
//! changes, and [`Osascript`] drives the system-wide input volume.

mod osascript;

#[cfg(target_os = "macos")]
mod coreaudio;
#[cfg(target_os = "macos")]
mod watcher;

#[cfg(target_os = "macos")]
pub use coreaudio::CoreAudioHardware;
pub use osascript::Osascript;
#[cfg(target_os = "macos")]
pub use watcher::DeviceChangeWatcher;
