//! Application events for the tao event loop.
//!
//! Every input source (tray clicks, menu items, the global hotkey and
//! CoreAudio listeners) is funneled into this one queue, so the mute state is
//! only ever touched from the event loop thread.

/// Events delivered to the tao event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicMuteEvent {
    /// The default input device or the device list changed
    DeviceChanged,
    /// The user asked to flip the mute state
    ToggleRequested,
    /// The user picked the quit menu item
    QuitRequested,
}
