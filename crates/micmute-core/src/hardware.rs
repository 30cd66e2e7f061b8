//! Seams to the host audio system.
//!
//! [`AudioHardware`] mirrors a property-based hardware API: objects expose
//! properties that can be read, probed for settability, and written. The
//! channel facades in this crate are written against it so they can be
//! exercised without real devices.

use std::sync::Arc;

use thiserror::Error;

use crate::device::{DeviceId, StreamId};

/// Errors reported by hardware backends.
///
/// These never leave the channel facades; they are logged and turned into
/// safe defaults there.
#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("{call} failed with status {status}")]
    Status { call: &'static str, status: i32 },

    #[error("could not decode {0}")]
    Decode(String),

    #[error("script failed: {0}")]
    Script(String),
}

/// Result type for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Which control element of a device a property lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    /// The device-wide element
    Main,
    /// A single channel, starting at 1
    Channel(u32),
}

impl Element {
    /// Elements probed when muting. Many stereo devices only expose mute and
    /// volume on the individual channels.
    pub const MUTE_TARGETS: [Element; 3] =
        [Element::Main, Element::Channel(1), Element::Channel(2)];

    pub fn index(self) -> u32 {
        match self {
            Element::Main => 0,
            Element::Channel(n) => n,
        }
    }
}

/// A writable hardware property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// Stream property: whether the stream is delivering data
    StreamActive,
    /// Device input-scope mute flag
    Mute(Element),
    /// Device input-scope volume, 0.0 to 1.0
    Volume(Element),
}

/// Property-level access to the audio hardware.
///
/// Object ids are plain `u32` so both devices and streams can be probed with
/// the same settability call.
pub trait AudioHardware {
    /// All audio devices known to the system, input-capable or not.
    fn device_ids(&self) -> Result<Vec<DeviceId>>;

    /// The current default input device, `None` if the system has none.
    fn default_input_device(&self) -> Result<Option<DeviceId>>;

    fn device_name(&self, device: DeviceId) -> Result<String>;

    fn device_uid(&self, device: DeviceId) -> Result<String>;

    /// Raw transport type code, see [`crate::TransportKind::from_transport_type`].
    fn transport_type(&self, device: DeviceId) -> Result<u32>;

    /// Total number of input channels across the device's input streams.
    fn input_channel_count(&self, device: DeviceId) -> Result<u32>;

    fn input_streams(&self, device: DeviceId) -> Result<Vec<StreamId>>;

    /// Whether `property` can currently be written on `object`. This is asked
    /// before every write since capabilities can change while running.
    fn is_settable(&self, object: u32, property: Property) -> Result<bool>;

    fn set_bool(&self, object: u32, property: Property, value: bool) -> Result<()>;

    fn set_scalar(&self, object: u32, property: Property, value: f32) -> Result<()>;
}

/// Runs scripts against the system-wide volume settings.
pub trait ScriptRunner {
    /// Run a script to completion and return its standard output.
    fn output(&self, script: &str) -> Result<String>;

    /// Launch a script without waiting for it.
    fn spawn(&self, script: &str) -> Result<()>;
}

impl<T: AudioHardware + ?Sized> AudioHardware for &T {
    fn device_ids(&self) -> Result<Vec<DeviceId>> {
        (**self).device_ids()
    }

    fn default_input_device(&self) -> Result<Option<DeviceId>> {
        (**self).default_input_device()
    }

    fn device_name(&self, device: DeviceId) -> Result<String> {
        (**self).device_name(device)
    }

    fn device_uid(&self, device: DeviceId) -> Result<String> {
        (**self).device_uid(device)
    }

    fn transport_type(&self, device: DeviceId) -> Result<u32> {
        (**self).transport_type(device)
    }

    fn input_channel_count(&self, device: DeviceId) -> Result<u32> {
        (**self).input_channel_count(device)
    }

    fn input_streams(&self, device: DeviceId) -> Result<Vec<StreamId>> {
        (**self).input_streams(device)
    }

    fn is_settable(&self, object: u32, property: Property) -> Result<bool> {
        (**self).is_settable(object, property)
    }

    fn set_bool(&self, object: u32, property: Property, value: bool) -> Result<()> {
        (**self).set_bool(object, property, value)
    }

    fn set_scalar(&self, object: u32, property: Property, value: f32) -> Result<()> {
        (**self).set_scalar(object, property, value)
    }
}

impl<T: AudioHardware + ?Sized> AudioHardware for Arc<T> {
    fn device_ids(&self) -> Result<Vec<DeviceId>> {
        (**self).device_ids()
    }

    fn default_input_device(&self) -> Result<Option<DeviceId>> {
        (**self).default_input_device()
    }

    fn device_name(&self, device: DeviceId) -> Result<String> {
        (**self).device_name(device)
    }

    fn device_uid(&self, device: DeviceId) -> Result<String> {
        (**self).device_uid(device)
    }

    fn transport_type(&self, device: DeviceId) -> Result<u32> {
        (**self).transport_type(device)
    }

    fn input_channel_count(&self, device: DeviceId) -> Result<u32> {
        (**self).input_channel_count(device)
    }

    fn input_streams(&self, device: DeviceId) -> Result<Vec<StreamId>> {
        (**self).input_streams(device)
    }

    fn is_settable(&self, object: u32, property: Property) -> Result<bool> {
        (**self).is_settable(object, property)
    }

    fn set_bool(&self, object: u32, property: Property, value: bool) -> Result<()> {
        (**self).set_bool(object, property, value)
    }

    fn set_scalar(&self, object: u32, property: Property, value: f32) -> Result<()> {
        (**self).set_scalar(object, property, value)
    }
}

impl<T: ScriptRunner + ?Sized> ScriptRunner for &T {
    fn output(&self, script: &str) -> Result<String> {
        (**self).output(script)
    }

    fn spawn(&self, script: &str) -> Result<()> {
        (**self).spawn(script)
    }
}

impl<T: ScriptRunner + ?Sized> ScriptRunner for Arc<T> {
    fn output(&self, script: &str) -> Result<String> {
        (**self).output(script)
    }

    fn spawn(&self, script: &str) -> Result<()> {
        (**self).spawn(script)
    }
}
