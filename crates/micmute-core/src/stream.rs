//! Input stream activation.

use tracing::debug;

use crate::device::InputDevice;
use crate::hardware::{AudioHardware, Property};

/// Flips the active flag on a device's input streams.
pub struct StreamActivator<'a, H: ?Sized> {
    hardware: &'a H,
}

impl<'a, H: AudioHardware + ?Sized> StreamActivator<'a, H> {
    pub fn new(hardware: &'a H) -> Self {
        Self { hardware }
    }

    /// Sets every settable input stream of `device` to `active`.
    ///
    /// Returns `true` if at least one stream was changed. Most consumer
    /// devices expose no settable streams, so `false` is the common case and
    /// not a failure.
    pub fn set_streams_active(&self, device: &InputDevice, active: bool) -> bool {
        let streams = match self.hardware.input_streams(device.id) {
            Ok(streams) => streams,
            Err(e) => {
                debug!(device = %device.name, error = %e, "Could not list input streams");
                return false;
            }
        };

        let mut changed = false;
        for stream in streams {
            match self.hardware.is_settable(stream.0, Property::StreamActive) {
                Ok(true) => {}
                _ => continue,
            }
            match self
                .hardware
                .set_bool(stream.0, Property::StreamActive, active)
            {
                Ok(()) => {
                    debug!(device = %device.name, %stream, active, "Stream activation set");
                    changed = true;
                }
                Err(e) => {
                    debug!(device = %device.name, %stream, error = %e, "Stream activation failed");
                }
            }
        }
        changed
    }
}
