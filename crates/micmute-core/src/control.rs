//! Per-device mute flag and volume control.

use tracing::debug;

use crate::device::InputDevice;
use crate::hardware::{AudioHardware, Element, Property};

/// Applies mute flags and volume levels across a device's control elements.
pub struct DeviceMuteController<'a, H: ?Sized> {
    hardware: &'a H,
}

impl<'a, H: AudioHardware + ?Sized> DeviceMuteController<'a, H> {
    pub fn new(hardware: &'a H) -> Self {
        Self { hardware }
    }

    /// Mutes or unmutes `device` on the main element and channels 1 and 2.
    ///
    /// Each element gets a mute flag write and a volume write (0.0 or 1.0),
    /// each skipped when the device reports it as not settable. Returns `true`
    /// if any write went through; devices supporting none of these controls
    /// are silently left alone.
    pub fn set_device_mute(&self, device: &InputDevice, mute: bool) -> bool {
        let level = if mute { 0.0 } else { 1.0 };
        let mut applied = false;

        for element in Element::MUTE_TARGETS {
            applied |= self.try_write(device, Property::Mute(element), |hw, id, p| {
                hw.set_bool(id, p, mute)
            });
            applied |= self.try_write(device, Property::Volume(element), |hw, id, p| {
                hw.set_scalar(id, p, level)
            });
        }

        applied
    }

    fn try_write<F>(&self, device: &InputDevice, property: Property, write: F) -> bool
    where
        F: FnOnce(&H, u32, Property) -> crate::hardware::Result<()>,
    {
        match self.hardware.is_settable(device.id.0, property) {
            Ok(true) => {}
            _ => return false,
        }

        match write(self.hardware, device.id.0, property) {
            Ok(()) => {
                debug!(device = %device.name, ?property, "Control written");
                true
            }
            Err(e) => {
                debug!(device = %device.name, ?property, error = %e, "Control write failed");
                false
            }
        }
    }
}
