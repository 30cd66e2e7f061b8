//! Input device enumeration.

use tracing::{debug, warn};

use crate::device::{DeviceId, InputDevice, TransportKind};
use crate::hardware::AudioHardware;

/// Lists input-capable devices from the hardware.
///
/// Every call queries the hardware again. Query failures fail closed: a
/// broken enumeration yields no devices rather than an error.
pub struct DeviceRegistry<'a, H: ?Sized> {
    hardware: &'a H,
}

impl<'a, H: AudioHardware + ?Sized> DeviceRegistry<'a, H> {
    pub fn new(hardware: &'a H) -> Self {
        Self { hardware }
    }

    /// All devices with at least one input channel.
    pub fn list_all_input_devices(&self) -> Vec<InputDevice> {
        let ids = match self.hardware.device_ids() {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to list audio devices");
                return Vec::new();
            }
        };

        ids.into_iter()
            .filter(|&id| self.has_input(id))
            .map(|id| self.describe(id))
            .collect()
    }

    /// Input devices backed by real hardware. Virtual and aggregate devices
    /// are left out so the software that owns them keeps its session.
    pub fn list_physical_input_devices(&self) -> Vec<InputDevice> {
        self.list_all_input_devices()
            .into_iter()
            .filter(|device| {
                let keep = device.is_physical();
                if !keep {
                    debug!(
                        device = %device.name,
                        transport = %device.transport,
                        "Skipping non-physical device"
                    );
                }
                keep
            })
            .collect()
    }

    /// The system default input device, if there is a valid one.
    pub fn default_input_device(&self) -> Option<InputDevice> {
        match self.hardware.default_input_device() {
            Ok(id) => id.map(|id| self.describe(id)),
            Err(e) => {
                warn!(error = %e, "Failed to query default input device");
                None
            }
        }
    }

    fn has_input(&self, id: DeviceId) -> bool {
        match self.hardware.input_channel_count(id) {
            Ok(channels) => channels > 0,
            Err(e) => {
                debug!(%id, error = %e, "Could not read input configuration");
                false
            }
        }
    }

    fn describe(&self, id: DeviceId) -> InputDevice {
        let name = self
            .hardware
            .device_name(id)
            .unwrap_or_else(|_| "Unknown".to_string());
        let transport = self
            .hardware
            .transport_type(id)
            .map(TransportKind::from_transport_type)
            .unwrap_or(TransportKind::Other);
        let uid = self.hardware.device_uid(id).ok();

        InputDevice {
            id,
            name,
            transport,
            uid,
        }
    }
}
