//! In-memory hardware for tests.
//!
//! [`MockHardware`] and [`MockScripts`] record every successful write so
//! tests can assert which channels were driven and in what order.

use parking_lot::Mutex;

use crate::device::{DeviceId, StreamId};
use crate::hardware::{AudioHardware, HardwareError, Property, Result, ScriptRunner};

const BUILT_IN: u32 = u32::from_be_bytes(*b"bltn");
const USB: u32 = u32::from_be_bytes(*b"usb ");
const VIRTUAL: u32 = u32::from_be_bytes(*b"virt");
const AGGREGATE: u32 = u32::from_be_bytes(*b"grup");

/// A fake device description.
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub id: u32,
    pub name: String,
    pub transport: u32,
    pub input_channels: u32,
    pub streams: Vec<u32>,
    pub streams_settable: bool,
    /// Device properties reported as settable
    pub controls: Vec<Property>,
}

impl MockDevice {
    pub fn new(id: u32, name: &str, transport: u32) -> Self {
        Self {
            id,
            name: name.to_string(),
            transport,
            input_channels: 1,
            streams: Vec::new(),
            streams_settable: false,
            controls: Vec::new(),
        }
    }

    pub fn builtin(id: u32, name: &str) -> Self {
        Self::new(id, name, BUILT_IN)
    }

    pub fn usb(id: u32, name: &str) -> Self {
        Self::new(id, name, USB)
    }

    pub fn virtual_device(id: u32, name: &str) -> Self {
        Self::new(id, name, VIRTUAL)
    }

    pub fn aggregate(id: u32, name: &str) -> Self {
        Self::new(id, name, AGGREGATE)
    }

    /// A device with no input channels, such as speakers.
    pub fn output_only(id: u32, name: &str) -> Self {
        Self {
            input_channels: 0,
            ..Self::new(id, name, BUILT_IN)
        }
    }

    pub fn with_streams(mut self, streams: &[u32], settable: bool) -> Self {
        self.streams = streams.to_vec();
        self.streams_settable = settable;
        self
    }

    pub fn with_controls(mut self, controls: &[Property]) -> Self {
        self.controls = controls.to_vec();
        self
    }
}

/// A recorded hardware write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Write {
    Bool(u32, Property, bool),
    Scalar(u32, Property, f32),
}

impl Write {
    pub fn object(&self) -> u32 {
        match *self {
            Write::Bool(object, ..) | Write::Scalar(object, ..) => object,
        }
    }
}

#[derive(Debug, Default)]
struct HardwareState {
    devices: Vec<MockDevice>,
    default_device: Option<u32>,
    fail_enumeration: bool,
    fail_writes: bool,
    writes: Vec<Write>,
    probes: Vec<u32>,
}

/// Fake property-based audio hardware.
#[derive(Debug, Default)]
pub struct MockHardware {
    state: Mutex<HardwareState>,
}

impl MockHardware {
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self {
            state: Mutex::new(HardwareState {
                devices,
                ..Default::default()
            }),
        }
    }

    pub fn add_device(&self, device: MockDevice) {
        self.state.lock().devices.push(device);
    }

    pub fn remove_device(&self, id: u32) {
        self.state.lock().devices.retain(|d| d.id != id);
    }

    pub fn set_default(&self, id: Option<u32>) {
        self.state.lock().default_device = id;
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.state.lock().fail_enumeration = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }

    /// How many settability checks were made against `object`.
    pub fn settable_probes(&self, object: u32) -> usize {
        self.state
            .lock()
            .probes
            .iter()
            .filter(|&&o| o == object)
            .count()
    }

    fn with_device<T>(&self, id: DeviceId, f: impl FnOnce(&MockDevice) -> T) -> Result<T> {
        let state = self.state.lock();
        state
            .devices
            .iter()
            .find(|d| d.id == id.0)
            .map(f)
            .ok_or(HardwareError::Status {
                call: "mock device lookup",
                status: -1,
            })
    }

    fn record(&self, write: Write) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(HardwareError::Status {
                call: "mock write",
                status: -1,
            });
        }
        state.writes.push(write);
        Ok(())
    }
}

impl AudioHardware for MockHardware {
    fn device_ids(&self) -> Result<Vec<DeviceId>> {
        let state = self.state.lock();
        if state.fail_enumeration {
            return Err(HardwareError::Status {
                call: "mock enumeration",
                status: -1,
            });
        }
        Ok(state.devices.iter().map(|d| DeviceId(d.id)).collect())
    }

    fn default_input_device(&self) -> Result<Option<DeviceId>> {
        Ok(self.state.lock().default_device.map(DeviceId))
    }

    fn device_name(&self, device: DeviceId) -> Result<String> {
        self.with_device(device, |d| d.name.clone())
    }

    fn device_uid(&self, device: DeviceId) -> Result<String> {
        self.with_device(device, |d| format!("uid-{}", d.id))
    }

    fn transport_type(&self, device: DeviceId) -> Result<u32> {
        self.with_device(device, |d| d.transport)
    }

    fn input_channel_count(&self, device: DeviceId) -> Result<u32> {
        self.with_device(device, |d| d.input_channels)
    }

    fn input_streams(&self, device: DeviceId) -> Result<Vec<StreamId>> {
        self.with_device(device, |d| d.streams.iter().copied().map(StreamId).collect())
    }

    fn is_settable(&self, object: u32, property: Property) -> Result<bool> {
        let mut state = self.state.lock();
        state.probes.push(object);

        let settable = state.devices.iter().any(|d| {
            if d.id == object {
                d.controls.contains(&property)
            } else {
                property == Property::StreamActive
                    && d.streams_settable
                    && d.streams.contains(&object)
            }
        });
        Ok(settable)
    }

    fn set_bool(&self, object: u32, property: Property, value: bool) -> Result<()> {
        self.record(Write::Bool(object, property, value))
    }

    fn set_scalar(&self, object: u32, property: Property, value: f32) -> Result<()> {
        self.record(Write::Scalar(object, property, value))
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    volume: u8,
    fail: bool,
    queries: Vec<String>,
    launched: Vec<String>,
}

/// Fake script runner holding a system input volume.
#[derive(Debug, Default)]
pub struct MockScripts {
    state: Mutex<ScriptState>,
}

impl MockScripts {
    pub fn with_volume(volume: u8) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                volume,
                ..Default::default()
            }),
        }
    }

    pub fn set_volume(&self, volume: u8) {
        self.state.lock().volume = volume;
    }

    pub fn fail(&self, fail: bool) {
        self.state.lock().fail = fail;
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.lock().queries.clone()
    }

    pub fn launched(&self) -> Vec<String> {
        self.state.lock().launched.clone()
    }

    /// Levels passed to `set volume input volume`, in order.
    pub fn written_levels(&self) -> Vec<u8> {
        self.state
            .lock()
            .launched
            .iter()
            .filter_map(|script| script.strip_prefix("set volume input volume "))
            .filter_map(|level| level.parse().ok())
            .collect()
    }
}

impl ScriptRunner for MockScripts {
    fn output(&self, script: &str) -> Result<String> {
        let mut state = self.state.lock();
        if state.fail {
            return Err(HardwareError::Script("mock failure".to_string()));
        }
        state.queries.push(script.to_string());
        Ok(format!("{}\n", state.volume))
    }

    fn spawn(&self, script: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail {
            return Err(HardwareError::Script("mock failure".to_string()));
        }
        state.launched.push(script.to_string());
        Ok(())
    }
}
