//! CoreAudio implementation of [`AudioHardware`].
//!
//! All calls go through the `AudioObject*PropertyData` family. Nothing is
//! cached: every method asks the HAL again.

use std::ffi::c_void;
use std::mem;
use std::ptr;

use core_foundation::base::TCFType;
use core_foundation::string::{CFString, CFStringRef};
use coreaudio_sys::{
    AudioBufferList, AudioObjectGetPropertyData, AudioObjectGetPropertyDataSize,
    AudioObjectHasProperty, AudioObjectID, AudioObjectIsPropertySettable,
    AudioObjectPropertyAddress, AudioObjectSetPropertyData, Boolean, OSStatus, UInt32,
    kAudioDevicePropertyDeviceUID, kAudioDevicePropertyMute, kAudioDevicePropertyScopeInput,
    kAudioDevicePropertyStreamConfiguration, kAudioDevicePropertyStreams,
    kAudioDevicePropertyTransportType, kAudioDevicePropertyVolumeScalar,
    kAudioHardwarePropertyDefaultInputDevice, kAudioHardwarePropertyDevices,
    kAudioObjectPropertyElementMain, kAudioObjectPropertyName, kAudioObjectPropertyScopeGlobal,
    kAudioObjectSystemObject, kAudioObjectUnknown, kAudioStreamPropertyIsActive,
};
use micmute_core::{AudioHardware, DeviceId, HardwareError, Property, StreamId};

pub(crate) const ELEMENT_MAIN: u32 = kAudioObjectPropertyElementMain as u32;
pub(crate) const SYSTEM_OBJECT: AudioObjectID = kAudioObjectSystemObject as AudioObjectID;

type Result<T> = std::result::Result<T, HardwareError>;

pub(crate) fn address(selector: u32, scope: u32, element: u32) -> AudioObjectPropertyAddress {
    AudioObjectPropertyAddress {
        mSelector: selector,
        mScope: scope,
        mElement: element,
    }
}

pub(crate) fn check(call: &'static str, status: OSStatus) -> Result<()> {
    if status == 0 {
        Ok(())
    } else {
        Err(HardwareError::Status { call, status })
    }
}

fn global(selector: u32) -> AudioObjectPropertyAddress {
    address(selector, kAudioObjectPropertyScopeGlobal as u32, ELEMENT_MAIN)
}

fn input(selector: u32, element: u32) -> AudioObjectPropertyAddress {
    address(selector, kAudioDevicePropertyScopeInput as u32, element)
}

fn property_address(property: Property) -> AudioObjectPropertyAddress {
    match property {
        Property::StreamActive => global(kAudioStreamPropertyIsActive as u32),
        Property::Mute(element) => input(kAudioDevicePropertyMute as u32, element.index()),
        Property::Volume(element) => {
            input(kAudioDevicePropertyVolumeScalar as u32, element.index())
        }
    }
}

fn data_size(object: AudioObjectID, address: &AudioObjectPropertyAddress) -> Result<u32> {
    let mut size: UInt32 = 0;
    let status =
        unsafe { AudioObjectGetPropertyDataSize(object, address, 0, ptr::null(), &mut size) };
    check("AudioObjectGetPropertyDataSize", status)?;
    Ok(size)
}

/// Reads a fixed-size property value.
fn get_value<T: Copy + Default>(
    object: AudioObjectID,
    address: &AudioObjectPropertyAddress,
) -> Result<T> {
    let mut value = T::default();
    let mut size = mem::size_of::<T>() as UInt32;
    let status = unsafe {
        AudioObjectGetPropertyData(
            object,
            address,
            0,
            ptr::null(),
            &mut size,
            &mut value as *mut T as *mut c_void,
        )
    };
    check("AudioObjectGetPropertyData", status)?;
    Ok(value)
}

/// Reads a property holding an array of object ids.
fn get_ids(object: AudioObjectID, address: &AudioObjectPropertyAddress) -> Result<Vec<u32>> {
    let mut size = data_size(object, address)?;
    let count = size as usize / mem::size_of::<AudioObjectID>();
    let mut ids: Vec<AudioObjectID> = vec![0; count];
    if count == 0 {
        return Ok(ids);
    }

    let status = unsafe {
        AudioObjectGetPropertyData(
            object,
            address,
            0,
            ptr::null(),
            &mut size,
            ids.as_mut_ptr() as *mut c_void,
        )
    };
    check("AudioObjectGetPropertyData", status)?;
    // the list can shrink between the size query and the read
    ids.truncate(size as usize / mem::size_of::<AudioObjectID>());
    Ok(ids)
}

/// Reads a CFString property. CoreAudio hands these out retained.
fn get_string(object: AudioObjectID, address: &AudioObjectPropertyAddress) -> Result<String> {
    let mut raw: CFStringRef = ptr::null();
    let mut size = mem::size_of::<CFStringRef>() as UInt32;
    let status = unsafe {
        AudioObjectGetPropertyData(
            object,
            address,
            0,
            ptr::null(),
            &mut size,
            &mut raw as *mut CFStringRef as *mut c_void,
        )
    };
    check("AudioObjectGetPropertyData", status)?;
    if raw.is_null() {
        return Err(HardwareError::Decode("null string property".to_string()));
    }
    let string = unsafe { CFString::wrap_under_create_rule(raw) };
    Ok(string.to_string())
}

fn set_value<T: Copy>(
    object: AudioObjectID,
    address: &AudioObjectPropertyAddress,
    value: T,
) -> Result<()> {
    let status = unsafe {
        AudioObjectSetPropertyData(
            object,
            address,
            0,
            ptr::null(),
            mem::size_of::<T>() as UInt32,
            &value as *const T as *const c_void,
        )
    };
    check("AudioObjectSetPropertyData", status)
}

/// The system's audio hardware, reached through the CoreAudio HAL.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreAudioHardware;

impl CoreAudioHardware {
    pub fn new() -> Self {
        Self
    }
}

impl AudioHardware for CoreAudioHardware {
    fn device_ids(&self) -> Result<Vec<DeviceId>> {
        let ids = get_ids(SYSTEM_OBJECT, &global(kAudioHardwarePropertyDevices as u32))?;
        Ok(ids.into_iter().map(DeviceId).collect())
    }

    fn default_input_device(&self) -> Result<Option<DeviceId>> {
        let id: AudioObjectID = get_value(
            SYSTEM_OBJECT,
            &global(kAudioHardwarePropertyDefaultInputDevice as u32),
        )?;
        if id == kAudioObjectUnknown as AudioObjectID {
            Ok(None)
        } else {
            Ok(Some(DeviceId(id)))
        }
    }

    fn device_name(&self, device: DeviceId) -> Result<String> {
        get_string(device.0, &global(kAudioObjectPropertyName as u32))
    }

    fn device_uid(&self, device: DeviceId) -> Result<String> {
        get_string(device.0, &global(kAudioDevicePropertyDeviceUID as u32))
    }

    fn transport_type(&self, device: DeviceId) -> Result<u32> {
        get_value(device.0, &global(kAudioDevicePropertyTransportType as u32))
    }

    fn input_channel_count(&self, device: DeviceId) -> Result<u32> {
        let address = input(kAudioDevicePropertyStreamConfiguration as u32, ELEMENT_MAIN);
        let mut size = data_size(device.0, &address)?;
        if (size as usize) < mem::size_of::<UInt32>() {
            return Ok(0);
        }

        // u64 words keep the buffer list suitably aligned
        let bytes = (size as usize).max(mem::size_of::<AudioBufferList>());
        let words = bytes.div_ceil(mem::size_of::<u64>());
        let mut storage: Vec<u64> = vec![0; words];
        let list = storage.as_mut_ptr() as *mut AudioBufferList;

        let status = unsafe {
            AudioObjectGetPropertyData(
                device.0,
                &address,
                0,
                ptr::null(),
                &mut size,
                list as *mut c_void,
            )
        };
        check("AudioObjectGetPropertyData", status)?;

        let channels = unsafe {
            let count = (*list).mNumberBuffers as usize;
            let buffers = std::slice::from_raw_parts((*list).mBuffers.as_ptr(), count);
            buffers.iter().map(|b| b.mNumberChannels).sum()
        };
        Ok(channels)
    }

    fn input_streams(&self, device: DeviceId) -> Result<Vec<StreamId>> {
        let ids = get_ids(
            device.0,
            &input(kAudioDevicePropertyStreams as u32, ELEMENT_MAIN),
        )?;
        Ok(ids.into_iter().map(StreamId).collect())
    }

    fn is_settable(&self, object: u32, property: Property) -> Result<bool> {
        let address = property_address(property);
        if unsafe { AudioObjectHasProperty(object, &address) } == 0 {
            return Ok(false);
        }

        let mut settable: Boolean = 0;
        let status = unsafe { AudioObjectIsPropertySettable(object, &address, &mut settable) };
        check("AudioObjectIsPropertySettable", status)?;
        Ok(settable != 0)
    }

    fn set_bool(&self, object: u32, property: Property, value: bool) -> Result<()> {
        set_value::<UInt32>(object, &property_address(property), u32::from(value))
    }

    fn set_scalar(&self, object: u32, property: Property, value: f32) -> Result<()> {
        set_value::<f32>(object, &property_address(property), value.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use micmute_core::{DeviceRegistry, Element};

    use super::*;

    #[test]
    fn test_property_addresses() {
        let mute = property_address(Property::Mute(Element::Channel(2)));
        assert_eq!(mute.mSelector, kAudioDevicePropertyMute as u32);
        assert_eq!(mute.mScope, kAudioDevicePropertyScopeInput as u32);
        assert_eq!(mute.mElement, 2);

        let active = property_address(Property::StreamActive);
        assert_eq!(active.mScope, kAudioObjectPropertyScopeGlobal as u32);
        assert_eq!(active.mElement, ELEMENT_MAIN);
    }

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_list_real_devices() {
        let hw = CoreAudioHardware::new();
        let registry = DeviceRegistry::new(&hw);
        for device in registry.list_all_input_devices() {
            println!("{:?}", device);
        }
        println!("default: {:?}", registry.default_input_device());
    }
}
