//! Default input device change notifications.
//!
//! CoreAudio calls property listeners on its own notification thread. The
//! handler passed to [`DeviceChangeWatcher::start`] should only forward the
//! notification to the thread that owns the mute state.

use std::ffi::c_void;

use coreaudio_sys::{
    AudioObjectAddPropertyListener, AudioObjectID, AudioObjectPropertyAddress,
    AudioObjectRemovePropertyListener, OSStatus, UInt32, kAudioHardwarePropertyDefaultInputDevice,
    kAudioHardwarePropertyDevices, kAudioObjectPropertyScopeGlobal,
};
use micmute_core::HardwareError;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::coreaudio::{ELEMENT_MAIN, SYSTEM_OBJECT, address, check};

type Handler = Mutex<Box<dyn FnMut() + Send>>;

/// System properties whose changes mean the device set may need muting
/// again: the default input device and the list of attached devices.
fn watched_addresses() -> [AudioObjectPropertyAddress; 2] {
    let scope = kAudioObjectPropertyScopeGlobal as u32;
    [
        address(kAudioHardwarePropertyDefaultInputDevice as u32, scope, ELEMENT_MAIN),
        address(kAudioHardwarePropertyDevices as u32, scope, ELEMENT_MAIN),
    ]
}

unsafe extern "C" fn on_property_changed(
    _object: AudioObjectID,
    _count: UInt32,
    _addresses: *const AudioObjectPropertyAddress,
    client_data: *mut c_void,
) -> OSStatus {
    if client_data.is_null() {
        return 0;
    }
    let handler = unsafe { &*(client_data as *const Handler) };
    (handler.lock())();
    0
}

/// Replaces the handler with a no-op. Waits for a running callback, since
/// the callback holds the lock while it runs.
fn disarm(handler: &Handler) {
    *handler.lock() = Box::new(|| {});
}

/// Keeps CoreAudio listeners registered until dropped.
pub struct DeviceChangeWatcher {
    // Leaked: CoreAudio may still be inside a callback when removal returns,
    // so the handler must outlive the watcher. It is disarmed on drop.
    handler: &'static Handler,
    registered: Vec<AudioObjectPropertyAddress>,
}

impl DeviceChangeWatcher {
    /// Registers `on_change` for default input device and device list
    /// changes.
    pub fn start<F>(on_change: F) -> Result<Self, HardwareError>
    where
        F: FnMut() + Send + 'static,
    {
        let handler: &'static Handler = Box::leak(Box::new(Mutex::new(Box::new(on_change))));
        let mut watcher = Self {
            handler,
            registered: Vec::new(),
        };

        for address in watched_addresses() {
            let status = unsafe {
                AudioObjectAddPropertyListener(
                    SYSTEM_OBJECT,
                    &address,
                    Some(on_property_changed),
                    watcher.client_data(),
                )
            };
            // dropping `watcher` removes whatever was already registered
            check("AudioObjectAddPropertyListener", status)?;
            watcher.registered.push(address);
        }

        debug!(listeners = watcher.registered.len(), "Device change listeners registered");
        Ok(watcher)
    }

    /// Unregisters the listeners.
    pub fn stop(self) {}

    fn client_data(&self) -> *mut c_void {
        self.handler as *const Handler as *mut c_void
    }
}

impl Drop for DeviceChangeWatcher {
    fn drop(&mut self) {
        for address in self.registered.drain(..) {
            let status = unsafe {
                AudioObjectRemovePropertyListener(
                    SYSTEM_OBJECT,
                    &address,
                    Some(on_property_changed),
                    self.client_data(),
                )
            };
            if let Err(e) = check("AudioObjectRemovePropertyListener", status) {
                warn!(error = %e, "Failed to remove device listener");
            }
        }

        disarm(self.handler);
        debug!("Device change listeners removed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_watched_addresses() {
        let [default_input, devices] = watched_addresses();
        assert_eq!(
            default_input.mSelector,
            kAudioHardwarePropertyDefaultInputDevice as u32
        );
        assert_eq!(devices.mSelector, kAudioHardwarePropertyDevices as u32);
    }

    #[test]
    fn test_callback_invokes_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler: Handler = Mutex::new(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let status = unsafe {
            on_property_changed(
                SYSTEM_OBJECT,
                0,
                std::ptr::null(),
                &handler as *const Handler as *mut c_void,
            )
        };
        assert_eq!(status, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disarmed_handler_ignores_late_callbacks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler: Handler = Mutex::new(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let client_data = &handler as *const Handler as *mut c_void;

        unsafe { on_property_changed(SYSTEM_OBJECT, 0, std::ptr::null(), client_data) };
        disarm(&handler);
        unsafe { on_property_changed(SYSTEM_OBJECT, 0, std::ptr::null(), client_data) };

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // the original closure and its captures are released
        assert_eq!(Arc::strong_count(&calls), 1);
    }

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_start_and_stop() {
        let watcher = DeviceChangeWatcher::start(|| {}).unwrap();
        watcher.stop();
    }
}
