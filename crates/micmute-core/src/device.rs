//! Input device data model.
//!
//! Devices and streams are rebuilt on every enumeration. Hardware can come and
//! go at any time, so nothing here is cached between calls.

use std::fmt;

/// Opaque handle to a live audio device. Only valid for the current hardware
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

/// Opaque handle to one of a device's input streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device#{}", self.0)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream#{}", self.0)
    }
}

/// How a device is connected to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    BuiltIn,
    Usb,
    Bluetooth,
    /// Synthesized by software (loopback drivers, conferencing tools)
    Virtual,
    /// Combines several devices into one
    Aggregate,
    Other,
}

/// Packs a four character code the way CoreAudio does.
const fn four_cc(code: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*code)
}

impl TransportKind {
    /// Maps a CoreAudio transport type code to a transport kind.
    pub fn from_transport_type(code: u32) -> Self {
        const BUILT_IN: u32 = four_cc(b"bltn");
        const USB: u32 = four_cc(b"usb ");
        const BLUETOOTH: u32 = four_cc(b"blue");
        const BLUETOOTH_LE: u32 = four_cc(b"blea");
        const VIRTUAL: u32 = four_cc(b"virt");
        const AGGREGATE: u32 = four_cc(b"grup");
        const AUTO_AGGREGATE: u32 = four_cc(b"fgrp");

        match code {
            BUILT_IN => TransportKind::BuiltIn,
            USB => TransportKind::Usb,
            BLUETOOTH | BLUETOOTH_LE => TransportKind::Bluetooth,
            VIRTUAL => TransportKind::Virtual,
            AGGREGATE | AUTO_AGGREGATE => TransportKind::Aggregate,
            _ => TransportKind::Other,
        }
    }

    /// Physical devices are the ones we mute directly. Muting a virtual or
    /// aggregate device can kill the audio session of the app that owns it.
    pub fn is_physical(self) -> bool {
        !matches!(self, TransportKind::Virtual | TransportKind::Aggregate)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::BuiltIn => "built-in",
            TransportKind::Usb => "usb",
            TransportKind::Bluetooth => "bluetooth",
            TransportKind::Virtual => "virtual",
            TransportKind::Aggregate => "aggregate",
            TransportKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// An input-capable audio device as seen during one enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    pub id: DeviceId,
    pub name: String,
    pub transport: TransportKind,
    /// Stable identifier, used for logging only
    pub uid: Option<String>,
}

impl InputDevice {
    pub fn is_physical(&self) -> bool {
        self.transport.is_physical()
    }
}

/// One input stream of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputStream {
    pub id: StreamId,
    pub device: DeviceId,
}
