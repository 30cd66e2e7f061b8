//! The mute orchestrator.
//!
//! [`MuteStateMachine`] owns the [`MuteState`] and drives every mute channel:
//! stream activation, per-device controls, then the system-wide volume. It is
//! meant to live on a single event-dispatch thread; the `is_toggling` flag is
//! a re-entrancy guard, not a lock.
//!
//! A toggle opens a grace window that ends at [`MuteStateMachine::settle_deadline`].
//! The owner of the event queue wakes at that instant and calls
//! [`MuteStateMachine::poll`]; toggles and device changes also check the
//! deadline themselves, so a missed wake-up never leaves the guard stuck.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::control::DeviceMuteController;
use crate::device::InputDevice;
use crate::hardware::{AudioHardware, ScriptRunner};
use crate::legacy::LegacySystemVolume;
use crate::registry::DeviceRegistry;
use crate::state::{MicState, MuteState, SavedVolume};
use crate::stream::StreamActivator;

/// Result of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// A toggle was already in flight; nothing changed
    Ignored,
    Muted,
    Unmuted,
}

/// Which channels took effect during one mute or unmute run. Only used for
/// diagnostics, it never changes what the next attempt does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceReport {
    /// Devices the sequence visited
    pub devices: usize,
    /// Devices where at least one stream changed
    pub streams_changed: usize,
    /// Devices where at least one mute or volume control was written
    pub controls_changed: usize,
}

pub struct MuteStateMachine<H, R> {
    hardware: H,
    legacy: LegacySystemVolume<R>,
    state: MuteState,
    grace_period: Duration,
    settle_at: Option<Instant>,
    include_virtual: bool,
}

impl<H: AudioHardware, R: ScriptRunner> MuteStateMachine<H, R> {
    /// How long a toggle keeps further toggles and device changes out.
    pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(300);

    /// Creates the state machine from the live system input volume.
    ///
    /// Startup only reads; no channel is written until the first toggle or
    /// device change.
    pub fn new(hardware: H, scripts: R) -> Self {
        let legacy = LegacySystemVolume::new(scripts);
        let state = MuteState::from_startup_volume(legacy.read_volume());
        info!(
            muted = state.is_muted,
            saved_volume = %state.saved_volume,
            "Initial microphone state"
        );

        Self {
            hardware,
            legacy,
            state,
            grace_period: Self::DEFAULT_GRACE_PERIOD,
            settle_at: None,
            include_virtual: false,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Also target virtual and aggregate devices when muting.
    pub fn with_virtual_devices(mut self, include: bool) -> Self {
        self.include_virtual = include;
        self
    }

    pub fn state(&self) -> MuteState {
        self.state
    }

    pub fn currently_muted(&self) -> bool {
        self.state.is_muted
    }

    pub fn mic_state(&self) -> MicState {
        self.state.mic_state()
    }

    pub fn is_toggling(&self) -> bool {
        self.state.is_toggling
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// When the current grace window ends, if one is open.
    pub fn settle_deadline(&self) -> Option<Instant> {
        self.settle_at
    }

    /// Ends the grace window once `now` has reached its deadline.
    pub fn poll(&mut self, now: Instant) {
        if self.settle_at.is_some_and(|at| now >= at) {
            self.settle();
        }
    }

    /// Flips between muted and unmuted.
    ///
    /// Leaves `is_toggling` set until [`Self::settle_deadline`]. Requests
    /// that arrive before then are ignored and do not extend the window.
    pub fn toggle(&mut self) -> ToggleOutcome {
        let now = Instant::now();
        self.poll(now);
        if self.state.is_toggling {
            debug!("Toggle already in flight, ignoring");
            return ToggleOutcome::Ignored;
        }
        self.state.is_toggling = true;
        self.settle_at = Some(now + self.grace_period);

        if self.state.is_muted {
            self.unmute();
            ToggleOutcome::Unmuted
        } else {
            self.state.saved_volume = SavedVolume::from_reading(self.legacy.read_volume());
            let report = self.run_mute_sequence();
            self.state.is_muted = true;
            info!(
                saved_volume = %self.state.saved_volume,
                devices = report.devices,
                streams_changed = report.streams_changed,
                controls_changed = report.controls_changed,
                "Microphone muted"
            );
            ToggleOutcome::Muted
        }
    }

    /// Ends the grace window right away.
    pub fn settle(&mut self) {
        if self.state.is_toggling {
            debug!("Toggle settled");
        }
        self.state.is_toggling = false;
        self.settle_at = None;
    }

    /// Reconciles the mute state with a changed device set.
    ///
    /// While muted the full mute sequence runs again, since a newly connected
    /// or newly default device starts out live. While unmuted only the saved
    /// volume is refreshed. Returns the report when a sequence ran.
    pub fn on_device_changed(&mut self) -> Option<SequenceReport> {
        self.poll(Instant::now());
        if self.state.is_toggling {
            debug!("Device change during toggle, ignoring");
            return None;
        }

        if self.state.is_muted {
            let report = self.run_mute_sequence();
            info!(
                devices = report.devices,
                streams_changed = report.streams_changed,
                controls_changed = report.controls_changed,
                "Re-applied mute after device change"
            );
            Some(report)
        } else {
            self.state.saved_volume = SavedVolume::from_reading(self.legacy.read_volume());
            debug!(saved_volume = %self.state.saved_volume, "Refreshed saved volume");
            None
        }
    }

    /// Leaves the system audible before the process exits. Returns the
    /// report if an unmute had to run.
    pub fn quit(&mut self) -> Option<SequenceReport> {
        if !self.state.is_muted {
            return None;
        }
        info!("Unmuting before exit");
        Some(self.unmute())
    }

    /// Name of the default input device, if there is one.
    pub fn current_device_name(&self) -> Option<String> {
        DeviceRegistry::new(&self.hardware)
            .default_input_device()
            .map(|device| device.name)
    }

    /// Name of the default input device for display.
    pub fn current_device_label(&self) -> String {
        self.current_device_name()
            .unwrap_or_else(|| "No microphone".to_string())
    }

    fn unmute(&mut self) -> SequenceReport {
        let report = self.run_unmute_sequence();
        self.state.is_muted = false;
        info!(
            restored_volume = %self.state.saved_volume,
            devices = report.devices,
            streams_changed = report.streams_changed,
            controls_changed = report.controls_changed,
            "Microphone unmuted"
        );
        report
    }

    fn targets(&self) -> Vec<InputDevice> {
        let registry = DeviceRegistry::new(&self.hardware);
        if self.include_virtual {
            registry.list_all_input_devices()
        } else {
            registry.list_physical_input_devices()
        }
    }

    /// Streams first, then mute flag and volume on every device, then the
    /// system volume. Some devices only go silent through one of these, so
    /// all of them are attempted regardless of earlier results.
    fn run_mute_sequence(&self) -> SequenceReport {
        let report = self.apply_to_devices(true);
        self.legacy.write_volume(0);
        report
    }

    fn run_unmute_sequence(&self) -> SequenceReport {
        let report = self.apply_to_devices(false);
        self.legacy.write_volume(self.state.saved_volume.get());
        report
    }

    fn apply_to_devices(&self, mute: bool) -> SequenceReport {
        let streams = StreamActivator::new(&self.hardware);
        let controls = DeviceMuteController::new(&self.hardware);
        let mut report = SequenceReport::default();

        for device in self.targets() {
            let stream_changed = streams.set_streams_active(&device, !mute);
            let control_changed = controls.set_device_mute(&device, mute);
            debug!(
                device = %device.name,
                uid = device.uid.as_deref().unwrap_or("-"),
                transport = %device.transport,
                stream_changed,
                control_changed,
                mute,
                "Applied to device"
            );

            report.devices += 1;
            report.streams_changed += usize::from(stream_changed);
            report.controls_changed += usize::from(control_changed);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{Element, Property};
    use crate::mock::{MockDevice, MockHardware, MockScripts, Write};

    fn rig() -> (MockHardware, MockScripts) {
        let hw = MockHardware::new(vec![
            MockDevice::builtin(1, "MacBook Pro Microphone")
                .with_streams(&[10], true)
                .with_controls(&[Property::Mute(Element::Main), Property::Volume(Element::Main)]),
            MockDevice::usb(2, "USB Headset").with_controls(&[Property::Mute(Element::Channel(1))]),
            MockDevice::virtual_device(3, "Zoom Audio")
                .with_streams(&[30], true)
                .with_controls(&[Property::Mute(Element::Main)]),
        ]);
        (hw, MockScripts::with_volume(55))
    }

    #[test]
    fn test_toggle_alternates() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);

        let mut expected = ToggleOutcome::Muted;
        for _ in 0..6 {
            assert_eq!(machine.toggle(), expected);
            machine.settle();
            expected = match expected {
                ToggleOutcome::Muted => ToggleOutcome::Unmuted,
                _ => ToggleOutcome::Muted,
            };
        }
        assert!(!machine.currently_muted());
    }

    #[test]
    fn test_toggle_while_toggling_is_ignored() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);

        assert_eq!(machine.toggle(), ToggleOutcome::Muted);
        let before = machine.state();
        let writes = hw.writes().len();

        assert_eq!(machine.toggle(), ToggleOutcome::Ignored);
        assert_eq!(machine.state(), before);
        assert_eq!(hw.writes().len(), writes);

        machine.settle();
        assert!(!machine.is_toggling());
        assert_eq!(machine.toggle(), ToggleOutcome::Unmuted);
    }

    #[test]
    fn test_scenario_mute_and_restore() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);
        assert!(!machine.currently_muted());
        assert_eq!(machine.state().saved_volume.get(), 55);

        machine.toggle();
        assert!(machine.currently_muted());
        assert_eq!(machine.state().saved_volume.get(), 55);
        assert_eq!(scripts.written_levels(), vec![0]);
        machine.settle();

        machine.toggle();
        assert!(!machine.currently_muted());
        assert_eq!(machine.state().saved_volume.get(), 55);
        assert_eq!(scripts.written_levels(), vec![0, 55]);
    }

    #[test]
    fn test_restore_uses_volume_captured_at_mute() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);

        scripts.set_volume(80);
        machine.toggle();
        machine.settle();
        scripts.set_volume(0);
        machine.toggle();

        assert_eq!(scripts.written_levels(), vec![0, 80]);
    }

    #[test]
    fn test_zero_reading_saves_full_volume() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);

        scripts.set_volume(0);
        machine.toggle();
        assert_eq!(machine.state().saved_volume.get(), 100);
        machine.settle();
        machine.toggle();
        assert_eq!(scripts.written_levels(), vec![0, 100]);
    }

    #[test]
    fn test_startup_muted() {
        let (hw, _) = rig();
        let scripts = MockScripts::with_volume(0);
        let mut machine = MuteStateMachine::new(&hw, &scripts);

        assert!(machine.currently_muted());
        assert_eq!(machine.state().saved_volume.get(), 100);
        assert!(hw.writes().is_empty());

        assert_eq!(machine.toggle(), ToggleOutcome::Unmuted);
        assert_eq!(scripts.written_levels(), vec![100]);
    }

    #[test]
    fn test_mute_sequence_order_and_targets() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);
        machine.toggle();

        assert_eq!(
            hw.writes(),
            vec![
                Write::Bool(10, Property::StreamActive, false),
                Write::Bool(1, Property::Mute(Element::Main), true),
                Write::Scalar(1, Property::Volume(Element::Main), 0.0),
                Write::Bool(2, Property::Mute(Element::Channel(1)), true),
            ]
        );
        // the virtual device is left alone
        assert!(!hw.writes().iter().any(|w| w.object() == 3 || w.object() == 30));
    }

    #[test]
    fn test_unmute_sequence_reactivates() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);
        machine.toggle();
        machine.settle();
        hw.clear_writes();

        machine.toggle();
        assert_eq!(
            hw.writes(),
            vec![
                Write::Bool(10, Property::StreamActive, true),
                Write::Bool(1, Property::Mute(Element::Main), false),
                Write::Scalar(1, Property::Volume(Element::Main), 1.0),
                Write::Bool(2, Property::Mute(Element::Channel(1)), false),
            ]
        );
    }

    #[test]
    fn test_include_virtual_devices() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts).with_virtual_devices(true);
        machine.toggle();
        assert!(hw.writes().iter().any(|w| w.object() == 30));
        assert!(hw.writes().iter().any(|w| w.object() == 3));
    }

    #[test]
    fn test_legacy_write_happens_without_any_device() {
        let hw = MockHardware::new(vec![]);
        let scripts = MockScripts::with_volume(40);
        let mut machine = MuteStateMachine::new(&hw, &scripts);

        assert_eq!(machine.toggle(), ToggleOutcome::Muted);
        assert_eq!(scripts.written_levels(), vec![0]);
    }

    #[test]
    fn test_device_change_while_muted_reapplies() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);
        machine.toggle();
        machine.settle();
        hw.clear_writes();

        hw.add_device(
            MockDevice::usb(4, "New Headset").with_controls(&[Property::Mute(Element::Main)]),
        );
        let report = machine.on_device_changed().unwrap();

        assert_eq!(report.devices, 3);
        assert!(machine.currently_muted());
        assert!(
            hw.writes()
                .contains(&Write::Bool(4, Property::Mute(Element::Main), true))
        );
        assert_eq!(scripts.written_levels(), vec![0, 0]);
    }

    #[test]
    fn test_unplugged_device_is_skipped_on_unmute() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);

        machine.toggle();
        machine.settle();
        hw.remove_device(2);
        assert_eq!(machine.on_device_changed().unwrap().devices, 1);
        hw.clear_writes();

        assert_eq!(machine.toggle(), ToggleOutcome::Unmuted);
        assert!(hw.writes().iter().all(|w| w.object() != 2));
        assert!(
            hw.writes()
                .contains(&Write::Bool(1, Property::Mute(Element::Main), false))
        );
        assert_eq!(scripts.written_levels(), vec![0, 0, 55]);
    }

    #[test]
    fn test_device_change_while_unmuted_refreshes_volume() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);

        scripts.set_volume(64);
        assert!(machine.on_device_changed().is_none());
        assert!(!machine.currently_muted());
        assert_eq!(machine.state().saved_volume.get(), 64);
        assert!(hw.writes().is_empty());
        assert!(scripts.written_levels().is_empty());

        scripts.set_volume(0);
        machine.on_device_changed();
        assert_eq!(machine.state().saved_volume.get(), 100);
    }

    #[test]
    fn test_device_change_while_toggling_is_ignored() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);
        machine.toggle();
        let before = machine.state();
        let writes = hw.writes().len();

        scripts.set_volume(12);
        assert!(machine.on_device_changed().is_none());
        assert_eq!(machine.state(), before);
        assert_eq!(hw.writes().len(), writes);
    }

    #[test]
    fn test_quit_while_muted_unmutes_once() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);
        machine.toggle();

        assert!(machine.quit().is_some());
        assert!(!machine.currently_muted());
        assert_eq!(scripts.written_levels(), vec![0, 55]);
    }

    #[test]
    fn test_quit_while_unmuted_does_nothing() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);

        assert!(machine.quit().is_none());
        assert!(hw.writes().is_empty());
        assert!(scripts.written_levels().is_empty());
    }

    #[test]
    fn test_device_label() {
        let (hw, scripts) = rig();
        let machine = MuteStateMachine::new(&hw, &scripts);
        assert_eq!(machine.current_device_label(), "No microphone");
        assert!(machine.current_device_name().is_none());

        hw.set_default(Some(1));
        assert_eq!(machine.current_device_label(), "MacBook Pro Microphone");
        assert_eq!(
            machine.current_device_name().as_deref(),
            Some("MacBook Pro Microphone")
        );
    }

    #[test]
    fn test_poll_before_deadline_keeps_guard() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);
        let started = Instant::now();
        assert!(machine.settle_deadline().is_none());

        machine.toggle();
        let deadline = machine.settle_deadline().unwrap();
        assert!(deadline >= started + machine.grace_period());

        machine.poll(deadline - Duration::from_millis(1));
        assert!(machine.is_toggling());
        assert_eq!(machine.settle_deadline(), Some(deadline));
    }

    #[test]
    fn test_poll_at_deadline_releases_guard() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);
        machine.toggle();
        let deadline = machine.settle_deadline().unwrap();

        machine.poll(deadline);
        assert!(!machine.is_toggling());
        assert!(machine.settle_deadline().is_none());

        machine.toggle();
        let deadline = machine.settle_deadline().unwrap();
        machine.poll(deadline + Duration::from_secs(1));
        assert!(!machine.is_toggling());
    }

    #[test]
    fn test_ignored_toggle_keeps_deadline() {
        let (hw, scripts) = rig();
        let mut machine = MuteStateMachine::new(&hw, &scripts);
        machine.toggle();
        let deadline = machine.settle_deadline();

        assert_eq!(machine.toggle(), ToggleOutcome::Ignored);
        assert_eq!(machine.settle_deadline(), deadline);
    }

    #[test]
    fn test_guard_expires_without_explicit_settle() {
        let (hw, scripts) = rig();
        let mut machine =
            MuteStateMachine::new(&hw, &scripts).with_grace_period(Duration::from_millis(10));

        assert_eq!(machine.toggle(), ToggleOutcome::Muted);
        std::thread::sleep(Duration::from_millis(50));
        assert!(machine.on_device_changed().is_some());
        assert!(!machine.is_toggling());

        assert_eq!(machine.toggle(), ToggleOutcome::Unmuted);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(machine.toggle(), ToggleOutcome::Muted);
    }

    #[test]
    fn test_custom_grace_period() {
        let (hw, scripts) = rig();
        let machine = MuteStateMachine::new(&hw, &scripts);
        assert_eq!(machine.grace_period(), Duration::from_millis(300));

        let machine = machine.with_grace_period(Duration::from_millis(50));
        assert_eq!(machine.grace_period(), Duration::from_millis(50));
    }
}
