//! Operation set shared by every LED device backend, plus the events a
//! device reports back to its host.

use std::sync::mpsc::Sender;

use crate::pixel_format::{Color, ColorSequence};
use crate::transport::TransportError;

/// Outcome notifications pushed to the host's event queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A command finished; `true` if its frame (if any) was delivered
    CommandCompleted(bool),
    OpenDeviceSuccess(bool),
    FirmwareVersion(String),
}

/// Optional event queue; a dropped receiver is ignored
#[derive(Debug, Clone, Default)]
pub struct EventSink(Option<Sender<DeviceEvent>>);

impl EventSink {
    pub fn new(sender: Sender<DeviceEvent>) -> Self {
        EventSink(Some(sender))
    }

    pub fn none() -> Self {
        EventSink(None)
    }

    pub fn emit(&self, event: DeviceEvent) {
        if let Some(sender) = &self.0 {
            if sender.send(event).is_err() {
                log::trace!("device event receiver dropped");
            }
        }
    }
}

/// Lifecycle of a device's serial connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Closed,
    Open,
    /// Last `open` failed; cleared by the next `open`
    FailedToOpen,
}

/// Capability interface implemented by each physical LED protocol
///
/// Operations run to completion before returning and report their outcome
/// both as a return value and as a [`DeviceEvent`].
pub trait LedDevice {
    fn name(&self) -> &'static str;

    fn open(&mut self) -> Result<(), TransportError>;
    fn close(&mut self);

    /// Show `colors`, remembering them for later re-emission
    fn set_colors(&mut self, colors: &[Color]) -> bool;
    /// Turn every LED of the last frame off
    fn switch_off_leds(&mut self) -> bool;

    fn set_refresh_delay(&mut self, value: u32) -> bool;
    fn set_color_depth(&mut self, value: u32) -> bool;
    fn set_smooth_slowdown(&mut self, value: u32) -> bool;
    fn set_color_sequence(&mut self, sequence: ColorSequence) -> bool;

    fn request_firmware_version(&mut self) -> String;
    /// Re-read this device's settings from the host and apply them
    fn update_device_settings(&mut self) -> bool;

    fn max_leds_count(&self) -> usize;
    fn default_leds_count(&self) -> usize;
}
