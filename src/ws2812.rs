use crate::config::{DeviceType, SettingsProvider};
use crate::device::{DeviceEvent, DeviceState, EventSink, LedDevice};
use crate::pixel_format::{Color, ColorSequence};
use crate::protocol::{clamp_colors, FrameEncoder, MAX_LEDS};
use crate::transport::{SerialTransport, TransportError};

pub const FIRMWARE_VERSION: &str = "unknown (ws2812 device)";

/// WS2812 strip behind a microcontroller speaking Adalight frames
pub struct Ws2812Device {
    port_name: String,
    baud_rate: u32,
    transport: SerialTransport,
    encoder: FrameEncoder,
    sequence: ColorSequence,
    /// Last colors shown, re-sent when only the encoding changes
    colors_saved: Vec<Color>,
    state: DeviceState,
    settings: Box<dyn SettingsProvider>,
    events: EventSink,
}

impl Ws2812Device {
    pub fn new(
        port_name: impl Into<String>,
        baud_rate: u32,
        transport: SerialTransport,
        settings: Box<dyn SettingsProvider>,
    ) -> Self {
        Ws2812Device {
            port_name: port_name.into(),
            baud_rate,
            transport,
            encoder: FrameEncoder::new(),
            sequence: ColorSequence::default(),
            colors_saved: Vec::new(),
            state: DeviceState::Closed,
            settings,
            events: EventSink::none(),
        }
    }

    /// Report outcomes to `events` as well as through return values
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Start with `sequence` instead of RGB; nothing is sent until colors are set
    pub fn with_color_sequence(mut self, sequence: ColorSequence) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn color_sequence(&self) -> ColorSequence {
        self.sequence
    }

    pub fn saved_colors(&self) -> &[Color] {
        &self.colors_saved
    }

    fn write_saved(&mut self) -> bool {
        let frame = self.encoder.encode(&self.colors_saved, self.sequence);
        let ok = self.transport.write(&frame);
        self.events.emit(DeviceEvent::CommandCompleted(ok));
        ok
    }

    fn complete_no_op(&self, what: &str, value: u32) -> bool {
        log::debug!("{what} = {value} has no effect on {}", self.name());
        self.events.emit(DeviceEvent::CommandCompleted(true));
        true
    }
}

impl LedDevice for Ws2812Device {
    fn name(&self) -> &'static str {
        "ws2812"
    }

    fn open(&mut self) -> Result<(), TransportError> {
        let result = self.transport.open(&self.port_name, self.baud_rate);
        self.state = match result {
            Ok(()) => DeviceState::Open,
            Err(_) => DeviceState::FailedToOpen,
        };
        self.events.emit(DeviceEvent::OpenDeviceSuccess(result.is_ok()));
        result
    }

    fn close(&mut self) {
        self.transport.close();
        self.state = DeviceState::Closed;
    }

    fn set_colors(&mut self, colors: &[Color]) -> bool {
        self.colors_saved = clamp_colors(colors).to_vec();
        self.write_saved()
    }

    fn switch_off_leds(&mut self) -> bool {
        self.colors_saved.fill(Color::BLACK);
        self.write_saved()
    }

    // The Adalight frame has no field for timing or depth, so these only
    // acknowledge the request.

    fn set_refresh_delay(&mut self, value: u32) -> bool {
        self.complete_no_op("refresh delay", value)
    }

    fn set_color_depth(&mut self, value: u32) -> bool {
        self.complete_no_op("color depth", value)
    }

    fn set_smooth_slowdown(&mut self, value: u32) -> bool {
        self.complete_no_op("smooth slowdown", value)
    }

    fn set_color_sequence(&mut self, sequence: ColorSequence) -> bool {
        log::debug!("color sequence {} -> {}", self.sequence, sequence);
        self.sequence = sequence;
        self.write_saved()
    }

    fn request_firmware_version(&mut self) -> String {
        self.events.emit(DeviceEvent::FirmwareVersion(FIRMWARE_VERSION.to_string()));
        self.events.emit(DeviceEvent::CommandCompleted(true));
        FIRMWARE_VERSION.to_string()
    }

    fn update_device_settings(&mut self) -> bool {
        let name = self.settings.color_sequence(DeviceType::Ws2812);
        self.set_color_sequence(ColorSequence::from_name(&name))
    }

    fn max_leds_count(&self) -> usize {
        MAX_LEDS
    }

    fn default_leds_count(&self) -> usize {
        1
    }
}

impl Drop for Ws2812Device {
    fn drop(&mut self) {
        self.close();
    }
}
