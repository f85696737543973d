//! Drive a WS2812 LED strip over a serial link using checksummed
//! Adalight-style frames.

pub mod config;
pub mod device;
pub mod output;
pub mod pixel_format;
pub mod protocol;
pub mod transport;
pub mod ws2812;

pub use config::{Config, DeviceType, SettingsProvider};
pub use device::{DeviceEvent, DeviceState, EventSink, LedDevice};
pub use output::FrameSender;
pub use pixel_format::{Color, ColorSequence};
pub use protocol::FrameEncoder;
pub use transport::{ConfigFailurePolicy, SerialTransport, TransportError};
pub use ws2812::Ws2812Device;
