//! End-to-end: device operations through the public API, checked against
//! the bytes that reach a mock serial port.

use std::sync::mpsc;

use ws2812_serial::transport::mock::MockPorts;
use ws2812_serial::{
    Color, ColorSequence, Config, ConfigFailurePolicy, DeviceEvent, DeviceState, EventSink,
    FrameEncoder, FrameSender, LedDevice, SerialTransport, Ws2812Device,
};

fn config(sequence: &str) -> Config {
    let json = format!(
        r#"{{
            "device": {{ "port": "mock0", "baud_rate": 115200, "led_count": 3 }},
            "color_sequences": {{ "ws2812": "{sequence}" }}
        }}"#
    );
    serde_json::from_str(&json).unwrap()
}

fn device(ports: &MockPorts, config: Config, policy: ConfigFailurePolicy) -> Ws2812Device {
    let transport = SerialTransport::new(Box::new(ports.clone()), policy);
    Ws2812Device::new(
        config.device.port.clone(),
        config.device.baud_rate,
        transport,
        Box::new(config),
    )
}

#[test]
fn full_session_produces_expected_bytes() {
    let ports = MockPorts::new();
    let (tx, rx) = mpsc::channel();
    let mut dev = device(&ports, config("GRB"), ConfigFailurePolicy::Lenient)
        .with_events(EventSink::new(tx));

    dev.open().unwrap();
    dev.update_device_settings();
    assert!(dev.set_colors(&[
        Color::new(0xFF, 0x00, 0x00),
        Color::new(0x00, 0xFF, 0x00),
        Color::new(0x00, 0x00, 0xFF),
    ]));
    assert!(dev.switch_off_leds());
    dev.close();

    let frames = ports.frames();
    assert_eq!(frames.len(), 3);
    // Nothing saved yet: the reconfiguration resends an empty frame
    assert_eq!(frames[0], vec![b'A', b'd', b'a', 0xFF, 0xFF, 0x55]);
    assert_eq!(
        frames[1],
        vec![b'A', b'd', b'a', 0x00, 0x02, 0x57, 0, 15, 0, 15, 0, 0, 0, 0, 15]
    );
    assert_eq!(
        frames[2],
        vec![b'A', b'd', b'a', 0x00, 0x02, 0x57, 0, 0, 0, 0, 0, 0, 0, 0, 0]
    );

    let events: Vec<DeviceEvent> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![
            DeviceEvent::OpenDeviceSuccess(true),
            DeviceEvent::CommandCompleted(true),
            DeviceEvent::CommandCompleted(true),
            DeviceEvent::CommandCompleted(true),
        ]
    );
}

#[test]
fn reconfiguration_round_trips_through_cache() {
    let colors: Vec<Color> = (0..20u8).map(|i| Color::new(i * 12, 255 - i, i * 5)).collect();

    for sequence in ColorSequence::ALL {
        let ports = MockPorts::new();
        let mut dev = device(&ports, config("RGB"), ConfigFailurePolicy::Lenient);
        dev.open().unwrap();
        dev.set_colors(&colors);
        dev.set_color_sequence(sequence);

        let expected = FrameEncoder::new().encode(&colors, sequence);
        assert_eq!(ports.frames()[1], expected, "{sequence}");
    }
}

#[test]
fn flaky_open_recovers_with_one_retry() {
    let ports = MockPorts { fail_opens: 1, ..MockPorts::new() };
    let mut dev = device(&ports, config("RGB"), ConfigFailurePolicy::Lenient);
    assert!(dev.open().is_ok());
    assert_eq!(dev.state(), DeviceState::Open);
    assert_eq!(ports.open_attempts(), 2);
}

#[test]
fn configuration_failure_policy_decides_open_outcome() {
    let lenient = MockPorts { fail_baud_rate: true, ..MockPorts::new() };
    let mut dev = device(&lenient, config("RGB"), ConfigFailurePolicy::Lenient);
    assert!(dev.open().is_ok());
    assert!(dev.set_colors(&[Color::BLACK]));

    let strict = MockPorts { fail_baud_rate: true, ..MockPorts::new() };
    let mut dev = device(&strict, config("RGB"), ConfigFailurePolicy::Strict);
    assert!(dev.open().is_err());
    assert_eq!(dev.state(), DeviceState::FailedToOpen);
    assert!(!dev.set_colors(&[Color::BLACK]));
    assert_eq!(strict.write_calls(), 0);
}

#[test]
fn background_sender_writes_encoded_frames() {
    let ports = MockPorts::new();
    let mut transport = SerialTransport::new(Box::new(ports.clone()), ConfigFailurePolicy::Lenient);
    transport.open("mock0", 115_200).unwrap();

    let mut encoder = FrameEncoder::new();
    let mut sender = FrameSender::new(transport, 2);
    let first = encoder.encode(&[Color::new(0x80, 0x40, 0x20)], ColorSequence::Bgr);
    let off = encoder.encode(&[Color::BLACK], ColorSequence::Bgr);
    assert!(sender.send_frame(first.clone()));
    assert!(sender.send_frame(off.clone()));
    assert!(sender.results().recv().unwrap());
    assert!(sender.results().recv().unwrap());
    sender.stop();

    assert_eq!(ports.frames(), vec![first, off]);
}
