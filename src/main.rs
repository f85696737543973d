use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ws2812_serial::{
    Color, ColorSequence, Config, DeviceEvent, DeviceType, EventSink, FrameEncoder, FrameSender,
    LedDevice, SerialTransport, SettingsProvider, Ws2812Device,
};

#[derive(Parser)]
#[command(name = "ws2812_serial")]
#[command(about = "Drive a WS2812 LED strip over a serial Adalight link", long_about = None)]
struct Cli {
    /// Path to configuration file (JSON)
    config: String,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Enable detailed debug (hex dumps every frame)
    #[arg(long)]
    ddebug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill the strip with colors (hex, repeated across all LEDs)
    Color {
        #[arg(required = true)]
        colors: Vec<String>,
    },
    /// Turn every LED off
    Off,
    /// Print the device firmware version
    Version,
    /// Run a rainbow chase until Ctrl-C
    Chase {
        /// Frames per second
        #[arg(long, default_value_t = 30)]
        fps: u32,
    },
}

fn init_logging(debug: bool, ddebug: bool) {
    let default = if ddebug {
        "trace"
    } else if debug {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug, cli.ddebug);

    let config = Config::load(&cli.config)?;

    match cli.command {
        Command::Color { colors } => {
            let colors = colors
                .iter()
                .map(|s| Color::from_hex(s).with_context(|| format!("Invalid color '{s}'")))
                .collect::<Result<Vec<_>>>()?;
            let mut device = open_device(&config)?;
            let strip: Vec<Color> = colors
                .iter()
                .copied()
                .cycle()
                .take(config.device.led_count)
                .collect();
            if !device.set_colors(&strip) {
                bail!("Failed to write frame to {}", config.device.port);
            }
        }
        Command::Off => {
            let mut device = open_device(&config)?;
            if !device.set_colors(&vec![Color::BLACK; config.device.led_count]) {
                bail!("Failed to write frame to {}", config.device.port);
            }
        }
        Command::Version => {
            let (tx, rx) = mpsc::channel();
            let mut device = Ws2812Device::new(
                config.device.port.clone(),
                config.device.baud_rate,
                SerialTransport::system(config.device.config_failure_policy()),
                Box::new(config.clone()),
            )
            .with_events(EventSink::new(tx));
            device.request_firmware_version();
            for event in rx.try_iter() {
                if let DeviceEvent::FirmwareVersion(version) = event {
                    println!("{version}");
                }
            }
        }
        Command::Chase { fps } => run_chase(&config, fps)?,
    }

    Ok(())
}

fn open_device(config: &Config) -> Result<Ws2812Device> {
    let mut device = Ws2812Device::new(
        config.device.port.clone(),
        config.device.baud_rate,
        SerialTransport::system(config.device.config_failure_policy()),
        Box::new(config.clone()),
    )
    .with_color_sequence(ColorSequence::from_name(
        &config.color_sequence(DeviceType::Ws2812),
    ));
    device.open()?;
    Ok(device)
}

/// Hue wheel position 0..=255 to a fully saturated color
fn wheel(pos: u8) -> Color {
    match pos {
        0..=84 => Color::new(255 - pos * 3, pos * 3, 0),
        85..=169 => {
            let p = pos - 85;
            Color::new(0, 255 - p * 3, p * 3)
        }
        _ => {
            let p = pos - 170;
            Color::new(p * 3, 0, 255 - p * 3)
        }
    }
}

fn run_chase(config: &Config, fps: u32) -> Result<()> {
    let mut transport = SerialTransport::system(config.device.config_failure_policy());
    transport.open(&config.device.port, config.device.baud_rate)?;

    let sequence = ColorSequence::from_name(&config.color_sequence(DeviceType::Ws2812));
    let led_count = config.device.led_count;
    let mut encoder = FrameEncoder::new();
    let mut sender = FrameSender::new(transport, 1);

    // Set up Ctrl-C handler with graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let handler_running = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || {
        handler_running.store(false, Ordering::Relaxed);
    }) {
        log::warn!("Could not set Ctrl-C handler: {e}");
    }

    let frame_time = Duration::from_secs(1) / fps.max(1);
    let mut offset: usize = 0;

    while running.load(Ordering::Relaxed) {
        let colors: Vec<Color> = (0..led_count)
            .map(|i| wheel(((i * 256 / led_count + offset) & 0xFF) as u8))
            .collect();
        sender.try_send_frame(encoder.encode(&colors, sequence));

        for ok in sender.results().try_iter() {
            if !ok {
                log::warn!("frame not delivered to {}", config.device.port);
            }
        }

        offset = offset.wrapping_add(4);
        thread::sleep(frame_time);
    }

    log::info!("Turning off LEDs...");
    sender.send_frame(encoder.encode(&vec![Color::BLACK; led_count], sequence));
    sender.stop();
    log::info!("{} frames sent", sender.frames_sent());

    Ok(())
}
