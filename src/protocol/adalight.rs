use crate::pixel_format::{transform_pixels, Color, ColorSequence};

/// Most LEDs one frame can address
pub const MAX_LEDS: usize = 255;

pub const HEADER_LEN: usize = 6;

/// Build the 6-byte Adalight header for `led_count` LEDs
///
/// The count is sent as `led_count - 1`; a zero count wraps to `0xFFFF`.
/// Frames never address more than [`MAX_LEDS`], so the count fits in a `u8`.
pub fn build_header(led_count: u8) -> [u8; HEADER_LEN] {
    let n = u16::from(led_count).wrapping_sub(1);
    let count_hi = (n >> 8) as u8;
    let count_lo = (n & 0xFF) as u8;
    let checksum = count_hi ^ count_lo ^ 0x55;

    [b'A', b'd', b'a', count_hi, count_lo, checksum]
}

/// Clamp an input run to [`MAX_LEDS`], logging when anything is dropped
pub fn clamp_colors(colors: &[Color]) -> &[Color] {
    if colors.len() > MAX_LEDS {
        log::warn!(
            "{} colors exceed the device maximum of {} LEDs, truncating",
            colors.len(),
            MAX_LEDS
        );
        &colors[..MAX_LEDS]
    } else {
        colors
    }
}

/// Builds Adalight frames, keeping the header of the last LED count around
#[derive(Debug, Default)]
pub struct FrameEncoder {
    header: Option<(usize, [u8; HEADER_LEN])>,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn header_for(&mut self, led_count: usize) -> [u8; HEADER_LEN] {
        match self.header {
            Some((count, header)) if count == led_count => header,
            _ => {
                let header = build_header(led_count.min(MAX_LEDS) as u8);
                self.header = Some((led_count, header));
                header
            }
        }
    }

    /// Encode `colors` into a complete frame of `6 + 3 * n` bytes
    pub fn encode(&mut self, colors: &[Color], sequence: ColorSequence) -> Vec<u8> {
        let colors = clamp_colors(colors);
        let header = self.header_for(colors.len());
        let pixel_data = transform_pixels(colors, sequence);

        let mut frame = Vec::with_capacity(HEADER_LEN + pixel_data.len());
        frame.extend_from_slice(&header);
        frame.extend_from_slice(&pixel_data);

        frame
    }
}
