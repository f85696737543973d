mod adalight;

pub use adalight::{build_header, clamp_colors, FrameEncoder, HEADER_LEN, MAX_LEDS};
