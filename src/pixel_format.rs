use std::fmt;

/// A single 24-bit color as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Reduce every channel to its high nibble (the wire carries 4 bits per channel)
    pub fn quantized(self) -> Color {
        Color {
            r: self.r >> 4,
            g: self.g >> 4,
            b: self.b >> 4,
        }
    }

    /// Parse `rrggbb` or `#rrggbb`
    pub fn from_hex(s: &str) -> Option<Color> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(hex, 16).ok().map(Color::from)
    }
}

/// `0xAARRGGBB` / `0xRRGGBB`; the alpha byte is ignored.
impl From<u32> for Color {
    fn from(rgb: u32) -> Self {
        Color {
            r: (rgb >> 16) as u8,
            g: (rgb >> 8) as u8,
            b: rgb as u8,
        }
    }
}

/// Order in which the three channels of every LED are placed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSequence {
    #[default]
    Rgb,
    Rbg,
    Brg,
    Bgr,
    Grb,
    Gbr,
}

impl ColorSequence {
    pub const ALL: [ColorSequence; 6] = [
        ColorSequence::Rgb,
        ColorSequence::Rbg,
        ColorSequence::Brg,
        ColorSequence::Bgr,
        ColorSequence::Grb,
        ColorSequence::Gbr,
    ];

    /// Look up a sequence by its setting name. Unknown names fall back to RGB.
    pub fn from_name(name: &str) -> ColorSequence {
        match name {
            "RGB" => ColorSequence::Rgb,
            "RBG" => ColorSequence::Rbg,
            "BRG" => ColorSequence::Brg,
            "BGR" => ColorSequence::Bgr,
            "GRB" => ColorSequence::Grb,
            "GBR" => ColorSequence::Gbr,
            _ => ColorSequence::Rgb,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ColorSequence::Rgb => "RGB",
            ColorSequence::Rbg => "RBG",
            ColorSequence::Brg => "BRG",
            ColorSequence::Bgr => "BGR",
            ColorSequence::Grb => "GRB",
            ColorSequence::Gbr => "GBR",
        }
    }

    /// Channels of `color` in wire order
    pub fn arrange(self, color: Color) -> [u8; 3] {
        let Color { r, g, b } = color;
        match self {
            ColorSequence::Rgb => [r, g, b],
            ColorSequence::Rbg => [r, b, g],
            ColorSequence::Brg => [b, r, g],
            ColorSequence::Bgr => [b, g, r],
            ColorSequence::Grb => [g, r, b],
            ColorSequence::Gbr => [g, b, r],
        }
    }
}

impl fmt::Display for ColorSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Quantize and reorder a run of colors into wire payload bytes
pub fn transform_pixels(colors: &[Color], sequence: ColorSequence) -> Vec<u8> {
    let mut data = Vec::with_capacity(colors.len() * 3);

    for color in colors {
        data.extend_from_slice(&sequence.arrange(color.quantized()));
    }

    data
}
