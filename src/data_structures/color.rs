//! Linear RGB colours.
//!
//! Scene content is authored with sRGB hex codes (`#FF7A00`), shading happens
//! in linear space. [`Color`] always stores the linear value; conversions to
//! and from 8-bit sRGB happen at the edges (config parsing, pixel buffers).

use serde::Deserialize;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ColorError {
    #[error("colour `{0}` is not a #RRGGBB or #RGB hex code")]
    InvalidHex(String),
}

/// A linear-space RGB colour. Components may exceed `1.0` to brighten a
/// texture (the desk top does this).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "ColorRepr")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Linear([f32; 3]),
}

impl TryFrom<ColorRepr> for Color {
    type Error = ColorError;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Hex(hex) => Color::parse(&hex),
            ColorRepr::Linear([r, g, b]) => Ok(Color::linear(r, g, b)),
        }
    }
}

impl Color {
    pub const WHITE: Color = Color::linear(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::linear(0.0, 0.0, 0.0);

    pub const fn linear(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_srgb_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: srgb_to_linear(r as f32 / 255.0),
            g: srgb_to_linear(g as f32 / 255.0),
            b: srgb_to_linear(b as f32 / 255.0),
        }
    }

    /// `0xRRGGBB` in sRGB.
    pub fn from_hex(hex: u32) -> Self {
        Self::from_srgb_u8((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// Parses `#RRGGBB`, `RRGGBB` or the short `#RGB` form.
    pub fn parse(text: &str) -> Result<Self, ColorError> {
        let invalid = || ColorError::InvalidHex(text.to_string());
        let digits = text.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let value = match digits.len() {
            6 => u32::from_str_radix(digits, 16).map_err(|_| invalid())?,
            3 => {
                let short = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
                let (r, g, b) = ((short >> 8) & 0xf, (short >> 4) & 0xf, short & 0xf);
                (r * 0x11) << 16 | (g * 0x11) << 8 | (b * 0x11)
            }
            _ => return Err(invalid()),
        };
        Ok(Self::from_hex(value))
    }

    /// 8-bit sRGB, clamped.
    pub fn to_srgb_u8(self) -> [u8; 3] {
        let encode = |c: f32| (linear_to_srgb(c.clamp(0.0, 1.0)) * 255.0).round() as u8;
        [encode(self.r), encode(self.g), encode(self.b)]
    }

    pub fn to_rgba8(self) -> image::Rgba<u8> {
        let [r, g, b] = self.to_srgb_u8();
        image::Rgba([r, g, b, 255])
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::linear(self.r * factor, self.g * factor, self.b * factor)
    }

    pub fn is_finite(&self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite()
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<Color> for wgpu::Color {
    fn from(c: Color) -> Self {
        wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: 1.0,
        }
    }
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}

pub fn linear_to_srgb(c: f32) -> f32 {
    if c < 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(0.41666) - 0.055
    }
}
