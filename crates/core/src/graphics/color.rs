//! Native pixel encodings and the color lookup tables handed to the emulation core.
//!
//! Two encodings are in use:
//!
//! - [`PixelFormat::Argb8888`]: a `u32` value laid out as `0xAARRGGBB`. This is what
//!   the software compositor and host windows that take `&[u32]` frames consume.
//! - [`PixelFormat::Rgba8888`]: four bytes in memory order `R, G, B, A`, which is what
//!   a GL `RGBA`/`UNSIGNED_BYTE` texture upload expects. As a `u32` this is the
//!   native-endian reading of those bytes.

use serde::{Deserialize, Serialize};

use crate::palette::Rgb;

/// Color operation utilities for `0xAARRGGBB` values
pub struct ColorOps;

impl ColorOps {
    /// Extract red channel from ARGB color
    #[inline]
    pub fn red(color: u32) -> u8 {
        ((color >> 16) & 0xFF) as u8
    }

    /// Extract green channel from ARGB color
    #[inline]
    pub fn green(color: u32) -> u8 {
        ((color >> 8) & 0xFF) as u8
    }

    /// Extract blue channel from ARGB color
    #[inline]
    pub fn blue(color: u32) -> u8 {
        (color & 0xFF) as u8
    }

    /// Extract alpha channel from ARGB color
    #[inline]
    pub fn alpha(color: u32) -> u8 {
        ((color >> 24) & 0xFF) as u8
    }

    /// Construct ARGB color from components
    #[inline]
    pub fn from_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
        ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
    }

    /// Construct RGB color with full alpha
    #[inline]
    pub fn from_rgb(r: u8, g: u8, b: u8) -> u32 {
        0xFF000000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
    }
}

/// Per-pixel color encoding a backend wants the emulation core to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// `0xAARRGGBB` as a `u32` value.
    Argb8888,
    /// Bytes `R, G, B, A` in memory order.
    Rgba8888,
}

impl PixelFormat {
    /// Bytes per encoded pixel. Both formats are 32-bit.
    pub const fn bytes_per_pixel(self) -> usize {
        4
    }

    pub const fn bits_per_pixel(self) -> u32 {
        32
    }

    /// Encode a single channel value into its position within a pixel.
    ///
    /// `channel` is 0 = red, 1 = green, 2 = blue, 3 = alpha. Summing (or OR-ing)
    /// the four channel encodings gives the full pixel.
    #[inline]
    pub fn channel(self, channel: usize, value: u8) -> u32 {
        match self {
            PixelFormat::Argb8888 => {
                let shift = match channel {
                    0 => 16,
                    1 => 8,
                    2 => 0,
                    _ => 24,
                };
                (value as u32) << shift
            }
            PixelFormat::Rgba8888 => {
                let mut bytes = [0u8; 4];
                bytes[channel.min(3)] = value;
                u32::from_ne_bytes(bytes)
            }
        }
    }

    /// Encode an opaque RGB triple.
    #[inline]
    pub fn encode(self, rgb: Rgb) -> u32 {
        self.channel(0, rgb.r)
            | self.channel(1, rgb.g)
            | self.channel(2, rgb.b)
            | self.channel(3, 0xFF)
    }

    /// Decode a pixel back into its RGB triple (alpha is dropped).
    #[inline]
    pub fn decode(self, pixel: u32) -> Rgb {
        match self {
            PixelFormat::Argb8888 => Rgb::new(
                ColorOps::red(pixel),
                ColorOps::green(pixel),
                ColorOps::blue(pixel),
            ),
            PixelFormat::Rgba8888 => {
                let [r, g, b, _] = pixel.to_ne_bytes();
                Rgb::new(r, g, b)
            }
        }
    }

    /// Re-encode a pixel of this format as `0xAARRGGBB`.
    #[inline]
    pub fn to_argb(self, pixel: u32) -> u32 {
        match self {
            PixelFormat::Argb8888 => pixel,
            PixelFormat::Rgba8888 => {
                let [r, g, b, a] = pixel.to_ne_bytes();
                ColorOps::from_argb(a, r, g, b)
            }
        }
    }
}

/// Color lookup tables for one palette in one pixel format.
///
/// `physical` holds the encoded palette entries in palette order. The raw
/// tables map an 8-bit intensity to its encoded contribution for a single
/// channel, so a core producing direct RGB output can build a pixel with
/// `red[r] | green[g] | blue[b] | alpha`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTables {
    pub format: PixelFormat,
    pub physical: Vec<u32>,
    pub red: [u32; 256],
    pub green: [u32; 256],
    pub blue: [u32; 256],
    pub alpha: u32,
}

impl ColorTables {
    /// Build the raw channel tables for `format` with an empty physical palette.
    pub fn raw(format: PixelFormat) -> Self {
        let mut red = [0u32; 256];
        let mut green = [0u32; 256];
        let mut blue = [0u32; 256];
        for i in 0..256 {
            let v = i as u8;
            red[i] = format.channel(0, v);
            green[i] = format.channel(1, v);
            blue[i] = format.channel(2, v);
        }
        Self {
            format,
            physical: Vec::new(),
            red,
            green,
            blue,
            alpha: format.channel(3, 0xFF),
        }
    }

    /// Compose a pixel from raw channel intensities.
    #[inline]
    pub fn compose(&self, r: u8, g: u8, b: u8) -> u32 {
        self.red[r as usize] | self.green[g as usize] | self.blue[b as usize] | self.alpha
    }

    /// Look up an encoded palette entry; out-of-range indices yield opaque black.
    #[inline]
    pub fn physical(&self, index: u8) -> u32 {
        self.physical
            .get(index as usize)
            .copied()
            .unwrap_or(self.alpha)
    }
}
