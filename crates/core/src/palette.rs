//! Indexed palettes as supplied by the emulation core.
//!
//! Where the color values come from (chip models, user palette files) is the
//! core's business; the display side only ever receives a whole [`Palette`]
//! and replaces its previous one wholesale.

use serde::{Deserialize, Serialize};

/// One palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unpack a `0xRRGGBB` value (upper byte ignored).
    pub const fn from_packed(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
        }
    }
}

/// Ordered list of palette entries, addressed by pixel index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    entries: Vec<Rgb>,
}

impl Palette {
    pub fn new(entries: Vec<Rgb>) -> Self {
        Self { entries }
    }

    /// Build a palette from `0xRRGGBB` values.
    pub fn from_packed(colors: &[u32]) -> Self {
        Self {
            entries: colors.iter().map(|&c| Rgb::from_packed(c)).collect(),
        }
    }

    pub fn entries(&self) -> &[Rgb] {
        &self.entries
    }

    /// Get an entry; out-of-range indices read as black.
    pub fn get(&self, index: usize) -> Rgb {
        self.entries.get(index).copied().unwrap_or(Rgb::BLACK)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<Rgb>> for Palette {
    fn from(entries: Vec<Rgb>) -> Self {
        Self::new(entries)
    }
}
