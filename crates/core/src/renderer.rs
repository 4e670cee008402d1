//! Pixel production contract between the emulation core and the display
//!
//! The emulation core owns the pixel source of truth. The display side never
//! decodes emulated video memory itself; it hands the core a destination
//! buffer plus geometry and lets the core fill the requested region in the
//! color encoding established by the last [`PixelSource::init_colors`] call.
//!
//! ```text
//! emulation core --(init_colors)--> lookup tables
//! display canvas --(render)------> core writes encoded pixels into dest
//! ```
//!
//! [`IndexedFrame`] is a small reference source backed by an indexed frame
//! buffer. The demo binary and the test suites drive the display with it.

use thiserror::Error;

use crate::graphics::color::{ColorTables, PixelFormat};
use crate::logging::{log, LogCategory, LogLevel};
use crate::types::{Rect, Size};

/// Region the core is asked to render.
///
/// `xs`/`ys` address the core's own source coordinate space and are passed
/// through untouched; `xi`/`yi`/`w`/`h` address the destination buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    pub xs: u32,
    pub ys: u32,
    pub xi: u32,
    pub yi: u32,
    pub w: u32,
    pub h: u32,
    pub stride_bytes: usize,
    pub bits_per_pixel: u32,
}

impl RenderRequest {
    /// Destination rectangle of the request.
    pub fn dest_rect(&self) -> Rect {
        Rect::new(self.xi, self.yi, self.w, self.h)
    }
}

/// Implemented by the emulation core.
pub trait PixelSource {
    /// Fill `dest` (the whole destination surface, `req.stride_bytes` per row)
    /// for the region described by `req`.
    fn render(&mut self, dest: &mut [u8], req: &RenderRequest);

    /// Install new color lookup tables. Called once per palette change.
    fn init_colors(&mut self, tables: &ColorTables);
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("indexed frame of {width}x{height} needs {expected} indices, got {actual}")]
pub struct FrameSizeError {
    pub width: u32,
    pub height: u32,
    pub expected: usize,
    pub actual: usize,
}

/// Indexed frame buffer that renders through the installed color tables.
#[derive(Debug, Clone)]
pub struct IndexedFrame {
    size: Size,
    indices: Vec<u8>,
    tables: ColorTables,
    render_calls: u64,
}

impl IndexedFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
            indices: vec![0; width as usize * height as usize],
            tables: ColorTables::raw(PixelFormat::Argb8888),
            render_calls: 0,
        }
    }

    pub fn from_indices(width: u32, height: u32, indices: Vec<u8>) -> Result<Self, FrameSizeError> {
        let expected = width as usize * height as usize;
        if indices.len() != expected {
            return Err(FrameSizeError {
                width,
                height,
                expected,
                actual: indices.len(),
            });
        }
        Ok(Self {
            indices,
            ..Self::new(width, height)
        })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn tables(&self) -> &ColorTables {
        &self.tables
    }

    /// Number of `render` calls served so far.
    pub fn render_calls(&self) -> u64 {
        self.render_calls
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, index: u8) {
        if x < self.size.width && y < self.size.height {
            self.indices[(y * self.size.width + x) as usize] = index;
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        if x < self.size.width && y < self.size.height {
            self.indices[(y * self.size.width + x) as usize]
        } else {
            0
        }
    }

    pub fn fill(&mut self, index: u8) {
        self.indices.fill(index);
    }

    /// Vertical color bars cycling through `colors` palette indices.
    pub fn color_bars(&mut self, colors: u8) {
        let colors = colors.max(1) as u32;
        let bar = (self.size.width / colors).max(1);
        for y in 0..self.size.height {
            for x in 0..self.size.width {
                let index = ((x / bar) % colors) as u8;
                self.indices[(y * self.size.width + x) as usize] = index;
            }
        }
    }
}

impl PixelSource for IndexedFrame {
    fn render(&mut self, dest: &mut [u8], req: &RenderRequest) {
        self.render_calls += 1;

        if req.bits_per_pixel != self.tables.format.bits_per_pixel() {
            log(LogCategory::Renderer, LogLevel::Warn, || {
                format!(
                    "IndexedFrame: unsupported depth {} bpp requested",
                    req.bits_per_pixel
                )
            });
            return;
        }

        let bpp = self.tables.format.bytes_per_pixel();
        for row in 0..req.h {
            let dst_start =
                (req.yi as usize + row as usize) * req.stride_bytes + req.xi as usize * bpp;
            let dst_end = dst_start + req.w as usize * bpp;
            let Some(dst_row) = dest.get_mut(dst_start..dst_end) else {
                return;
            };
            // Coordinates past u32::MAX are outside any frame.
            let sy = req.ys.checked_add(row).unwrap_or(u32::MAX);
            for (col, out) in dst_row.chunks_exact_mut(bpp).enumerate() {
                let sx = req.xs.checked_add(col as u32).unwrap_or(u32::MAX);
                let index = self.pixel(sx, sy);
                out.copy_from_slice(&self.tables.physical(index).to_ne_bytes());
            }
        }
    }

    fn init_colors(&mut self, tables: &ColorTables) {
        self.tables = tables.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{Palette, Rgb};

    fn tables(format: PixelFormat, palette: &Palette) -> ColorTables {
        let mut t = ColorTables::raw(format);
        t.physical = palette.entries().iter().map(|&c| format.encode(c)).collect();
        t
    }

    #[test]
    fn test_from_indices_checks_length() {
        let err = IndexedFrame::from_indices(4, 4, vec![0; 15]).unwrap_err();
        assert_eq!(err.expected, 16);
        assert_eq!(err.actual, 15);
        assert!(IndexedFrame::from_indices(4, 4, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_render_writes_only_requested_region() {
        let palette = Palette::new(vec![Rgb::BLACK, Rgb::new(0xFF, 0, 0)]);
        let mut frame = IndexedFrame::new(8, 8);
        frame.fill(1);
        frame.init_colors(&tables(PixelFormat::Argb8888, &palette));

        let stride = 8 * 4;
        let mut dest = vec![0u8; stride * 8];
        let req = RenderRequest {
            xs: 0,
            ys: 0,
            xi: 2,
            yi: 3,
            w: 2,
            h: 1,
            stride_bytes: stride,
            bits_per_pixel: 32,
        };
        frame.render(&mut dest, &req);

        let px = |x: usize, y: usize| {
            let o = y * stride + x * 4;
            u32::from_ne_bytes([dest[o], dest[o + 1], dest[o + 2], dest[o + 3]])
        };
        assert_eq!(px(2, 3), 0xFFFF0000);
        assert_eq!(px(3, 3), 0xFFFF0000);
        assert_eq!(px(1, 3), 0);
        assert_eq!(px(4, 3), 0);
        assert_eq!(px(2, 4), 0);
        assert_eq!(frame.render_calls(), 1);
    }

    #[test]
    fn test_render_uses_source_offset() {
        let palette = Palette::from_packed(&[0x000000, 0x00FF00, 0x0000FF]);
        let mut frame = IndexedFrame::new(4, 1);
        frame.set_pixel(3, 0, 2);
        frame.init_colors(&tables(PixelFormat::Rgba8888, &palette));

        let mut dest = vec![0u8; 4];
        let req = RenderRequest {
            xs: 3,
            ys: 0,
            xi: 0,
            yi: 0,
            w: 1,
            h: 1,
            stride_bytes: 4,
            bits_per_pixel: 32,
        };
        frame.render(&mut dest, &req);
        assert_eq!(dest, vec![0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_render_source_offset_near_u32_max() {
        let palette = Palette::from_packed(&[0x112233, 0x00FF00]);
        let mut frame = IndexedFrame::new(2, 2);
        frame.fill(1);
        frame.init_colors(&tables(PixelFormat::Rgba8888, &palette));

        let mut dest = vec![0u8; 16];
        let req = RenderRequest {
            xs: u32::MAX,
            ys: u32::MAX - 1,
            xi: 0,
            yi: 0,
            w: 2,
            h: 2,
            stride_bytes: 8,
            bits_per_pixel: 32,
        };
        frame.render(&mut dest, &req);

        // Every sample lands outside the frame and reads index 0.
        for px in dest.chunks_exact(4) {
            assert_eq!(px, &[0x11, 0x22, 0x33, 0xFF]);
        }
    }

    #[test]
    fn test_render_ignores_unsupported_depth() {
        let mut frame = IndexedFrame::new(2, 2);
        let mut dest = vec![0xAAu8; 16];
        let req = RenderRequest {
            xs: 0,
            ys: 0,
            xi: 0,
            yi: 0,
            w: 2,
            h: 2,
            stride_bytes: 8,
            bits_per_pixel: 16,
        };
        frame.render(&mut dest, &req);
        assert!(dest.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_color_bars() {
        let mut frame = IndexedFrame::new(16, 2);
        frame.color_bars(4);
        assert_eq!(frame.pixel(0, 0), 0);
        assert_eq!(frame.pixel(4, 1), 1);
        assert_eq!(frame.pixel(15, 0), 3);
    }
}
