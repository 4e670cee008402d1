//! Palette translation into backend-native color tables.

use emu_core::graphics::{ColorTables, PixelFormat};
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::palette::Palette;
use emu_core::renderer::PixelSource;

/// Encode every palette entry in `format` and attach the raw channel tables.
pub fn translate_palette(palette: &Palette, format: PixelFormat) -> ColorTables {
    let mut tables = ColorTables::raw(format);
    tables.physical = palette
        .entries()
        .iter()
        .map(|&rgb| format.encode(rgb))
        .collect();
    tables
}

/// Translate `palette` and install it in the emulation core.
///
/// Returns `false` without touching the core when the palette is empty.
pub fn install_palette(palette: &Palette, format: PixelFormat, source: &mut dyn PixelSource) -> bool {
    if palette.is_empty() {
        return false;
    }
    let tables = translate_palette(palette, format);
    log(LogCategory::Palette, LogLevel::Debug, || {
        format!("installing {} colors as {:?}", tables.physical.len(), format)
    });
    source.init_colors(&tables);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::palette::Rgb;
    use emu_core::renderer::RenderRequest;

    #[derive(Default)]
    struct CapturingSource {
        installed: Vec<ColorTables>,
    }

    impl PixelSource for CapturingSource {
        fn render(&mut self, _dest: &mut [u8], _req: &RenderRequest) {}

        fn init_colors(&mut self, tables: &ColorTables) {
            self.installed.push(tables.clone());
        }
    }

    fn pepto() -> Palette {
        Palette::from_packed(&[0x000000, 0xFFFFFF, 0x68372B, 0x70A4B2])
    }

    #[test]
    fn test_translate_argb() {
        let tables = translate_palette(&pepto(), PixelFormat::Argb8888);
        assert_eq!(
            tables.physical,
            vec![0xFF000000, 0xFFFFFFFF, 0xFF68372B, 0xFF70A4B2]
        );
    }

    #[test]
    fn test_translate_rgba_keeps_channel_order() {
        let palette = pepto();
        let tables = translate_palette(&palette, PixelFormat::Rgba8888);
        assert_eq!(tables.physical.len(), palette.len());
        for (encoded, rgb) in tables.physical.iter().zip(palette.entries()) {
            assert_eq!(encoded.to_ne_bytes(), [rgb.r, rgb.g, rgb.b, 0xFF]);
        }
    }

    #[test]
    fn test_raw_tables_follow_format() {
        let argb = translate_palette(&pepto(), PixelFormat::Argb8888);
        assert_eq!(argb.red[0x10], 0x10 << 16);
        assert_eq!(argb.green[0x10], 0x10 << 8);
        assert_eq!(argb.blue[0x10], 0x10);
        assert_eq!(argb.alpha, 0xFF000000);

        let rgba = translate_palette(&pepto(), PixelFormat::Rgba8888);
        assert_eq!(rgba.red[0x10].to_ne_bytes(), [0x10, 0, 0, 0]);
        assert_eq!(rgba.blue[0x10].to_ne_bytes(), [0, 0, 0x10, 0]);
        assert_eq!(rgba.alpha.to_ne_bytes(), [0, 0, 0, 0xFF]);
    }

    #[test]
    fn test_install_feeds_core() {
        let mut source = CapturingSource::default();
        assert!(install_palette(&pepto(), PixelFormat::Argb8888, &mut source));
        assert_eq!(source.installed.len(), 1);
        assert_eq!(source.installed[0].physical[2], 0xFF68372B);
    }

    #[test]
    fn test_install_empty_palette_is_noop() {
        let mut source = CapturingSource::default();
        assert!(!install_palette(&Palette::default(), PixelFormat::Argb8888, &mut source));
        assert!(source.installed.is_empty());
    }

    #[test]
    fn test_round_trip_every_entry() {
        let palette = Palette::new((0..=255u8).map(|i| Rgb::new(i, 255 - i, i / 2)).collect());
        for format in [PixelFormat::Argb8888, PixelFormat::Rgba8888] {
            let tables = translate_palette(&palette, format);
            for (i, rgb) in palette.entries().iter().enumerate() {
                assert_eq!(format.decode(tables.physical[i]), *rgb);
            }
        }
    }
}
