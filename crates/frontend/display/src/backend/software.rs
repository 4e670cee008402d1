//! CPU-composited backend
//!
//! The context is a `u32` surface the size of the source, written by the
//! emulation core in ARGB8888. Presenting maps every viewport pixel back into
//! the surface through the affine transform (nearest neighbour, sampled at the
//! pixel centre); viewport pixels that land outside the surface are black.

use emu_core::graphics::{Affine, PixelFormat, Transform, ViewParams};
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::renderer::PixelSource;
use emu_core::Size;

use super::{reject_region, BackendKind, Presented, RefreshOutcome, RefreshRegion, RendererBackend};
use crate::error::{try_zeroed, CanvasError};
use crate::host::{Compositor, DrawableId};
use crate::stats::PresentStats;

const BORDER: u32 = 0xFF00_0000;

struct Surface {
    size: Size,
    pixels: Vec<u32>,
}

pub struct SoftwareBackend {
    drawable: Option<DrawableId>,
    surface: Option<Surface>,
    view: ViewParams,
    transform: Transform,
    frame: Vec<u32>,
    columns: Vec<Option<usize>>,
    stats: PresentStats,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self {
            drawable: None,
            surface: None,
            view: ViewParams {
                viewport: Size::ZERO,
                keep_aspect: true,
                true_aspect: false,
                pixel_aspect_ratio: 1.0,
            },
            transform: Transform::IDENTITY,
            frame: Vec::new(),
            columns: Vec::new(),
            stats: PresentStats::new(),
        }
    }

    /// Raw surface contents, row-major, `source_size().width` pixels per row.
    pub fn surface(&self) -> Option<&[u32]> {
        self.surface.as_ref().map(|s| s.pixels.as_slice())
    }

    fn recompute(&mut self) {
        let source = self.source_size();
        self.transform = self.view.transform_for(source);
    }

    fn composite(&mut self) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        let vw = self.view.viewport.width as usize;
        let vh = self.view.viewport.height as usize;
        self.frame.resize(vw * vh, BORDER);

        let affine: Affine = self.transform.to_affine();
        let sw = surface.size.width as usize;
        let sh = surface.size.height as usize;

        self.columns.clear();
        self.columns.extend((0..vw).map(|x| {
            let (sx, _) = affine.map(x as f64 + 0.5, 0.0);
            sample_index(sx, sw)
        }));

        for (y, row) in self.frame.chunks_exact_mut(vw.max(1)).enumerate().take(vh) {
            let (_, sy) = affine.map(0.0, y as f64 + 0.5);
            let Some(sy) = sample_index(sy, sh) else {
                row.fill(BORDER);
                continue;
            };
            let src_row = &surface.pixels[sy * sw..(sy + 1) * sw];
            for (out, col) in row.iter_mut().zip(&self.columns) {
                *out = match col {
                    Some(sx) => src_row[*sx] | BORDER,
                    None => BORDER,
                };
            }
        }
    }
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn sample_index(coord: f64, len: usize) -> Option<usize> {
    if coord < 0.0 {
        return None;
    }
    let index = coord as usize;
    (index < len).then_some(index)
}

impl RendererBackend for SoftwareBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Software
    }

    fn name(&self) -> &str {
        "Software"
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Argb8888
    }

    fn create_surface(&mut self, host: &mut dyn Compositor) -> DrawableId {
        let id = host.create_drawable(BackendKind::Software);
        self.drawable = Some(id);
        self.surface = None;
        id
    }

    fn release_surface(&mut self, host: &mut dyn Compositor) {
        if let Some(id) = self.drawable.take() {
            host.release_drawable(id);
        }
    }

    fn drawable(&self) -> Option<DrawableId> {
        self.drawable
    }

    fn update_context(&mut self, size: Size) -> Result<(), CanvasError> {
        match &self.surface {
            Some(surface) if surface.size == size => return Ok(()),
            None if size.is_empty() => return Ok(()),
            _ => {}
        }

        self.destroy_context();
        if !size.is_empty() {
            let pixels = try_zeroed::<u32>(size.area(), "software surface")?;
            self.surface = Some(Surface { size, pixels });
            log(LogCategory::Renderer, LogLevel::Debug, || {
                format!("Software: surface {}x{}", size.width, size.height)
            });
        }
        self.recompute();
        Ok(())
    }

    fn destroy_context(&mut self) {
        self.surface = None;
    }

    fn has_context(&self) -> bool {
        self.surface.is_some()
    }

    fn source_size(&self) -> Size {
        self.surface.as_ref().map_or(Size::ZERO, |s| s.size)
    }

    fn set_view(&mut self, view: ViewParams) {
        self.view = view;
        self.recompute();
    }

    fn transform(&self) -> Transform {
        self.transform
    }

    fn refresh_rect(
        &mut self,
        source: &mut dyn PixelSource,
        host: &mut dyn Compositor,
        region: RefreshRegion,
    ) -> Result<RefreshOutcome, CanvasError> {
        let Some(surface) = self.surface.as_mut() else {
            return Err(CanvasError::Precondition("refresh_rect without a context"));
        };
        if let Some(outcome) = reject_region("Software", &region, surface.size, &mut self.stats) {
            return Ok(outcome);
        }

        let stride = surface.size.width as usize * 4;
        let req = region.request(stride, PixelFormat::Argb8888);
        source.render(bytemuck::cast_slice_mut(&mut surface.pixels), &req);
        self.stats.refreshes_accepted += 1;

        if let Some(id) = self.drawable {
            host.request_repaint(id);
            self.stats.repaints_requested += 1;
        }
        Ok(RefreshOutcome::Written)
    }

    fn present(&mut self) -> Presented<'_> {
        self.stats.presents += 1;
        if self.surface.is_none() || self.view.viewport.is_empty() {
            self.stats.blank_presents += 1;
            return Presented::Blank;
        }
        self.composite();
        Presented::Frame {
            pixels: &self.frame,
            width: self.view.viewport.width,
            height: self.view.viewport.height,
        }
    }

    fn stats(&self) -> PresentStats {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RepaintQueue;
    use emu_core::graphics::ColorTables;
    use emu_core::palette::{Palette, Rgb};
    use emu_core::renderer::{IndexedFrame, RenderRequest};

    fn view(w: u32, h: u32) -> ViewParams {
        ViewParams {
            viewport: Size::new(w, h),
            keep_aspect: true,
            true_aspect: false,
            pixel_aspect_ratio: 1.0,
        }
    }

    fn backend(host: &mut RepaintQueue, source: Size, viewport: Size) -> SoftwareBackend {
        let mut backend = SoftwareBackend::new();
        backend.create_surface(host);
        backend.set_view(view(viewport.width, viewport.height));
        backend.update_context(source).unwrap();
        backend
    }

    /// Writes a counter into each pixel so tests can tell writes apart.
    struct Counter {
        next: u32,
    }

    impl PixelSource for Counter {
        fn render(&mut self, dest: &mut [u8], req: &RenderRequest) {
            for row in req.yi..req.yi + req.h {
                for col in req.xi..req.xi + req.w {
                    let at = row as usize * req.stride_bytes + col as usize * 4;
                    self.next += 1;
                    dest[at..at + 4].copy_from_slice(&self.next.to_ne_bytes());
                }
            }
        }

        fn init_colors(&mut self, _tables: &ColorTables) {}
    }

    #[test]
    fn test_refresh_writes_surface_and_requests_repaint() {
        let mut host = RepaintQueue::new();
        let mut backend = backend(&mut host, Size::new(4, 4), Size::new(4, 4));
        let mut source = Counter { next: 0 };

        let outcome = backend
            .refresh_rect(&mut source, &mut host, RefreshRegion::at(1, 1, 2, 1))
            .unwrap();
        assert_eq!(outcome, RefreshOutcome::Written);

        let surface = backend.surface().unwrap();
        assert_eq!(surface[5], 1);
        assert_eq!(surface[6], 2);
        assert_eq!(surface.iter().filter(|&&p| p != 0).count(), 2);
        assert_eq!(host.take_pending(), vec![backend.drawable().unwrap()]);
    }

    #[test]
    fn test_out_of_bounds_refresh_leaves_surface_untouched() {
        let mut host = RepaintQueue::new();
        let mut backend = backend(&mut host, Size::new(4, 4), Size::new(4, 4));
        let mut source = Counter { next: 0 };

        let outcome = backend
            .refresh_rect(&mut source, &mut host, RefreshRegion::at(3, 0, 2, 1))
            .unwrap();
        assert_eq!(outcome, RefreshOutcome::OutOfBounds);
        assert_eq!(source.next, 0);
        assert!(backend.surface().unwrap().iter().all(|&p| p == 0));
        assert!(host.take_pending().is_empty());
        assert_eq!(backend.stats().refreshes_rejected, 1);
    }

    #[test]
    fn test_refresh_without_context_is_precondition() {
        let mut host = RepaintQueue::new();
        let mut backend = SoftwareBackend::new();
        backend.create_surface(&mut host);
        let err = backend
            .refresh_rect(&mut Counter { next: 0 }, &mut host, RefreshRegion::at(0, 0, 1, 1))
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn test_update_context_same_size_keeps_contents() {
        let mut host = RepaintQueue::new();
        let mut backend = backend(&mut host, Size::new(4, 4), Size::new(4, 4));
        backend
            .refresh_rect(&mut Counter { next: 0 }, &mut host, RefreshRegion::at(0, 0, 4, 4))
            .unwrap();

        backend.update_context(Size::new(4, 4)).unwrap();
        assert_eq!(backend.surface().unwrap()[15], 16);

        backend.update_context(Size::new(2, 2)).unwrap();
        assert_eq!(backend.surface().unwrap(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_present_composites_with_borders() {
        let mut host = RepaintQueue::new();
        // Height fit at scale 1.0 centres the image in columns 1..3.
        let mut backend = backend(&mut host, Size::new(2, 2), Size::new(4, 2));
        let palette = Palette::new(vec![Rgb::new(0xFF, 0, 0), Rgb::new(0, 0xFF, 0)]);
        let mut frame = IndexedFrame::from_indices(2, 2, vec![0, 1, 1, 0]).unwrap();
        assert!(backend.set_palette(&palette, &mut frame));
        backend
            .refresh_rect(&mut frame, &mut host, RefreshRegion::at(0, 0, 2, 2))
            .unwrap();

        let Presented::Frame {
            pixels,
            width,
            height,
        } = backend.present()
        else {
            panic!("expected a composited frame");
        };
        assert_eq!((width, height), (4, 2));
        assert_eq!(
            pixels,
            &[
                0xFF00_0000, 0xFFFF_0000, 0xFF00_FF00, 0xFF00_0000,
                0xFF00_0000, 0xFF00_FF00, 0xFFFF_0000, 0xFF00_0000,
            ]
        );
    }

    #[test]
    fn test_present_scales_up() {
        let mut host = RepaintQueue::new();
        let mut backend = backend(&mut host, Size::new(2, 1), Size::new(4, 2));
        let mut source = Counter { next: 0 };
        backend
            .refresh_rect(&mut source, &mut host, RefreshRegion::at(0, 0, 2, 1))
            .unwrap();

        let Presented::Frame { pixels, .. } = backend.present() else {
            panic!("expected a composited frame");
        };
        let a = 1 | BORDER;
        let b = 2 | BORDER;
        assert_eq!(pixels, &[a, a, b, b, a, a, b, b]);
    }

    #[test]
    fn test_present_without_context_is_blank() {
        let mut backend = SoftwareBackend::new();
        backend.set_view(view(8, 8));
        assert_eq!(backend.present(), Presented::Blank);
        assert_eq!(backend.stats().blank_presents, 1);
    }

    #[test]
    fn test_release_surface_returns_drawable() {
        let mut host = RepaintQueue::new();
        let mut backend = SoftwareBackend::new();
        let id = backend.create_surface(&mut host);
        assert!(host.is_live(id));
        backend.release_surface(&mut host);
        assert!(!host.is_live(id));
        assert_eq!(backend.drawable(), None);
    }
}
