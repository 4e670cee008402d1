//! Video canvas: one per displayed machine screen
//!
//! The canvas ties the pieces together. It owns the geometry, the palette,
//! the aspect options and the active backend, and it enforces the lifecycle:
//!
//! ```text
//!                 update_context(w, h), w*h > 0
//!  Uninitialized ------------------------------> Sized --+
//!       ^   |                                      ^    | update_context (resize)
//!       |   |          update_context(0, 0)        +----+
//!       |   +----------<---------------------------+
//!       |                                          |
//!       +------------- destroy() ------------------+--> Destroyed (terminal)
//! ```
//!
//! Host resizes only recompute the transform; the backend context survives.

use emu_core::graphics::{Geometry, Transform, ViewParams};
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::palette::Palette;
use emu_core::renderer::PixelSource;
use emu_core::Size;

use crate::backend::{
    create_backend, BackendKind, GpuDevice, Presented, RefreshOutcome, RefreshRegion,
    RendererBackend,
};
use crate::error::CanvasError;
use crate::host::{Compositor, DrawableId};
use crate::settings::{TextureFilter, VideoSettings};
use crate::stats::PresentStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasState {
    Uninitialized,
    Sized,
    Destroyed,
}

pub struct VideoCanvas {
    state: CanvasState,
    backend: Box<dyn RendererBackend>,
    host: Box<dyn Compositor>,
    geometry: Geometry,
    palette: Palette,
    source_size: Size,
    keep_aspect: bool,
    true_aspect: bool,
    viewport: Size,
    filter: TextureFilter,
}

impl VideoCanvas {
    /// Create a canvas drawing through `backend` into a drawable from `host`.
    pub fn new(
        backend: Box<dyn RendererBackend>,
        host: Box<dyn Compositor>,
        settings: &VideoSettings,
        geometry: Geometry,
        viewport: Size,
    ) -> Self {
        let mut canvas = Self {
            state: CanvasState::Uninitialized,
            backend,
            host,
            geometry,
            palette: Palette::default(),
            source_size: Size::ZERO,
            keep_aspect: settings.keep_aspect_ratio,
            true_aspect: settings.true_aspect_ratio,
            viewport,
            filter: settings.texture_filter,
        };
        canvas.attach_backend();
        canvas
    }

    /// Create a canvas with the backend named in `settings`.
    ///
    /// An accelerated request without `device` gets the software backend.
    pub fn from_settings(
        settings: &VideoSettings,
        device: Option<Box<dyn GpuDevice>>,
        host: Box<dyn Compositor>,
        geometry: Geometry,
        viewport: Size,
    ) -> Self {
        let backend = create_backend(settings.backend, device);
        Self::new(backend, host, settings, geometry, viewport)
    }

    fn view(&self) -> ViewParams {
        ViewParams {
            viewport: self.viewport,
            keep_aspect: self.keep_aspect,
            true_aspect: self.true_aspect,
            pixel_aspect_ratio: self.geometry.pixel_aspect_ratio,
        }
    }

    fn attach_backend(&mut self) {
        let drawable = self.backend.create_surface(self.host.as_mut());
        self.backend.set_view(self.view());
        self.backend.set_texture_filter(self.filter);
        log(LogCategory::Canvas, LogLevel::Info, || {
            format!("canvas using {} backend, drawable {}", self.backend.name(), drawable.0)
        });
    }

    fn update_view(&mut self) {
        self.backend.set_view(self.view());
    }

    fn ensure_alive(&self, op: &'static str) -> Result<(), CanvasError> {
        if self.state == CanvasState::Destroyed {
            log(LogCategory::Canvas, LogLevel::Error, || {
                format!("{} called on a destroyed canvas", op)
            });
            return Err(CanvasError::Precondition("canvas already destroyed"));
        }
        Ok(())
    }

    /// Resize the source surface.
    ///
    /// A size with a zero dimension counts as `(0, 0)` and drops the context.
    /// Repeating the current size does nothing.
    pub fn update_context(&mut self, width: u32, height: u32) -> Result<(), CanvasError> {
        self.ensure_alive("update_context")?;

        let size = if width == 0 || height == 0 {
            Size::ZERO
        } else {
            Size::new(width, height)
        };
        let unchanged = match (size.is_empty(), self.backend.has_context()) {
            (false, true) => size == self.source_size,
            (true, false) => true,
            _ => false,
        };
        if unchanged {
            return Ok(());
        }

        if let Err(e) = self.backend.update_context(size) {
            self.backend.destroy_context();
            self.source_size = Size::ZERO;
            self.state = CanvasState::Uninitialized;
            self.update_view();
            return Err(e);
        }

        self.source_size = size;
        self.state = if size.is_empty() {
            CanvasState::Uninitialized
        } else {
            CanvasState::Sized
        };
        self.update_view();
        log(LogCategory::Canvas, LogLevel::Debug, || {
            format!(
                "source {}x{}, transform {:?}",
                size.width, size.height, self.backend.transform()
            )
        });
        Ok(())
    }

    /// Ask `source` to render `region` into the backend.
    pub fn refresh_rect(
        &mut self,
        source: &mut dyn PixelSource,
        region: RefreshRegion,
    ) -> Result<RefreshOutcome, CanvasError> {
        self.ensure_alive("refresh_rect")?;
        if self.state == CanvasState::Uninitialized {
            log(LogCategory::Canvas, LogLevel::Error, || {
                "refresh_rect before update_context".to_string()
            });
            return Err(CanvasError::Precondition("refresh_rect before update_context"));
        }
        self.backend
            .refresh_rect(source, self.host.as_mut(), region)
    }

    /// Replace the palette and install it in the core in the backend's encoding.
    ///
    /// Returns `Ok(false)` for an empty palette, which installs nothing.
    pub fn set_palette(
        &mut self,
        palette: Palette,
        source: &mut dyn PixelSource,
    ) -> Result<bool, CanvasError> {
        self.ensure_alive("set_palette")?;
        self.palette = palette;
        if self.palette.is_empty() {
            return Ok(false);
        }
        Ok(self.backend.set_palette(&self.palette, source))
    }

    /// Host window resize. Recomputes the transform; the context is kept.
    pub fn resize_viewport(&mut self, width: u32, height: u32) -> Result<(), CanvasError> {
        self.ensure_alive("resize_viewport")?;
        self.viewport = Size::new(width, height);
        self.update_view();
        Ok(())
    }

    pub fn set_aspect_flags(&mut self, keep_aspect: bool, true_aspect: bool) -> Result<(), CanvasError> {
        self.ensure_alive("set_aspect_flags")?;
        self.keep_aspect = keep_aspect;
        self.true_aspect = true_aspect;
        self.update_view();
        Ok(())
    }

    pub fn set_pixel_aspect_ratio(&mut self, pixel_aspect_ratio: f64) -> Result<(), CanvasError> {
        self.ensure_alive("set_pixel_aspect_ratio")?;
        self.geometry.pixel_aspect_ratio = pixel_aspect_ratio;
        self.update_view();
        Ok(())
    }

    pub fn set_texture_filter(&mut self, filter: TextureFilter) -> Result<(), CanvasError> {
        self.ensure_alive("set_texture_filter")?;
        self.filter = filter;
        self.backend.set_texture_filter(filter);
        Ok(())
    }

    /// Replace the backend.
    ///
    /// The old backend's context and drawable are released before the new
    /// backend gets its surface. The new context is built at the current
    /// source size and the palette re-installed in the new encoding; the
    /// core has to refresh the whole surface afterwards.
    pub fn switch_backend(
        &mut self,
        backend: Box<dyn RendererBackend>,
        source: &mut dyn PixelSource,
    ) -> Result<(), CanvasError> {
        self.ensure_alive("switch_backend")?;

        self.backend.destroy_context();
        self.backend.release_surface(self.host.as_mut());
        let old = std::mem::replace(&mut self.backend, backend);
        log(LogCategory::Canvas, LogLevel::Info, || {
            format!("switching backend {} -> {}", old.name(), self.backend.name())
        });
        drop(old);

        self.attach_backend();
        if let Err(e) = self.backend.update_context(self.source_size) {
            self.source_size = Size::ZERO;
            self.state = CanvasState::Uninitialized;
            self.update_view();
            return Err(e);
        }
        self.update_view();
        if !self.palette.is_empty() {
            self.backend.set_palette(&self.palette, source);
        }
        Ok(())
    }

    /// Switch to a freshly built backend of `kind`.
    pub fn switch_backend_kind(
        &mut self,
        kind: BackendKind,
        device: Option<Box<dyn GpuDevice>>,
        source: &mut dyn PixelSource,
    ) -> Result<(), CanvasError> {
        self.switch_backend(create_backend(kind, device), source)
    }

    /// Produce the frame for the next host repaint.
    pub fn present(&mut self) -> Result<Presented<'_>, CanvasError> {
        self.ensure_alive("present")?;
        Ok(self.backend.present())
    }

    /// Tear down the context and drawable. Idempotent; the canvas is unusable afterwards.
    pub fn destroy(&mut self) {
        if self.state == CanvasState::Destroyed {
            return;
        }
        self.backend.destroy_context();
        self.backend.release_surface(self.host.as_mut());
        self.source_size = Size::ZERO;
        self.state = CanvasState::Destroyed;
        log(LogCategory::Canvas, LogLevel::Debug, || "canvas destroyed".to_string());
    }

    pub fn state(&self) -> CanvasState {
        self.state
    }

    pub fn source_size(&self) -> Size {
        self.source_size
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// The backend's current source-to-viewport transform.
    pub fn transform(&self) -> Transform {
        self.backend.transform()
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn aspect_flags(&self) -> (bool, bool) {
        (self.keep_aspect, self.true_aspect)
    }

    pub fn texture_filter(&self) -> TextureFilter {
        self.filter
    }

    pub fn has_context(&self) -> bool {
        self.backend.has_context()
    }

    pub fn backend(&self) -> &dyn RendererBackend {
        self.backend.as_ref()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn drawable(&self) -> Option<DrawableId> {
        self.backend.drawable()
    }

    pub fn stats(&self) -> PresentStats {
        self.backend.stats()
    }
}

impl Drop for VideoCanvas {
    fn drop(&mut self) {
        self.destroy();
    }
}
