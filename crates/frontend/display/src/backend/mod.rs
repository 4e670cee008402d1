//! Renderer backends
//!
//! A backend owns everything sized to the source surface (its "context") and
//! is the only part of the display that talks to the host compositor. Two
//! implementations share the [`RendererBackend`] contract:
//!
//! - [`SoftwareBackend`]: a CPU surface composited into a viewport-sized frame
//! - [`AcceleratedBackend`]: a staging buffer uploaded to a GPU texture through
//!   a [`GpuDevice`], with dirty-region coalescing
//!
//! The backend is picked at canvas construction with [`create_backend`], which
//! falls back to software when no GPU device is available.

pub mod accelerated;
pub mod gpu;
#[cfg(feature = "opengl")]
pub mod opengl;
pub mod software;

use emu_core::graphics::{PixelFormat, Transform, ViewParams};
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::palette::Palette;
use emu_core::renderer::{PixelSource, RenderRequest};
use emu_core::{Rect, Size};
use serde::{Deserialize, Serialize};

use crate::dirty_rect::Upload;
use crate::error::CanvasError;
use crate::host::{Compositor, DrawableId};
use crate::palette::install_palette;
use crate::settings::TextureFilter;
use crate::stats::PresentStats;

pub use accelerated::AcceleratedBackend;
pub use gpu::{GpuDevice, GpuError, HeadlessDevice, TextureId};
pub use software::SoftwareBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Software,
    Accelerated,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Software => "software",
            BackendKind::Accelerated => "accelerated",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "software" | "sw" => Ok(BackendKind::Software),
            "accelerated" | "gpu" | "opengl" => Ok(BackendKind::Accelerated),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// A changed region reported by the emulation core.
///
/// `xs`/`ys` are forwarded to the pixel source untouched; `xi`/`yi`/`w`/`h`
/// address the backend's surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshRegion {
    pub xs: u32,
    pub ys: u32,
    pub xi: u32,
    pub yi: u32,
    pub w: u32,
    pub h: u32,
}

impl RefreshRegion {
    pub fn new(xs: u32, ys: u32, xi: u32, yi: u32, w: u32, h: u32) -> Self {
        Self {
            xs,
            ys,
            xi,
            yi,
            w,
            h,
        }
    }

    /// Region whose source and destination coordinates coincide.
    pub fn at(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self::new(x, y, x, y, w, h)
    }

    pub fn dest_rect(&self) -> Rect {
        Rect::new(self.xi, self.yi, self.w, self.h)
    }

    pub fn request(&self, stride_bytes: usize, format: PixelFormat) -> RenderRequest {
        RenderRequest {
            xs: self.xs,
            ys: self.ys,
            xi: self.xi,
            yi: self.yi,
            w: self.w,
            h: self.h,
            stride_bytes,
            bits_per_pixel: format.bits_per_pixel(),
        }
    }
}

/// Result of a refresh that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Pixels were written and a repaint was requested.
    Written,
    /// The region exceeded the surface; nothing was written.
    OutOfBounds,
    /// The region had zero area; nothing was written and no repaint requested.
    Empty,
}

/// What a present pass produced.
#[derive(Debug, PartialEq)]
pub enum Presented<'a> {
    /// Nothing to show: no context yet, or the backend is degraded.
    Blank,
    /// A composited ARGB frame the size of the viewport.
    Frame {
        pixels: &'a [u32],
        width: u32,
        height: u32,
    },
    /// The GPU drew the current texture after performing `Upload`.
    Gpu(Upload),
}

/// Contract shared by every backend.
///
/// Backends are deliberately not `Send`: drawables and graphics contexts
/// belong to the thread that created them.
pub trait RendererBackend {
    fn kind(&self) -> BackendKind;

    fn name(&self) -> &str;

    /// Encoding the emulation core must emit pixels in.
    fn pixel_format(&self) -> PixelFormat;

    /// Obtain a drawable from the host. The context stays empty.
    fn create_surface(&mut self, host: &mut dyn Compositor) -> DrawableId;

    /// Hand the drawable back to the host.
    fn release_surface(&mut self, host: &mut dyn Compositor);

    fn drawable(&self) -> Option<DrawableId>;

    /// (Re)build the context for a source surface of `size`.
    ///
    /// No-op when a context of that size exists, or when `size` is empty and
    /// there is no context. Otherwise the old context is destroyed first.
    fn update_context(&mut self, size: Size) -> Result<(), CanvasError>;

    /// Release the context. Safe to call without one.
    fn destroy_context(&mut self);

    fn has_context(&self) -> bool;

    /// Size of the current context, or zero without one.
    fn source_size(&self) -> Size;

    /// Replace the viewport and aspect options and recompute the transform.
    fn set_view(&mut self, view: ViewParams);

    fn transform(&self) -> Transform;

    /// Have `source` render `region` into the context and request a repaint.
    fn refresh_rect(
        &mut self,
        source: &mut dyn PixelSource,
        host: &mut dyn Compositor,
        region: RefreshRegion,
    ) -> Result<RefreshOutcome, CanvasError>;

    /// Translate `palette` to this backend's encoding and install it in the core.
    ///
    /// Returns `false` for an empty palette.
    fn set_palette(&mut self, palette: &Palette, source: &mut dyn PixelSource) -> bool {
        install_palette(palette, self.pixel_format(), source)
    }

    fn set_texture_filter(&mut self, _filter: TextureFilter) {}

    fn present(&mut self) -> Presented<'_>;

    fn stats(&self) -> PresentStats;
}

/// Build a backend of `kind`.
///
/// `Accelerated` needs a GPU device; without one the software backend is
/// returned instead.
pub fn create_backend(
    kind: BackendKind,
    device: Option<Box<dyn GpuDevice>>,
) -> Box<dyn RendererBackend> {
    match (kind, device) {
        (BackendKind::Accelerated, Some(device)) => Box::new(AcceleratedBackend::new(device)),
        (BackendKind::Accelerated, None) => {
            log(LogCategory::Canvas, LogLevel::Warn, || {
                "Accelerated backend requested without a GPU device, using software".to_string()
            });
            Box::new(SoftwareBackend::new())
        }
        (BackendKind::Software, _) => Box::new(SoftwareBackend::new()),
    }
}

/// Shared refresh validation.
///
/// Returns the outcome to report when the region must not be rendered.
pub(crate) fn reject_region(
    backend: &str,
    region: &RefreshRegion,
    surface: Size,
    stats: &mut PresentStats,
) -> Option<RefreshOutcome> {
    let rect = region.dest_rect();
    if !rect.fits_within(surface) {
        stats.refreshes_rejected += 1;
        log(LogCategory::Renderer, LogLevel::Error, || {
            format!(
                "{}: refresh ({}, {}, {}x{}) exceeds {}x{} surface, skipped",
                backend, rect.x, rect.y, rect.w, rect.h, surface.width, surface.height
            )
        });
        return Some(RefreshOutcome::OutOfBounds);
    }
    if rect.is_empty() {
        return Some(RefreshOutcome::Empty);
    }
    None
}
