//! GPU texture backend
//!
//! The emulation core renders RGBA8 into a CPU staging buffer. Refreshes only
//! mark regions dirty; the upload happens on the next present, at most once:
//!
//! - `NewTexture`: the old texture is deleted and a new one created from the
//!   whole staging buffer
//! - `DirtyRect`: the accumulated rectangle is uploaded as a sub-image
//! - `Static`: the existing texture is drawn as is
//!
//! If the presentation program fails to build when the surface is created,
//! the backend logs the driver's message and keeps running, presenting a
//! cleared frame.

use emu_core::graphics::{PixelFormat, Transform, ViewParams};
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::renderer::PixelSource;
use emu_core::Size;

use super::gpu::{GpuDevice, TextureId};
use super::{reject_region, BackendKind, Presented, RefreshOutcome, RefreshRegion, RendererBackend};
use crate::dirty_rect::{DirtyState, DirtyTracker, Upload};
use crate::error::{try_zeroed, CanvasError};
use crate::host::{Compositor, DrawableId};
use crate::settings::TextureFilter;
use crate::stats::PresentStats;

struct GpuContext {
    size: Size,
    staging: Vec<u8>,
    texture: Option<TextureId>,
    dirty: DirtyTracker,
}

pub struct AcceleratedBackend {
    device: Box<dyn GpuDevice>,
    drawable: Option<DrawableId>,
    degraded: bool,
    context: Option<GpuContext>,
    view: ViewParams,
    transform: Transform,
    scale: (f32, f32),
    filter: TextureFilter,
    stats: PresentStats,
}

impl AcceleratedBackend {
    pub fn new(device: Box<dyn GpuDevice>) -> Self {
        Self {
            device,
            drawable: None,
            degraded: false,
            context: None,
            view: ViewParams {
                viewport: Size::ZERO,
                keep_aspect: true,
                true_aspect: false,
                pixel_aspect_ratio: 1.0,
            },
            transform: Transform::IDENTITY,
            scale: (1.0, 1.0),
            filter: TextureFilter::default(),
            stats: PresentStats::new(),
        }
    }

    /// True when the presentation program could not be built.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Quad half-extents in normalized device coordinates.
    pub fn scale(&self) -> (f32, f32) {
        self.scale
    }

    pub fn dirty_state(&self) -> Option<DirtyState> {
        self.context.as_ref().map(|ctx| ctx.dirty.state())
    }

    pub fn staging(&self) -> Option<&[u8]> {
        self.context.as_ref().map(|ctx| ctx.staging.as_slice())
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.context.as_ref().and_then(|ctx| ctx.texture)
    }

    fn recompute(&mut self) {
        let source = self.source_size();
        self.transform = self.view.transform_for(source);
        self.scale = self.transform.normalized(source, self.view.viewport);
    }

    fn blank(&mut self) -> Presented<'static> {
        self.device.clear();
        self.stats.blank_presents += 1;
        Presented::Blank
    }

    /// Perform the pending upload. Returns the texture to draw.
    fn upload(&mut self, upload: Upload) -> Option<TextureId> {
        let ctx = self.context.as_mut()?;
        let upload = match (upload, ctx.texture) {
            (Upload::Partial(_), None) => Upload::Full,
            (upload, _) => upload,
        };

        match upload {
            Upload::None => {}
            Upload::Full => {
                if let Some(old) = ctx.texture.take() {
                    self.device.delete_texture(old);
                }
                match self.device.create_texture(ctx.size, &ctx.staging) {
                    Ok(texture) => {
                        ctx.texture = Some(texture);
                        self.stats.record_upload(true, ctx.staging.len());
                    }
                    Err(e) => {
                        log(LogCategory::Gpu, LogLevel::Error, || {
                            format!("{}: texture creation failed: {}", self.device.name(), e)
                        });
                        ctx.dirty.mark_new_texture();
                        return None;
                    }
                }
            }
            Upload::Partial(rect) => {
                let texture = ctx.texture?;
                match self
                    .device
                    .update_texture(texture, rect, &ctx.staging, ctx.size.width)
                {
                    Ok(()) => self.stats.record_upload(false, rect.area() * 4),
                    Err(e) => {
                        log(LogCategory::Gpu, LogLevel::Error, || {
                            format!("{}: sub-image upload failed: {}", self.device.name(), e)
                        });
                        ctx.dirty.mark_new_texture();
                    }
                }
            }
        }
        ctx.texture
    }
}

impl RendererBackend for AcceleratedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Accelerated
    }

    fn name(&self) -> &str {
        self.device.name()
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Rgba8888
    }

    fn create_surface(&mut self, host: &mut dyn Compositor) -> DrawableId {
        let id = host.create_drawable(BackendKind::Accelerated);
        self.drawable = Some(id);
        self.destroy_context();

        match self.device.setup() {
            Ok(()) => {
                self.degraded = false;
                self.device.set_filter(self.filter);
            }
            Err(e) => {
                self.degraded = true;
                log(LogCategory::Gpu, LogLevel::Error, || {
                    format!(
                        "{}: presentation program unavailable, output disabled: {}",
                        self.device.name(),
                        e
                    )
                });
            }
        }
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
        match &self.context {
            Some(ctx) if ctx.size == size => return Ok(()),
            None if size.is_empty() => return Ok(()),
            _ => {}
        }

        self.destroy_context();
        if !size.is_empty() {
            let staging = try_zeroed::<u8>(size.area() * 4, "texture staging buffer")?;
            let mut dirty = DirtyTracker::new();
            dirty.mark_new_texture();
            self.context = Some(GpuContext {
                size,
                staging,
                texture: None,
                dirty,
            });
            log(LogCategory::Gpu, LogLevel::Debug, || {
                format!("{}: staging {}x{}", self.device.name(), size.width, size.height)
            });
        }
        self.recompute();
        Ok(())
    }

    fn destroy_context(&mut self) {
        if let Some(ctx) = self.context.take() {
            if let Some(texture) = ctx.texture {
                self.device.delete_texture(texture);
            }
        }
    }

    fn has_context(&self) -> bool {
        self.context.is_some()
    }

    fn source_size(&self) -> Size {
        self.context.as_ref().map_or(Size::ZERO, |ctx| ctx.size)
    }

    fn set_view(&mut self, view: ViewParams) {
        if view.viewport != self.view.viewport && !self.degraded {
            self.device.set_viewport(view.viewport);
        }
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
        let Some(ctx) = self.context.as_mut() else {
            return Err(CanvasError::Precondition("refresh_rect without a context"));
        };
        if let Some(outcome) = reject_region("Accelerated", &region, ctx.size, &mut self.stats) {
            return Ok(outcome);
        }

        let stride = ctx.size.width as usize * 4;
        let req = region.request(stride, PixelFormat::Rgba8888);
        source.render(&mut ctx.staging, &req);
        ctx.dirty.mark(region.dest_rect());
        self.stats.refreshes_accepted += 1;

        if let Some(id) = self.drawable {
            host.request_repaint(id);
            self.stats.repaints_requested += 1;
        }
        Ok(RefreshOutcome::Written)
    }

    fn set_texture_filter(&mut self, filter: TextureFilter) {
        self.filter = filter;
        if !self.degraded {
            self.device.set_filter(filter);
        }
    }

    fn present(&mut self) -> Presented<'_> {
        self.stats.presents += 1;
        if self.degraded {
            return self.blank();
        }
        let Some(upload) = self.context.as_mut().map(|ctx| ctx.dirty.take()) else {
            return self.blank();
        };

        match self.upload(upload) {
            Some(texture) => {
                let (sx, sy) = self.scale;
                self.device.draw(texture, sx, sy);
                Presented::Gpu(upload)
            }
            None => self.blank(),
        }
    }

    fn stats(&self) -> PresentStats {
        self.stats.snapshot()
    }
}

impl Drop for AcceleratedBackend {
    fn drop(&mut self) {
        self.destroy_context();
    }
}
