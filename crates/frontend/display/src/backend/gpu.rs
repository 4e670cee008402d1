//! GPU device abstraction used by the accelerated backend
//!
//! The accelerated backend owns the dirty-region bookkeeping and the staging
//! buffer; everything that actually touches a graphics API goes through
//! [`GpuDevice`]. [`GlowDevice`](super::opengl::GlowDevice) implements it on
//! OpenGL, [`HeadlessDevice`] keeps a CPU mirror of every texture for tests
//! and hosts without a GL context.
//!
//! Pixel data handed to a device is always tightly packed RGBA8
//! ([`PixelFormat::Rgba8888`](emu_core::graphics::PixelFormat::Rgba8888)).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use emu_core::{Rect, Size};
use thiserror::Error;

use crate::settings::TextureFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    #[error("Failed to compile shader: {0}")]
    ShaderCompile(String),
    #[error("Failed to link shader program: {0}")]
    ProgramLink(String),
    #[error("GPU unavailable: {0}")]
    Unavailable(String),
    #[error("GPU resource error: {0}")]
    Resource(String),
}

pub trait GpuDevice {
    fn name(&self) -> &str;

    /// Compile the presentation program and build the quad geometry.
    ///
    /// Called once when the backend's surface is created.
    fn setup(&mut self) -> Result<(), GpuError>;

    fn set_filter(&mut self, filter: TextureFilter);

    /// Create a texture of `size` initialized from `pixels`.
    fn create_texture(&mut self, size: Size, pixels: &[u8]) -> Result<TextureId, GpuError>;

    /// Upload `rect` out of `pixels`, an RGBA image `row_length` pixels wide,
    /// into the same position of `texture`.
    fn update_texture(
        &mut self,
        texture: TextureId,
        rect: Rect,
        pixels: &[u8],
        row_length: u32,
    ) -> Result<(), GpuError>;

    fn delete_texture(&mut self, texture: TextureId);

    fn set_viewport(&mut self, viewport: Size);

    /// Clear, then draw `texture` on a viewport-centred quad with the given
    /// half-extents in normalized device coordinates.
    fn draw(&mut self, texture: TextureId, scale_x: f32, scale_y: f32);

    /// Clear to black without drawing anything.
    fn clear(&mut self);
}

/// Operation log entry recorded by [`HeadlessDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum GpuOp {
    Setup,
    SetFilter(TextureFilter),
    CreateTexture { texture: TextureId, size: Size },
    UpdateTexture { texture: TextureId, rect: Rect },
    DeleteTexture(TextureId),
    SetViewport(Size),
    Draw { texture: TextureId, scale_x: f32, scale_y: f32 },
    Clear,
}

#[derive(Debug, Default)]
struct HeadlessState {
    fail_setup: bool,
    next_texture: u32,
    textures: HashMap<TextureId, (Size, Vec<u8>)>,
    ops: Vec<GpuOp>,
}

/// GPU device without a GPU.
///
/// Clones share state, so a test can keep a handle after boxing one into a
/// backend and inspect what was uploaded.
#[derive(Debug, Clone, Default)]
pub struct HeadlessDevice {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device whose shader setup fails, as with a driver lacking GLSL 3.30.
    pub fn failing_setup() -> Self {
        let device = Self::new();
        device.state.borrow_mut().fail_setup = true;
        device
    }

    pub fn ops(&self) -> Vec<GpuOp> {
        self.state.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.borrow_mut().ops.clear();
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    /// CPU copy of a texture's RGBA contents.
    pub fn texture_pixels(&self, texture: TextureId) -> Option<(Size, Vec<u8>)> {
        self.state.borrow().textures.get(&texture).cloned()
    }
}

impl GpuDevice for HeadlessDevice {
    fn name(&self) -> &str {
        "Headless"
    }

    fn setup(&mut self) -> Result<(), GpuError> {
        let mut state = self.state.borrow_mut();
        state.ops.push(GpuOp::Setup);
        if state.fail_setup {
            return Err(GpuError::ShaderCompile(
                "0:1(10): error: GLSL 3.30 is not supported".to_string(),
            ));
        }
        Ok(())
    }

    fn set_filter(&mut self, filter: TextureFilter) {
        self.state.borrow_mut().ops.push(GpuOp::SetFilter(filter));
    }

    fn create_texture(&mut self, size: Size, pixels: &[u8]) -> Result<TextureId, GpuError> {
        let expected = size.area() * 4;
        if pixels.len() < expected {
            return Err(GpuError::Resource(format!(
                "texture data too short: {} < {}",
                pixels.len(),
                expected
            )));
        }
        let mut state = self.state.borrow_mut();
        let texture = TextureId(state.next_texture);
        state.next_texture += 1;
        state
            .textures
            .insert(texture, (size, pixels[..expected].to_vec()));
        state.ops.push(GpuOp::CreateTexture { texture, size });
        Ok(texture)
    }

    fn update_texture(
        &mut self,
        texture: TextureId,
        rect: Rect,
        pixels: &[u8],
        row_length: u32,
    ) -> Result<(), GpuError> {
        let mut state = self.state.borrow_mut();
        let (size, data) = state
            .textures
            .get_mut(&texture)
            .ok_or_else(|| GpuError::Resource(format!("unknown texture {:?}", texture)))?;
        if !rect.fits_within(*size) {
            return Err(GpuError::Resource(format!(
                "sub-image {:?} outside {}x{} texture",
                rect, size.width, size.height
            )));
        }
        let tex_stride = size.width as usize * 4;
        let src_stride = row_length as usize * 4;
        let span = rect.w as usize * 4;
        for row in rect.y..rect.bottom() {
            let src = row as usize * src_stride + rect.x as usize * 4;
            let dst = row as usize * tex_stride + rect.x as usize * 4;
            let Some(src_row) = pixels.get(src..src + span) else {
                return Err(GpuError::Resource("sub-image source too short".to_string()));
            };
            data[dst..dst + span].copy_from_slice(src_row);
        }
        state.ops.push(GpuOp::UpdateTexture { texture, rect });
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureId) {
        let mut state = self.state.borrow_mut();
        state.textures.remove(&texture);
        state.ops.push(GpuOp::DeleteTexture(texture));
    }

    fn set_viewport(&mut self, viewport: Size) {
        self.state.borrow_mut().ops.push(GpuOp::SetViewport(viewport));
    }

    fn draw(&mut self, texture: TextureId, scale_x: f32, scale_y: f32) {
        self.state.borrow_mut().ops.push(GpuOp::Draw {
            texture,
            scale_x,
            scale_y,
        });
    }

    fn clear(&mut self) {
        self.state.borrow_mut().ops.push(GpuOp::Clear);
    }
}
