//! OpenGL implementation of [`GpuDevice`] on `glow`
//!
//! The caller owns the GL context and must keep it current on the UI thread
//! for as long as the device lives. Textures are RGBA8; partial uploads use
//! `UNPACK_ROW_LENGTH`/`SKIP_PIXELS`/`SKIP_ROWS` so the sub-image is read
//! straight out of the full staging buffer without an intermediate copy.

use std::collections::HashMap;

use emu_core::{Rect, Size};
use glow::HasContext;

use super::gpu::{GpuDevice, GpuError, TextureId};
use crate::settings::TextureFilter;

pub struct GlowDevice {
    gl: glow::Context,
    program: Option<glow::Program>,
    vao: Option<glow::VertexArray>,
    vbo: Option<glow::Buffer>,
    textures: HashMap<TextureId, glow::Texture>,
    next_texture: u32,
    filter: TextureFilter,
}

impl GlowDevice {
    pub fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            program: None,
            vao: None,
            vbo: None,
            textures: HashMap::new(),
            next_texture: 0,
            filter: TextureFilter::Nearest,
        }
    }

    /// Get a reference to the GL context
    pub fn gl_context(&self) -> &glow::Context {
        &self.gl
    }

    fn gl_filter(&self) -> i32 {
        match self.filter {
            TextureFilter::Nearest => glow::NEAREST as i32,
            TextureFilter::Linear => glow::LINEAR as i32,
        }
    }

    unsafe fn apply_filter(&self, texture: glow::Texture) {
        self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        self.gl
            .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, self.gl_filter());
        self.gl
            .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, self.gl_filter());
    }

    unsafe fn release_program(&mut self) {
        if let Some(program) = self.program.take() {
            self.gl.delete_program(program);
        }
        if let Some(vao) = self.vao.take() {
            self.gl.delete_vertex_array(vao);
        }
        if let Some(vbo) = self.vbo.take() {
            self.gl.delete_buffer(vbo);
        }
    }
}

impl GpuDevice for GlowDevice {
    fn name(&self) -> &str {
        "OpenGL"
    }

    fn setup(&mut self) -> Result<(), GpuError> {
        unsafe {
            self.release_program();

            let vertex_shader = compile_shader(
                &self.gl,
                glow::VERTEX_SHADER,
                include_str!("../shaders/vertex.glsl"),
            )?;
            let fragment_shader = match compile_shader(
                &self.gl,
                glow::FRAGMENT_SHADER,
                include_str!("../shaders/fragment.glsl"),
            ) {
                Ok(shader) => shader,
                Err(e) => {
                    self.gl.delete_shader(vertex_shader);
                    return Err(e);
                }
            };

            let program = self.gl.create_program().map_err(GpuError::Unavailable)?;
            self.gl.attach_shader(program, vertex_shader);
            self.gl.attach_shader(program, fragment_shader);
            self.gl.link_program(program);
            self.gl.delete_shader(vertex_shader);
            self.gl.delete_shader(fragment_shader);

            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(GpuError::ProgramLink(log));
            }
            self.program = Some(program);

            // Unit quad (position + texcoord), scaled by uScale in the vertex shader
            let vao = self.gl.create_vertex_array().map_err(GpuError::Resource)?;
            self.gl.bind_vertex_array(Some(vao));
            self.vao = Some(vao);

            let vbo = self.gl.create_buffer().map_err(GpuError::Resource)?;
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            self.vbo = Some(vbo);

            #[rustfmt::skip]
            let vertices: [f32; 24] = [
                // pos         // tex
                -1.0, -1.0,    0.0, 1.0,
                 1.0, -1.0,    1.0, 1.0,
                 1.0,  1.0,    1.0, 0.0,
                -1.0, -1.0,    0.0, 1.0,
                 1.0,  1.0,    1.0, 0.0,
                -1.0,  1.0,    0.0, 0.0,
            ];
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&vertices),
                glow::STATIC_DRAW,
            );

            let stride = 4 * std::mem::size_of::<f32>() as i32;
            self.gl
                .vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, stride, 0);
            self.gl.enable_vertex_attrib_array(0);
            self.gl.vertex_attrib_pointer_f32(
                1,
                2,
                glow::FLOAT,
                false,
                stride,
                2 * std::mem::size_of::<f32>() as i32,
            );
            self.gl.enable_vertex_attrib_array(1);
        }
        Ok(())
    }

    fn set_filter(&mut self, filter: TextureFilter) {
        self.filter = filter;
        let textures: Vec<glow::Texture> = self.textures.values().copied().collect();
        unsafe {
            for texture in textures {
                self.apply_filter(texture);
            }
        }
    }

    fn create_texture(&mut self, size: Size, pixels: &[u8]) -> Result<TextureId, GpuError> {
        let expected = size.area() * 4;
        let data = pixels.get(..expected).ok_or_else(|| {
            GpuError::Resource(format!("texture data too short: {} < {}", pixels.len(), expected))
        })?;

        unsafe {
            let texture = self.gl.create_texture().map_err(GpuError::Resource)?;
            self.apply_filter(texture);
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                size.width as i32,
                size.height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(data),
            );

            let id = TextureId(self.next_texture);
            self.next_texture = self.next_texture.wrapping_add(1);
            self.textures.insert(id, texture);
            Ok(id)
        }
    }

    fn update_texture(
        &mut self,
        texture: TextureId,
        rect: Rect,
        pixels: &[u8],
        row_length: u32,
    ) -> Result<(), GpuError> {
        let gl_texture = *self
            .textures
            .get(&texture)
            .ok_or_else(|| GpuError::Resource(format!("unknown texture {:?}", texture)))?;

        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Some(gl_texture));
            self.gl
                .pixel_store_i32(glow::UNPACK_ROW_LENGTH, row_length as i32);
            self.gl.pixel_store_i32(glow::UNPACK_SKIP_PIXELS, rect.x as i32);
            self.gl.pixel_store_i32(glow::UNPACK_SKIP_ROWS, rect.y as i32);
            self.gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                rect.x as i32,
                rect.y as i32,
                rect.w as i32,
                rect.h as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(pixels),
            );
            self.gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, 0);
            self.gl.pixel_store_i32(glow::UNPACK_SKIP_PIXELS, 0);
            self.gl.pixel_store_i32(glow::UNPACK_SKIP_ROWS, 0);
        }
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(gl_texture) = self.textures.remove(&texture) {
            unsafe {
                self.gl.delete_texture(gl_texture);
            }
        }
    }

    fn set_viewport(&mut self, viewport: Size) {
        unsafe {
            self.gl
                .viewport(0, 0, viewport.width as i32, viewport.height as i32);
        }
    }

    fn draw(&mut self, texture: TextureId, scale_x: f32, scale_y: f32) {
        let (Some(program), Some(gl_texture)) = (self.program, self.textures.get(&texture).copied())
        else {
            self.clear();
            return;
        };

        unsafe {
            self.gl.clear_color(0.0, 0.0, 0.0, 1.0);
            self.gl.clear(glow::COLOR_BUFFER_BIT);

            self.gl.use_program(Some(program));
            self.gl.bind_vertex_array(self.vao);
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(gl_texture));

            if let Some(loc) = self.gl.get_uniform_location(program, "uScale") {
                self.gl.uniform_2_f32(Some(&loc), scale_x, scale_y);
            }
            if let Some(loc) = self.gl.get_uniform_location(program, "uTexture") {
                self.gl.uniform_1_i32(Some(&loc), 0);
            }

            self.gl.draw_arrays(glow::TRIANGLES, 0, 6);
        }
    }

    fn clear(&mut self) {
        unsafe {
            self.gl.clear_color(0.0, 0.0, 0.0, 1.0);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }
}

impl Drop for GlowDevice {
    fn drop(&mut self) {
        unsafe {
            for (_, texture) in self.textures.drain() {
                self.gl.delete_texture(texture);
            }
            self.release_program();
        }
    }
}

unsafe fn compile_shader(
    gl: &glow::Context,
    shader_type: u32,
    source: &str,
) -> Result<glow::Shader, GpuError> {
    let shader = gl.create_shader(shader_type).map_err(GpuError::Unavailable)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(GpuError::ShaderCompile(log));
    }

    Ok(shader)
}
