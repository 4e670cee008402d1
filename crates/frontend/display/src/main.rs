use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use clap::Parser;
use emu_core::graphics::Geometry;
use emu_core::logging::{LogConfig, LogLevel};
use emu_core::palette::{Palette, Rgb};
use emu_core::renderer::IndexedFrame;
use emu_core::Size;
use emu_display::{
    BackendKind, Presented, RefreshRegion, RepaintQueue, TextureFilter, VideoCanvas,
    VideoSettings,
};
use minifb::{Key, KeyRepeat, ScaleMode, Window, WindowOptions};

/// Present a test pattern through the display pipeline
#[derive(Parser)]
struct Args {
    /// Emulated screen width in pixels
    #[arg(long, default_value_t = 320)]
    width: u32,

    /// Emulated screen height in pixels
    #[arg(long, default_value_t = 200)]
    height: u32,

    /// Initial window size as a multiple of the screen size
    #[arg(long, default_value_t = 2)]
    scale: u32,

    /// Width-to-height ratio of one emulated pixel
    #[arg(long, default_value_t = 1.0)]
    pixel_aspect: f64,

    /// Settings file (defaults to display.json next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend override: "software" or "accelerated"
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Core log level: off, error, warn, info, debug, trace
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,
}

/// The 16 CGA colors
fn cga_palette() -> Palette {
    Palette::from_packed(&[
        0x000000, 0x0000AA, 0x00AA00, 0x00AAAA, 0xAA0000, 0xAA00AA, 0xAA5500, 0xAAAAAA,
        0x555555, 0x5555FF, 0x55FF55, 0x55FFFF, 0xFF5555, 0xFF55FF, 0xFFFF55, 0xFFFFFF,
    ])
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let level = LogLevel::from_str(&args.log_level)
        .ok_or_else(|| anyhow!("unknown log level '{}'", args.log_level))?;
    LogConfig::global().set_global_level(level);

    let mut settings = match &args.config {
        Some(path) => VideoSettings::load_from(path),
        None => VideoSettings::load(),
    };
    if let Some(kind) = args.backend {
        settings.backend = kind;
    }

    let source = Size::new(args.width.max(1), args.height.max(1));
    let scale = args.scale.max(1) as usize;
    let mut window = Window::new(
        "Display Demo - Esc quits, F2 keep aspect, F3 true aspect, F4 filter",
        source.width as usize * scale,
        source.height as usize * scale,
        WindowOptions {
            resize: true,
            scale_mode: ScaleMode::UpperLeft,
            ..WindowOptions::default()
        },
    )?;
    window.set_target_fps(60);

    let (vw, vh) = window.get_size();
    let host = Rc::new(RefCell::new(RepaintQueue::new()));
    let geometry = Geometry {
        pixel_aspect_ratio: args.pixel_aspect,
    };
    // minifb only takes CPU buffers, so no GPU device is offered here.
    let mut canvas = VideoCanvas::from_settings(
        &settings,
        None,
        Box::new(host.clone()),
        geometry,
        Size::new(vw as u32, vh as u32),
    );

    let mut frame = IndexedFrame::new(source.width, source.height);
    frame.color_bars(8);
    canvas.set_palette(cga_palette(), &mut frame)?;
    canvas.update_context(source.width, source.height)?;
    canvas.refresh_rect(&mut frame, RefreshRegion::at(0, 0, source.width, source.height))?;

    let mut viewport = (vw, vh);
    let mut frame_count: u64 = 0;
    let mut beam_row = 0u32;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        if args.frames.is_some_and(|limit| frame_count >= limit) {
            break;
        }

        if window.is_key_pressed(Key::F2, KeyRepeat::No) {
            let (keep, true_aspect) = canvas.aspect_flags();
            canvas.set_aspect_flags(!keep, true_aspect)?;
        }
        if window.is_key_pressed(Key::F3, KeyRepeat::No) {
            let (keep, true_aspect) = canvas.aspect_flags();
            canvas.set_aspect_flags(keep, !true_aspect)?;
        }
        if window.is_key_pressed(Key::F4, KeyRepeat::No) {
            let next = match canvas.texture_filter() {
                TextureFilter::Nearest => TextureFilter::Linear,
                TextureFilter::Linear => TextureFilter::Nearest,
            };
            canvas.set_texture_filter(next)?;
        }

        let size = window.get_size();
        if size != viewport {
            viewport = size;
            canvas.resize_viewport(size.0 as u32, size.1 as u32)?;
        }

        // Sweep a white line down the bars, refreshing only the rows it touches.
        let previous = beam_row;
        beam_row = (beam_row + 1) % source.height;
        for x in 0..source.width {
            frame.set_pixel(x, previous, ((x / (source.width / 8).max(1)) % 8) as u8);
            frame.set_pixel(x, beam_row, 15);
        }
        canvas.refresh_rect(&mut frame, RefreshRegion::at(0, previous, source.width, 1))?;
        canvas.refresh_rect(&mut frame, RefreshRegion::at(0, beam_row, source.width, 1))?;

        let repaint = host.borrow_mut().take_pending();
        if repaint.is_empty() {
            window.update();
        } else {
            match canvas.present()? {
                Presented::Frame {
                    pixels,
                    width,
                    height,
                } => window.update_with_buffer(pixels, width as usize, height as usize)?,
                Presented::Blank | Presented::Gpu(_) => window.update(),
            }
        }
        frame_count += 1;
    }

    log::info!("{}", canvas.stats().summary());
    canvas.destroy();
    Ok(())
}
