use std::cell::RefCell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use emu_core::graphics::Geometry;
use emu_core::palette::Palette;
use emu_core::renderer::IndexedFrame;
use emu_core::Size;
use emu_display::backend::{AcceleratedBackend, HeadlessDevice, SoftwareBackend};
use emu_display::{RefreshRegion, RendererBackend, RepaintQueue, VideoCanvas, VideoSettings};

fn canvas(backend: Box<dyn RendererBackend>, frame: &mut IndexedFrame) -> VideoCanvas {
    let host = Rc::new(RefCell::new(RepaintQueue::new()));
    let mut canvas = VideoCanvas::new(
        backend,
        Box::new(host),
        &VideoSettings::default(),
        Geometry::default(),
        Size::new(1280, 800),
    );
    let palette = Palette::from_packed(&(0..16u32).map(|i| i * 0x0011_1111).collect::<Vec<_>>());
    let _ = canvas.set_palette(palette, frame);
    let _ = canvas.update_context(320, 200);
    canvas
}

fn bench_software(c: &mut Criterion) {
    let mut frame = IndexedFrame::new(320, 200);
    frame.color_bars(16);
    let mut canvas = canvas(Box::new(SoftwareBackend::new()), &mut frame);

    c.bench_function("software_full_frame_refresh", |b| {
        b.iter(|| {
            let _ = canvas.refresh_rect(&mut frame, black_box(RefreshRegion::at(0, 0, 320, 200)));
        })
    });

    c.bench_function("software_present_1280x800", |b| {
        b.iter(|| {
            let _ = black_box(canvas.present());
        })
    });
}

fn bench_accelerated(c: &mut Criterion) {
    let mut frame = IndexedFrame::new(320, 200);
    frame.color_bars(16);
    let device = HeadlessDevice::new();
    let backend = AcceleratedBackend::new(Box::new(device.clone()));
    let mut canvas = canvas(Box::new(backend), &mut frame);
    let _ = canvas.present();

    c.bench_function("accelerated_scanline_frame", |b| {
        b.iter(|| {
            for row in 0..200 {
                let _ = canvas.refresh_rect(&mut frame, RefreshRegion::at(0, row, 320, 1));
            }
            let _ = black_box(canvas.present());
            device.clear_ops();
        })
    });
}

criterion_group!(benches, bench_software, bench_accelerated);
criterion_main!(benches);
