use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use emu_core::graphics::compute_transform;

fn bench_compute_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_transform");

    for &(vw, vh) in &[(640u32, 400u32), (1920, 1080), (800, 1200)] {
        group.bench_with_input(
            BenchmarkId::new("keep_aspect", format!("{}x{}", vw, vh)),
            &(vw, vh),
            |b, &(vw, vh)| {
                b.iter(|| {
                    compute_transform(
                        black_box(384),
                        black_box(272),
                        black_box(vw),
                        black_box(vh),
                        true,
                        true,
                        black_box(0.9365),
                    )
                })
            },
        );
    }

    group.bench_function("stretch", |b| {
        b.iter(|| compute_transform(black_box(384), black_box(272), 1920, 1080, false, false, 1.0))
    });

    group.finish();
}

criterion_group!(benches, bench_compute_transform);
criterion_main!(benches);
