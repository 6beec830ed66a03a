use camera_session::geometry::{
    compute_orientation, negotiate_any, AspectMode, AspectRatio, Facing, Rotation, Size,
    SizePolicy,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn size(width: u32, height: u32) -> Size {
    Size::new(width, height)
}

/// Size lists in the shape a mid-range phone sensor reports.
fn phone_sizes() -> (Vec<Size>, Vec<Size>) {
    let previews = vec![
        size(1920, 1080),
        size(1440, 1080),
        size(1280, 960),
        size(1280, 720),
        size(1088, 1088),
        size(960, 720),
        size(864, 480),
        size(800, 600),
        size(720, 720),
        size(720, 480),
        size(640, 480),
        size(352, 288),
        size(320, 240),
        size(176, 144),
    ];
    let pictures = vec![
        size(4608, 3456),
        size(4608, 2592),
        size(4000, 3000),
        size(3456, 3456),
        size(3264, 2448),
        size(3264, 1836),
        size(2592, 1944),
        size(2560, 1440),
        size(2048, 1536),
        size(1920, 1080),
        size(1600, 1200),
        size(1440, 1440),
        size(1280, 960),
        size(1280, 720),
        size(640, 480),
    ];
    (previews, pictures)
}

fn bench_negotiation(c: &mut Criterion) {
    let (previews, pictures) = phone_sizes();
    let fallbacks = [
        AspectMode::Fixed(AspectRatio::WIDE),
        AspectMode::Fixed(AspectRatio::STANDARD),
        AspectMode::Auto,
    ];
    let threshold = SizePolicy::Threshold {
        preview: size(1280, 720),
        picture: size(3000, 2000),
    };

    let mut group = c.benchmark_group("negotiate");
    group.bench_function("mid_rank_auto", |b| {
        b.iter(|| {
            negotiate_any(
                black_box(&previews),
                black_box(&pictures),
                &[AspectMode::Auto],
                &SizePolicy::MidRank,
            )
        })
    });
    group.bench_function("mid_rank_fallbacks", |b| {
        b.iter(|| {
            negotiate_any(
                black_box(&previews),
                black_box(&pictures),
                &fallbacks,
                &SizePolicy::MidRank,
            )
        })
    });
    group.bench_function("threshold_fallbacks", |b| {
        b.iter(|| negotiate_any(black_box(&previews), black_box(&pictures), &fallbacks, &threshold))
    });
    group.finish();
}

fn bench_orientation(c: &mut Criterion) {
    c.bench_function("compute_orientation", |b| {
        b.iter(|| {
            compute_orientation(
                black_box(Rotation::Deg270),
                black_box(Rotation::Deg90),
                black_box(Facing::Front),
            )
        })
    });
}

criterion_group!(benches, bench_negotiation, bench_orientation);
criterion_main!(benches);
