use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use bgalpha::{
    bilateral_denoise, classify, detect_background_color, feather, process_image, BatchOptions,
    BatchOrchestrator, Color, MemoryImageLoader, NullSink, Preset, ProcessingConfig,
};
use image::{Rgba, RgbaImage};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn studio_shot(size: u32) -> RgbaImage {
    let center = size as f32 / 2.0;
    let radius = size as f32 / 3.0;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        if dx * dx + dy * dy < radius * radius {
            Rgba([(x % 256) as u8, 90, (y % 256) as u8, 255])
        } else {
            Rgba([0, 250, 4, 255])
        }
    })
}

fn bench_stages(c: &mut Criterion) {
    let image = studio_shot(256);
    let background = detect_background_color(&image);
    let map = classify(&image, background, 12.0);

    let mut group = c.benchmark_group("stages");
    group.bench_function("detect", |b| b.iter(|| detect_background_color(black_box(&image))));
    group.bench_function("classify", |b| {
        b.iter(|| classify(black_box(&image), Color::new(0, 248, 0), 12.0));
    });
    group.bench_function("bilateral", |b| {
        b.iter_batched(
            || image.clone(),
            |mut img| bilateral_denoise(&mut img, 2.0, 30.0),
            criterion::BatchSize::LargeInput,
        );
    });
    for radius in [1.5_f32, 3.0] {
        group.bench_with_input(BenchmarkId::new("feather", radius), &radius, |b, &r| {
            b.iter(|| feather(black_box(&map), r));
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);
    for size in [128_u32, 512] {
        let image = studio_shot(size);
        group.bench_with_input(BenchmarkId::new("green_preset", size), &image, |b, img| {
            b.iter(|| process_image(img.clone(), &Preset::Green.config()));
        });
        let hard = ProcessingConfig::builder()
            .smooth(false)
            .feather_radius(0.0)
            .build()
            .unwrap_or_default();
        group.bench_with_input(BenchmarkId::new("hard_edges", size), &image, |b, img| {
            b.iter(|| process_image(img.clone(), &hard));
        });
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let ids: Vec<String> = (0..8).map(|i| format!("shot-{}.jpg", i)).collect();
    let mut loader = MemoryImageLoader::new();
    for id in &ids {
        loader.insert(id.clone(), studio_shot(128));
    }
    let loader = Arc::new(loader);
    let rt = Runtime::new().unwrap();

    c.bench_function("batch_8_items", |b| {
        b.iter(|| {
            let mut orchestrator = BatchOrchestrator::new()
                .with_loader(loader.clone())
                .with_sink(Arc::new(NullSink));
            rt.block_on(orchestrator.convert_all(&ids, &BatchOptions::with_preset(Preset::Green)))
        });
    });
}

criterion_group!(benches, bench_stages, bench_pipeline, bench_batch);
criterion_main!(benches);
