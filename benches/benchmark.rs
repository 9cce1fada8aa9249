use criterion::{black_box, criterion_group, criterion_main, Criterion};
use landsat_indices::processing::composite::median_composite;
use landsat_indices::processing::indices::{compute_index, SpectralIndex};
use landsat_indices::region::StudyRegion;
use landsat_indices::utils::raster::{GeoInfo, MultiBandRaster, StandardizedImage};

const SIZE: (usize, usize) = (1024, 1024);

fn bench_geo() -> GeoInfo {
    GeoInfo::new("", [0.0, 30.0, 0.0, 30.0 * SIZE.1 as f64, 0.0, -30.0])
}

/// Synthetic standardized image with varying reflectances
fn synthetic_image() -> StandardizedImage {
    let n = SIZE.0 * SIZE.1;
    let band = |base: f32, step: usize| -> Vec<f32> {
        (0..n).map(|i| base + (i % step) as f32 * 0.001).collect()
    };
    let bands = [
        band(0.05, 40),
        band(0.08, 60),
        band(0.10, 50),
        band(0.30, 100),
        band(0.15, 70),
        band(0.08, 30),
    ];
    StandardizedImage::new(SIZE, bench_geo(), bands).unwrap()
}

/// Benchmark the per-pixel index evaluation in isolation
fn benchmark_index_calculation(c: &mut Criterion) {
    let image = synthetic_image();

    c.bench_function("ndvi_core_calculation", |b| {
        b.iter(|| compute_index(black_box(&image), SpectralIndex::NDVI))
    });
    c.bench_function("evi_core_calculation", |b| {
        b.iter(|| compute_index(black_box(&image), SpectralIndex::EVI))
    });
}

/// Benchmark clipping an index image to a polygon region
fn benchmark_clip(c: &mut Criterion) {
    let image = synthetic_image();
    let index = compute_index(&image, SpectralIndex::NDVI);
    let extent = 30.0 * SIZE.0 as f64;
    let region = StudyRegion::rectangle(extent * 0.25, extent * 0.25, extent * 0.75, extent * 0.75).unwrap();

    c.bench_function("region_clip", |b| {
        b.iter(|| region.clip(black_box(index.clone())))
    });
}

/// Benchmark the median composite over a small scene stack
fn benchmark_median_composite(c: &mut Criterion) {
    let n = SIZE.0 * SIZE.1;
    let scenes: Vec<MultiBandRaster> = (0..5)
        .map(|s| {
            MultiBandRaster::new(SIZE, bench_geo())
                .with_band("SR_B4", (0..n).map(|i| ((i + s * 7) % 97) as f32 * 0.01).collect())
                .and_then(|r| r.with_band("SR_B5", (0..n).map(|i| ((i * 3 + s) % 89) as f32 * 0.01).collect()))
                .unwrap()
        })
        .collect();
    let refs: Vec<&MultiBandRaster> = scenes.iter().collect();

    c.bench_function("median_composite_5_scenes", |b| {
        b.iter(|| median_composite(black_box(&refs)))
    });
}

criterion_group!(
    benches,
    benchmark_index_calculation,
    benchmark_clip,
    benchmark_median_composite
);
criterion_main!(benches);
