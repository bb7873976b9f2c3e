//! Benchmarks for imagery algorithms

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vegscope_algorithms::collection::{ImageCollection, Reducer};
use vegscope_algorithms::imagery::{mask_clouds, ndvi, Pipeline, SpectralIndex};
use vegscope_core::{GeoTransform, Image, Raster};

fn create_band(size: usize, base: f64) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    for row in 0..size {
        for col in 0..size {
            let v = base + ((row * 7 + col * 13) % 200) as f64;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn create_qa(size: usize) -> Raster<f64> {
    let mut r = create_band(size, 0.0);
    for row in 0..size {
        for col in 0..size {
            let flag = if (row + col) % 5 == 0 { 1024.0 } else { 0.0 };
            r.set(row, col, flag).unwrap();
        }
    }
    r
}

fn create_scene(size: usize) -> Image {
    Image::from_bands(
        "bench",
        [
            ("B2", create_band(size, 400.0)),
            ("B4", create_band(size, 900.0)),
            ("B8", create_band(size, 2800.0)),
            ("B11", create_band(size, 1700.0)),
            ("QA60", create_qa(size)),
        ],
    )
    .unwrap()
}

fn bench_ndvi(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/ndvi");
    for size in [256, 512, 1024, 2048] {
        let nir = create_band(size, 3000.0);
        let red = create_band(size, 1000.0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| ndvi(black_box(&nir), black_box(&red)).unwrap())
        });
    }
    group.finish();
}

fn bench_cloud_mask(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/cloud_mask");
    for size in [256, 512, 1024] {
        let scene = create_scene(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| mask_clouds(black_box(&scene)).unwrap())
        });
    }
    group.finish();
}

fn bench_pipeline_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection/median_composite");
    group.sample_size(20);
    for size in [128, 256, 512] {
        let collection = ImageCollection::new((0..8).map(|_| create_scene(size)).collect());
        let pipeline = Pipeline::sentinel2(SpectralIndex::ALL);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                pipeline
                    .apply_collection(black_box(&collection))
                    .and_then(|processed| processed.reduce(Reducer::Median))
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ndvi, bench_cloud_mask, bench_pipeline_composite);
criterion_main!(benches);
