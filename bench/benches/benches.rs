use criterion::{Criterion, criterion_group, criterion_main};
use relief_core::{Curve, ReliefMask, Surface, SurfaceField};
use std::hint::black_box;

const SIZE: usize = 512;

// Field with a handful of raised ridges on both surfaces
fn sample_field() -> SurfaceField {
    let mut field = SurfaceField::new(SIZE, SIZE);
    for (i, row) in [64, 150, 256, 333, 470].into_iter().enumerate() {
        let mut ridge = Curve::new(SIZE);
        for k in 1..12 {
            let loc = k * SIZE / 12;
            let h = 0.1 + 0.05 * ((k + i) % 7) as f64;
            ridge.insert_point(loc, h).unwrap();
        }
        let surface = if i % 2 == 0 { Surface::Top } else { Surface::Bottom };
        field.insert_ridge(row, ridge, surface).unwrap();
    }
    field
}

fn bench_full_raster(c: &mut Criterion) {
    let field = sample_field();
    let mut mask = ReliefMask::new(SIZE, SIZE);
    c.bench_function("copy_to_relief_mask 512x512 full", |b| {
        b.iter(|| {
            field
                .copy_to_relief_mask(&mut mask, None, false)
                .unwrap();
        })
    });
}

fn bench_band_raster(c: &mut Criterion) {
    let field = sample_field();
    let mut mask = ReliefMask::new(SIZE, SIZE);
    let (lo, hi) = field.bracketing_locs(200, Surface::Top);
    c.bench_function("copy_to_relief_mask 512x512 drag band", |b| {
        b.iter(|| {
            field
                .copy_to_relief_mask(&mut mask, Some(lo..=hi), true)
                .unwrap();
            mask.take_pending_rows()
        })
    });
}

fn bench_mask_profile(c: &mut Criterion) {
    let field = sample_field();
    c.bench_function("mask_profile interpolated rows", |b| {
        b.iter(|| {
            for row in (0..SIZE).step_by(7) {
                black_box(field.mask_profile(black_box(row), Surface::Top));
            }
        })
    });
}

fn bench_json_round_trip(c: &mut Criterion) {
    let field = sample_field();
    c.bench_function("mask JSON save + load", |b| {
        b.iter(|| {
            let text = field.to_json_string().unwrap();
            SurfaceField::from_json_str(&text).unwrap()
        })
    });
}

criterion_group!(
    mask_benchmarks,
    bench_full_raster,
    bench_band_raster,
    bench_mask_profile,
    bench_json_round_trip
);
criterion_main!(mask_benchmarks);
