use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use yapgen::rendering::fonts::FontStore;
use yapgen::snapshot::{CaptureOptions, SnapshotBackend, SoftwareBackend, StagedTree};
use yapgen::{Composition, RasterRenderer};

fn bench_render_background(c: &mut Criterion) {
    let renderer = RasterRenderer::new(Arc::new(FontStore::new()));
    let composition = Composition::default();

    c.bench_function("raster_render_1200x675", |b| {
        b.iter(|| {
            let _ = renderer.render(&composition).unwrap();
        })
    });
}

fn bench_capture_2x(c: &mut Criterion) {
    let backend = SoftwareBackend::new(Arc::new(FontStore::new()));
    let tree = StagedTree::from_composition(&Composition::default());
    let options = CaptureOptions::default();

    c.bench_function("snapshot_capture_2400x1350", |b| {
        b.iter(|| {
            let _ = backend.capture(&tree, &options).unwrap();
        })
    });
}

criterion_group!(benches, bench_render_background, bench_capture_2x);
criterion_main!(benches);
