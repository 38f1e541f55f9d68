//! Boundary rendering benchmarks.
//!
//! Run with: cargo bench --bench boundary

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mlp::{sequential, Activation, AdamConfig, Loss};
use planefit::{render_boundary, BoundaryStyle, Class, Point, RenderTarget};

fn points() -> Vec<Point> {
    (0..20)
        .map(|i| {
            let class = if i % 2 == 0 { Class::Blue } else { Class::Red };
            Point::new(40.0 * i as f32, 30.0 * i as f32, class)
        })
        .collect()
}

/// Full redraw of an 800x800 canvas at several grid resolutions.
fn bench_render_boundary(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_boundary");
    group.sample_size(30);

    let model = sequential(2)
        .dense(4, Activation::Relu)
        .dense(1, Activation::Sigmoid)
        .build::<f32>(AdamConfig::default(), Loss::BinaryCrossEntropy, 42)
        .unwrap();
    let points = points();

    for resolution in [50u32, 100, 200] {
        let style = BoundaryStyle {
            resolution,
            ..BoundaryStyle::default()
        };
        group.throughput(Throughput::Elements(u64::from(resolution * resolution)));
        group.bench_with_input(
            BenchmarkId::from_parameter(resolution),
            &style,
            |b, style| {
                let mut target = RenderTarget::new(800, 800);
                b.iter(|| {
                    render_boundary(&model, black_box(&mut target), &points, style).unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_render_boundary);
criterion_main!(benches);
