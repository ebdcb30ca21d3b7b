//! Benchmarks for the Biot-Savart influence kernels.
//!
//! Run with: `cargo bench --bench kernel_bench`
//!
//! Compares the scalar reference kernels against the dispatched SIMD path
//! over a range of population sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vpm2d::kernels::{vel_points_on_points, vel_points_on_points_scalar};

/// Generate a deterministic particle cloud.
fn generate_cloud(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    let mut s = Vec::with_capacity(n);
    let mut r = Vec::with_capacity(n);
    for i in 0..n {
        let a = i as f64 * 0.377;
        x.push(2.0 * a.sin());
        y.push(2.0 * (a * 1.3).cos());
        s.push(0.5 * (a * 0.7).sin());
        r.push(0.05 + 0.01 * ((i % 7) as f64));
    }
    (x, y, s, r)
}

fn bench_velocity_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("vel_points_on_points");

    for &n in &[64usize, 256, 1024, 4096] {
        let (sx, sy, ss, sr) = generate_cloud(n);
        let (tx, ty, _, _) = generate_cloud(n);

        group.bench_with_input(BenchmarkId::new("scalar", n), &n, |b, _| {
            b.iter(|| {
                let mut u = vec![0.0; n];
                let mut v = vec![0.0; n];
                vel_points_on_points_scalar(
                    black_box(&sx),
                    black_box(&sy),
                    black_box(&ss),
                    black_box(&sr),
                    black_box(&tx),
                    black_box(&ty),
                    &mut u,
                    &mut v,
                );
                (u, v)
            })
        });

        group.bench_with_input(BenchmarkId::new("dispatched", n), &n, |b, _| {
            b.iter(|| {
                let mut u = vec![0.0; n];
                let mut v = vec![0.0; n];
                vel_points_on_points(
                    black_box(&sx),
                    black_box(&sy),
                    black_box(&ss),
                    black_box(&sr),
                    black_box(&tx),
                    black_box(&ty),
                    &mut u,
                    &mut v,
                );
                (u, v)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_velocity_kernels);
criterion_main!(benches);
