use criterion::{criterion_group, criterion_main, Criterion};

use projmap_engine::{MediaRegistry, Surface};

fn bench_mesh_generation(c: &mut Criterion) {
    let registry = MediaRegistry::new();

    let flat = Surface::default();
    c.bench_function("recompute_mesh flat quad", |b| {
        b.iter(|| flat.recompute_mesh(&registry))
    });

    let mut bezier = Surface::default();
    bezier.set_bezier_enabled(true);
    c.bench_function("recompute_mesh bezier grid", |b| {
        b.iter(|| bezier.recompute_mesh(&registry))
    });
}

criterion_group!(benches, bench_mesh_generation);
criterion_main!(benches);
