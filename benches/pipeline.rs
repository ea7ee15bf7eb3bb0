//! Benchmarks for the geometry pipeline.

use criterion::{criterion_group, criterion_main, Criterion};
use metaseq::algo::{apply_mirroring, subdivide};
use metaseq::build::MeshBuilder;
use metaseq::mesh::Mesh;
use metaseq::nalgebra::{Matrix4, Point3};
use metaseq::scene::{MirrorAxes, MirrorMode, MirrorSettings};

fn create_grid_mesh(n: usize) -> Mesh {
    let mut mesh = Mesh::new();

    for j in 0..=n {
        for i in 0..=n {
            mesh.add_position(Point3::new(i as f32, j as f32, 0.0));
        }
    }

    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;

            mesh.add_face(&[v00, v10, v11, v01]);
        }
    }

    mesh
}

fn bench_subdivide(c: &mut Criterion) {
    c.bench_function("subdivide_grid_32x32", |b| {
        b.iter(|| {
            let mut mesh = create_grid_mesh(32);
            subdivide(&mut mesh).unwrap()
        });
    });
}

fn bench_mirror(c: &mut Criterion) {
    let settings = MirrorSettings {
        mode: MirrorMode::Connect,
        axes: MirrorAxes {
            x: true,
            local: true,
            ..MirrorAxes::default()
        },
        distance: None,
    };

    c.bench_function("mirror_connect_grid_32x32", |b| {
        b.iter(|| {
            let mut mesh = create_grid_mesh(32);
            apply_mirroring(&mut mesh, &settings, &Matrix4::identity()).unwrap();
            mesh
        });
    });
}

fn bench_build(c: &mut Criterion) {
    let falloff = (59.5_f32.to_radians() * 1.1).cos();

    c.bench_function("build_grid_64x64_smoothed", |b| {
        b.iter(|| {
            let mut mesh = create_grid_mesh(64);
            let mut builder = MeshBuilder::new(true);
            builder.begin().unwrap();
            builder.add_mesh(&mut mesh, Some(falloff)).unwrap();
            builder.finish().unwrap()
        });
    });
}

criterion_group!(benches, bench_subdivide, bench_mirror, bench_build);
criterion_main!(benches);
