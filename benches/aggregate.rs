//! Benchmarks for the aggregation passes.

use criterion::{criterion_group, criterion_main, Criterion};
use strata::prelude::*;
use nalgebra::Point3;

/// An `n x n x n` box of unit cubes, each split into six tetrahedra, as a
/// single region; the interior plane `z = n / 2` carries a triangulated
/// surface matching the cell facets on both sides.
fn box_model(n: usize) -> GeoModel {
    let side = n + 1;
    let vertex = |i: usize, j: usize, k: usize| (k * side + j) * side + i;

    let mut points = Vec::with_capacity(side * side * side);
    for k in 0..side {
        for j in 0..side {
            for i in 0..side {
                points.push(Point3::new(i as f64, j as f64, k as f64));
            }
        }
    }

    let tets: [[(usize, usize, usize); 4]; 6] = [
        [(0, 0, 0), (1, 0, 0), (1, 1, 0), (1, 1, 1)],
        [(0, 0, 0), (1, 0, 0), (1, 0, 1), (1, 1, 1)],
        [(0, 0, 0), (0, 1, 0), (1, 1, 0), (1, 1, 1)],
        [(0, 0, 0), (0, 1, 0), (0, 1, 1), (1, 1, 1)],
        [(0, 0, 0), (0, 0, 1), (1, 0, 1), (1, 1, 1)],
        [(0, 0, 0), (0, 0, 1), (0, 1, 1), (1, 1, 1)],
    ];
    let mut cells = Vec::with_capacity(n * n * n * 6);
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                for tet in &tets {
                    let vs: Vec<usize> = tet
                        .iter()
                        .map(|&(di, dj, dk)| vertex(i + di, j + dj, k + dk))
                        .collect();
                    cells.push((CellType::Tetrahedron, vs));
                }
            }
        }
    }

    let mid = (n / 2) as f64;
    let mut surface_points = Vec::with_capacity(side * side);
    for j in 0..side {
        for i in 0..side {
            surface_points.push(Point3::new(i as f64, j as f64, mid));
        }
    }
    let mut triangles = Vec::with_capacity(n * n * 2);
    for j in 0..n {
        for i in 0..n {
            let v00 = j * side + i;
            let v10 = v00 + 1;
            let v01 = v00 + side;
            let v11 = v01 + 1;
            triangles.push(vec![v00, v10, v11]);
            triangles.push(vec![v00, v11, v01]);
        }
    }

    let mut model = GeoModel::new();
    model.add_surface(surface_points, &triangles).unwrap();
    model.add_region(points, &cells).unwrap();
    model
}

fn bench_vertex_aggregation(c: &mut Criterion) {
    c.bench_function("vertices_box_10", |b| {
        b.iter_batched(
            || box_model(10),
            |model| {
                let mut mesh = GeoModelMesh::new(model);
                mesh.vertices().nb_vertices()
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_cell_aggregation(c: &mut Criterion) {
    c.bench_function("polygons_and_cells_box_10", |b| {
        b.iter_batched(
            || {
                // Pre-build the vertex set so only the element passes are
                // timed through the lazy facade.
                let mut mesh = GeoModelMesh::new(box_model(10));
                mesh.vertices();
                mesh
            },
            |mut mesh| {
                mesh.polygons().nb_polygons(None) + mesh.cells().nb_cells(None)
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_duplication(c: &mut Criterion) {
    c.bench_function("duplicate_all_box_8", |b| {
        b.iter_batched(
            || {
                let mut mesh = GeoModelMesh::new(box_model(8));
                mesh.cells();
                mesh.polygons();
                mesh
            },
            |mut mesh| mesh.duplicate_vertices(DuplicateMode::All).unwrap(),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_vertex_aggregation,
    bench_cell_aggregation,
    bench_duplication
);
criterion_main!(benches);
