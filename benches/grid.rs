use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, black_box};

use voxgrid::core::types::{IVec3, Vec3};
use voxgrid::grid::persist::{compress_grid, decompress_grid};
use voxgrid::{Block, BlockCatalog, BlockPtr, Grid, Material, RawPrimitiveData, VoxelShapeCache};

fn steel() -> BlockPtr {
    Arc::new(Block::singular("steel_plate", Material::new("steel")))
}

/// Hollow box hull, `size` cells per side
fn create_test_hull(block: &BlockPtr, size: i32) -> Grid {
    let mut grid = Grid::new();
    let half = size / 2;
    for z in -half..half {
        for y in -half..half {
            for x in -half..half {
                let edge = [x, y, z].iter().any(|&c| c == -half || c == half - 1);
                if edge {
                    grid.insert(IVec3::new(x, y, z), block, 0, 0, 0);
                }
            }
        }
    }
    grid
}

fn bench_insert_hull_32(c: &mut Criterion) {
    let block = steel();

    c.bench_function("insert_hull_32", |b| {
        b.iter(|| create_test_hull(black_box(&block), 32));
    });
}

fn bench_find(c: &mut Criterion) {
    let grid = create_test_hull(&steel(), 32);

    c.bench_function("find_hull_32", |b| {
        let mut i = 0i32;
        b.iter(|| {
            i = i.wrapping_add(7919);
            let pos = IVec3::new(i % 16, (i / 16) % 16, -16);
            grid.find(black_box(pos))
        });
    });
}

fn bench_ray_cast(c: &mut Criterion) {
    let grid = create_test_hull(&steel(), 32);

    c.bench_function("ray_cast_hull_32", |b| {
        b.iter(|| {
            grid.ray_cast(
                black_box(Vec3::new(-40.0, 3.2, 1.7)),
                black_box(Vec3::new(40.0, -2.1, 0.4)),
            )
        });
    });
}

fn bench_generate_mesh(c: &mut Criterion) {
    let shapes = VoxelShapeCache::cube_only();
    let grid = create_test_hull(&steel(), 32);

    c.bench_function("generate_mesh_hull_32", |b| {
        b.iter(|| {
            let mut out = RawPrimitiveData::new();
            grid.generate_mesh(black_box(&shapes), &mut out);
            out
        });
    });
}

fn bench_persist(c: &mut Criterion) {
    let block = steel();
    let mut catalog = BlockCatalog::new();
    catalog.insert(block.clone());
    let grid = create_test_hull(&block, 32);

    c.bench_function("compress_grid_hull_32", |b| {
        b.iter(|| compress_grid(black_box(&grid)))
    });

    let Ok(bytes) = compress_grid(&grid) else {
        return;
    };
    c.bench_function("decompress_grid_hull_32", |b| {
        b.iter(|| decompress_grid(black_box(&bytes), &catalog))
    });
}

criterion_group!(
    benches,
    bench_insert_hull_32,
    bench_find,
    bench_ray_cast,
    bench_generate_mesh,
    bench_persist,
);
criterion_main!(benches);
