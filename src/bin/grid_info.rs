//! Print a summary of a saved grid.
//!
//! Usage:
//!   cargo run --release --bin grid_info -- <catalog.json> <grid file>
//!
//! Set `RUST_LOG=voxgrid=debug` to dump the tree structure as well.

use std::path::PathBuf;

use voxgrid::core::logging;
use voxgrid::core::types::Result;
use voxgrid::grid::persist::load_grid;
use voxgrid::{BlockCatalog, RawPrimitiveData, VoxelShapeCache};

#[tokio::main]
async fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: grid_info <catalog.json> <grid file>");
        std::process::exit(2);
    }

    if let Err(e) = run(PathBuf::from(&args[1]), PathBuf::from(&args[2])).await {
        eprintln!("grid_info: {}", e);
        std::process::exit(1);
    }
}

async fn run(catalog_path: PathBuf, grid_path: PathBuf) -> Result<()> {
    let catalog = BlockCatalog::load(&catalog_path).await?;
    let grid = load_grid(&grid_path, &catalog).await?;
    let octree = grid.octree();

    println!("Grid: {}", grid_path.display());
    println!("  depth:  {}", octree.depth());
    println!("  width:  {} (cells {}..{})", octree.width() * 2, -octree.width(), octree.width());
    println!("  nodes:  {} (pool capacity {})", octree.len(), grid.pool().capacity());
    println!("  voxels: {}", grid.voxels().count());

    println!("Types:");
    for (i, entry) in grid.types().iter().enumerate() {
        println!(
            "  {:>4}  {:<24} {:>8}  {}",
            i,
            entry.block.name(),
            entry.count,
            entry.block.label()
        );
    }

    grid.dump();

    let shapes = VoxelShapeCache::cube_only();
    let mut out = RawPrimitiveData::new();
    let start = std::time::Instant::now();
    grid.generate_mesh(&shapes, &mut out);
    let elapsed = start.elapsed();

    let mut materials: Vec<_> = out.iter().collect();
    materials.sort_by(|a, b| a.0.material().name.cmp(&b.0.material().name));

    println!("Mesh ({} materials, {:.2} ms):", materials.len(), elapsed.as_secs_f64() * 1000.0);
    for (key, data) in materials {
        println!(
            "  {:<24} {:>8} vertices {:>8} indices",
            key.material().name,
            data.vertices.len(),
            data.indices.len()
        );
    }

    Ok(())
}
