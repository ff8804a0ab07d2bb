//! Voxgrid - sparse voxel grids for ship and structure building

pub mod core;
pub mod math;
pub mod shape;
pub mod block;
pub mod grid;

pub use block::catalog::BlockCatalog;
pub use block::{Block, BlockPtr, Material, MaterialKey};
pub use grid::{Grid, MeshConfig, RawPrimitiveData, RayCastResult, Voxel};
pub use shape::{Face, ShapeType, VoxelShape};
pub use shape::cache::VoxelShapeCache;
