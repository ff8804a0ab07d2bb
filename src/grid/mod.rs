//! Voxel grid: block-type table, octree storage and mesh generation

pub mod config;
pub mod iterator;
pub mod mesh;
pub mod node;
pub mod octree;
pub mod persist;
pub mod pool;

use std::sync::Arc;

use crate::block::BlockPtr;
use crate::core::types::{IVec3, Vec3};
use crate::shape::{Face, VoxelShapeCache};

pub use config::MeshConfig;
pub use iterator::{OctreeIterator, Voxels};
pub use mesh::{BlocksData, MESH_BUILD_WIDTH, MeshBlockCache, RawPrimitiveData, VertexFinal};
pub use node::{BAD_INDEX, Branch, Index, Node, Voxel};
pub use octree::{MAX_DEPTH, MAX_WIDTH, NodesPool, Octree, RayCastResult, is_addressable};
pub use pool::Pool;

/// Most distinct block types one grid can reference (10-bit type field)
pub const MAX_TYPES: usize = 1 << 10;

/// Entry of a grid's block-type table
#[derive(Clone, Debug)]
pub struct BlockType {
    pub block: BlockPtr,
    /// Voxels currently using this type
    pub count: usize,
}

/// A ship or structure made of voxels
#[derive(Clone, Debug, Default)]
pub struct Grid {
    octree: Octree,
    types: Vec<BlockType>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(octree: Octree, types: Vec<BlockType>) -> Self {
        Self { octree, types }
    }

    /// Place `block` at `pos`, replacing whatever was there
    ///
    /// # Panics
    /// Panics if `pos` is not [`octree::is_addressable`].
    pub fn insert(&mut self, pos: IVec3, block: &BlockPtr, rotation: u8, color: u8, shape: u8) {
        let block_type = self.insert_block(block);
        self.insert_type(pos, block_type, rotation, color, shape);
    }

    /// Place a voxel of an already registered type at `pos`.
    ///
    /// The type index is not validated; voxels of unknown types are skipped
    /// while meshing.
    pub fn insert_type(&mut self, pos: IVec3, block_type: u16, rotation: u8, color: u8, shape: u8) {
        if let Some(old) = self.octree.find(pos) {
            self.release_type(old.block_type());
        }
        self.octree
            .insert(pos, Voxel::new(block_type, color, rotation, shape));
    }

    /// Type index of `block`, registering it on first use. Counts one more
    /// voxel of that type.
    ///
    /// # Panics
    /// Panics if the grid already references [`MAX_TYPES`] distinct blocks.
    pub fn insert_block(&mut self, block: &BlockPtr) -> u16 {
        if let Some(i) = self.types.iter().position(|t| Arc::ptr_eq(&t.block, block)) {
            self.types[i].count += 1;
            return i as u16;
        }

        assert!(
            self.types.len() < MAX_TYPES,
            "Grid type table full ({} entries)",
            MAX_TYPES
        );
        log::debug!("Registering block type {} as '{}'", self.types.len(), block.name());
        self.types.push(BlockType {
            block: block.clone(),
            count: 1,
        });
        (self.types.len() - 1) as u16
    }

    fn release_type(&mut self, block_type: u16) {
        if let Some(entry) = self.types.get_mut(block_type as usize) {
            entry.count = entry.count.saturating_sub(1);
        }
    }

    /// Remove the voxel at `pos`; `false` if the cell was empty
    pub fn remove(&mut self, pos: IVec3) -> bool {
        let Some(old) = self.octree.find(pos) else {
            return false;
        };
        self.release_type(old.block_type());
        self.octree.remove(pos)
    }

    pub fn find(&self, pos: IVec3) -> Option<Voxel> {
        self.octree.find(pos)
    }

    /// Block registered under a type index; `None` for stale indices
    pub fn get_type(&self, index: usize) -> Option<&BlockPtr> {
        self.types.get(index).map(|t| &t.block)
    }

    pub fn types(&self) -> &[BlockType] {
        &self.types
    }

    pub fn ray_cast(&self, from: Vec3, to: Vec3) -> Option<RayCastResult> {
        self.octree.ray_cast(from, to)
    }

    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    pub fn pool(&self) -> &NodesPool {
        self.octree.pool()
    }

    pub fn iterate(&self) -> OctreeIterator<'_> {
        self.octree.iterate()
    }

    pub fn voxels(&self) -> Voxels<'_> {
        self.octree.voxels()
    }

    pub fn dump(&self) {
        self.octree.dump();
    }

    /// Mesh the whole grid with the default [`MeshConfig`]
    pub fn generate_mesh(&self, shapes: &VoxelShapeCache, out: &mut RawPrimitiveData) {
        self.generate_mesh_with(shapes, out, &MeshConfig::default());
    }

    /// Mesh the whole grid, appending per-material geometry to `out`
    pub fn generate_mesh_with(&self, shapes: &VoxelShapeCache, out: &mut RawPrimitiveData, config: &MeshConfig) {
        let mut cache = MeshBlockCache::new();
        self.generate_mesh_level(self.octree.iterate(), shapes, out, config, &mut cache);
    }

    fn generate_mesh_level(
        &self,
        mut it: OctreeIterator<'_>,
        shapes: &VoxelShapeCache,
        out: &mut RawPrimitiveData,
        config: &MeshConfig,
        cache: &mut MeshBlockCache,
    ) {
        while it.is_valid() {
            if !it.is_voxel() {
                if it.branch_width() as usize <= MESH_BUILD_WIDTH {
                    self.generate_mesh_block(&it, shapes, out, config, cache);
                } else {
                    self.generate_mesh_level(it.children(), shapes, out, config, cache);
                }
            }
            it.advance();
        }
    }

    fn generate_mesh_block(
        &self,
        it: &OctreeIterator<'_>,
        shapes: &VoxelShapeCache,
        out: &mut RawPrimitiveData,
        config: &MeshConfig,
        cache: &mut MeshBlockCache,
    ) {
        let width = it.branch_width();
        let min = it.pos() - IVec3::splat(width / 2);

        cache.clear();
        Self::generate_mesh_cache(it.children(), cache, min);
        self.fill_padding(cache, min, width);

        log::debug!("Building mesh block at {:?} ({} voxels cached)", min, cache.count());
        mesh::build(shapes, cache, &self.types, out, min, config);
    }

    /// Copy every voxel below `it` into `cache`, relative to `offset`
    pub fn generate_mesh_cache(mut it: OctreeIterator<'_>, cache: &mut MeshBlockCache, offset: IVec3) {
        while it.is_valid() {
            if it.is_voxel() {
                cache.set(it.pos() - offset, *it.value().voxel());
            } else {
                Self::generate_mesh_cache(it.children(), cache, offset);
            }
            it.advance();
        }
    }

    /// Copy the face-adjacent slabs of neighbouring blocks into the padding
    /// ring so faces shared with another block are culled too.
    fn fill_padding(&self, cache: &mut MeshBlockCache, min: IVec3, width: i32) {
        for face in Face::ALL {
            let normal = face.offset();
            let axis = if normal.x != 0 { 0 } else if normal.y != 0 { 1 } else { 2 };
            let outside = if normal[axis] > 0 { width } else { -1 };

            for u in 0..width {
                for v in 0..width {
                    let mut local = IVec3::ZERO;
                    local[axis] = outside;
                    local[(axis + 1) % 3] = u;
                    local[(axis + 2) % 3] = v;
                    if let Some(voxel) = self.octree.find(min + local) {
                        cache.set(local, voxel);
                    }
                }
            }
        }
    }
}
