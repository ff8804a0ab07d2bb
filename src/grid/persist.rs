//! Grid serialization (rkyv + LZ4) and file storage

use std::path::Path;

use rkyv::{Archive, Deserialize, Serialize};

use crate::block::catalog::BlockCatalog;
use crate::core::error::Error;
use crate::core::types::Result;

use super::node::{Node, is_link};
use super::octree::{MAX_DEPTH, NodesPool, Octree};
use super::{BlockType, Grid};

/// Current version of the grid file format
pub const GRID_DATA_VERSION: u32 = 1;

/// File extension for grid files
pub const GRID_FILE_EXTENSION: &str = "vxg";

/// Type table entry, stored by block name
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TypeData {
    pub name: String,
    pub count: u64,
}

/// Serializable grid snapshot: raw pool contents plus the type table
#[derive(Archive, Deserialize, Serialize, Debug, Clone)]
pub struct GridData {
    pub version: u32,
    pub depth: u32,
    pub nodes: Vec<Node>,
    pub counters: Vec<u16>,
    pub types: Vec<TypeData>,
}

impl GridData {
    pub fn from_grid(grid: &Grid) -> Self {
        let pool = grid.pool();
        Self {
            version: GRID_DATA_VERSION,
            depth: grid.octree().depth() as u32,
            nodes: pool.items().to_vec(),
            counters: pool.counters().to_vec(),
            types: grid
                .types()
                .iter()
                .map(|t| TypeData {
                    name: t.block.name().to_string(),
                    count: t.count as u64,
                })
                .collect(),
        }
    }

    /// Rebuild a grid, resolving block names through `catalog`
    pub fn to_grid(self, catalog: &BlockCatalog) -> Result<Grid> {
        if self.version != GRID_DATA_VERSION {
            return Err(Error::Corrupt(format!(
                "grid data version mismatch: expected {}, got {}",
                GRID_DATA_VERSION, self.version
            )));
        }
        if self.depth == 0 || self.depth as usize > MAX_DEPTH {
            return Err(Error::Corrupt(format!(
                "depth {} outside 1..={}",
                self.depth, MAX_DEPTH
            )));
        }

        let types = self
            .types
            .into_iter()
            .map(|t| {
                let block = catalog
                    .get(&t.name)
                    .ok_or_else(|| Error::UnknownBlock(t.name.clone()))?;
                Ok(BlockType {
                    block: block.clone(),
                    count: t.count as usize,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let nodes = NodesPool::from_raw(self.nodes, self.counters)
            .ok_or_else(|| Error::Corrupt("node pool counters do not match contents".into()))?;
        validate_links(&nodes, self.depth as usize)?;

        Ok(Grid::from_parts(Octree::from_parts(nodes, self.depth as usize), types))
    }
}

/// Check that every reachable link points at an occupied slot and that each
/// slot is reached exactly once, so the structure is a tree.
fn validate_links(nodes: &NodesPool, depth: usize) -> Result<()> {
    let len = nodes.items().len();
    if nodes.items().first().is_none_or(|root| root.is_empty()) {
        return Err(Error::Corrupt("missing root node".into()));
    }

    let mut visited = vec![false; len];
    visited[0] = true;
    let mut stack = vec![(nodes.at(0).branch().child(), 1usize)];
    while let Some((first, level)) = stack.pop() {
        let is_voxel = level == depth;
        let mut idx = first;
        while is_link(idx) {
            let slot = idx as usize;
            if slot >= len || nodes.at(slot).is_empty() {
                return Err(Error::Corrupt(format!("dangling link to node {}", idx)));
            }
            if std::mem::replace(&mut visited[slot], true) {
                return Err(Error::Corrupt(format!("node {} is linked more than once", idx)));
            }

            let node = nodes.at(slot);
            if !is_voxel {
                stack.push((node.branch().child(), level + 1));
            }
            idx = node.next(is_voxel);
        }
    }
    Ok(())
}

/// Serialize a grid to uncompressed rkyv bytes
pub fn serialize_grid(grid: &Grid) -> Result<Vec<u8>> {
    let data = GridData::from_grid(grid);
    let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&data)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(bytes.to_vec())
}

/// Inverse of [`serialize_grid`]
pub fn deserialize_grid(bytes: &[u8], catalog: &BlockCatalog) -> Result<Grid> {
    let mut aligned = rkyv::util::AlignedVec::<16>::new();
    aligned.extend_from_slice(bytes);

    let archived = rkyv::access::<ArchivedGridData, rkyv::rancor::Error>(&aligned)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    let data = rkyv::deserialize::<GridData, rkyv::rancor::Error>(archived)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    data.to_grid(catalog)
}

/// Serialize to compressed bytes (rkyv + LZ4)
pub fn compress_grid(grid: &Grid) -> Result<Vec<u8>> {
    let bytes = serialize_grid(grid)?;
    Ok(lz4_flex::compress_prepend_size(&bytes))
}

/// Deserialize from compressed bytes
pub fn decompress_grid(data: &[u8], catalog: &BlockCatalog) -> Result<Grid> {
    let bytes = lz4_flex::decompress_size_prepended(data)
        .map_err(|e| Error::Serialization(format!("LZ4 decompression failed: {}", e)))?;
    deserialize_grid(&bytes, catalog)
}

/// Save to file (async)
pub async fn save_grid(path: &Path, grid: &Grid) -> Result<()> {
    let bytes = compress_grid(grid)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::fs::write(path, bytes).await?;
    log::info!("Saved grid to {:?} ({} nodes)", path, grid.octree().len());
    Ok(())
}

/// Load from file (async)
pub async fn load_grid(path: &Path, catalog: &BlockCatalog) -> Result<Grid> {
    let bytes = tokio::fs::read(path).await?;
    let grid = decompress_grid(&bytes, catalog)?;
    log::info!("Loaded grid from {:?} ({} nodes)", path, grid.octree().len());
    Ok(grid)
}

/// Save to file (sync)
pub fn save_grid_sync(path: &Path, grid: &Grid) -> Result<()> {
    let bytes = compress_grid(grid)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, bytes)?;
    Ok(())
}

/// Load from file (sync)
pub fn load_grid_sync(path: &Path, catalog: &BlockCatalog) -> Result<Grid> {
    let bytes = std::fs::read(path)?;
    decompress_grid(&bytes, catalog)
}
