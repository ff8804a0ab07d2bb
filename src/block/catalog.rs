//! Block catalog loaded from a JSON definition file

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::types::Result;

use super::{Block, BlockDefinition, BlockPtr};

/// On-disk catalog format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default = "default_version")]
    version: u32,
    blocks: HashMap<String, BlockDefinition>,
}

fn default_version() -> u32 {
    CATALOG_VERSION
}

const CATALOG_VERSION: u32 = 1;

/// Named block assets, shared by every grid built from them
#[derive(Debug, Default)]
pub struct BlockCatalog {
    blocks: HashMap<String, BlockPtr>,
}

impl BlockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from its JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        if file.version != CATALOG_VERSION {
            log::warn!(
                "Block catalog version {} (expected {})",
                file.version,
                CATALOG_VERSION
            );
        }

        let mut catalog = Self::new();
        for (name, definition) in file.blocks {
            let block = Block::from_definition(name, definition)?;
            catalog.insert(Arc::new(block));
        }
        log::info!("Loaded {} block definitions", catalog.len());
        Ok(catalog)
    }

    /// Load a catalog file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json(&json)
    }

    /// Load a catalog file (sync)
    pub fn load_sync(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Register a block under its own name, replacing any previous entry
    pub fn insert(&mut self, block: BlockPtr) -> Option<BlockPtr> {
        self.blocks.insert(block.name().to_string(), block)
    }

    pub fn get(&self, name: &str) -> Option<&BlockPtr> {
        self.blocks.get(name)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate all blocks in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = &BlockPtr> {
        self.blocks.values()
    }
}
