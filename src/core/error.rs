//! Error types for the voxel grid engine

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt grid data: {0}")]
    Corrupt(String),

    #[error("Unknown block: '{0}'")]
    UnknownBlock(String),

    #[error("Block error: {0}")]
    Block(String),

    #[error("Shape error: {0}")]
    Shape(String),
}
