//! Mesh generation settings

use serde::{Deserialize, Serialize};

use crate::core::types::Result;

/// Parameters of the box-projected texture mapping applied to generated
/// vertices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Texture repeats per voxel along each projected axis. Default 0.25.
    pub uv_scale: f32,
    /// Added to both projected coordinates. Default 0.5.
    pub uv_offset: f32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            uv_scale: 0.25,
            uv_offset: 0.5,
        }
    }
}

impl MeshConfig {
    /// Parse from JSON; omitted fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MeshConfig::default();
        assert_eq!(config.uv_scale, 0.25);
        assert_eq!(config.uv_offset, 0.5);
    }

    #[test]
    fn test_partial_json() {
        let config = MeshConfig::from_json(r#"{ "uv_scale": 1.0 }"#).unwrap();
        assert_eq!(config.uv_scale, 1.0);
        assert_eq!(config.uv_offset, 0.5);
        assert_eq!(MeshConfig::from_json("{}").unwrap(), MeshConfig::default());
        assert!(MeshConfig::from_json(r#"{ "uv_scale": "x" }"#).is_err());
        assert!(MeshConfig::from_json("not json").is_err());
    }
}
