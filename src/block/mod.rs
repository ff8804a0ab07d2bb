//! Block assets: materials and per-face material assignment

pub mod catalog;

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::shape::{Face, ShapeType};

pub use catalog::BlockCatalog;

/// Shared handle to a block asset
pub type BlockPtr = Arc<Block>;

/// Surface material referenced by block faces
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Linear RGBA multiplier for the base color texture
    #[serde(default = "default_color_factor")]
    pub base_color_factor: [f32; 4],
}

fn default_color_factor() -> [f32; 4] {
    [1.0; 4]
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_color_factor: default_color_factor(),
        }
    }
}

/// Material handle that hashes and compares by identity, used to key mesh
/// output per distinct material instance.
#[derive(Clone, Debug)]
pub struct MaterialKey(pub Arc<Material>);

impl MaterialKey {
    pub fn material(&self) -> &Material {
        &self.0
    }
}

impl PartialEq for MaterialKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MaterialKey {}

impl Hash for MaterialKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

/// Material entry of a block definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialDefinition {
    pub name: String,
    /// Faces this material is applied to
    #[serde(default)]
    pub faces: Vec<Face>,
    #[serde(default = "default_color_factor")]
    pub base_color_factor: [f32; 4],
}

/// Data-driven description of a block
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockDefinition {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub category: String,
    /// Shapes this block may be placed as
    #[serde(default)]
    pub shapes: Vec<ShapeType>,
    pub materials: Vec<MaterialDefinition>,
}

/// A placeable block type
#[derive(Debug)]
pub struct Block {
    name: String,
    label: String,
    category: String,
    shapes: Vec<ShapeType>,
    materials: Vec<Arc<Material>>,
    /// Index into `materials` per face, in `Face` order
    side_to_material: [Option<usize>; 6],
}

impl Block {
    /// Block with one material covering every face
    pub fn singular(name: impl Into<String>, material: Material) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            category: String::new(),
            shapes: vec![ShapeType::Cube],
            materials: vec![Arc::new(material)],
            side_to_material: [Some(0); 6],
        }
    }

    /// Build a block from its definition.
    ///
    /// A single material applies to all faces when it lists none; with several
    /// materials each face takes the first material naming it.
    pub fn from_definition(name: impl Into<String>, definition: BlockDefinition) -> Result<Self> {
        let name = name.into();
        if definition.materials.is_empty() {
            return Err(Error::Block(format!("block '{}' defines no materials", name)));
        }

        let single = definition.materials.len() == 1;
        let mut side_to_material = [None; 6];
        let mut materials = Vec::with_capacity(definition.materials.len());

        for (index, def) in definition.materials.into_iter().enumerate() {
            if single && def.faces.is_empty() {
                side_to_material = [Some(index); 6];
            }
            for face in &def.faces {
                side_to_material[*face as usize].get_or_insert(index);
            }
            materials.push(Arc::new(Material {
                name: def.name,
                base_color_factor: def.base_color_factor,
            }));
        }

        if let Some(face) = Face::ALL.iter().find(|f| side_to_material[**f as usize].is_none()) {
            log::warn!("Block '{}' has no material for face {:?}", name, face);
        }

        Ok(Self {
            name,
            label: definition.label,
            category: definition.category,
            shapes: definition.shapes,
            materials,
            side_to_material,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Shapes this block may be placed as
    pub fn allowed_shapes(&self) -> &[ShapeType] {
        &self.shapes
    }

    /// True when a single material covers the whole block
    pub fn is_singular(&self) -> bool {
        self.materials.len() == 1
    }

    /// The first (for singular blocks, the only) material
    pub fn material(&self) -> &Arc<Material> {
        &self.materials[0]
    }

    /// Material assigned to a face, if any
    pub fn material_for_side(&self, face: Face) -> Option<&Arc<Material>> {
        self.side_to_material[face as usize].map(|i| &self.materials[i])
    }
}
