//! Voxel shapes and their per-face geometry

pub mod cache;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::{IVec3, Result, Vec3};

pub use cache::{ShapePrebuilt, VoxelShapeCache};

/// Silhouette class of a voxel
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    Cube = 0,
    Wedge = 1,
    Corner = 2,
    Penta = 3,
}

impl ShapeType {
    pub const ALL: [ShapeType; 4] = [
        ShapeType::Cube,
        ShapeType::Wedge,
        ShapeType::Corner,
        ShapeType::Penta,
    ];

    /// Decode the 5-bit shape field of a voxel
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Directions from which this shape hides the adjacent face of a neighbour.
    ///
    /// Only cubes occlude; the sloped shapes never cover a neighbour fully.
    pub fn solid_mask(self) -> u8 {
        match self {
            ShapeType::Cube => 0b0011_1111,
            ShapeType::Wedge | ShapeType::Corner | ShapeType::Penta => 0,
        }
    }
}

/// One of the six axis-aligned faces of a voxel
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    #[serde(rename = "X+")]
    PositiveX = 0,
    #[serde(rename = "X-")]
    NegativeX = 1,
    #[serde(rename = "Y+")]
    PositiveY = 2,
    #[serde(rename = "Y-")]
    NegativeY = 3,
    #[serde(rename = "Z+")]
    PositiveZ = 4,
    #[serde(rename = "Z-")]
    NegativeZ = 5,
}

impl Face {
    /// Faces in occlusion-mask bit order
    pub const ALL: [Face; 6] = [
        Face::PositiveX,
        Face::NegativeX,
        Face::PositiveY,
        Face::NegativeY,
        Face::PositiveZ,
        Face::NegativeZ,
    ];

    /// Occlusion mask bit of this face
    pub fn mask(self) -> u8 {
        1 << self as u8
    }

    /// Unit offset to the neighbouring cell behind this face
    pub fn offset(self) -> IVec3 {
        match self {
            Face::PositiveX => IVec3::X,
            Face::NegativeX => IVec3::NEG_X,
            Face::PositiveY => IVec3::Y,
            Face::NegativeY => IVec3::NEG_Y,
            Face::PositiveZ => IVec3::Z,
            Face::NegativeZ => IVec3::NEG_Z,
        }
    }

    /// Outward normal of this face
    pub fn normal(self) -> Vec3 {
        self.offset().as_vec3()
    }
}

/// Vertex of an untransformed shape side
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeVertex {
    pub position: Vec3,
    pub normal: Vec3,
}

/// Geometry of one face of a shape, shown when that face is exposed
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShapeSide {
    pub face: Face,
    pub vertices: Vec<ShapeVertex>,
    pub indices: Vec<u16>,
}

/// A voxel shape as a set of per-face triangle lists in local space.
///
/// Local space is a unit box centred on the origin.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VoxelShape {
    pub sides: Vec<ShapeSide>,
}

impl VoxelShape {
    /// Unit cube with two counter-clockwise triangles per face
    pub fn cube() -> Self {
        let sides = Face::ALL
            .iter()
            .map(|&face| {
                let n = face.normal();
                // (u, v) chosen so that u x v == n
                let (u, v) = match face {
                    Face::PositiveX => (Vec3::Y, Vec3::Z),
                    Face::NegativeX => (Vec3::Z, Vec3::Y),
                    Face::PositiveY => (Vec3::Z, Vec3::X),
                    Face::NegativeY => (Vec3::X, Vec3::Z),
                    Face::PositiveZ => (Vec3::X, Vec3::Y),
                    Face::NegativeZ => (Vec3::Y, Vec3::X),
                };
                let corners = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];
                let vertices = corners
                    .iter()
                    .map(|&(a, b)| ShapeVertex {
                        position: n * 0.5 + u * a + v * b,
                        normal: n,
                    })
                    .collect();
                ShapeSide {
                    face,
                    vertices,
                    indices: vec![0, 1, 2, 0, 2, 3],
                }
            })
            .collect();

        Self { sides }
    }

    /// Parse a shape definition from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let shape: VoxelShape = serde_json::from_str(json)?;
        shape.validate()?;
        Ok(shape)
    }

    /// Check that every side is a well-formed triangle list
    pub fn validate(&self) -> Result<()> {
        let mut total_vertices = 0usize;
        for side in &self.sides {
            if side.indices.len() % 3 != 0 {
                return Err(Error::Shape(format!(
                    "side {:?} has {} indices, expected a multiple of 3",
                    side.face,
                    side.indices.len()
                )));
            }
            if let Some(&bad) = side.indices.iter().find(|&&i| i as usize >= side.vertices.len()) {
                return Err(Error::Shape(format!(
                    "side {:?} index {} out of range ({} vertices)",
                    side.face,
                    bad,
                    side.vertices.len()
                )));
            }
            total_vertices += side.vertices.len();
        }
        if total_vertices > u16::MAX as usize + 1 {
            return Err(Error::Shape(format!(
                "shape has {} vertices, more than 16-bit indices can address",
                total_vertices
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_type_from_u8() {
        assert_eq!(ShapeType::from_u8(0), Some(ShapeType::Cube));
        assert_eq!(ShapeType::from_u8(3), Some(ShapeType::Penta));
        assert_eq!(ShapeType::from_u8(4), None);
        assert_eq!(ShapeType::from_u8(31), None);
    }

    #[test]
    fn test_face_masks_cover_six_bits() {
        let all = Face::ALL.iter().fold(0u8, |acc, f| acc | f.mask());
        assert_eq!(all, 0b0011_1111);
        assert_eq!(Face::PositiveZ.mask(), 0x10);
        assert_eq!(Face::NegativeZ.offset(), IVec3::new(0, 0, -1));
    }

    #[test]
    fn test_cube_winding_faces_outward() {
        let cube = VoxelShape::cube();
        assert_eq!(cube.sides.len(), 6);
        for side in &cube.sides {
            for tri in side.indices.chunks(3) {
                let a = side.vertices[tri[0] as usize].position;
                let b = side.vertices[tri[1] as usize].position;
                let c = side.vertices[tri[2] as usize].position;
                let n = (b - a).cross(c - a).normalize();
                assert!((n - side.face.normal()).length() < 1e-5, "{:?}", side.face);
            }
        }
        assert!(cube.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "sides": [{
                "face": "Y+",
                "vertices": [
                    { "position": [-0.5, 0.5, -0.5], "normal": [0.0, 1.0, 0.0] },
                    { "position": [0.5, 0.5, -0.5], "normal": [0.0, 1.0, 0.0] },
                    { "position": [0.5, 0.5, 0.5], "normal": [0.0, 1.0, 0.0] }
                ],
                "indices": [0, 2, 1]
            }]
        }"#;
        let shape = VoxelShape::from_json(json).unwrap();
        assert_eq!(shape.sides.len(), 1);
        assert_eq!(shape.sides[0].face, Face::PositiveY);
    }

    #[test]
    fn test_validate_rejects_bad_indices() {
        let mut shape = VoxelShape::cube();
        shape.sides[0].indices.push(0);
        assert!(matches!(shape.validate(), Err(Error::Shape(_))));

        let mut shape = VoxelShape::cube();
        shape.sides[1].indices[0] = 9;
        assert!(matches!(shape.validate(), Err(Error::Shape(_))));
    }
}
