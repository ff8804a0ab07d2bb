//! Pre-tessellated shape geometry for every (shape, rotation, mask) combination

use crate::core::types::{Mat3, Result};
use crate::math::rotation::{ROTATION_COUNT, rotation_matrix};

use super::{ShapeType, ShapeVertex, VoxelShape};

/// Number of distinct 6-bit occlusion masks
pub const MASK_COUNT: usize = 64;

/// Geometry of one shape, rotated, with only the masked faces present
#[derive(Clone, Debug, Default)]
pub struct ShapePrebuilt {
    pub vertices: Vec<ShapeVertex>,
    pub indices: Vec<u16>,
}

impl ShapePrebuilt {
    /// Check if there is no geometry
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Read-only cache of prebuilt shape geometry, indexed by
/// `[shape][rotation][mask]`.
///
/// Fully computed on construction; safe to share between grids.
#[derive(Clone, Debug, Default)]
pub struct VoxelShapeCache {
    shapes: Vec<Vec<Vec<ShapePrebuilt>>>,
}

impl VoxelShapeCache {
    /// Validate and precompute the given shapes
    pub fn new(shapes: impl IntoIterator<Item = (ShapeType, VoxelShape)>) -> Result<Self> {
        let mut cache = Self::default();
        for (shape_type, shape) in shapes {
            shape.validate()?;
            cache.insert(shape_type, &shape);
        }
        Ok(cache)
    }

    /// Cache holding only the procedural unit cube
    pub fn cube_only() -> Self {
        let mut cache = Self::default();
        cache.insert(ShapeType::Cube, &VoxelShape::cube());
        cache
    }

    fn insert(&mut self, shape_type: ShapeType, shape: &VoxelShape) {
        let slot = shape_type as usize;
        if self.shapes.len() <= slot {
            self.shapes.resize_with(slot + 1, Vec::new);
        }
        self.shapes[slot] = precompute(shape);
        log::debug!(
            "Prebuilt shape {:?}: {} sides x {} rotations x {} masks",
            shape_type,
            shape.sides.len(),
            ROTATION_COUNT,
            MASK_COUNT
        );
    }

    /// Check if geometry for a shape is available
    pub fn has_shape(&self, shape_type: ShapeType) -> bool {
        self.shapes
            .get(shape_type as usize)
            .is_some_and(|rotations| !rotations.is_empty())
    }

    /// Look up prebuilt geometry. `None` for unknown shapes, rotations >= 24
    /// or masks >= 64.
    pub fn get(&self, shape: u8, rotation: u8, mask: u8) -> Option<&ShapePrebuilt> {
        self.shapes
            .get(shape as usize)?
            .get(rotation as usize)?
            .get(mask as usize)
    }
}

fn precompute(shape: &VoxelShape) -> Vec<Vec<ShapePrebuilt>> {
    (0..ROTATION_COUNT as u8)
        .filter_map(rotation_matrix)
        .map(|rotation| {
            let normal_matrix = Mat3::from_mat4(*rotation).inverse().transpose();

            (0..MASK_COUNT as u8)
                .map(|mask| {
                    let mut prebuilt = ShapePrebuilt::default();

                    for side in shape.sides.iter().filter(|s| mask & s.face.mask() != 0) {
                        let vertex_offset = prebuilt.vertices.len() as u16;
                        prebuilt.vertices.extend(side.vertices.iter().map(|v| ShapeVertex {
                            position: rotation.transform_point3(v.position),
                            normal: normal_matrix * v.normal,
                        }));
                        prebuilt.indices.extend(side.indices.iter().map(|i| i + vertex_offset));
                    }

                    prebuilt
                })
                .collect()
        })
        .collect()
}
